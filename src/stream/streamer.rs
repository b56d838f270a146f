//! Double-buffered streaming
//!
//! Region 2·M elemen dibagi dua blok. Mekanisme transfer (DMA circular)
//! menguras region secara terus-menerus; begitu satu blok selesai dikuras,
//! streamer langsung mengisi ulang blok itu selagi transfer berada di blok
//! lainnya. Streamer tidak pernah polling: ia hanya bereaksi pada sinyal
//! `HalfConsumed` / `FullConsumed` dari transfer.

use std::fmt;

/// Salah satu dari dua blok
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Half {
    First = 0,
    Second = 1,
}

impl Half {
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline(always)]
    pub const fn other(self) -> Half {
        match self {
            Half::First => Half::Second,
            Half::Second => Half::First,
        }
    }
}

/// Sinyal progres dari mekanisme transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEvent {
    /// Blok pertama (M elemen) sudah habis dikirim
    HalfConsumed,
    /// Kedua blok habis, transfer akan wrap ke awal
    FullConsumed,
}

/// Callback aplikasi untuk mengisi ulang satu blok.
///
/// Dipanggil dari konteks sinyal: harus selesai sebelum transfer kembali ke
/// blok ini (satu durasi blok), dan tidak boleh blocking.
pub trait Regenerate<T> {
    fn regenerate(&mut self, half: Half, block: &mut [T]);
}

impl<T, F: FnMut(Half, &mut [T])> Regenerate<T> for F {
    #[inline]
    fn regenerate(&mut self, half: Half, block: &mut [T]) {
        self(half, block)
    }
}

/// Kontrol minimal atas mekanisme transfer yang dibutuhkan streamer
pub trait TransferControl {
    fn stop(&mut self);
    fn start(&mut self);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamerStats {
    /// Jumlah regenerasi per blok
    pub regenerations: [u64; 2],
    /// Pass penuh (2·M elemen) yang sudah selesai
    pub passes: u64,
    /// Sinyal yang datang di luar urutan Half → Full → Half ...
    pub out_of_order: u64,
}

/// Dua blok berukuran `M`, satu dikuras transfer, satu diisi ulang.
pub struct DoubleBufferStreamer<T, const M: usize, R, C> {
    // Blok 0 = region[..M], blok 1 = region[M..]
    region: Box<[T]>,
    active: Half,
    expect: TransferEvent,
    regenerator: R,
    control: C,
    stats: StreamerStats,
}

impl<T, const M: usize, R, C> DoubleBufferStreamer<T, M, R, C> {
    const BLOCK_OK: () = assert!(M > 0, "DoubleBufferStreamer block size M must be > 0");

    /// Ukuran satu blok
    #[inline(always)]
    pub const fn block_len(&self) -> usize {
        M
    }

    /// Seluruh region 2·M, urutan yang dibaca transfer
    #[inline(always)]
    pub fn region(&self) -> &[T] {
        &self.region
    }

    #[inline]
    pub fn block(&self, half: Half) -> &[T] {
        let start = half.index() * M;
        &self.region[start..start + M]
    }

    /// Blok yang sedang dikuras transfer
    #[inline(always)]
    pub fn active(&self) -> Half {
        self.active
    }

    #[inline(always)]
    pub fn stats(&self) -> StreamerStats {
        self.stats
    }

    pub fn regenerator(&self) -> &R {
        &self.regenerator
    }

    pub fn control(&self) -> &C {
        &self.control
    }
}

impl<T, const M: usize, R, C> DoubleBufferStreamer<T, M, R, C>
where
    T: Copy + Default,
    R: Regenerate<T>,
    C: TransferControl,
{
    /// Buat streamer dengan region berisi `T::default()`.
    ///
    /// Transfer belum berjalan sampai [`arm`](Self::arm) dipanggil.
    pub fn new(regenerator: R, control: C) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::BLOCK_OK;

        Self {
            region: vec![T::default(); 2 * M].into_boxed_slice(),
            active: Half::First,
            expect: TransferEvent::HalfConsumed,
            regenerator,
            control,
            stats: StreamerStats::default(),
        }
    }

    /// Isi kedua blok lalu mulai transfer dari blok pertama
    pub fn arm(&mut self) {
        self.refill(Half::First);
        self.refill(Half::Second);
        self.active = Half::First;
        self.expect = TransferEvent::HalfConsumed;
        self.control.start();
        log::debug!("streamer armed: 2 x {} elements", M);
    }

    /// Transfer selesai dengan blok pertama: pindah ke blok kedua, isi ulang
    /// blok pertama.
    pub fn on_half_consumed(&mut self) {
        self.check_order(TransferEvent::HalfConsumed);
        self.active = Half::Second;
        self.expect = TransferEvent::FullConsumed;
        self.refill(Half::First);
    }

    /// Transfer selesai dengan kedua blok: re-arm transfer supaya pass baru
    /// mulai bersih dari awal region, lalu isi ulang blok kedua.
    pub fn on_full_consumed(&mut self) {
        self.check_order(TransferEvent::FullConsumed);
        // Hanya di jalur wrap-around; half-consumed tidak menyentuh transfer
        self.control.stop();
        self.control.start();
        self.active = Half::First;
        self.expect = TransferEvent::HalfConsumed;
        self.stats.passes += 1;
        self.refill(Half::Second);
    }

    #[inline]
    pub fn handle(&mut self, event: TransferEvent) {
        match event {
            TransferEvent::HalfConsumed => self.on_half_consumed(),
            TransferEvent::FullConsumed => self.on_full_consumed(),
        }
    }

    fn check_order(&mut self, event: TransferEvent) {
        if event != self.expect {
            self.stats.out_of_order += 1;
            log::warn!(
                "transfer signal {:?} out of order (expected {:?})",
                event,
                self.expect
            );
        }
    }

    fn refill(&mut self, half: Half) {
        let start = half.index() * M;
        self.regenerator
            .regenerate(half, &mut self.region[start..start + M]);
        self.stats.regenerations[half.index()] += 1;
        log::trace!("regenerated block {}", half.index());
    }
}

impl<T, const M: usize, R, C> fmt::Debug for DoubleBufferStreamer<T, M, R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoubleBufferStreamer")
            .field("block_len", &M)
            .field("active", &self.active)
            .field("expect", &self.expect)
            .field("stats", &self.stats)
            .finish()
    }
}
