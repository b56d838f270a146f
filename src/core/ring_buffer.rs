//! Single-Producer Single-Consumer (SPSC) Ring Buffer dengan kapasitas tetap
//!
//! Lamport queue klasik: satu slot selalu dibiarkan kosong supaya "penuh" dan
//! "kosong" bisa dibedakan hanya dengan dua indeks. `head` hanya ditulis oleh
//! producer, `tail` hanya ditulis oleh consumer; keduanya dibaca oleh dua sisi.
//! Tidak ada Mutex, tidak ada alokasi setelah `new()`.

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::idle::{GlobalIdle, Idle};

/// Lock-Free SPSC Ring Buffer
///
/// `N` harus power of 2 dan minimal 2; dicek saat kompilasi. Kapasitas yang
/// bisa dipakai adalah `N - 1`.
///
/// Akses data hanya lewat [`Producer`] dan [`Consumer`] dari [`split`],
/// sehingga disiplin satu penulis / satu pembaca dijamin oleh borrow checker.
///
/// [`split`]: RingBuffer::split
#[repr(C)]
pub struct RingBuffer<T, const N: usize> {
    // Producer side - cache line aligned
    head: CacheLinePadded<AtomicUsize>,
    // Consumer side - cache line aligned
    tail: CacheLinePadded<AtomicUsize>,
    buffer: Box<[UnsafeCell<T>]>,
}

/// Padding untuk cache line isolation (64 bytes pada x86-64)
#[repr(C, align(64))]
struct CacheLinePadded<T> {
    value: T,
}

impl<T> CacheLinePadded<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

// SAFETY: slot di [tail, head) hanya dibaca consumer, slot di head hanya
// ditulis producer. Publikasi lewat Release store, observasi lewat Acquire load.
unsafe impl<T: Send, const N: usize> Sync for RingBuffer<T, N> {}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> RingBuffer<T, N> {
    const CAPACITY_OK: () = assert!(
        N >= 2 && N.is_power_of_two(),
        "RingBuffer capacity N must be a power of two >= 2"
    );
    const MASK: usize = N - 1;

    /// Jumlah elemen maksimum yang bisa ditampung (N - 1)
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Reset head = tail = 0. Isi buffer dibuang.
    ///
    /// Butuh `&mut self`, jadi tidak mungkin ada Producer/Consumer yang hidup.
    pub fn init(&mut self) {
        *self.head.value.get_mut() = 0;
        *self.tail.value.get_mut() = 0;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        let head = self.head.value.load(Ordering::Acquire);
        let tail = self.tail.value.load(Ordering::Acquire);
        head == tail
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        let head = self.head.value.load(Ordering::Acquire);
        let tail = self.tail.value.load(Ordering::Acquire);
        ((head + 1) & Self::MASK) == tail
    }

    #[inline(always)]
    pub fn can_read(&self) -> bool {
        !self.is_empty()
    }

    #[inline(always)]
    pub fn can_write(&self) -> bool {
        !self.is_full()
    }

    /// Jumlah elemen yang siap dibaca
    #[inline(always)]
    pub fn used(&self) -> usize {
        let head = self.head.value.load(Ordering::Acquire);
        let tail = self.tail.value.load(Ordering::Acquire);
        head.wrapping_sub(tail) & Self::MASK
    }

    /// Bagi buffer menjadi satu producer dan satu consumer.
    ///
    /// Kedua handle bisa dipindah ke thread berbeda (mis. lewat
    /// `std::thread::scope`).
    pub fn split(&mut self) -> (Producer<'_, T, N>, Consumer<'_, T, N>) {
        let rb: &Self = self;
        (
            Producer {
                rb,
                idle: GlobalIdle,
            },
            Consumer {
                rb,
                idle: GlobalIdle,
            },
        )
    }

    #[inline(always)]
    fn slot(&self, index: usize) -> *mut T {
        self.buffer[index & Self::MASK].get()
    }
}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    /// Membuat ring buffer baru dengan head = tail = 0.
    ///
    /// Alokasi hanya terjadi sekali di sini. Slot diisi `T::default()`.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;

        // Alokasi buffer di heap untuk menghindari stack overflow
        let mut buffer = Vec::with_capacity(N);
        for _ in 0..N {
            buffer.push(UnsafeCell::new(T::default()));
        }

        Self {
            head: CacheLinePadded::new(AtomicUsize::new(0)),
            tail: CacheLinePadded::new(AtomicUsize::new(0)),
            buffer: buffer.into_boxed_slice(),
        }
    }
}

impl<T, const N: usize> fmt::Debug for RingBuffer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("head", &self.head.value.load(Ordering::Relaxed))
            .field("tail", &self.tail.value.load(Ordering::Relaxed))
            .field("used", &self.used())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Sisi penulis. Hanya ada satu per buffer.
pub struct Producer<'a, T, const N: usize, I = GlobalIdle> {
    rb: &'a RingBuffer<T, N>,
    idle: I,
}

impl<'a, T: Copy, const N: usize, I: Idle> Producer<'a, T, N, I> {
    /// Ganti strategi menunggu untuk `push`/`put`
    pub fn with_idle<J: Idle>(self, idle: J) -> Producer<'a, T, N, J> {
        Producer { rb: self.rb, idle }
    }

    /// Tulis elemen ke slot head tanpa mempublikasikannya
    #[inline(always)]
    pub fn stage(&mut self, value: T) {
        let head = self.rb.head.value.load(Ordering::Relaxed);
        // SAFETY: slot head tidak pernah ada di rentang [tail, head) yang
        // dibaca consumer, bahkan saat buffer penuh.
        unsafe { self.rb.slot(head).write(value) };
    }

    /// Majukan head satu slot. Blocking selama buffer penuh.
    ///
    /// Slot head harus sudah diisi lewat [`stage`](Self::stage); kalau tidak,
    /// isi lama slot itu ikut terpublikasi.
    #[inline]
    pub fn push(&mut self) {
        if self.rb.is_full() {
            log::trace!("ring buffer full ({} slots), waiting for consumer", N - 1);
            while self.rb.is_full() {
                self.idle.idle();
            }
            self.idle.reset();
        }
        let head = self.rb.head.value.load(Ordering::Relaxed);
        // Release: isi slot terlihat sebelum head baru
        self.rb
            .head
            .value
            .store((head + 1) & RingBuffer::<T, N>::MASK, Ordering::Release);
    }

    /// Blocking enqueue: stage + push
    #[inline]
    pub fn put(&mut self, value: T) {
        self.stage(value);
        self.push();
    }

    /// Enqueue tanpa menunggu. Returns `false` (elemen dibuang) jika penuh.
    #[inline]
    pub fn try_put(&mut self, value: T) -> bool {
        if self.rb.is_full() {
            return false;
        }
        self.put(value);
        true
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.rb.is_full()
    }

    #[inline(always)]
    pub fn can_write(&self) -> bool {
        self.rb.can_write()
    }

    #[inline(always)]
    pub fn used(&self) -> usize {
        self.rb.used()
    }
}

/// Sisi pembaca. Hanya ada satu per buffer.
pub struct Consumer<'a, T, const N: usize, I = GlobalIdle> {
    rb: &'a RingBuffer<T, N>,
    idle: I,
}

impl<'a, T: Copy, const N: usize, I: Idle> Consumer<'a, T, N, I> {
    /// Ganti strategi menunggu untuk `get`
    pub fn with_idle<J: Idle>(self, idle: J) -> Consumer<'a, T, N, J> {
        Consumer { rb: self.rb, idle }
    }

    /// Baca elemen di tail tanpa mengkonsumsinya
    #[inline(always)]
    pub fn peek(&self) -> Option<T> {
        let tail = self.rb.tail.value.load(Ordering::Relaxed);
        let head = self.rb.head.value.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        // SAFETY: slot tail sudah dipublikasikan (Acquire di atas) dan
        // producer tidak menyentuhnya sampai tail maju.
        Some(unsafe { self.rb.slot(tail).read() })
    }

    /// Majukan tail satu slot. Elemen di tail harus sudah dibaca.
    ///
    /// Memanggil `pop` saat kosong adalah pelanggaran kontrak: panic di debug
    /// build, no-op di release build.
    #[inline]
    pub fn pop(&mut self) {
        let tail = self.rb.tail.value.load(Ordering::Relaxed);
        let head = self.rb.head.value.load(Ordering::Acquire);
        debug_assert!(tail != head, "pop() on empty ring buffer");
        if tail == head {
            return;
        }
        // Release: pembacaan slot selesai sebelum slot dikembalikan ke producer
        self.rb
            .tail
            .value
            .store((tail + 1) & RingBuffer::<T, N>::MASK, Ordering::Release);
    }

    /// Blocking dequeue. Menunggu selama buffer kosong.
    #[inline]
    pub fn get(&mut self) -> T {
        if self.rb.is_empty() {
            log::trace!("ring buffer empty, waiting for producer");
            while self.rb.is_empty() {
                self.idle.idle();
            }
            self.idle.reset();
        }
        let tail = self.rb.tail.value.load(Ordering::Relaxed);
        // SAFETY: buffer tidak kosong (Acquire di is_empty), slot tail sudah
        // dipublikasikan dan hanya consumer yang memajukan tail.
        let value = unsafe { self.rb.slot(tail).read() };
        self.pop();
        value
    }

    /// Dequeue tanpa menunggu
    #[inline]
    pub fn try_get(&mut self) -> Option<T> {
        let value = self.peek()?;
        self.pop();
        Some(value)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.rb.is_empty()
    }

    #[inline(always)]
    pub fn can_read(&self) -> bool {
        self.rb.can_read()
    }

    #[inline(always)]
    pub fn used(&self) -> usize {
        self.rb.used()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_basic_put_get() {
        let mut rb: RingBuffer<u64, 16> = RingBuffer::new();
        assert!(rb.is_empty());
        assert!(!rb.is_full());

        let (mut tx, mut rx) = rb.split();
        tx.put(42);
        assert!(rx.can_read());
        assert_eq!(rx.get(), 42);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_capacity_eight_fills_at_seven() {
        let mut rb: RingBuffer<u8, 8> = RingBuffer::new();
        assert_eq!(rb.capacity(), 7);

        let (mut tx, mut rx) = rb.split();
        for i in 1..=7 {
            assert!(tx.can_write());
            tx.put(i);
        }
        assert!(tx.is_full());
        assert_eq!(tx.used(), 7);
        assert!(!tx.try_put(8)); // Should fail - buffer full

        let out: Vec<u8> = (0..7).map(|_| rx.get()).collect();
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 7]);
        assert!(rx.is_empty());
        assert_eq!(rx.used(), 0);
    }

    #[test]
    fn test_full_and_empty_match_used() {
        let mut rb: RingBuffer<u32, 4> = RingBuffer::new();
        let (mut tx, mut rx) = rb.split();

        for i in 0..3 {
            assert_eq!(tx.is_full(), tx.used() == 3);
            assert_eq!(rx.is_empty(), rx.used() == 0);
            tx.put(i);
        }
        assert!(tx.is_full() && !rx.is_empty());
        rx.pop();
        assert!(!tx.is_full() && !rx.is_empty());
    }

    #[test]
    fn test_wraparound_returns_to_origin() {
        let mut rb: RingBuffer<u64, 4> = RingBuffer::new();
        {
            let (mut tx, mut rx) = rb.split();
            // Fill and drain multiple times to test wraparound
            for round in 0..10 {
                for i in 0..3 {
                    tx.put(round * 3 + i);
                }
                for i in 0..3 {
                    assert_eq!(rx.get(), round * 3 + i);
                }
            }
        }
        assert!(rb.is_empty());
        // 30 elemen = 30 mod 4 = 2
        assert_eq!(rb.head.value.load(Ordering::Relaxed), 2);
        assert_eq!(rb.tail.value.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_init_discards_content() {
        let mut rb: RingBuffer<u8, 8> = RingBuffer::new();
        {
            let (mut tx, _rx) = rb.split();
            tx.put(1);
            tx.put(2);
        }
        assert_eq!(rb.used(), 2);

        rb.init();
        assert!(rb.is_empty());
        assert_eq!(rb.used(), 0);
    }

    #[test]
    fn test_stage_then_push_and_peek_then_pop() {
        let mut rb: RingBuffer<u16, 8> = RingBuffer::new();
        let (mut tx, mut rx) = rb.split();

        tx.stage(7);
        assert!(rx.peek().is_none()); // belum dipublikasikan
        tx.push();
        assert_eq!(rx.peek(), Some(7));
        assert_eq!(rx.peek(), Some(7));
        rx.pop();
        assert!(rx.peek().is_none());
    }

    #[test]
    fn test_push_without_stage_publishes_stale_slot() {
        let mut rb: RingBuffer<u8, 4> = RingBuffer::new();
        let (mut tx, mut rx) = rb.split();

        tx.push();
        assert_eq!(rx.get(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "pop() on empty ring buffer")]
    fn test_pop_on_empty_panics_in_debug() {
        let mut rb: RingBuffer<u8, 4> = RingBuffer::new();
        let (_tx, mut rx) = rb.split();
        rx.pop();
    }

    /// Idle yang mencatat jumlah iterasi dan reset, lalu menjalankan aksi
    struct Tracking<'c, F> {
        idles: &'c Cell<usize>,
        resets: &'c Cell<usize>,
        on_idle: F,
    }

    impl<F: FnMut(usize)> Idle for Tracking<'_, F> {
        fn idle(&mut self) {
            let n = self.idles.get() + 1;
            self.idles.set(n);
            (self.on_idle)(n);
        }

        fn reset(&mut self) {
            self.resets.set(self.resets.get() + 1);
        }
    }

    #[test]
    fn test_get_runs_idle_until_value_arrives() {
        let mut rb: RingBuffer<u32, 4> = RingBuffer::new();
        let idles = Cell::new(0);
        let resets = Cell::new(0);
        let (mut tx, rx) = rb.split();
        let mut rx = rx.with_idle(Tracking {
            idles: &idles,
            resets: &resets,
            on_idle: |n: usize| {
                if n % 3 == 0 {
                    tx.stage(n as u32);
                    tx.push();
                }
            },
        });

        assert_eq!(rx.get(), 3);
        assert_eq!(idles.get(), 3);
        assert_eq!(resets.get(), 1);

        // Wait kedua: idle dipanggil lagi, reset sekali lagi
        assert_eq!(rx.get(), 6);
        assert_eq!(idles.get(), 6);
        assert_eq!(resets.get(), 2);
    }

    #[test]
    fn test_put_runs_idle_until_slot_frees() {
        let mut rb: RingBuffer<u32, 4> = RingBuffer::new();
        let idles = Cell::new(0);
        let resets = Cell::new(0);
        let (tx, mut rx) = rb.split();
        {
            let mut tx = tx.with_idle(Tracking {
                idles: &idles,
                resets: &resets,
                on_idle: |n: usize| {
                    if n == 2 {
                        rx.pop();
                    }
                },
            });
            for i in 1..=3 {
                tx.put(i);
            }
            assert_eq!(idles.get(), 0);
            assert!(tx.is_full());

            tx.put(4);
            assert_eq!(idles.get(), 2);
            assert_eq!(resets.get(), 1);
        }

        assert_eq!(rx.get(), 2);
        assert_eq!(rx.get(), 3);
        assert_eq!(rx.get(), 4);
    }

    #[test]
    fn test_threaded_put_get_with_capacity_one() {
        let mut rb: RingBuffer<u32, 2> = RingBuffer::new();
        let (tx, rx) = rb.split();
        let mut tx = tx.with_idle(std::thread::yield_now);
        let mut rx = rx.with_idle(std::thread::yield_now);

        std::thread::scope(|s| {
            s.spawn(move || {
                for i in 0..100 {
                    tx.put(i);
                }
            });
            s.spawn(move || {
                for i in 0..100 {
                    assert_eq!(rx.get(), i);
                }
            });
        });
        assert!(rb.is_empty());
    }
}
