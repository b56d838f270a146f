//! Strategi menunggu untuk operasi blocking (`put`/`get`)
//!
//! Tidak ada primitive wake/notify: sisi yang blocking melakukan busy-wait
//! dan memanggil `Idle::idle()` di setiap iterasi. Host bebas memilih
//! spin, yield, feed watchdog, atau menghitung iterasi di test.

use std::sync::atomic::{AtomicPtr, Ordering};

/// Dipanggil sekali per iterasi busy-wait
pub trait Idle {
    fn idle(&mut self);

    /// Dipanggil sekali setelah satu wait selesai
    #[inline]
    fn reset(&mut self) {}
}

/// Spin murni (hint ke CPU, tidak melepas time slice)
#[derive(Debug, Clone, Copy, Default)]
pub struct Spin;

impl Idle for Spin {
    #[inline(always)]
    fn idle(&mut self) {
        std::hint::spin_loop();
    }
}

/// Melepas time slice ke scheduler OS
#[derive(Debug, Clone, Copy, Default)]
pub struct Yield;

impl Idle for Yield {
    #[inline]
    fn idle(&mut self) {
        std::thread::yield_now();
    }
}

/// Spin beberapa kali dulu, lalu yield
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    spins: u32,
    limit: u32,
}

impl Backoff {
    pub const DEFAULT_SPIN_LIMIT: u32 = 64;

    pub const fn new(limit: u32) -> Self {
        Self { spins: 0, limit }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SPIN_LIMIT)
    }
}

impl Idle for Backoff {
    #[inline]
    fn idle(&mut self) {
        if self.spins < self.limit {
            self.spins += 1;
            std::hint::spin_loop();
        } else {
            std::thread::yield_now();
        }
    }

    #[inline]
    fn reset(&mut self) {
        self.spins = 0;
    }
}

/// Meneruskan ke hook global (lihat [`set_idle_hook`])
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalIdle;

impl Idle for GlobalIdle {
    #[inline]
    fn idle(&mut self) {
        run_idle_hook();
    }
}

impl<F: FnMut()> Idle for F {
    #[inline]
    fn idle(&mut self) {
        self()
    }
}

fn default_hook() {
    std::thread::yield_now();
}

// Null berarti hook default
static IDLE_HOOK: AtomicPtr<()> = AtomicPtr::new(std::ptr::null_mut());

/// Pasang hook idle untuk seluruh proses.
///
/// Hook dipanggil dari konteks yang sedang menunggu, jadi harus singkat
/// dan tidak boleh memanggil `put`/`get` pada buffer yang sama.
pub fn set_idle_hook(hook: fn()) {
    IDLE_HOOK.store(hook as *mut (), Ordering::Release);
}

/// Kembalikan hook ke default (`thread::yield_now`)
pub fn reset_idle_hook() {
    IDLE_HOOK.store(std::ptr::null_mut(), Ordering::Release);
}

/// Jalankan hook global satu kali
#[inline]
pub fn run_idle_hook() {
    let ptr = IDLE_HOOK.load(Ordering::Acquire);
    let hook: fn() = if ptr.is_null() {
        default_hook
    } else {
        // SAFETY: pointer non-null hanya berasal dari `set_idle_hook`,
        // yang menyimpan `fn()` yang valid.
        unsafe { std::mem::transmute::<*mut (), fn()>(ptr) }
    };
    hook();
}
