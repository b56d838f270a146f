//! Core module: Lock-Free SPSC Ring Buffer
//!
//! Prinsip desain:
//! - Lock-Free: Hanya atomic operations, tidak ada Mutex/RwLock di hot path
//! - No-Allocation: Buffer pre-allocated saat init
//! - SPSC by construction: satu Producer dan satu Consumer per buffer

mod idle;
mod ring_buffer;

pub use idle::{reset_idle_hook, run_idle_hook, set_idle_hook, Backoff, GlobalIdle, Idle, Spin, Yield};
pub use ring_buffer::{Consumer, Producer, RingBuffer};
