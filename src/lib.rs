//! # pingring
//!
//! Dua primitive low-level untuk firmware yang digerakkan interrupt:
//!
//! - [`core::RingBuffer`]: circular buffer SPSC dengan kapasitas power of 2
//! - [`stream::DoubleBufferStreamer`]: dua blok yang bergantian dikuras oleh
//!   transfer di background (DMA) dan diisi ulang oleh aplikasi
//!
//! Sisanya ([`pattern`], [`console`]) adalah pemakai kedua primitive itu.
//!
//! ```
//! use pingring::core::RingBuffer;
//!
//! let mut rb: RingBuffer<u8, 8> = RingBuffer::new();
//! let (mut tx, mut rx) = rb.split();
//! tx.put(b'h');
//! tx.put(b'i');
//! assert_eq!(rx.get(), b'h');
//! assert_eq!(rx.get(), b'i');
//! ```

pub mod console;
pub mod core;
pub mod error;
pub mod pattern;
pub mod stream;

pub use error::{Error, Result};
