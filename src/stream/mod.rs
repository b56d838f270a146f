//! Stream module: double-buffered output untuk transfer background
//!
//! - `DoubleBufferStreamer`: dua blok, satu dikuras, satu diisi ulang
//! - `SimulatedTransfer`: pengganti DMA circular untuk host dan test

mod streamer;
mod transfer;

pub use streamer::{
    DoubleBufferStreamer, Half, Regenerate, StreamerStats, TransferControl, TransferEvent,
};
pub use transfer::{Channel, ChannelControl, SimulatedTransfer};
