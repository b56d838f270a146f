//! Console dua arah lewat sepasang ring buffer
//!
//! Target menulis log ke buffer `up`, host (debugger / reader eksternal)
//! membacanya; input host masuk lewat buffer `down`. Satu buffer per arah,
//! jadi masing-masing tetap SPSC.
//!
//! Tulisan tidak pernah blocking: kalau tidak ada reader yang menguras `up`,
//! byte yang tidak muat dibuang begitu saja.

use std::io;

use crate::core::{Consumer, Producer, RingBuffer};
use crate::error::{Error, Result};

pub const CONSOLE_MAGIC: u32 = 0xDEAD_F00D;
pub const CONSOLE_BUFSIZE: usize = 256;

pub const STDOUT: i32 = 1;
pub const STDERR: i32 = 2;

pub struct ConsoleChannel {
    magic: u32,
    up: RingBuffer<u8, CONSOLE_BUFSIZE>,
    down: RingBuffer<u8, CONSOLE_BUFSIZE>,
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleChannel {
    pub fn new() -> Self {
        Self {
            magic: CONSOLE_MAGIC,
            up: RingBuffer::new(),
            down: RingBuffer::new(),
        }
    }

    /// Magic yang dicari reader untuk menemukan channel
    pub fn magic(&self) -> u32 {
        self.magic
    }

    pub fn bufsize(&self) -> usize {
        CONSOLE_BUFSIZE
    }

    /// Sisi target (writer) dan sisi host (reader)
    pub fn split(&mut self) -> (ConsoleWriter<'_>, ConsoleReader<'_>) {
        let (up_tx, up_rx) = self.up.split();
        let (down_tx, down_rx) = self.down.split();
        (
            ConsoleWriter {
                up: up_tx,
                down: down_rx,
                dropped: 0,
            },
            ConsoleReader {
                up: up_rx,
                down: down_tx,
            },
        )
    }
}

/// Sisi target: menulis output, membaca input dari host
pub struct ConsoleWriter<'a> {
    up: Producer<'a, u8, CONSOLE_BUFSIZE>,
    down: Consumer<'a, u8, CONSOLE_BUFSIZE>,
    dropped: u64,
}

impl ConsoleWriter<'_> {
    /// Tulis ke stream bernomor `stream`. Hanya stdout dan stderr.
    pub fn write_stream(&mut self, stream: i32, buf: &[u8]) -> Result<usize> {
        match stream {
            STDOUT | STDERR => {
                self.put_bytes(buf);
                Ok(buf.len())
            }
            other => Err(Error::UnsupportedStream(other)),
        }
    }

    /// Satu byte input dari host, jika ada
    pub fn read_input(&mut self) -> Option<u8> {
        self.down.try_get()
    }

    /// Byte yang dibuang karena buffer `up` penuh
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn put_bytes(&mut self, buf: &[u8]) {
        for &byte in buf {
            if !self.up.try_put(byte) {
                // Tidak ada reader: sisa pesan dibuang
                self.dropped += 1;
            }
        }
    }
}

impl io::Write for ConsoleWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.put_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sisi host: menguras output target, mengirim input
pub struct ConsoleReader<'a> {
    up: Consumer<'a, u8, CONSOLE_BUFSIZE>,
    down: Producer<'a, u8, CONSOLE_BUFSIZE>,
}

impl ConsoleReader<'_> {
    /// Pindahkan semua output yang tersedia ke `out`. Returns jumlah byte.
    pub fn drain_into(&mut self, out: &mut Vec<u8>) -> usize {
        let mut n = 0;
        while let Some(byte) = self.up.try_get() {
            out.push(byte);
            n += 1;
        }
        n
    }

    /// Kirim input ke target tanpa menunggu. Returns jumlah byte yang masuk.
    pub fn send(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().take_while(|&&b| self.down.try_put(b)).count()
    }

    pub fn pending(&self) -> usize {
        self.up.used()
    }
}
