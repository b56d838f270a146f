//! Wave pattern generator untuk output 8-bit paralel
//!
//! Setiap elemen adalah satu sampel untuk 8 pin: bit 0..6 pulsa acak yang
//! jarang (sparse), bit 7 dicadangkan untuk penanda reference clock yang
//! muncul secara periodik di elemen pertama blok.

use crate::error::{Error, Result};
use crate::stream::{Half, Regenerate};

/// Bit penanda reference clock
pub const MARKER_BIT: u8 = 0x80;

/// Bit yang membawa pulsa data
pub const PULSE_MASK: u8 = 0x7F;

// Pulsa per frame dihitung untuk tiga frame per pass
const PULSE_SCALE: u32 = 3;

/// Xorshift128 (Marsaglia)
#[derive(Debug, Clone)]
pub struct Xorshift128 {
    x: u32,
    y: u32,
    z: u32,
    w: u32,
}

impl Xorshift128 {
    pub const SEED: [u32; 4] = [123_456_789, 362_436_069, 521_288_629, 88_675_123];

    pub const fn new() -> Self {
        Self::with_seed(Self::SEED)
    }

    pub const fn with_seed(seed: [u32; 4]) -> Self {
        Self {
            x: seed[0],
            y: seed[1],
            z: seed[2],
            w: seed[3],
        }
    }

    #[inline(always)]
    pub fn next_u32(&mut self) -> u32 {
        let t = self.x ^ (self.x << 11);
        self.x = self.y;
        self.y = self.z;
        self.z = self.w;
        self.w ^= (self.w >> 19) ^ t ^ (t >> 8);
        self.w
    }
}

impl Default for Xorshift128 {
    fn default() -> Self {
        Self::new()
    }
}

/// Penanda periodik: aktif di regenerasi #0, lalu setiap `period` regenerasi.
#[derive(Debug, Clone)]
pub struct RefMarker {
    period: u32,
    countdown: u32,
}

impl RefMarker {
    /// Perilaku firmware: reload 5, jadi penanda muncul setiap 6 regenerasi
    pub const FIRMWARE_PERIOD: u32 = 6;

    pub fn new(period: u32) -> Result<Self> {
        if period == 0 {
            return Err(Error::InvalidConfig(
                "marker period must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            period,
            countdown: 0,
        })
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Returns `true` jika regenerasi kali ini harus diberi penanda
    #[inline]
    pub fn tick(&mut self) -> bool {
        if self.countdown == 0 {
            self.countdown = self.period - 1;
            true
        } else {
            self.countdown -= 1;
            false
        }
    }
}

impl Default for RefMarker {
    fn default() -> Self {
        Self {
            period: Self::FIRMWARE_PERIOD,
            countdown: 0,
        }
    }
}

/// Regenerator blok: pulsa acak + penanda reference clock
#[derive(Debug, Clone, Default)]
pub struct WavePattern {
    rng: Xorshift128,
    marker: RefMarker,
    generations: u64,
    marks: u64,
}

impl WavePattern {
    pub fn new(rng: Xorshift128, marker: RefMarker) -> Self {
        Self {
            rng,
            marker,
            generations: 0,
            marks: 0,
        }
    }

    /// Jumlah blok yang sudah digenerate
    pub fn generations(&self) -> u64 {
        self.generations
    }

    /// Jumlah blok yang diberi penanda
    pub fn marks(&self) -> u64 {
        self.marks
    }
}

impl Regenerate<u8> for WavePattern {
    fn regenerate(&mut self, half: Half, block: &mut [u8]) {
        let base = half.index() * block.len();
        for (i, out) in block.iter_mut().enumerate() {
            let mut t = self.rng.next_u32() >> 1;
            t &= t >> 16;
            t &= t >> 8;
            // Posisi dalam region ikut membentuk pola
            *out = (t & (base + i + 1) as u32) as u8 & PULSE_MASK;
        }

        if self.marker.tick() {
            if let Some(first) = block.first_mut() {
                *first |= MARKER_BIT;
            }
            self.marks += 1;
        }
        self.generations += 1;
    }
}

/// Jumlah pulsa data (bit 0..6) dalam region, diskalakan per frame
pub fn pulses_per_frame(region: &[u8]) -> u32 {
    let pulses: u32 = region.iter().map(|b| (b & PULSE_MASK).count_ones()).sum();
    pulses * PULSE_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xorshift_reference_sequence() {
        let mut rng = Xorshift128::new();
        assert_eq!(rng.next_u32(), 3_701_687_786);
        assert_eq!(rng.next_u32(), 458_299_110);
        assert_eq!(rng.next_u32(), 2_500_872_618);
    }

    #[test]
    fn test_marker_period_five() {
        let mut marker = RefMarker::new(5).unwrap();
        let marked: Vec<u32> = (0..16).filter(|_| marker.tick()).collect();
        assert_eq!(marked, vec![0, 5, 10, 15]);
    }

    #[test]
    fn test_marker_firmware_period() {
        let mut marker = RefMarker::default();
        let marked: Vec<u32> = (0..13).filter(|_| marker.tick()).collect();
        assert_eq!(marked, vec![0, 6, 12]);
    }

    #[test]
    fn test_marker_rejects_zero_period() {
        assert!(matches!(RefMarker::new(0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_wave_pattern_marks_first_element_only() {
        let mut wave = WavePattern::new(Xorshift128::new(), RefMarker::new(5).unwrap());
        let mut block = [0u8; 64];
        let mut marked = Vec::new();

        for n in 0..11 {
            let half = if n % 2 == 0 { Half::First } else { Half::Second };
            wave.regenerate(half, &mut block);
            assert!(block[1..].iter().all(|b| b & MARKER_BIT == 0));
            if block[0] & MARKER_BIT != 0 {
                marked.push(n);
            }
        }

        assert_eq!(marked, vec![0, 5, 10]);
        assert_eq!(wave.generations(), 11);
        assert_eq!(wave.marks(), 3);
    }

    #[test]
    fn test_pulses_per_frame_ignores_marker() {
        let region = [MARKER_BIT | 0b0000_0011, 0b0100_0000, 0, MARKER_BIT];
        assert_eq!(pulses_per_frame(&region), 3 * 3);
    }
}
