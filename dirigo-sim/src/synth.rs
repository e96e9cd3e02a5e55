//! Synthetic specimen: drifting fluorescent beads on a noisy background.

use rayon::prelude::*;

use dirigo_core::{DataRange, Position, RawFrame};

const BEADS_PER_CHANNEL: usize = 12;
const BACKGROUND_FRACTION: f64 = 0.02;
const NOISE_FRACTION: f64 = 0.03;
/// Axial extent over which a bead dims to `1/e`.
const FOCAL_DEPTH_UM: f64 = 60.0;

/// SplitMix64 step; a cheap deterministic hash.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Uniform in `[0, 1)`.
#[allow(clippy::cast_precision_loss)]
fn unit(seed: u64) -> f64 {
    (mix(seed) >> 11) as f64 / (1_u64 << 53) as f64
}

#[derive(Debug, Clone, Copy)]
struct Bead {
    x: f64,
    y: f64,
    z_um: f64,
    radius: f64,
    brightness: f64,
    drift: (f64, f64),
}

/// Scene description shared by every frame of an acquisition.
#[derive(Debug, Clone)]
pub struct Specimen {
    seed: u64,
    range: DataRange,
    beads: Vec<Vec<Bead>>,
}

impl Specimen {
    /// Places beads for `channels` channels in normalised field coordinates.
    #[must_use]
    pub fn new(seed: u64, channels: usize, range: DataRange) -> Self {
        let beads = (0..channels)
            .map(|c| {
                (0..BEADS_PER_CHANNEL)
                    .map(|b| {
                        let s = seed ^ ((c as u64) << 32) ^ (b as u64);
                        Bead {
                            x: unit(s.wrapping_mul(3)),
                            y: unit(s.wrapping_mul(5)),
                            z_um: (unit(s.wrapping_mul(7)) - 0.5) * 300.0,
                            radius: 0.02 + 0.04 * unit(s.wrapping_mul(11)),
                            brightness: 0.4 + 0.6 * unit(s.wrapping_mul(13)),
                            drift: (
                                (unit(s.wrapping_mul(17)) - 0.5) * 2e-3,
                                (unit(s.wrapping_mul(19)) - 0.5) * 2e-3,
                            ),
                        }
                    })
                    .collect()
            })
            .collect();
        Self { seed, range, beads }
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.beads.len()
    }

    /// Renders frame `index` at optional objective `depth`.
    ///
    /// Channels whose detector is off (`lit[c] == false`) receive noise only.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn render(
        &self,
        index: u64,
        width: u32,
        height: u32,
        depth: Option<Position>,
        lit: &[bool],
    ) -> RawFrame {
        let mut frame = RawFrame::zeroed(index, width, height, self.channel_count());
        frame.depth = depth;
        let w = width as usize;
        if w == 0 {
            return frame;
        }
        let span = f64::from(self.range.max - self.range.min);
        let floor = f64::from(self.range.min);
        let z_um = depth.map_or(0.0, Position::micrometers);
        let t = index as f64;

        for (c, plane) in frame.channels.iter_mut().enumerate() {
            let on = lit.get(c).copied().unwrap_or(true);
            let beads = &self.beads[c];
            let noise_seed = mix(self.seed ^ index.rotate_left(17) ^ (c as u64));
            plane.par_chunks_mut(w).enumerate().for_each(|(row, line)| {
                let y = (row as f64 + 0.5) / f64::from(height);
                for (col, px) in line.iter_mut().enumerate() {
                    let x = (col as f64 + 0.5) / f64::from(width);
                    let mut signal = BACKGROUND_FRACTION;
                    if on {
                        for bead in beads {
                            let bx = (bead.x + bead.drift.0 * t).rem_euclid(1.0);
                            let by = (bead.y + bead.drift.1 * t).rem_euclid(1.0);
                            let r2 = ((x - bx).powi(2) + (y - by).powi(2)) / bead.radius.powi(2);
                            if r2 < 9.0 {
                                let axial = ((z_um - bead.z_um) / FOCAL_DEPTH_UM).powi(2);
                                signal += bead.brightness * (-(r2 + axial)).exp();
                            }
                        }
                    }
                    let pixel = (row * w + col) as u64;
                    signal += NOISE_FRACTION * unit(noise_seed ^ pixel);
                    *px = (floor + signal.min(1.0) * span).clamp(0.0, f64::from(u16::MAX)) as u16;
                }
            });
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_deterministic() {
        let specimen = Specimen::new(7, 2, DataRange::default());
        let a = specimen.render(3, 32, 16, None, &[true, true]);
        let b = specimen.render(3, 32, 16, None, &[true, true]);
        assert_eq!(a, b);
        assert_eq!(a.channel_count(), 2);
        assert_eq!(a.channels[0].len(), 32 * 16);
    }

    #[test]
    fn test_dark_channel_is_dim() {
        let specimen = Specimen::new(7, 2, DataRange::default());
        let lit = specimen.render(0, 64, 64, None, &[true, true]);
        let dark = specimen.render(0, 64, 64, None, &[false, true]);
        let dark_ceiling = (BACKGROUND_FRACTION + NOISE_FRACTION) * 65535.0;
        assert!(dark.channels[0].iter().all(|v| f64::from(*v) <= dark_ceiling + 1.0));
        let sum = |plane: &[u16]| plane.iter().map(|v| u64::from(*v)).sum::<u64>();
        assert!(sum(&lit.channels[0]) >= sum(&dark.channels[0]));
        // The other channel is untouched.
        assert_eq!(lit.channels[1], dark.channels[1]);
    }

    #[test]
    fn test_depth_is_recorded() {
        let specimen = Specimen::new(1, 1, DataRange::default());
        let depth = Position::from_micrometers(-50.0);
        let frame = specimen.render(0, 8, 8, Some(depth), &[true]);
        assert_eq!(frame.depth, Some(depth));
    }
}
