//! Simulated instrument: digitizer channels, detectors, stage and z scanner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use dirigo_core::{DataRange, Detector, Frequency, LinearAxis, Position, Velocity};

/// Instrument description for a [`crate::SimEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Enable flag per digitizer channel.
    pub channels: Vec<bool>,
    pub detectors: usize,
    pub has_stage: bool,
    pub has_z_scanner: bool,
    pub fast_scanner_frequency: Frequency,
    pub data_range: DataRange,
    /// Sleep between frames so acquisitions run at the rate the timing model
    /// predicts. Off, frames are produced as fast as possible.
    pub realtime: bool,
    /// Travel limit of every axis, symmetric about zero.
    pub travel: Position,
    /// Seed of the synthetic scene.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            channels: vec![true, true],
            detectors: 2,
            has_stage: true,
            has_z_scanner: true,
            fast_scanner_frequency: Frequency::from_hz(7910.0),
            data_range: DataRange::default(),
            realtime: true,
            travel: Position::from_millimeters(25.0),
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Motion {
    origin: Position,
    velocity: Velocity,
    since: Instant,
}

/// Axis that integrates its commanded velocity over wall-clock time.
#[derive(Debug)]
pub struct SimAxis {
    name: &'static str,
    limit: Position,
    motion: Mutex<Motion>,
}

impl SimAxis {
    #[must_use]
    pub fn new(name: &'static str, limit: Position) -> Self {
        Self {
            name,
            limit: limit.abs(),
            motion: Mutex::new(Motion {
                origin: Position::default(),
                velocity: Velocity::default(),
                since: Instant::now(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lock(&self) -> MutexGuard<'_, Motion> {
        self.motion.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clamp(&self, position: Position) -> Position {
        if position > self.limit {
            self.limit
        } else if position < -self.limit {
            -self.limit
        } else {
            position
        }
    }

    fn current(&self, motion: &Motion) -> Position {
        let elapsed = motion.since.elapsed().as_secs_f64();
        let travelled = motion.velocity.distance(dirigo_core::Time::from_base(elapsed));
        self.clamp(motion.origin + travelled)
    }

    /// Re-anchors the motion at the current position with a new velocity.
    fn settle(&self, velocity: Velocity) {
        let mut motion = self.lock();
        let here = self.current(&motion);
        *motion = Motion {
            origin: here,
            velocity,
            since: Instant::now(),
        };
    }
}

impl LinearAxis for SimAxis {
    fn move_velocity(&self, velocity: Velocity) -> dirigo_core::Result<()> {
        self.settle(velocity);
        log::trace!("{} moving at {velocity}", self.name);
        Ok(())
    }

    fn stop(&self) -> dirigo_core::Result<()> {
        self.settle(Velocity::default());
        Ok(())
    }

    fn move_to(&self, position: Position) -> dirigo_core::Result<()> {
        let mut motion = self.lock();
        *motion = Motion {
            origin: self.clamp(position),
            velocity: Velocity::default(),
            since: Instant::now(),
        };
        Ok(())
    }

    fn position(&self) -> Position {
        self.current(&self.lock())
    }

    fn is_moving(&self) -> bool {
        let motion = self.lock();
        motion.velocity.base() != 0.0 && self.current(&motion).abs() < self.limit
    }
}

/// Photodetector with an enable flag.
#[derive(Debug)]
pub struct SimDetector {
    index: usize,
    enabled: AtomicBool,
}

impl SimDetector {
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            enabled: AtomicBool::new(true),
        }
    }
}

impl Detector for SimDetector {
    fn index(&self) -> usize {
        self.index
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn set_enabled(&self, enabled: bool) {
        log::debug!("detector {} {}", self.index + 1, if enabled { "on" } else { "off" });
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

/// Shared hardware objects of one engine.
#[derive(Debug)]
pub struct SimHardware {
    pub config: SimConfig,
    pub detectors: Vec<Arc<SimDetector>>,
    pub x: Option<Arc<SimAxis>>,
    pub y: Option<Arc<SimAxis>>,
    pub z: Option<Arc<SimAxis>>,
}

impl SimHardware {
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let stage_axis = |name| {
            config
                .has_stage
                .then(|| Arc::new(SimAxis::new(name, config.travel)))
        };
        let x = stage_axis("x");
        let y = stage_axis("y");
        let z = config
            .has_z_scanner
            .then(|| Arc::new(SimAxis::new("z", config.travel)));
        let detectors = (0..config.detectors)
            .map(|i| Arc::new(SimDetector::new(i)))
            .collect();
        Self {
            config,
            detectors,
            x,
            y,
            z,
        }
    }

    /// Whether the detector feeding digitizer channel `channel` is on.
    ///
    /// Channels without a detector are treated as lit.
    #[must_use]
    pub fn detector_on(&self, channel: usize) -> bool {
        self.detectors.get(channel).map_or(true, |d| d.enabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_axis_integrates_velocity() {
        let axis = SimAxis::new("x", Position::from_millimeters(10.0));
        axis.move_velocity(Velocity::from_mm_per_s(2.0)).unwrap();
        assert!(axis.is_moving());
        thread::sleep(Duration::from_millis(50));
        axis.stop().unwrap();
        let stopped_at = axis.position();
        assert!(stopped_at.base() > 0.0);
        assert!(!axis.is_moving());
        thread::sleep(Duration::from_millis(10));
        assert_eq!(axis.position(), stopped_at);
    }

    #[test]
    fn test_axis_respects_travel() {
        let axis = SimAxis::new("z", Position::from_micrometers(1.0));
        axis.move_to(Position::from_millimeters(5.0)).unwrap();
        assert_eq!(axis.position(), Position::from_micrometers(1.0));
    }

    #[test]
    fn test_detector_enable() {
        let hardware = SimHardware::new(SimConfig::default());
        assert!(hardware.detector_on(0));
        hardware.detectors[0].set_enabled(false);
        assert!(!hardware.detector_on(0));
        assert!(hardware.detector_on(5));
    }
}
