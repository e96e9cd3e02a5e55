//! Press-and-hold stage jog.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::units::{Position, Velocity};

/// Lateral jog speed.
pub const XY_VELOCITY_MM_S: f64 = 2.0;
/// Objective jog speed.
pub const Z_VELOCITY_MM_S: f64 = 0.02;

/// A motorised axis that can be driven at constant velocity.
pub trait LinearAxis: Send + Sync {
    /// Starts a constant-velocity move; the sign selects the direction.
    ///
    /// # Errors
    /// Fails if the controller rejects the command.
    fn move_velocity(&self, velocity: Velocity) -> Result<()>;

    /// # Errors
    /// Fails if the controller rejects the command.
    fn stop(&self) -> Result<()>;

    /// Moves to an absolute position and stops there.
    ///
    /// # Errors
    /// Fails if the controller rejects the command.
    fn move_to(&self, position: Position) -> Result<()>;

    fn position(&self) -> Position;

    fn is_moving(&self) -> bool;
}

/// Lateral stage axes.
#[derive(Clone)]
pub struct XyStage {
    pub x: Arc<dyn LinearAxis>,
    pub y: Arc<dyn LinearAxis>,
}

impl fmt::Debug for XyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XyStage")
            .field("x", &self.x.position())
            .field("y", &self.y.position())
            .finish()
    }
}

/// Jog buttons. Directions are in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JogDirection {
    PlusX,
    MinusX,
    PlusY,
    MinusY,
    PlusZ,
    MinusZ,
}

impl JogDirection {
    /// Arrow shown on the button.
    #[must_use]
    pub fn arrow(self) -> &'static str {
        match self {
            JogDirection::PlusX => "→",
            JogDirection::MinusX => "←",
            JogDirection::PlusY | JogDirection::PlusZ => "↑",
            JogDirection::MinusY | JogDirection::MinusZ => "↓",
        }
    }

    #[must_use]
    pub fn is_z(self) -> bool {
        matches!(self, JogDirection::PlusZ | JogDirection::MinusZ)
    }

    /// Signed axis velocity for this button.
    ///
    /// Screen-up is stage y negative.
    #[must_use]
    pub fn velocity(self) -> Velocity {
        let xy = Velocity::from_mm_per_s(XY_VELOCITY_MM_S);
        let z = Velocity::from_mm_per_s(Z_VELOCITY_MM_S);
        match self {
            JogDirection::PlusX | JogDirection::MinusY => xy,
            JogDirection::MinusX | JogDirection::PlusY => -xy,
            JogDirection::PlusZ => z,
            JogDirection::MinusZ => -z,
        }
    }
}

/// Drives the stage and objective scanner from jog buttons.
#[derive(Debug, Clone, Default)]
pub struct JogController {
    stage: Option<XyStage>,
    z: Option<ZAxis>,
    active: Option<JogDirection>,
}

#[derive(Clone)]
struct ZAxis(Arc<dyn LinearAxis>);

impl fmt::Debug for ZAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ZAxis").field(&self.0.position()).finish()
    }
}

impl JogController {
    #[must_use]
    pub fn new(stage: Option<XyStage>, z_scanner: Option<Arc<dyn LinearAxis>>) -> Self {
        Self {
            stage,
            z: z_scanner.map(ZAxis),
            active: None,
        }
    }

    #[must_use]
    pub fn has_stage(&self) -> bool {
        self.stage.is_some()
    }

    #[must_use]
    pub fn has_z(&self) -> bool {
        self.z.is_some()
    }

    /// Direction currently held, if any.
    #[must_use]
    pub fn active(&self) -> Option<JogDirection> {
        self.active
    }

    /// Starts a constant-velocity move.
    ///
    /// # Errors
    /// [`Error::HardwareUnavailable`] if the axis is missing, or the axis'
    /// own error.
    pub fn press(&mut self, direction: JogDirection) -> Result<()> {
        let velocity = direction.velocity();
        let axis: &dyn LinearAxis = match direction {
            JogDirection::PlusX | JogDirection::MinusX => {
                self.stage.as_ref().ok_or(Error::HardwareUnavailable("stage"))?.x.as_ref()
            }
            JogDirection::PlusY | JogDirection::MinusY => {
                self.stage.as_ref().ok_or(Error::HardwareUnavailable("stage"))?.y.as_ref()
            }
            JogDirection::PlusZ | JogDirection::MinusZ => {
                self.z.as_ref().ok_or(Error::HardwareUnavailable("z scanner"))?.0.as_ref()
            }
        };
        axis.move_velocity(velocity)?;
        log::debug!("jog {direction:?} at {velocity}");
        self.active = Some(direction);
        Ok(())
    }

    /// Stops every axis, whichever button was released.
    ///
    /// # Errors
    /// Returns the first axis error after attempting to stop all axes.
    pub fn release(&mut self) -> Result<()> {
        self.active = None;
        let mut results = Vec::with_capacity(3);
        if let Some(stage) = &self.stage {
            results.push(stage.x.stop());
            results.push(stage.y.stop());
        }
        if let Some(z) = &self.z {
            results.push(z.0.stop());
        }
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAxis {
        commands: Mutex<Vec<Option<f64>>>,
    }

    impl LinearAxis for RecordingAxis {
        fn move_velocity(&self, velocity: Velocity) -> Result<()> {
            self.commands.lock().unwrap().push(Some(velocity.base()));
            Ok(())
        }

        fn stop(&self) -> Result<()> {
            self.commands.lock().unwrap().push(None);
            Ok(())
        }

        fn move_to(&self, _position: Position) -> Result<()> {
            Ok(())
        }

        fn position(&self) -> Position {
            Position::default()
        }

        fn is_moving(&self) -> bool {
            false
        }
    }

    fn rig() -> (JogController, Arc<RecordingAxis>, Arc<RecordingAxis>, Arc<RecordingAxis>) {
        let x = Arc::new(RecordingAxis::default());
        let y = Arc::new(RecordingAxis::default());
        let z = Arc::new(RecordingAxis::default());
        let stage = XyStage {
            x: x.clone(),
            y: y.clone(),
        };
        (JogController::new(Some(stage), Some(z.clone())), x, y, z)
    }

    #[test]
    fn test_screen_up_drives_y_negative() {
        let (mut jog, _x, y, _z) = rig();
        jog.press(JogDirection::PlusY).unwrap();
        assert_eq!(*y.commands.lock().unwrap(), vec![Some(-0.002)]);
        assert_eq!(jog.active(), Some(JogDirection::PlusY));
    }

    #[test]
    fn test_velocities() {
        assert_eq!(JogDirection::PlusX.velocity().base(), 0.002);
        assert_eq!(JogDirection::MinusX.velocity().base(), -0.002);
        assert_eq!(JogDirection::MinusY.velocity().base(), 0.002);
        assert!((JogDirection::PlusZ.velocity().base() - 2e-5).abs() < 1e-15);
        assert!(JogDirection::MinusZ.velocity().base() < 0.0);
    }

    #[test]
    fn test_release_stops_all_axes() {
        let (mut jog, x, y, z) = rig();
        jog.press(JogDirection::MinusZ).unwrap();
        jog.release().unwrap();
        assert_eq!(*x.commands.lock().unwrap(), vec![None]);
        assert_eq!(*y.commands.lock().unwrap(), vec![None]);
        assert_eq!(z.commands.lock().unwrap().last(), Some(&None));
        assert_eq!(jog.active(), None);
    }

    #[test]
    fn test_missing_axis() {
        let mut jog = JogController::new(None, None);
        assert!(matches!(
            jog.press(JogDirection::PlusX),
            Err(Error::HardwareUnavailable("stage"))
        ));
        assert!(matches!(
            jog.press(JogDirection::PlusZ),
            Err(Error::HardwareUnavailable("z scanner"))
        ));
        jog.release().unwrap();
    }
}
