//! Panel rendering:
//! - `acquisition_panel`: capture buttons, frame and stack specs, timing, stage jog
//! - `display_panel`: detectors, display channels, logging and theme
//! - `main_view`: live viewer

mod acquisition_panel;
mod display_panel;
mod main_view;
pub mod theme;
pub mod widgets;
