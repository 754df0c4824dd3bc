//! Sweep bookkeeping
//!
//! A sweep is an ordered traversal of the frequency x pulse-voltage space,
//! one frame per combination. For each frequency, in order, the pulse voltage
//! goes from `pulse_min` to `pulse_max` in steps of `pulse_step`, clamped at
//! the top. The frequency only advances once the top voltage was captured.
//!
//! - [`SweepParameters`] - validated bounds, immutable for the sweep duration
//! - [`SweepCursor`] - current position, advanced once per captured frame
//! - [`SweepPlan`] - iterator over every point of a sweep, in capture order

pub mod cursor;
pub mod params;

pub use cursor::{Advance, SweepCursor, SweepPlan};
pub use params::{SweepParameters, DEFAULT_FREQUENCIES_MHZ};
