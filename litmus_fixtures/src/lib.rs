//! Litmus fixtures - simulated host and the built-in suites.
//!
//! The host stands in for the engine under test: editable fields, a clipboard,
//! a background spellchecker and an animation frame scheduler. The suites drive
//! it through [`litmus_core::SequentialRunner`].

pub mod controller;
pub mod frame_timestamps;
pub mod frames;
pub mod host;
pub mod spellcheck_paste;
pub mod suite;

pub use controller::SimulatedController;
pub use frames::AnimationFrames;
pub use host::{Field, Fragment, HostOptions, MarkerRange, SimulatedHost, SourceId};
pub use spellcheck_paste::{PasteAndVerify, PasteCase};
pub use suite::{Suite, SuiteKind, SuiteRun};
