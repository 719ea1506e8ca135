#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core simulator logic for a handheld optical loss tester (UI-agnostic).
//!
//! This crate models the instrument and the guided lab exercise around it.
//! Rendering, drag-and-drop and student registration live in consumers; they
//! talk to this crate exclusively through typed actions and state snapshots.
//!
//! ## Architecture
//!
//! - **State machine**: screens, nested setup menus and dropdowns, driven by a
//!   pure, total reducer (`reducer` module)
//! - **Measurement engine**: seeded-rng synthetic loss/power readings with
//!   bounded gaussian variation and repeat-measurement stability (`measure`)
//! - **Results tables**: expected-vs-entered grading of the student's data
//!   entry with strict progression gating (`results`)
//! - **Session**: state holder with dispatch/subscribe plus a generation-keyed
//!   arena of pending timed completions (`session`)
//!
//! All randomness flows through an injected `rand::Rng`; all timing flows
//! through `fotsim_traits::Clock`. Given a fixed seed and a test clock the
//! whole simulator is deterministic.

pub mod catalog;
pub mod error;
pub mod measure;
pub mod record;
pub mod reducer;
pub mod results;
pub mod scheme;
pub mod session;
pub mod state;

pub use catalog::{ComponentKind, ConnectorType, PassiveComponent};
pub use error::{MeasureError, SchemeError};
pub use measure::{Mode, Reading, Unit};
pub use record::{StudentRecord, TestScore};
pub use reducer::{initial_state, reduce};
pub use results::{CellStatus, ComponentResultsTable, Field, ResultsTables};
pub use scheme::{ConnectionElement, ConnectionScheme, ElementKind};
pub use session::Session;
pub use state::{
    Action, Button, DeviceState, Dropdown, FiberMeasurementResult, LengthUnit, MeasurementKind,
    PortStatus, PortType, PreparationState, ReferenceResult, ReferenceType, Screen, Wavelength,
};
