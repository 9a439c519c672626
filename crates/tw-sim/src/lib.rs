//! Time-stepping simulation of twinflow graph models.
//!
//! Provides:
//! - `Simulator`: Idle → Running → Done / Failed / Cancelled state machine
//! - Per-component history of input and output ports, aligned with the time axis
//! - Cooperative cancellation between steps and per-step progress reporting

pub mod error;
pub mod history;
pub mod sim;

pub use error::{SimError, SimResult};
pub use history::{ComponentHistory, History, PortSide};
pub use sim::{CancelToken, SimOptions, SimProgress, SimState, Simulator, simulate};
