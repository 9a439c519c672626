//! tw-core: stable foundation for twinflow.
//!
//! Contains:
//! - ids (component ids, compact connection ids, per-model id generation)
//! - value (port values and port typing)
//! - numeric (tolerances and float checks)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod value;

// Re-exports: nice ergonomics for downstream crates
pub use error::{TwError, TwResult};
pub use ids::*;
pub use numeric::*;
pub use value::{PortType, Value};
