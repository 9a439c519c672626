//! tw-graph: component graph layer for twinflow.
//!
//! Provides:
//! - The `Steppable` component contract and the `Component` wrapper holding port values
//! - Connections, including aggregating (fan-in) input ports
//! - The `Model` that owns components and connections and validates structure
//! - Deterministic execution order with cycle detection
//!
//! # Example
//!
//! ```
//! use tw_graph::{
//!     ComponentResult, Model, PortMap, PortSpec, StepContext, Steppable,
//! };
//!
//! #[derive(Debug)]
//! struct Source;
//!
//! impl Steppable for Source {
//!     fn kind(&self) -> &str {
//!         "Source"
//!     }
//!     fn ports(&self) -> PortSpec {
//!         PortSpec::new().output("value")
//!     }
//!     fn do_step(&mut self, _: &StepContext, _: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
//!         output.set_scalar("value", 1.0)
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct Sink;
//!
//! impl Steppable for Sink {
//!     fn kind(&self) -> &str {
//!         "Sink"
//!     }
//!     fn ports(&self) -> PortSpec {
//!         PortSpec::new().input("u")
//!     }
//!     fn do_step(&mut self, _: &StepContext, _: &PortMap, _: &mut PortMap) -> ComponentResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! let mut model = Model::new("example");
//! model.add_component("sink", Box::new(Sink)).unwrap();
//! model.add_component("source", Box::new(Source)).unwrap();
//! model.add_connection("source", "sink", "value", "u").unwrap();
//!
//! let order = model.compute_execution_order().unwrap();
//! assert_eq!(order.ids()[0].as_str(), "source");
//! ```

pub mod component;
pub mod connection;
pub mod error;
pub mod model;
pub mod order;

// Re-exports for ergonomics
pub use component::{
    Component, ComponentRole, InputSpec, OutputSpec, PortMap, PortSpec, SimPeriod, StepContext,
    Steppable,
};
pub use connection::{Aggregation, Connection};
pub use error::{ComponentError, ComponentResult, GraphError, GraphResult, StructuralError};
pub use model::{CyclePolicy, Model};
pub use order::{ExecutionOrder, InputBinding};
