//! tw-components: stock component library.
//!
//! Reference behaviors implementing the step contract (sources, arithmetic, sensors,
//! controllers, actuators), their serializable configuration, and the default pattern
//! catalog used to discover them in a semantic building graph.

pub mod actuator;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod math;
pub mod sensor;
pub mod source;

pub use actuator::{Damper, FirstOrderActuator};
pub use catalog::{default_catalog, default_classes};
pub use config::ComponentConfig;
pub use controller::{PidController, PidGains, PidState, RuleStep, RulebasedController};
pub use math::{AggregationRule, Gain, PiecewiseLinear, Summer};
pub use sensor::{Sensor, SensorKind};
pub use source::{Constant, DayRuleset, Ruleset, Schedule, ScheduleRule};
