//! Serializable component configuration, as stored in project files.

use serde::{Deserialize, Serialize};
use tw_graph::{ComponentResult, Steppable};

use crate::actuator::{Damper, FirstOrderActuator};
use crate::controller::{PidController, RulebasedController};
use crate::math::{Gain, PiecewiseLinear, Summer};
use crate::sensor::{Sensor, SensorKind};
use crate::source::{Constant, Schedule};

/// A stock component and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ComponentConfig {
    Constant(Constant),
    Gain(Gain),
    Summer(Summer),
    PiecewiseLinear(PiecewiseLinear),
    Schedule(Schedule),
    Sensor(Sensor),
    PidController(PidController),
    RulebasedController(RulebasedController),
    Damper(Damper),
    FirstOrderActuator(FirstOrderActuator),
}

impl ComponentConfig {
    /// Type name, matching `Steppable::kind` of the built component.
    pub fn type_name(&self) -> &'static str {
        match self {
            ComponentConfig::Constant(_) => "Constant",
            ComponentConfig::Gain(_) => "Gain",
            ComponentConfig::Summer(_) => "Summer",
            ComponentConfig::PiecewiseLinear(_) => "PiecewiseLinear",
            ComponentConfig::Schedule(_) => "Schedule",
            ComponentConfig::Sensor(s) => match s.kind {
                SensorKind::Sensor => "Sensor",
                SensorKind::Meter => "Meter",
            },
            ComponentConfig::PidController(_) => "PidController",
            ComponentConfig::RulebasedController(_) => "RulebasedController",
            ComponentConfig::Damper(_) => "Damper",
            ComponentConfig::FirstOrderActuator(_) => "FirstOrderActuator",
        }
    }

    /// Check parameters without building.
    pub fn validate(&self) -> ComponentResult<()> {
        match self {
            ComponentConfig::Constant(c) => Constant::new(c.value).map(|_| ()),
            ComponentConfig::Gain(g) => Gain::new(g.k).map(|_| ()),
            ComponentConfig::Summer(_) | ComponentConfig::Sensor(_) => Ok(()),
            ComponentConfig::PiecewiseLinear(c) => c.validate(),
            ComponentConfig::Schedule(s) => s.validate(),
            ComponentConfig::PidController(c) => c.validate(),
            ComponentConfig::RulebasedController(c) => c.validate(),
            ComponentConfig::Damper(d) => d.validate(),
            ComponentConfig::FirstOrderActuator(a) => a.validate(),
        }
    }

    /// Validate and box the component behind the step contract.
    pub fn build(&self) -> ComponentResult<Box<dyn Steppable>> {
        self.validate()?;
        Ok(match self.clone() {
            ComponentConfig::Constant(c) => Box::new(c),
            ComponentConfig::Gain(g) => Box::new(g),
            ComponentConfig::Summer(s) => Box::new(s),
            ComponentConfig::PiecewiseLinear(c) => Box::new(c),
            ComponentConfig::Schedule(s) => Box::new(s),
            ComponentConfig::Sensor(s) => Box::new(s),
            ComponentConfig::PidController(c) => Box::new(c),
            ComponentConfig::RulebasedController(c) => Box::new(c),
            ComponentConfig::Damper(d) => Box::new(d),
            ComponentConfig::FirstOrderActuator(a) => {
                let position = a.initial_position;
                Box::new(a.with_initial_position(position))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_is_tagged_by_type() {
        let yaml = "type: Damper\nnominal_air_flow_rate: 1.6\na: 5.0\n";
        let config: ComponentConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config, ComponentConfig::Damper(Damper::new(1.6, 5.0).unwrap()));
        assert_eq!(config.build().unwrap().kind(), "Damper");
    }

    #[test]
    fn pid_gains_are_flattened() {
        let yaml = "type: PidController\nkp: 0.1\nki: 0.01\n";
        let config: ComponentConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.type_name(), "PidController");
        assert!(config.build().is_ok());
    }

    #[test]
    fn invalid_parameters_fail_to_build() {
        let config = ComponentConfig::Gain(Gain { k: f64::INFINITY });
        assert!(config.build().is_err());
    }
}
