//! Sensors and meters: forward a measured value unchanged.

use serde::{Deserialize, Serialize};
use tw_graph::{ComponentResult, ComponentRole, PortMap, PortSpec, StepContext, Steppable};

/// Pass-through measurement device. `Meter` differs only in its reported kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SensorKind {
    #[default]
    Sensor,
    Meter,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sensor {
    #[serde(default)]
    pub kind: SensorKind,
}

impl Sensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meter() -> Self {
        Self {
            kind: SensorKind::Meter,
        }
    }
}

impl Steppable for Sensor {
    fn kind(&self) -> &str {
        match self.kind {
            SensorKind::Sensor => "Sensor",
            SensorKind::Meter => "Meter",
        }
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new().input("measuredValue").output("measuredValue")
    }

    fn role(&self) -> ComponentRole {
        ComponentRole::Sensor
    }

    /// An unconnected sensor simply reports nothing.
    fn do_step(&mut self, _: &StepContext, input: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
        output.set_opt("measuredValue", input.get("measuredValue").cloned())
    }
}
