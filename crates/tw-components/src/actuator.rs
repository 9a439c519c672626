//! Actuators: damper airflow curve and first-order positioner with rate limiting.

use serde::{Deserialize, Serialize};
use tw_core::{clamp_unit, ensure_finite, ensure_positive};
use tw_graph::{
    ComponentResult, ComponentRole, PortMap, PortSpec, SimPeriod, StepContext, Steppable,
};

/// Exponential damper characteristic.
///
/// `q(u) = a * (exp(b * u) - 1)` with `b` chosen so that `q(1)` equals the nominal
/// airflow. Larger `a` gives a more linear curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Damper {
    /// Airflow at fully open position (kg/s).
    pub nominal_air_flow_rate: f64,
    /// Curve shape parameter, must be positive.
    pub a: f64,
}

impl Damper {
    pub fn new(nominal_air_flow_rate: f64, a: f64) -> ComponentResult<Self> {
        let damper = Self {
            nominal_air_flow_rate,
            a,
        };
        damper.validate()?;
        Ok(damper)
    }

    pub fn validate(&self) -> ComponentResult<()> {
        ensure_positive(self.nominal_air_flow_rate, "nominal_air_flow_rate")?;
        ensure_positive(self.a, "a")?;
        Ok(())
    }

    fn b(&self) -> f64 {
        ((self.nominal_air_flow_rate + self.a) / self.a).ln()
    }

    /// Airflow for a damper position, clamped to [0, 1].
    pub fn air_flow_rate(&self, position: f64) -> f64 {
        self.a * ((self.b() * clamp_unit(position)).exp() - 1.0)
    }
}

impl Steppable for Damper {
    fn kind(&self) -> &str {
        "Damper"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new().input("damperPosition").output("airFlowRate")
    }

    fn role(&self) -> ComponentRole {
        ComponentRole::Actuator
    }

    fn initialize(&mut self, _: &SimPeriod, _: &mut PortMap) -> ComponentResult<()> {
        self.validate()
    }

    fn do_step(&mut self, _: &StepContext, input: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
        let position = ensure_finite(input.scalar("damperPosition")?, "damperPosition")?;
        output.set_scalar("airFlowRate", self.air_flow_rate(position))
    }
}

/// First-order actuator with rate limiting.
///
/// Dynamics: dpos/dt = (cmd - pos) / tau, clamped to [-rate_limit, rate_limit],
/// integrated with forward Euler over the step and kept in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstOrderActuator {
    /// Time constant (seconds).
    pub tau: f64,
    /// Rate limit (1/second).
    pub rate_limit: f64,
    #[serde(default)]
    pub initial_position: f64,
    #[serde(skip)]
    position: f64,
}

impl FirstOrderActuator {
    pub fn new(tau: f64, rate_limit: f64) -> ComponentResult<Self> {
        let actuator = Self {
            tau,
            rate_limit,
            initial_position: 0.0,
            position: 0.0,
        };
        actuator.validate()?;
        Ok(actuator)
    }

    pub fn with_initial_position(mut self, position: f64) -> Self {
        self.initial_position = clamp_unit(position);
        self.position = self.initial_position;
        self
    }

    pub fn validate(&self) -> ComponentResult<()> {
        ensure_positive(self.tau, "tau")?;
        ensure_positive(self.rate_limit, "rate_limit")?;
        ensure_finite(self.initial_position, "initial_position")?;
        Ok(())
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Position derivative for the current position and command.
    pub fn dpdt(&self, position: f64, command: f64) -> f64 {
        ((command - position) / self.tau).clamp(-self.rate_limit, self.rate_limit)
    }

    /// Position after `dt` seconds under `command`.
    pub fn advance(&self, position: f64, dt: f64, command: f64) -> f64 {
        clamp_unit(position + self.dpdt(position, command) * dt)
    }
}

impl Steppable for FirstOrderActuator {
    fn kind(&self) -> &str {
        "FirstOrderActuator"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new().input("command").output("position")
    }

    fn role(&self) -> ComponentRole {
        ComponentRole::Actuator
    }

    fn initialize(&mut self, _: &SimPeriod, output: &mut PortMap) -> ComponentResult<()> {
        self.validate()?;
        self.position = clamp_unit(self.initial_position);
        output.set_scalar("position", self.position)
    }

    fn do_step(&mut self, step: &StepContext, input: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
        let command = ensure_finite(input.scalar("command")?, "command")?;
        self.position = self.advance(self.position, step.step_size_s, command);
        output.set_scalar("position", self.position)
    }
}
