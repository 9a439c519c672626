//! Controllers: a discrete PID and a rule-based step controller.
//!
//! Both emit a normalized `inputSignal` in [0, 1] for an actuator.

use serde::{Deserialize, Serialize};
use tw_core::ensure_finite;
use tw_graph::{
    ComponentError, ComponentResult, ComponentRole, PortMap, PortSpec, SimPeriod, StepContext,
    Steppable,
};

/// PID gains, applied per step (not per second).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
}

/// PID controller state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidState {
    /// Accumulated error.
    pub acc_err: f64,
    pub prev_err: f64,
}

/// Discrete PID on `setpointValue - actualValue`, output clamped to [0, 1].
///
/// On saturation the accumulator is reset: to the value that reproduces full output
/// when saturated high, to zero when saturated low.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidController {
    #[serde(flatten)]
    pub gains: PidGains,
    #[serde(skip)]
    state: PidState,
}

impl PidController {
    pub fn new(kp: f64, ki: f64, kd: f64) -> ComponentResult<Self> {
        let controller = Self {
            gains: PidGains { kp, ki, kd },
            state: PidState::default(),
        };
        controller.validate()?;
        Ok(controller)
    }

    pub fn validate(&self) -> ComponentResult<()> {
        ensure_finite(self.gains.kp, "kp")?;
        ensure_finite(self.gains.ki, "ki")?;
        ensure_finite(self.gains.kd, "kd")?;
        if self.gains.ki < 0.0 {
            return Err(ComponentError::InvalidParameter {
                what: "ki must be non-negative",
            });
        }
        Ok(())
    }

    pub fn state(&self) -> PidState {
        self.state
    }

    /// Compute the next output and state.
    pub fn update(&self, state: &PidState, actual: f64, setpoint: f64) -> (PidState, f64) {
        let err = setpoint - actual;
        let p = self.gains.kp * err;
        let i = self.gains.ki * state.acc_err;
        let d = self.gains.kd * (err - state.prev_err);
        let raw = p + i + d;

        if raw > 1.0 {
            let acc_err = if self.gains.ki > 0.0 { 1.0 / self.gains.ki } else { 0.0 };
            (PidState { acc_err, prev_err: 0.0 }, 1.0)
        } else if raw < 0.0 {
            (PidState::default(), 0.0)
        } else {
            (
                PidState {
                    acc_err: state.acc_err + err,
                    prev_err: err,
                },
                raw,
            )
        }
    }
}

impl Steppable for PidController {
    fn kind(&self) -> &str {
        "PidController"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new()
            .input("actualValue")
            .input("setpointValue")
            .output("inputSignal")
    }

    fn role(&self) -> ComponentRole {
        ComponentRole::Controller
    }

    fn initialize(&mut self, _: &SimPeriod, _: &mut PortMap) -> ComponentResult<()> {
        self.validate()?;
        self.state = PidState::default();
        Ok(())
    }

    fn do_step(&mut self, _: &StepContext, input: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
        let actual = input.scalar("actualValue")?;
        let setpoint = input.scalar("setpointValue")?;
        let (state, signal) = self.update(&self.state, actual, setpoint);
        self.state = state;
        output.set_scalar("inputSignal", signal)
    }
}

/// Output `signal` once the measurement exceeds `above`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStep {
    pub above: f64,
    pub signal: f64,
}

/// Step controller: the highest exceeded threshold decides the signal, 0 below all.
///
/// Steps are ranked by threshold, not checked one after another with later checks
/// overwriting earlier ones. A reading above every threshold therefore always gets the
/// top step's signal (1.0 for the default CO2 table), never the signal of whichever
/// check happened to run last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulebasedController {
    pub steps: Vec<RuleStep>,
}

impl Default for RulebasedController {
    /// CO2 ventilation table: 0.1 above 600 ppm up to 1.0 above 900 ppm.
    fn default() -> Self {
        let thresholds = [600.0, 633.0, 666.0, 700.0, 733.0, 766.0, 800.0, 833.0, 866.0, 900.0];
        Self {
            steps: thresholds
                .iter()
                .enumerate()
                .map(|(i, &above)| RuleStep {
                    above,
                    signal: (i + 1) as f64 / 10.0,
                })
                .collect(),
        }
    }
}

impl RulebasedController {
    pub fn new(steps: Vec<RuleStep>) -> ComponentResult<Self> {
        let controller = Self { steps };
        controller.validate()?;
        Ok(controller)
    }

    pub fn validate(&self) -> ComponentResult<()> {
        for step in &self.steps {
            ensure_finite(step.above, "rule threshold")?;
            ensure_finite(step.signal, "rule signal")?;
        }
        if self.steps.windows(2).any(|w| w[0].above >= w[1].above) {
            return Err(ComponentError::InvalidParameter {
                what: "rule thresholds must be strictly increasing",
            });
        }
        Ok(())
    }

    pub fn signal_for(&self, actual: f64) -> f64 {
        self.steps
            .iter()
            .rev()
            .find(|s| actual > s.above)
            .map_or(0.0, |s| s.signal)
    }
}

impl Steppable for RulebasedController {
    fn kind(&self) -> &str {
        "RulebasedController"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new().input("actualValue").output("inputSignal")
    }

    fn role(&self) -> ComponentRole {
        ComponentRole::Controller
    }

    fn initialize(&mut self, _: &SimPeriod, _: &mut PortMap) -> ComponentResult<()> {
        self.validate()
    }

    fn do_step(&mut self, _: &StepContext, input: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
        let actual = input.scalar("actualValue")?;
        output.set_scalar("inputSignal", self.signal_for(actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_tracks_within_range() {
        let pid = PidController::new(0.1, 0.01, 0.0).unwrap();
        let (state, out) = pid.update(&PidState::default(), 20.0, 22.0);
        assert!((out - 0.2).abs() < 1e-12);
        assert_eq!(state, PidState { acc_err: 2.0, prev_err: 2.0 });

        let (_, out) = pid.update(&state, 21.0, 22.0);
        // p = 0.1, i = 0.01 * 2
        assert!((out - 0.12).abs() < 1e-12);
    }

    #[test]
    fn pid_saturation_resets_accumulator() {
        let pid = PidController::new(1.0, 0.5, 0.0).unwrap();
        let (state, out) = pid.update(&PidState::default(), 0.0, 10.0);
        assert_eq!(out, 1.0);
        assert_eq!(state, PidState { acc_err: 2.0, prev_err: 0.0 });

        let (state, out) = pid.update(&state, 10.0, 0.0);
        assert_eq!(out, 0.0);
        assert_eq!(state, PidState::default());
    }

    #[test]
    fn pid_rejects_negative_integral_gain() {
        assert!(PidController::new(1.0, -0.1, 0.0).is_err());
        assert!(PidController::new(f64::NAN, 0.1, 0.0).is_err());
    }

    #[test]
    fn co2_table_steps_monotonically() {
        let c = RulebasedController::default();
        assert_eq!(c.signal_for(400.0), 0.0);
        assert_eq!(c.signal_for(600.0), 0.0);
        assert_eq!(c.signal_for(610.0), 0.1);
        assert_eq!(c.signal_for(750.0), 0.5);
        assert_eq!(c.signal_for(900.0), 0.9);
        assert_eq!(c.signal_for(1200.0), 1.0);
    }

    #[test]
    fn readings_above_the_middle_steps_keep_rising() {
        let c = RulebasedController::default();
        assert_eq!(c.signal_for(710.0), 0.4);
        assert_eq!(c.signal_for(740.0), 0.5);
        assert_eq!(c.signal_for(850.0), 0.8);
        assert_eq!(c.signal_for(950.0), 1.0);
        let signals: Vec<f64> = (600..1000).step_by(5).map(|ppm| c.signal_for(ppm as f64)).collect();
        assert!(signals.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn unordered_thresholds_are_rejected() {
        let steps = vec![
            RuleStep { above: 800.0, signal: 1.0 },
            RuleStep { above: 600.0, signal: 0.5 },
        ];
        assert!(RulebasedController::new(steps).is_err());
    }
}
