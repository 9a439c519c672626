//! Signal arithmetic: gain, fan-in summation and piecewise-linear curves.

use serde::{Deserialize, Serialize};
use tw_core::ensure_finite;
use tw_graph::{
    Aggregation, ComponentError, ComponentResult, PortMap, PortSpec, StepContext, Steppable,
};

/// `y = k * u`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gain {
    pub k: f64,
}

impl Gain {
    pub fn new(k: f64) -> ComponentResult<Self> {
        ensure_finite(k, "gain")?;
        Ok(Self { k })
    }
}

impl Steppable for Gain {
    fn kind(&self) -> &str {
        "Gain"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new().input("u").output("y")
    }

    fn do_step(&mut self, _: &StepContext, input: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
        output.set_scalar("y", self.k * input.scalar("u")?)
    }
}

/// Combines any number of senders on `u` with a declared rule and forwards the result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summer {
    #[serde(default)]
    pub rule: AggregationRule,
}

/// Serializable mirror of `tw_graph::Aggregation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationRule {
    #[default]
    Sum,
    Mean,
    Min,
    Max,
}

impl Summer {
    pub fn new(rule: AggregationRule) -> Self {
        Self { rule }
    }
}

impl From<AggregationRule> for Aggregation {
    fn from(rule: AggregationRule) -> Self {
        match rule {
            AggregationRule::Sum => Aggregation::Sum,
            AggregationRule::Mean => Aggregation::Mean,
            AggregationRule::Min => Aggregation::Min,
            AggregationRule::Max => Aggregation::Max,
        }
    }
}

impl Steppable for Summer {
    fn kind(&self) -> &str {
        "Summer"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new()
            .aggregating_input("u", self.rule.into())
            .output("y")
    }

    fn do_step(&mut self, _: &StepContext, input: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
        let value = input.get("u").cloned().ok_or_else(|| ComponentError::MissingInput {
            port: "u".to_string(),
        })?;
        output.set("y", value)
    }
}

/// Linear interpolation through `(x, y)` points, held constant beyond the ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecewiseLinear {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl PiecewiseLinear {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> ComponentResult<Self> {
        let curve = Self { x, y };
        curve.validate()?;
        Ok(curve)
    }

    pub fn validate(&self) -> ComponentResult<()> {
        if self.x.is_empty() || self.x.len() != self.y.len() {
            return Err(ComponentError::InvalidParameter {
                what: "curve needs matching, non-empty x and y",
            });
        }
        for (&x, &y) in self.x.iter().zip(&self.y) {
            ensure_finite(x, "curve x")?;
            ensure_finite(y, "curve y")?;
        }
        if self.x.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ComponentError::InvalidParameter {
                what: "curve x must be strictly increasing",
            });
        }
        Ok(())
    }

    pub fn eval(&self, u: f64) -> f64 {
        let n = self.x.len();
        if u <= self.x[0] {
            return self.y[0];
        }
        if u >= self.x[n - 1] {
            return self.y[n - 1];
        }
        let i = self.x.partition_point(|&x| x <= u);
        let (x0, x1) = (self.x[i - 1], self.x[i]);
        let (y0, y1) = (self.y[i - 1], self.y[i]);
        y0 + (y1 - y0) * (u - x0) / (x1 - x0)
    }
}

impl Steppable for PiecewiseLinear {
    fn kind(&self) -> &str {
        "PiecewiseLinear"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new().input("u").output("y")
    }

    fn initialize(&mut self, _: &tw_graph::SimPeriod, _: &mut PortMap) -> ComponentResult<()> {
        self.validate()
    }

    fn do_step(&mut self, _: &StepContext, input: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
        output.set_scalar("y", self.eval(input.scalar("u")?))
    }
}
