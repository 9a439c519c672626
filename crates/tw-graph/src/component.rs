//! Components and the step contract they implement.
//!
//! A component is any unit of simulated behavior (sensor, controller, damper, weather
//! feed, co-simulated engine) with named input and output ports. The graph never looks
//! inside a component: it only relies on the `Steppable` capability.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use tw_core::{ComponentId, ConnectionId, PortType, Value};

use crate::connection::Aggregation;
use crate::error::{ComponentError, ComponentResult};

/// Coarse classification of a component.
///
/// Only `Controller` carries scheduling meaning (see `CyclePolicy::ControllerInputs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentRole {
    Source,
    Sensor,
    Controller,
    Actuator,
    #[default]
    Physical,
}

/// Declaration of one input port.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub name: String,
    pub ty: PortType,
    /// Present when the port accepts several senders.
    pub aggregation: Option<Aggregation>,
}

/// Declaration of one output port.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub name: String,
    pub ty: PortType,
}

/// The full port declaration of a component.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortSpec {
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<OutputSpec>,
}

impl PortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scalar input port with a single sender.
    pub fn input(self, name: impl Into<String>) -> Self {
        self.input_typed(name, PortType::Scalar)
    }

    pub fn input_typed(mut self, name: impl Into<String>, ty: PortType) -> Self {
        self.inputs.push(InputSpec {
            name: name.into(),
            ty,
            aggregation: None,
        });
        self
    }

    /// Add a scalar input port combining any number of senders with `aggregation`.
    pub fn aggregating_input(mut self, name: impl Into<String>, aggregation: Aggregation) -> Self {
        self.inputs.push(InputSpec {
            name: name.into(),
            ty: PortType::Scalar,
            aggregation: Some(aggregation),
        });
        self
    }

    /// Add a scalar output port.
    pub fn output(self, name: impl Into<String>) -> Self {
        self.output_typed(name, PortType::Scalar)
    }

    pub fn output_typed(mut self, name: impl Into<String>, ty: PortType) -> Self {
        self.outputs.push(OutputSpec {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn find_input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn find_output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|p| p.name == name)
    }
}

/// Bounds of a simulation run, handed to `Steppable::initialize`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub step_size_s: f64,
}

/// Time information for one call to `Steppable::do_step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepContext {
    /// Zero-based step index.
    pub step: usize,
    /// Seconds elapsed since the start of the period.
    pub second_time: f64,
    /// Wall-clock time of this step.
    pub date_time: NaiveDateTime,
    pub step_size_s: f64,
}

/// Named port values of one side of a component.
///
/// Every declared port is present; `None` means the value is undefined (nothing has
/// been computed or delivered yet).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortMap {
    values: BTreeMap<String, Option<Value>>,
}

impl PortMap {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: names.into_iter().map(|n| (n.into(), None)).collect(),
        }
    }

    pub fn contains(&self, port: &str) -> bool {
        self.values.contains_key(port)
    }

    /// Current value of a port, `None` if undefined or undeclared.
    pub fn get(&self, port: &str) -> Option<&Value> {
        self.values.get(port).and_then(Option::as_ref)
    }

    /// Scalar value of a required port.
    pub fn scalar(&self, port: &str) -> ComponentResult<f64> {
        match self.values.get(port) {
            None => Err(ComponentError::UnknownPort {
                port: port.to_string(),
            }),
            Some(None) => Err(ComponentError::MissingInput {
                port: port.to_string(),
            }),
            Some(Some(value)) => Ok(value.as_scalar()?),
        }
    }

    /// Scalar value of a port, or `default` while it is undefined.
    pub fn scalar_or(&self, port: &str, default: f64) -> ComponentResult<f64> {
        match self.scalar(port) {
            Err(ComponentError::MissingInput { .. }) => Ok(default),
            other => other,
        }
    }

    pub fn set(&mut self, port: &str, value: impl Into<Value>) -> ComponentResult<()> {
        self.set_opt(port, Some(value.into()))
    }

    pub fn set_scalar(&mut self, port: &str, value: f64) -> ComponentResult<()> {
        self.set(port, Value::Scalar(value))
    }

    pub fn set_opt(&mut self, port: &str, value: Option<Value>) -> ComponentResult<()> {
        match self.values.get_mut(port) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ComponentError::UnknownPort {
                port: port.to_string(),
            }),
        }
    }

    /// Mark every port undefined.
    pub fn clear(&mut self) {
        for slot in self.values.values_mut() {
            *slot = None;
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The step contract every component variant implements.
///
/// `do_step` must complete synchronously. Components that delegate to an external
/// engine handle retries and timeouts themselves and report failure through
/// `ComponentError`.
pub trait Steppable: fmt::Debug {
    /// Type name, used for logging, reports and default ids.
    fn kind(&self) -> &str;

    /// Declared ports. Must not change over the component's lifetime.
    fn ports(&self) -> PortSpec;

    fn role(&self) -> ComponentRole {
        ComponentRole::Physical
    }

    /// Reset internal state before a run. `output` arrives with every port undefined
    /// and may be seeded with initial values.
    fn initialize(&mut self, period: &SimPeriod, output: &mut PortMap) -> ComponentResult<()> {
        let _ = (period, output);
        Ok(())
    }

    /// Advance one step, reading `input` and writing `output`.
    fn do_step(
        &mut self,
        step: &StepContext,
        input: &PortMap,
        output: &mut PortMap,
    ) -> ComponentResult<()>;
}

/// A component registered in a model.
#[derive(Debug)]
pub struct Component {
    id: ComponentId,
    behavior: Box<dyn Steppable>,
    spec: PortSpec,
    input: PortMap,
    output: PortMap,
    pub(crate) connects_at: Vec<ConnectionId>,
    pub(crate) connected_through: Vec<ConnectionId>,
    pub(crate) sub_system_of: Option<ComponentId>,
    pub(crate) has_sub_system: Vec<ComponentId>,
    save_history: bool,
}

impl Component {
    pub(crate) fn new(id: ComponentId, behavior: Box<dyn Steppable>) -> Self {
        let spec = behavior.ports();
        let input = PortMap::from_names(spec.inputs.iter().map(|p| p.name.clone()));
        let output = PortMap::from_names(spec.outputs.iter().map(|p| p.name.clone()));
        Self {
            id,
            behavior,
            spec,
            input,
            output,
            connects_at: Vec::new(),
            connected_through: Vec::new(),
            sub_system_of: None,
            has_sub_system: Vec::new(),
            save_history: true,
        }
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn kind(&self) -> &str {
        self.behavior.kind()
    }

    pub fn role(&self) -> ComponentRole {
        self.behavior.role()
    }

    pub fn spec(&self) -> &PortSpec {
        &self.spec
    }

    pub fn input(&self) -> &PortMap {
        &self.input
    }

    pub fn output(&self) -> &PortMap {
        &self.output
    }

    /// Inbound connections, in creation order.
    pub fn connects_at(&self) -> &[ConnectionId] {
        &self.connects_at
    }

    /// Outbound connections, in creation order.
    pub fn connected_through(&self) -> &[ConnectionId] {
        &self.connected_through
    }

    pub fn sub_system_of(&self) -> Option<&ComponentId> {
        self.sub_system_of.as_ref()
    }

    pub fn has_sub_system(&self) -> &[ComponentId] {
        &self.has_sub_system
    }

    pub fn save_history(&self) -> bool {
        self.save_history
    }

    pub fn set_save_history(&mut self, enabled: bool) {
        self.save_history = enabled;
    }

    pub fn behavior(&self) -> &dyn Steppable {
        self.behavior.as_ref()
    }

    pub(crate) fn input_mut(&mut self) -> &mut PortMap {
        &mut self.input
    }

    /// Clear both port maps and let the behavior reset itself.
    pub fn initialize(&mut self, period: &SimPeriod) -> ComponentResult<()> {
        self.input.clear();
        self.output.clear();
        self.behavior.initialize(period, &mut self.output)?;
        self.check_outputs()
    }

    /// Run the behavior for one step on the already-resolved inputs.
    pub fn do_step(&mut self, step: &StepContext) -> ComponentResult<()> {
        self.behavior.do_step(step, &self.input, &mut self.output)?;
        self.check_outputs()
    }

    fn check_outputs(&self) -> ComponentResult<()> {
        for spec in &self.spec.outputs {
            if let Some(value) = self.output.get(&spec.name) {
                if !spec.ty.accepts(value) {
                    return Err(ComponentError::InvalidValue {
                        port: spec.name.clone(),
                        what: format!("expected {:?}, found {:?}", spec.ty, value.port_type()),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Doubler;

    impl Steppable for Doubler {
        fn kind(&self) -> &str {
            "Doubler"
        }

        fn ports(&self) -> PortSpec {
            PortSpec::new().input("u").output("y")
        }

        fn do_step(
            &mut self,
            _step: &StepContext,
            input: &PortMap,
            output: &mut PortMap,
        ) -> ComponentResult<()> {
            output.set_scalar("y", 2.0 * input.scalar("u")?)
        }
    }

    #[derive(Debug)]
    struct Liar;

    impl Steppable for Liar {
        fn kind(&self) -> &str {
            "Liar"
        }

        fn ports(&self) -> PortSpec {
            PortSpec::new().output("y")
        }

        fn do_step(&mut self, _: &StepContext, _: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
            output.set("y", vec![1.0, 2.0])
        }
    }

    fn ctx() -> StepContext {
        StepContext {
            step: 0,
            second_time: 0.0,
            date_time: NaiveDateTime::default(),
            step_size_s: 1.0,
        }
    }

    #[test]
    fn port_map_tracks_undefined_values() {
        let mut ports = PortMap::from_names(["a", "b"]);
        assert_eq!(ports.len(), 2);
        assert!(matches!(ports.scalar("a"), Err(ComponentError::MissingInput { .. })));
        assert_eq!(ports.scalar_or("a", 3.0).unwrap(), 3.0);

        ports.set_scalar("a", 1.5).unwrap();
        assert_eq!(ports.scalar("a").unwrap(), 1.5);

        ports.clear();
        assert!(ports.get("a").is_none());
    }

    #[test]
    fn port_map_rejects_undeclared_ports() {
        let mut ports = PortMap::from_names(["a"]);
        assert!(matches!(
            ports.set_scalar("zzz", 1.0),
            Err(ComponentError::UnknownPort { .. })
        ));
        assert!(matches!(ports.scalar("zzz"), Err(ComponentError::UnknownPort { .. })));
    }

    #[test]
    fn component_steps_behavior() {
        let mut comp = Component::new(ComponentId::new("d"), Box::new(Doubler));
        assert_eq!(comp.kind(), "Doubler");
        assert_eq!(comp.role(), ComponentRole::Physical);

        comp.input_mut().set_scalar("u", 4.0).unwrap();
        comp.do_step(&ctx()).unwrap();
        assert_eq!(comp.output().scalar("y").unwrap(), 8.0);
    }

    #[test]
    fn missing_input_fails_step() {
        let mut comp = Component::new(ComponentId::new("d"), Box::new(Doubler));
        let err = comp.do_step(&ctx()).unwrap_err();
        assert_eq!(err, ComponentError::MissingInput { port: "u".into() });
    }

    #[test]
    fn output_type_is_enforced() {
        let mut comp = Component::new(ComponentId::new("l"), Box::new(Liar));
        assert!(matches!(
            comp.do_step(&ctx()),
            Err(ComponentError::InvalidValue { .. })
        ));
    }
}
