//! The graph model: component registry, connections and cached execution order.

use std::collections::HashMap;

use tw_core::{ComponentId, ConnectionId, IdGenerator};

use crate::component::{Component, Steppable};
use crate::connection::Connection;
use crate::error::{
    ComponentError, ComponentResult, GraphError, GraphResult, PortDirection, StructuralError,
};
use crate::order::{self, ExecutionOrder, InputBinding};

/// How feedback cycles are tolerated when computing the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
    /// Only connections explicitly marked as feedback may close a cycle.
    #[default]
    ExplicitOnly,
    /// Additionally, any connection into a controller that lies on a cycle is treated
    /// as feedback: the controller acts on the previous step's measurement.
    ControllerInputs,
}

/// Owns the components and connections of one simulated system.
///
/// Components are kept in insertion order, which is also the tie-break order of the
/// scheduler. Any topology change drops the cached execution order.
#[derive(Debug, Default)]
pub struct Model {
    id: String,
    components: Vec<Component>,
    index: HashMap<ComponentId, usize>,
    connections: Vec<Connection>,
    ids: IdGenerator,
    cycle_policy: CyclePolicy,
    order: Option<ExecutionOrder>,
}

impl Model {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cycle_policy(&self) -> CyclePolicy {
        self.cycle_policy
    }

    pub fn set_cycle_policy(&mut self, policy: CyclePolicy) {
        if self.cycle_policy != policy {
            self.cycle_policy = policy;
            self.order = None;
        }
    }

    /// Register a component under an explicit id.
    pub fn add_component(
        &mut self,
        id: impl Into<ComponentId>,
        behavior: Box<dyn Steppable>,
    ) -> GraphResult<ComponentId> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(StructuralError::DuplicateComponent { id }.into());
        }
        self.ids.reserve(&id);
        Ok(self.insert(id, behavior))
    }

    /// Register a component under a generated `<prefix>_<n>` id.
    pub fn add_component_auto(&mut self, prefix: &str, behavior: Box<dyn Steppable>) -> ComponentId {
        let id = self.ids.next_component(prefix);
        self.insert(id, behavior)
    }

    /// Register a component under `preferred` if free, else under a generated id.
    pub fn add_component_preferring(
        &mut self,
        preferred: &str,
        behavior: Box<dyn Steppable>,
    ) -> ComponentId {
        let id = self.ids.claim_or_next(preferred);
        self.insert(id, behavior)
    }

    fn insert(&mut self, id: ComponentId, behavior: Box<dyn Steppable>) -> ComponentId {
        tracing::debug!(component = %id, kind = behavior.kind(), "add component");
        self.index.insert(id.clone(), self.components.len());
        self.components.push(Component::new(id.clone(), behavior));
        self.order = None;
        id
    }

    /// Remove a component together with its connections and hierarchy links.
    pub fn remove_component(&mut self, id: &str) -> GraphResult<Component> {
        let pos = self.position(id)?;
        let id = self.components[pos].id().clone();

        let doomed: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|c| c.touches(&id))
            .map(|c| c.id)
            .collect();
        for conn in doomed {
            self.remove_connection(conn)?;
        }

        for comp in &mut self.components {
            comp.has_sub_system.retain(|c| c != &id);
            if comp.sub_system_of.as_ref() == Some(&id) {
                comp.sub_system_of = None;
            }
        }

        let removed = self.components.remove(pos);
        self.ids.release(&id);
        self.reindex();
        self.order = None;
        Ok(removed)
    }

    fn reindex(&mut self) {
        self.index = self
            .components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id().clone(), i))
            .collect();
    }

    /// Connect `sender.output_port` to `receiver.input_port`.
    pub fn add_connection(
        &mut self,
        sender: &str,
        receiver: &str,
        output_port: &str,
        input_port: &str,
    ) -> GraphResult<ConnectionId> {
        self.connect(sender, receiver, output_port, input_port, false)
    }

    /// Like `add_connection`, but annotated as an allowed feedback edge.
    pub fn add_feedback_connection(
        &mut self,
        sender: &str,
        receiver: &str,
        output_port: &str,
        input_port: &str,
    ) -> GraphResult<ConnectionId> {
        self.connect(sender, receiver, output_port, input_port, true)
    }

    fn connect(
        &mut self,
        sender: &str,
        receiver: &str,
        output_port: &str,
        input_port: &str,
        feedback: bool,
    ) -> GraphResult<ConnectionId> {
        let s = self.position(sender)?;
        let r = self.position(receiver)?;
        let sender_comp = &self.components[s];
        let receiver_comp = &self.components[r];

        let out_spec = sender_comp.spec().find_output(output_port).ok_or_else(|| {
            StructuralError::UnknownPort {
                component: sender_comp.id().clone(),
                port: output_port.to_string(),
                direction: PortDirection::Output,
            }
        })?;
        let in_spec = receiver_comp.spec().find_input(input_port).ok_or_else(|| {
            StructuralError::UnknownPort {
                component: receiver_comp.id().clone(),
                port: input_port.to_string(),
                direction: PortDirection::Input,
            }
        })?;

        if !out_spec.ty.compatible_with(in_spec.ty) {
            return Err(StructuralError::IncompatiblePorts {
                sender: sender_comp.id().clone(),
                sender_port: output_port.to_string(),
                sender_type: out_spec.ty,
                receiver: receiver_comp.id().clone(),
                receiver_port: input_port.to_string(),
                receiver_type: in_spec.ty,
            }
            .into());
        }

        if in_spec.aggregation.is_none() {
            if let Some(existing) = self
                .connections
                .iter()
                .find(|c| &c.receiver == receiver_comp.id() && c.receiver_port == input_port)
            {
                return Err(StructuralError::PortAlreadyBound {
                    component: receiver_comp.id().clone(),
                    port: input_port.to_string(),
                    existing: existing.id,
                }
                .into());
            }
        }

        let id = self.ids.next_connection();
        let conn = Connection {
            id,
            sender: sender_comp.id().clone(),
            sender_port: output_port.to_string(),
            receiver: receiver_comp.id().clone(),
            receiver_port: input_port.to_string(),
            feedback,
        };
        tracing::debug!(
            connection = %id,
            "connect {}.{} -> {}.{}{}",
            conn.sender,
            conn.sender_port,
            conn.receiver,
            conn.receiver_port,
            if feedback { " (feedback)" } else { "" }
        );
        self.connections.push(conn);
        self.components[s].connected_through.push(id);
        self.components[r].connects_at.push(id);
        self.order = None;
        Ok(id)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> GraphResult<Connection> {
        let pos = self
            .connections
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| GraphError::NotFound {
                what: "Connection",
                id: id.to_string(),
            })?;
        let conn = self.connections.remove(pos);
        if let Some(&s) = self.index.get(&conn.sender) {
            self.components[s].connected_through.retain(|c| *c != id);
        }
        if let Some(&r) = self.index.get(&conn.receiver) {
            self.components[r].connects_at.retain(|c| *c != id);
        }
        self.order = None;
        Ok(conn)
    }

    /// Declare `child` as a sub-system of `parent`. Grouping only; never affects scheduling.
    pub fn set_sub_system(&mut self, parent: &str, child: &str) -> GraphResult<()> {
        let p = self.position(parent)?;
        let c = self.position(child)?;
        let parent_id = self.components[p].id().clone();
        let child_id = self.components[c].id().clone();
        let invalid = |reason| StructuralError::InvalidHierarchy {
            parent: parent_id.clone(),
            child: child_id.clone(),
            reason,
        };

        if p == c {
            return Err(invalid("a component cannot contain itself").into());
        }
        if self.components[c].sub_system_of.is_some() {
            return Err(invalid("child already belongs to another system").into());
        }
        let mut ancestor = self.components[p].sub_system_of.clone();
        while let Some(a) = ancestor {
            if a == child_id {
                return Err(invalid("link would make the hierarchy cyclic").into());
            }
            ancestor = self
                .index
                .get(&a)
                .and_then(|&i| self.components[i].sub_system_of.clone());
        }

        self.components[c].sub_system_of = Some(parent_id);
        self.components[p].has_sub_system.push(child_id);
        Ok(())
    }

    pub fn get_component(&self, id: &str) -> GraphResult<&Component> {
        let pos = self.position(id)?;
        Ok(&self.components[pos])
    }

    pub fn get_component_mut(&mut self, id: &str) -> GraphResult<&mut Component> {
        let pos = self.position(id)?;
        Ok(&mut self.components[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Insertion position of a component.
    pub fn position(&self, id: &str) -> GraphResult<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::component_not_found(id))
    }

    /// All components in insertion order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component_at(&self, position: usize) -> Option<&Component> {
        self.components.get(position)
    }

    pub fn component_at_mut(&mut self, position: usize) -> Option<&mut Component> {
        self.components.get_mut(position)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// Compute (or reuse) the execution order.
    pub fn compute_execution_order(&mut self) -> GraphResult<&ExecutionOrder> {
        let order = match self.order.take() {
            Some(cached) => cached,
            None => order::compute(
                &self.components,
                &self.connections,
                &self.index,
                self.cycle_policy,
            )?,
        };
        Ok(self.order.insert(order))
    }

    /// The cached execution order, if still valid.
    pub fn execution_order(&self) -> Option<&ExecutionOrder> {
        self.order.as_ref()
    }

    /// Copy sender outputs into the input ports of the component at `position`,
    /// combining fan-in with each port's aggregation rule.
    pub fn resolve_inputs(
        &mut self,
        position: usize,
        bindings: &[InputBinding],
    ) -> ComponentResult<()> {
        let mut resolved = Vec::with_capacity(bindings.len());
        for binding in bindings {
            if binding.sources.is_empty() {
                continue;
            }
            let mut delivered = binding
                .sources
                .iter()
                .filter_map(|(src, port)| self.components.get(*src)?.output().get(port));
            let value = match binding.aggregation {
                Some(rule) => rule.combine(delivered)?,
                None => delivered.next().cloned(),
            };
            resolved.push((binding.port.as_str(), value));
        }

        let Some(comp) = self.components.get_mut(position) else {
            return Ok(());
        };
        for (port, value) in resolved {
            if let (Some(v), Some(spec)) = (&value, comp.spec().find_input(port)) {
                if !spec.ty.accepts(v) {
                    return Err(ComponentError::InvalidValue {
                        port: port.to_string(),
                        what: format!("expected {:?}, received {:?}", spec.ty, v.port_type()),
                    });
                }
            }
            comp.input_mut().set_opt(port, value)?;
        }
        Ok(())
    }
}
