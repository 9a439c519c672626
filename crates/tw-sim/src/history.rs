//! Step-indexed history of port values.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tw_core::{ComponentId, Value};
use tw_graph::PortMap;

/// Which side of a component a recorded series belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortSide {
    Input,
    Output,
}

/// Recorded values of one component, one entry per step for every port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentHistory {
    pub saved_input: BTreeMap<String, Vec<Option<Value>>>,
    pub saved_output: BTreeMap<String, Vec<Option<Value>>>,
}

impl ComponentHistory {
    fn for_ports(input: &PortMap, output: &PortMap) -> Self {
        let empty = |ports: &PortMap| ports.names().map(|n| (n.to_string(), Vec::new())).collect();
        Self {
            saved_input: empty(input),
            saved_output: empty(output),
        }
    }

    fn push(&mut self, input: &PortMap, output: &PortMap) {
        for (port, value) in input.iter() {
            if let Some(series) = self.saved_input.get_mut(port) {
                series.push(value.cloned());
            }
        }
        for (port, value) in output.iter() {
            if let Some(series) = self.saved_output.get_mut(port) {
                series.push(value.cloned());
            }
        }
    }

    pub fn side(&self, side: PortSide) -> &BTreeMap<String, Vec<Option<Value>>> {
        match side {
            PortSide::Input => &self.saved_input,
            PortSide::Output => &self.saved_output,
        }
    }

    fn truncate(&mut self, len: usize) {
        for series in self.saved_input.values_mut().chain(self.saved_output.values_mut()) {
            series.truncate(len);
        }
    }
}

/// Simulated time axis plus the recorded series of every recording component.
///
/// Every series is index-aligned with `time_s`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub time_s: Vec<f64>,
    pub date_time: Vec<NaiveDateTime>,
    pub components: BTreeMap<ComponentId, ComponentHistory>,
}

impl History {
    pub(crate) fn with_capacity(steps: usize) -> Self {
        Self {
            time_s: Vec::with_capacity(steps),
            date_time: Vec::with_capacity(steps),
            components: BTreeMap::new(),
        }
    }

    pub(crate) fn track(&mut self, id: &ComponentId, input: &PortMap, output: &PortMap) {
        self.components
            .insert(id.clone(), ComponentHistory::for_ports(input, output));
    }

    pub(crate) fn push_time(&mut self, time_s: f64, date_time: NaiveDateTime) {
        self.time_s.push(time_s);
        self.date_time.push(date_time);
    }

    pub(crate) fn push(&mut self, id: &ComponentId, input: &PortMap, output: &PortMap) {
        if let Some(record) = self.components.get_mut(id) {
            record.push(input, output);
        }
    }

    /// Drop partially recorded rows so every series matches the time axis.
    pub(crate) fn align(&mut self) {
        let len = self.time_s.len();
        for record in self.components.values_mut() {
            record.truncate(len);
        }
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    pub fn component(&self, id: &str) -> Option<&ComponentHistory> {
        self.components.get(id)
    }

    pub fn series(&self, id: &str, side: PortSide, port: &str) -> Option<&[Option<Value>]> {
        self.component(id)?.side(side).get(port).map(Vec::as_slice)
    }

    pub fn saved_input(&self, id: &str, port: &str) -> Option<&[Option<Value>]> {
        self.series(id, PortSide::Input, port)
    }

    pub fn saved_output(&self, id: &str, port: &str) -> Option<&[Option<Value>]> {
        self.series(id, PortSide::Output, port)
    }

    /// Scalar view of an output series; non-scalar and undefined entries are `None`.
    pub fn output_scalars(&self, id: &str, port: &str) -> Option<Vec<Option<f64>>> {
        self.saved_output(id, port).map(|series| {
            series
                .iter()
                .map(|v| v.as_ref().and_then(|v| v.as_scalar().ok()))
                .collect()
        })
    }
}
