//! Default signature patterns for the stock components.

use tw_graph::{ComponentResult, Steppable};
use tw_semantic::{
    ClassHierarchy, PatternCatalog, PatternResult, SemanticNode, SignaturePattern, TemplateEdge,
};

use crate::actuator::Damper;
use crate::controller::{PidController, RulebasedController};
use crate::sensor::Sensor;
use crate::source::{Ruleset, Schedule};

/// Class hierarchy the default patterns are written against.
pub fn default_classes() -> ClassHierarchy {
    let mut classes = ClassHierarchy::new();
    classes
        .add("SetpointController", ["Controller"])
        .add("RulebasedController", ["Controller"])
        .add("Controller", ["Device"])
        .add("Sensor", ["Device"])
        .add("Meter", ["Device"])
        .add("Damper", ["Device"])
        .add("Co2", ["Property"])
        .add("Temperature", ["Property"])
        .add("AirFlow", ["Property"]);
    classes
}

fn property_or(node: &SemanticNode, key: &str, default: f64) -> f64 {
    node.property(key).unwrap_or(default)
}

/// Measurement device reading the flow of the damper whose property it observes.
fn damper_flow_pattern(class: &str) -> SignaturePattern {
    let mut p = SignaturePattern::new(class).with_priority(1);
    let sensor = p.add_node([class]);
    let property = p.add_node(["Property"]);
    let damper = p.add_node(["Damper"]);
    p.add_edge(TemplateEdge::exact(sensor, "observes", property))
        .add_edge(TemplateEdge::exact(property, "isPropertyOf", damper))
        .add_modeled_node(sensor)
        .add_input("measuredValue", damper, Some("airFlowRate"));
    p
}

/// Fallback: any device of `class`, measurement supplied externally.
fn bare_pattern(class: &str) -> SignaturePattern {
    let mut p = SignaturePattern::new(class).with_priority(-1);
    let node = p.add_node([class]);
    p.add_modeled_node(node);
    p
}

fn pid_pattern() -> SignaturePattern {
    let mut p = SignaturePattern::new("PidController");
    let controller = p.add_node(["SetpointController"]);
    let sensor = p.add_node(["Sensor"]);
    let property = p.add_node(["Property"]);
    let schedule = p.add_node(["Schedule"]);
    p.add_edge(TemplateEdge::exact(controller, "observes", property))
        .add_edge(TemplateEdge::exact(sensor, "observes", property))
        .add_edge(TemplateEdge::exact(controller, "hasProfile", schedule))
        .add_modeled_node(controller)
        .add_input("actualValue", sensor, Some("measuredValue"))
        .add_input("setpointValue", schedule, None);
    p
}

fn rulebased_pattern() -> SignaturePattern {
    let mut p = SignaturePattern::new("RulebasedController");
    let controller = p.add_node(["RulebasedController"]);
    let sensor = p.add_node(["Sensor"]);
    let property = p.add_node(["Property"]);
    p.add_edge(TemplateEdge::exact(controller, "observes", property))
        .add_edge(TemplateEdge::exact(sensor, "observes", property))
        .add_modeled_node(controller)
        .add_input("actualValue", sensor, Some("measuredValue"));
    p
}

fn controlled_damper_pattern() -> SignaturePattern {
    let mut p = SignaturePattern::new("Damper");
    let damper = p.add_node(["Damper"]);
    let controller = p.add_node(["Controller"]);
    p.add_edge(TemplateEdge::exact(controller, "controls", damper))
        .add_modeled_node(damper)
        .add_input("damperPosition", controller, Some("inputSignal"));
    p
}

fn build_sensor(_: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
    Ok(Box::new(Sensor::new()))
}

fn build_meter(_: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
    Ok(Box::new(Sensor::meter()))
}

fn build_pid(node: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
    Ok(Box::new(PidController::new(
        property_or(node, "kp", 0.1),
        property_or(node, "ki", 0.01),
        property_or(node, "kd", 0.0),
    )?))
}

fn build_rulebased(_: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
    Ok(Box::new(RulebasedController::default()))
}

fn build_damper(node: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
    Ok(Box::new(Damper::new(
        property_or(node, "nominalAirFlowRate", 1.6),
        property_or(node, "a", 5.0),
    )?))
}

fn build_schedule(node: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
    Ok(Box::new(Schedule::new(Ruleset::constant(property_or(node, "value", 0.0)))?))
}

/// Catalog of every stock component that can be discovered from a semantic graph.
///
/// Entries are declared producers first (schedules, controllers) so that equal
/// priorities resolve the same way on every run.
pub fn default_catalog() -> PatternResult<PatternCatalog> {
    let mut catalog = PatternCatalog::new();
    catalog
        .register("Schedule", vec![bare_pattern("Schedule")], build_schedule)?
        .register("PidController", vec![pid_pattern()], build_pid)?
        .register("RulebasedController", vec![rulebased_pattern()], build_rulebased)?
        .register(
            "Damper",
            vec![controlled_damper_pattern(), bare_pattern("Damper")],
            build_damper,
        )?
        .register(
            "Sensor",
            vec![damper_flow_pattern("Sensor"), bare_pattern("Sensor")],
            build_sensor,
        )?
        .register(
            "Meter",
            vec![damper_flow_pattern("Meter"), bare_pattern("Meter")],
            build_meter,
        )?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid() {
        let catalog = default_catalog().unwrap();
        assert_eq!(catalog.len(), 6);
        let sensor = catalog.entry("Sensor").unwrap();
        assert_eq!(sensor.patterns[1].priority(), -1);
    }

    #[test]
    fn controllers_share_a_parent_class() {
        let classes = default_classes();
        assert!(classes.is_a("SetpointController", "Controller"));
        assert!(classes.is_a("RulebasedController", "Device"));
        assert!(classes.is_a("Co2", "Property"));
    }
}
