//! Matching semantic graphs into graph models.

use tw_graph::{
    Aggregation, ComponentResult, ComponentRole, GraphError, Model, PortMap, PortSpec,
    StepContext, Steppable, StructuralError,
};
use tw_semantic::{
    MatchError, MatchMode, PatternCatalog, SemanticGraph, SemanticNode, SignaturePattern,
    TemplateEdge, auto_wire,
};

#[derive(Debug)]
struct Device {
    kind: &'static str,
    spec: PortSpec,
    role: ComponentRole,
}

impl Steppable for Device {
    fn kind(&self) -> &str {
        self.kind
    }

    fn ports(&self) -> PortSpec {
        self.spec.clone()
    }

    fn role(&self) -> ComponentRole {
        self.role
    }

    fn do_step(&mut self, _: &StepContext, _: &PortMap, _: &mut PortMap) -> ComponentResult<()> {
        Ok(())
    }
}

fn sensor(_: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
    Ok(Box::new(Device {
        kind: "Sensor",
        spec: PortSpec::new().input("measuredValue").output("measuredValue"),
        role: ComponentRole::Sensor,
    }))
}

fn controller(_: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
    Ok(Box::new(Device {
        kind: "Controller",
        spec: PortSpec::new().input("actualValue").output("inputSignal"),
        role: ComponentRole::Controller,
    }))
}

fn totalizer(_: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
    Ok(Box::new(Device {
        kind: "Totalizer",
        spec: PortSpec::new()
            .aggregating_input("airFlowRate", Aggregation::Sum)
            .output("airFlowRate"),
        role: ComponentRole::Physical,
    }))
}

fn damper(_: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
    Ok(Box::new(Device {
        kind: "Damper",
        spec: PortSpec::new().input("damperPosition").output("airFlowRate"),
        role: ComponentRole::Actuator,
    }))
}

/// Sensor must observe a property; controller observes the same property and reads
/// the sensor's measurement.
fn catalog() -> PatternCatalog {
    let mut sensor_p = SignaturePattern::new("Sensor");
    let s = sensor_p.add_node(["Sensor"]);
    let prop = sensor_p.add_node(["Property"]);
    sensor_p
        .add_edge(TemplateEdge::exact(s, "observes", prop))
        .add_modeled_node(s);

    let mut ctrl_p = SignaturePattern::new("Controller");
    let c = ctrl_p.add_node(["Controller"]);
    let prop = ctrl_p.add_node(["Property"]);
    let s = ctrl_p.add_node(["Sensor"]);
    ctrl_p
        .add_edge(TemplateEdge::exact(c, "observes", prop))
        .add_edge(TemplateEdge::exact(s, "observes", prop))
        .add_modeled_node(c)
        .add_input("actualValue", s, Some("measuredValue"));

    let mut catalog = PatternCatalog::new();
    catalog
        .register("Sensor", vec![sensor_p], sensor)
        .unwrap()
        .register("Controller", vec![ctrl_p], controller)
        .unwrap();
    catalog
}

fn room(with_observes: bool) -> SemanticGraph {
    let mut g = SemanticGraph::new();
    g.classes_mut().add("Co2", ["Property"]);
    g.add_node("co2_sensor", "Sensor").unwrap();
    g.add_node("co2", "Co2").unwrap();
    g.add_node("space", "Space").unwrap();
    g.add_node("ctrl", "Controller").unwrap();
    g.add_triple("co2", "isPropertyOf", "space").unwrap();
    g.add_triple("ctrl", "observes", "co2").unwrap();
    if with_observes {
        g.add_triple("co2_sensor", "observes", "co2").unwrap();
    }
    g
}

#[test]
fn matched_components_are_wired() {
    let mut model = Model::new("room");
    let report = auto_wire(&mut model, &room(true), &catalog(), MatchMode::Strict).unwrap();

    let ids: Vec<&str> = report.components.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["co2_sensor", "ctrl"]);
    assert_eq!(report.connections.len(), 1);

    let conn = model.connection(report.connections[0]).unwrap();
    assert_eq!(conn.sender.as_str(), "co2_sensor");
    assert_eq!(conn.sender_port, "measuredValue");
    assert_eq!(conn.receiver.as_str(), "ctrl");
    assert_eq!(conn.receiver_port, "actualValue");

    let order = model.compute_execution_order().unwrap();
    assert_eq!(order.rank_of("co2_sensor"), Some(0));
}

#[test]
fn missing_observes_is_fatal_in_strict_mode() {
    let mut model = Model::new("room");
    let err = auto_wire(&mut model, &room(false), &catalog(), MatchMode::Strict).unwrap_err();
    assert_eq!(
        err,
        MatchError::Unmodeled {
            nodes: vec!["co2_sensor".into(), "ctrl".into()]
        }
    );
    assert!(model.components().is_empty());
}

#[test]
fn missing_observes_is_omitted_in_lenient_mode() {
    let mut model = Model::new("room");
    let report = auto_wire(&mut model, &room(false), &catalog(), MatchMode::Lenient).unwrap();

    // Without the sensor's observation the controller has no measurement to wire.
    assert!(report.components.is_empty());
    assert_eq!(report.unmodeled, ["co2_sensor", "ctrl"]);
    assert!(model.compute_execution_order().unwrap().is_empty());
}

#[test]
fn unresolved_inputs_are_reported_in_lenient_mode() {
    // The controller matches, but the sensor it reads is claimed by no pattern.
    let mut ctrl_p = SignaturePattern::new("Controller");
    let c = ctrl_p.add_node(["Controller"]);
    let prop = ctrl_p.add_node(["Property"]);
    let s = ctrl_p.add_node(["Sensor"]);
    ctrl_p
        .add_edge(TemplateEdge::exact(c, "observes", prop))
        .add_edge(TemplateEdge::exact(s, "observes", prop))
        .add_modeled_node(c)
        .add_input("actualValue", s, None);
    let mut catalog = PatternCatalog::new();
    catalog.register("Controller", vec![ctrl_p], controller).unwrap();

    let mut model = Model::new("room");
    let report = auto_wire(&mut model, &room(true), &catalog, MatchMode::Lenient).unwrap();
    assert_eq!(report.components.len(), 1);
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].node, "co2_sensor");
    assert!(model.connections().is_empty());

    let mut strict_model = Model::new("room");
    let err = auto_wire(&mut strict_model, &room(true), &catalog, MatchMode::Strict).unwrap_err();
    assert!(matches!(err, MatchError::UnresolvedInput { .. }));
    assert!(strict_model.components().is_empty());
}

#[test]
fn matching_is_idempotent() {
    let graph = room(true);
    let catalog = catalog();

    let mut first = Model::new("a");
    let mut second = Model::new("a");
    let r1 = auto_wire(&mut first, &graph, &catalog, MatchMode::Lenient).unwrap();
    let r2 = auto_wire(&mut second, &graph, &catalog, MatchMode::Lenient).unwrap();

    assert_eq!(r1, r2);
    assert_eq!(first.connections(), second.connections());
    let ids = |m: &Model| m.components().iter().map(|c| c.id().clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn taken_ids_get_a_suffix() {
    let mut model = Model::new("room");
    model
        .add_component("ctrl", controller(&SemanticNode::new("x", "Controller")).unwrap())
        .unwrap();
    let report = auto_wire(&mut model, &room(true), &catalog(), MatchMode::Strict).unwrap();
    let ids: Vec<&str> = report.components.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["co2_sensor", "ctrl_0"]);
}

#[test]
fn multiple_matches_feed_an_aggregating_port() {
    let mut damper_p = SignaturePattern::new("Damper");
    let d = damper_p.add_node(["Damper"]);
    damper_p.add_modeled_node(d);

    let mut total_p = SignaturePattern::new("Totalizer");
    let space = total_p.add_node(["Space"]);
    let dampers = total_p.add_node(["Damper"]);
    total_p
        .add_edge(TemplateEdge::multiple(space, "servedBy", dampers))
        .add_modeled_node(space)
        .add_input("airFlowRate", dampers, None);

    let mut catalog = PatternCatalog::new();
    catalog
        .register("Damper", vec![damper_p], damper)
        .unwrap()
        .register("Totalizer", vec![total_p], totalizer)
        .unwrap();

    let mut g = SemanticGraph::new();
    g.add_node("supply_damper", "Damper").unwrap();
    g.add_node("exhaust_damper", "Damper").unwrap();
    g.add_node("room", "Space").unwrap();
    g.add_triple("room", "servedBy", "supply_damper").unwrap();
    g.add_triple("room", "servedBy", "exhaust_damper").unwrap();

    let mut model = Model::new("room");
    let report = auto_wire(&mut model, &g, &catalog, MatchMode::Strict).unwrap();
    assert_eq!(report.connections.len(), 2);
    assert_eq!(model.get_component("room").unwrap().connects_at().len(), 2);

    let order = model.compute_execution_order().unwrap();
    assert_eq!(order.rank_of("room"), Some(2));
}

fn mixer(_: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
    Ok(Box::new(Device {
        kind: "Mixer",
        spec: PortSpec::new().input("airFlowRate").output("airFlowRate"),
        role: ComponentRole::Physical,
    }))
}

#[test]
fn failed_wiring_leaves_the_model_untouched() {
    let mut damper_p = SignaturePattern::new("Damper");
    let d = damper_p.add_node(["Damper"]);
    damper_p.add_modeled_node(d);

    // Two dampers serve the room but the mixer's input takes a single sender.
    let mut mixer_p = SignaturePattern::new("Mixer");
    let space = mixer_p.add_node(["Space"]);
    let dampers = mixer_p.add_node(["Damper"]);
    mixer_p
        .add_edge(TemplateEdge::multiple(space, "servedBy", dampers))
        .add_modeled_node(space)
        .add_input("airFlowRate", dampers, None);

    let mut catalog = PatternCatalog::new();
    catalog
        .register("Damper", vec![damper_p], damper)
        .unwrap()
        .register("Mixer", vec![mixer_p], mixer)
        .unwrap();

    let mut g = SemanticGraph::new();
    g.add_node("supply_damper", "Damper").unwrap();
    g.add_node("exhaust_damper", "Damper").unwrap();
    g.add_node("room", "Space").unwrap();
    g.add_triple("room", "servedBy", "supply_damper").unwrap();
    g.add_triple("room", "servedBy", "exhaust_damper").unwrap();

    let mut model = Model::new("room");
    model
        .add_component("existing", sensor(&SemanticNode::new("x", "Sensor")).unwrap())
        .unwrap();

    for mode in [MatchMode::Strict, MatchMode::Lenient] {
        let err = auto_wire(&mut model, &g, &catalog, mode).unwrap_err();
        assert!(matches!(
            err,
            MatchError::Graph(GraphError::Structural(StructuralError::PortAlreadyBound { .. }))
        ));
        let ids: Vec<&str> = model.components().iter().map(|c| c.id().as_str()).collect();
        assert_eq!(ids, ["existing"]);
        assert!(model.connections().is_empty());
        assert!(model.compute_execution_order().is_ok());
    }
}
