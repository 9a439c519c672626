//! Integration tests for tw-graph.

use tw_core::{PortType, Value};
use tw_graph::{
    Aggregation, ComponentResult, ComponentRole, CyclePolicy, GraphError, Model, PortMap,
    PortSpec, StepContext, Steppable, StructuralError,
};

/// Generic test block: declared ports, configurable role, copies `u` to `y` when present.
#[derive(Debug)]
struct Block {
    spec: PortSpec,
    role: ComponentRole,
}

impl Block {
    fn source() -> Box<dyn Steppable> {
        Box::new(Self {
            spec: PortSpec::new().output("y"),
            role: ComponentRole::Source,
        })
    }

    fn relay() -> Box<dyn Steppable> {
        Box::new(Self {
            spec: PortSpec::new().input("u").output("y"),
            role: ComponentRole::Physical,
        })
    }

    fn controller() -> Box<dyn Steppable> {
        Box::new(Self {
            spec: PortSpec::new().input("u").output("y"),
            role: ComponentRole::Controller,
        })
    }

    fn summer() -> Box<dyn Steppable> {
        Box::new(Self {
            spec: PortSpec::new()
                .aggregating_input("u", Aggregation::Sum)
                .output("y"),
            role: ComponentRole::Physical,
        })
    }

    fn vector_source() -> Box<dyn Steppable> {
        Box::new(Self {
            spec: PortSpec::new().output_typed("y", PortType::Vector),
            role: ComponentRole::Source,
        })
    }
}

impl Steppable for Block {
    fn kind(&self) -> &str {
        "Block"
    }

    fn ports(&self) -> PortSpec {
        self.spec.clone()
    }

    fn role(&self) -> ComponentRole {
        self.role
    }

    fn do_step(&mut self, _: &StepContext, input: &PortMap, output: &mut PortMap) -> ComponentResult<()> {
        if let Some(v) = input.get("u") {
            output.set("y", v.clone())?;
        }
        Ok(())
    }
}

fn ids(model: &mut Model) -> Vec<String> {
    model
        .compute_execution_order()
        .unwrap()
        .ids()
        .iter()
        .map(|id| id.as_str().to_string())
        .collect()
}

#[test]
fn chain_is_ordered_by_dependency() {
    let mut model = Model::new("chain");
    model.add_component("c", Block::relay()).unwrap();
    model.add_component("b", Block::relay()).unwrap();
    model.add_component("a", Block::source()).unwrap();
    model.add_connection("a", "b", "y", "u").unwrap();
    model.add_connection("b", "c", "y", "u").unwrap();

    assert_eq!(ids(&mut model), ["a", "b", "c"]);
}

#[test]
fn independent_components_keep_insertion_order() {
    let mut model = Model::new("flat");
    for id in ["z", "m", "a"] {
        model.add_component(id, Block::source()).unwrap();
    }
    assert_eq!(ids(&mut model), ["z", "m", "a"]);
}

#[test]
fn ready_ties_break_by_insertion_order() {
    // s1 -> r, s0 independent; r must follow s1 but s0 (inserted first) leads.
    let mut model = Model::new("ties");
    model.add_component("s0", Block::source()).unwrap();
    model.add_component("r", Block::relay()).unwrap();
    model.add_component("s1", Block::source()).unwrap();
    model.add_connection("s1", "r", "y", "u").unwrap();

    assert_eq!(ids(&mut model), ["s0", "s1", "r"]);
}

#[test]
fn duplicate_component_is_structural_error() {
    let mut model = Model::new("dup");
    model.add_component("a", Block::source()).unwrap();
    let err = model.add_component("a", Block::source()).unwrap_err();
    assert!(matches!(
        err,
        GraphError::Structural(StructuralError::DuplicateComponent { .. })
    ));
}

#[test]
fn unknown_component_is_not_found() {
    let mut model = Model::new("nf");
    model.add_component("a", Block::source()).unwrap();
    let err = model.add_connection("a", "ghost", "y", "u").unwrap_err();
    assert!(matches!(err, GraphError::NotFound { .. }));
    assert!(matches!(
        model.get_component("ghost"),
        Err(GraphError::NotFound { .. })
    ));
}

#[test]
fn unknown_port_is_structural_error() {
    let mut model = Model::new("ports");
    model.add_component("a", Block::source()).unwrap();
    model.add_component("b", Block::relay()).unwrap();

    let err = model.add_connection("a", "b", "nope", "u").unwrap_err();
    assert!(matches!(
        err,
        GraphError::Structural(StructuralError::UnknownPort { .. })
    ));
    let err = model.add_connection("a", "b", "y", "nope").unwrap_err();
    assert!(matches!(
        err,
        GraphError::Structural(StructuralError::UnknownPort { .. })
    ));
}

#[test]
fn incompatible_port_types_are_rejected() {
    let mut model = Model::new("types");
    model.add_component("v", Block::vector_source()).unwrap();
    model.add_component("b", Block::relay()).unwrap();
    let err = model.add_connection("v", "b", "y", "u").unwrap_err();
    assert!(matches!(
        err,
        GraphError::Structural(StructuralError::IncompatiblePorts { .. })
    ));
}

#[test]
fn second_sender_on_plain_port_is_rejected() {
    let mut model = Model::new("bound");
    model.add_component("a", Block::source()).unwrap();
    model.add_component("b", Block::source()).unwrap();
    model.add_component("c", Block::relay()).unwrap();
    model.add_connection("a", "c", "y", "u").unwrap();

    let err = model.add_connection("b", "c", "y", "u").unwrap_err();
    assert!(matches!(
        err,
        GraphError::Structural(StructuralError::PortAlreadyBound { .. })
    ));
    assert_eq!(model.connections().len(), 1);
}

#[test]
fn aggregating_port_accumulates_senders() {
    let mut model = Model::new("fan-in");
    model.add_component("a", Block::source()).unwrap();
    model.add_component("b", Block::source()).unwrap();
    model.add_component("c", Block::summer()).unwrap();
    let c1 = model.add_connection("a", "c", "y", "u").unwrap();
    let c2 = model.add_connection("b", "c", "y", "u").unwrap();

    let c = model.get_component("c").unwrap();
    assert_eq!(c.connects_at(), &[c1, c2]);
    assert_eq!(model.get_component("a").unwrap().connected_through(), &[c1]);
}

#[test]
fn three_node_cycle_names_every_member() {
    let mut model = Model::new("cycle");
    model.add_component("a", Block::relay()).unwrap();
    model.add_component("b", Block::relay()).unwrap();
    model.add_component("c", Block::relay()).unwrap();
    model.add_component("tail", Block::relay()).unwrap();
    model.add_connection("a", "b", "y", "u").unwrap();
    model.add_connection("b", "c", "y", "u").unwrap();
    model.add_connection("c", "a", "y", "u").unwrap();
    model.add_connection("c", "tail", "y", "u").unwrap();

    let err = model.compute_execution_order().unwrap_err();
    match &err {
        GraphError::Cycle { cycles } => {
            assert_eq!(cycles.len(), 1);
            let names: Vec<&str> = cycles[0].iter().map(|id| id.as_str()).collect();
            assert_eq!(names, ["a", "b", "c"]);
        }
        other => panic!("expected cycle error, got {other:?}"),
    }
    assert_eq!(err.cycle_members().len(), 3);
    assert!(err.to_string().contains("a -> b -> c"));
}

#[test]
fn self_loop_is_a_cycle() {
    let mut model = Model::new("self");
    model.add_component("damper", Block::relay()).unwrap();
    model.add_connection("damper", "damper", "y", "u").unwrap();
    let err = model.compute_execution_order().unwrap_err();
    assert_eq!(err.cycle_members().len(), 1);
}

#[test]
fn explicit_feedback_edge_breaks_cycle() {
    let mut model = Model::new("feedback");
    model.add_component("plant", Block::relay()).unwrap();
    model.add_component("ctrl", Block::controller()).unwrap();
    model.add_connection("ctrl", "plant", "y", "u").unwrap();
    let fb = model.add_feedback_connection("plant", "ctrl", "y", "u").unwrap();

    assert_eq!(ids(&mut model), ["ctrl", "plant"]);
    assert_eq!(model.execution_order().unwrap().exempted(), &[fb]);
}

#[test]
fn controller_policy_exempts_controller_inputs_on_cycles() {
    let mut model = Model::new("loop");
    model.add_component("space", Block::relay()).unwrap();
    model.add_component("sensor", Block::relay()).unwrap();
    model.add_component("ctrl", Block::controller()).unwrap();
    model.add_connection("space", "sensor", "y", "u").unwrap();
    model.add_connection("sensor", "ctrl", "y", "u").unwrap();
    model.add_connection("ctrl", "space", "y", "u").unwrap();

    assert!(matches!(
        model.compute_execution_order(),
        Err(GraphError::Cycle { .. })
    ));

    model.set_cycle_policy(CyclePolicy::ControllerInputs);
    assert_eq!(ids(&mut model), ["ctrl", "space", "sensor"]);
}

#[test]
fn controller_policy_does_not_excuse_plain_cycles() {
    let mut model = Model::new("loop").with_cycle_policy(CyclePolicy::ControllerInputs);
    model.add_component("a", Block::relay()).unwrap();
    model.add_component("b", Block::relay()).unwrap();
    model.add_connection("a", "b", "y", "u").unwrap();
    model.add_connection("b", "a", "y", "u").unwrap();
    assert!(matches!(
        model.compute_execution_order(),
        Err(GraphError::Cycle { .. })
    ));
}

#[test]
fn acyclic_controller_inputs_keep_their_dependency() {
    let mut model = Model::new("open").with_cycle_policy(CyclePolicy::ControllerInputs);
    model.add_component("ctrl", Block::controller()).unwrap();
    model.add_component("setpoint", Block::source()).unwrap();
    model.add_connection("setpoint", "ctrl", "y", "u").unwrap();
    assert_eq!(ids(&mut model), ["setpoint", "ctrl"]);
    assert!(model.execution_order().unwrap().exempted().is_empty());
}

#[test]
fn topology_change_invalidates_cached_order() {
    let mut model = Model::new("cache");
    model.add_component("b", Block::relay()).unwrap();
    model.add_component("a", Block::source()).unwrap();
    assert_eq!(ids(&mut model), ["b", "a"]);
    assert!(model.execution_order().is_some());

    let conn = model.add_connection("a", "b", "y", "u").unwrap();
    assert!(model.execution_order().is_none());
    assert_eq!(ids(&mut model), ["a", "b"]);

    model.remove_connection(conn).unwrap();
    assert!(model.execution_order().is_none());
    assert_eq!(ids(&mut model), ["b", "a"]);
}

#[test]
fn removing_component_drops_its_connections() {
    let mut model = Model::new("rm");
    model.add_component("a", Block::source()).unwrap();
    model.add_component("b", Block::relay()).unwrap();
    model.add_component("c", Block::relay()).unwrap();
    model.add_connection("a", "b", "y", "u").unwrap();
    model.add_connection("b", "c", "y", "u").unwrap();

    model.remove_component("b").unwrap();
    assert!(model.connections().is_empty());
    assert!(model.get_component("a").unwrap().connected_through().is_empty());
    assert!(model.get_component("c").unwrap().connects_at().is_empty());
    assert_eq!(ids(&mut model), ["a", "c"]);
}

#[test]
fn generated_ids_avoid_explicit_ones() {
    let mut model = Model::new("ids");
    model.add_component("damper_0", Block::source()).unwrap();
    let id = model.add_component_auto("damper", Block::source());
    assert_eq!(id.as_str(), "damper_1");
    let id = model.add_component_preferring("damper_0", Block::source());
    assert_eq!(id.as_str(), "damper_0_0");
}

#[test]
fn sub_system_links_are_grouping_only() {
    let mut model = Model::new("hier");
    model.add_component("ahu", Block::source()).unwrap();
    model.add_component("fan", Block::source()).unwrap();
    model.add_component("coil", Block::source()).unwrap();
    model.set_sub_system("ahu", "fan").unwrap();
    model.set_sub_system("ahu", "coil").unwrap();

    assert_eq!(model.get_component("ahu").unwrap().has_sub_system().len(), 2);
    assert_eq!(
        model.get_component("fan").unwrap().sub_system_of().map(|id| id.as_str()),
        Some("ahu")
    );
    assert!(model.set_sub_system("fan", "ahu").is_err());
    assert!(model.set_sub_system("coil", "coil").is_err());
    assert_eq!(ids(&mut model), ["ahu", "fan", "coil"]);
}

#[test]
fn resolve_inputs_copies_sender_output() {
    #[derive(Debug)]
    struct Five;
    impl Steppable for Five {
        fn kind(&self) -> &str {
            "Five"
        }
        fn ports(&self) -> PortSpec {
            PortSpec::new().output("y")
        }
        fn do_step(&mut self, _: &StepContext, _: &PortMap, out: &mut PortMap) -> ComponentResult<()> {
            out.set_scalar("y", 5.0)
        }
    }

    let mut model = Model::new("copy");
    model.add_component("a", Box::new(Five)).unwrap();
    model.add_component("b", Block::relay()).unwrap();
    model.add_component("c", Box::new(Five)).unwrap();
    model.add_component("sum", Block::summer()).unwrap();
    model.add_connection("a", "b", "y", "u").unwrap();
    model.add_connection("a", "sum", "y", "u").unwrap();
    model.add_connection("c", "sum", "y", "u").unwrap();

    let order = model.compute_execution_order().unwrap().clone();
    let step = StepContext {
        step: 0,
        second_time: 0.0,
        date_time: chrono::NaiveDateTime::default(),
        step_size_s: 1.0,
    };
    for &pos in order.positions() {
        model.resolve_inputs(pos, order.bindings(pos)).unwrap();
        model.component_at_mut(pos).unwrap().do_step(&step).unwrap();
    }

    let b = model.get_component("b").unwrap();
    assert_eq!(b.input().get("u"), Some(&Value::Scalar(5.0)));
    let sum = model.get_component("sum").unwrap();
    assert_eq!(sum.input().scalar("u").unwrap(), 10.0);
}
