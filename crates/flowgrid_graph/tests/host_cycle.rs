// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drives the per-cycle host protocol end to end: template instantiation,
//! connection gestures, layout write-back, and dynamic pin sweeping.

use flowgrid_graph::{
    ConnectOutcome, ConnectionFilter, Graph, GraphError, Hovered, NodeRegistry, NodeTemplate,
    Pos2, Vec2,
};

fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(NodeTemplate::new("constant", "Constant", |g, id| {
        g.add_output::<i32>(id, "value", "value", 0, ConnectionFilter::NUMBERS)
            .unwrap();
    }));
    registry.register(NodeTemplate::new("adder", "Adder", |g, id| {
        g.add_input::<i32>(id, "a", "a", 0, ConnectionFilter::NUMBERS)
            .unwrap();
        g.add_input::<i32>(id, "b", "b", 0, ConnectionFilter::NUMBERS)
            .unwrap();
        g.add_output::<i32>(id, "sum", "sum", 0, ConnectionFilter::NUMBERS)
            .unwrap();
        g.set_compute::<i32>(id, "sum", |ctx| {
            ctx.input::<i32>("a").unwrap_or(0) + ctx.input::<i32>("b").unwrap_or(0)
        })
        .unwrap();
    }));
    registry
}

#[test]
fn editor_session_connects_and_evaluates() {
    let _ = tracing_subscriber::fmt::try_init();

    let registry = registry();
    let mut graph = Graph::default();

    let lhs = registry
        .instantiate(&mut graph, "constant", Pos2::ZERO)
        .unwrap();
    let rhs = registry
        .instantiate(&mut graph, "constant", Pos2::new(0.0, 80.0))
        .unwrap();
    let adder = registry
        .instantiate(&mut graph, "adder", Pos2::new(240.0, 40.0))
        .unwrap();
    graph.set_output_value::<i32>(lhs, "value", 2).unwrap();
    graph.set_output_value::<i32>(rhs, "value", 40).unwrap();

    // Connection gestures arrive as pin-pair attempts from the surface.
    let lhs_out = graph.output_ref(lhs, "value").unwrap();
    let rhs_out = graph.output_ref(rhs, "value").unwrap();
    let in_a = graph.input_ref(adder, "a").unwrap();
    let in_b = graph.input_ref(adder, "b").unwrap();
    assert_eq!(graph.connect(lhs_out, in_a).unwrap(), ConnectOutcome::Connected);
    assert_eq!(graph.connect(rhs_out, in_b).unwrap(), ConnectOutcome::Connected);

    assert_eq!(graph.output_value::<i32>(adder, "sum").unwrap(), 42);

    // A repeated gesture on the same pair is a click-to-disconnect.
    assert_eq!(
        graph.connect(lhs_out, in_a).unwrap(),
        ConnectOutcome::Disconnected
    );
    assert_eq!(graph.output_value::<i32>(adder, "sum").unwrap(), 40);
}

#[test]
fn renderer_state_round_trips_through_the_core() {
    let registry = registry();
    let mut graph = Graph::default();
    let node = registry
        .instantiate(&mut graph, "constant", Pos2::ZERO)
        .unwrap();
    let out = graph.output_ref(node, "value").unwrap();

    graph.begin_cycle();
    graph
        .set_pin_bounds(out, Pos2::new(96.0, 12.0), Vec2::new(48.0, 16.0))
        .unwrap();
    graph.set_hovered(Some(Hovered::Pin(out)));
    graph.end_cycle();

    let pin = graph.pin(out).unwrap();
    assert_eq!(pin.position(), Pos2::new(96.0, 12.0));
    assert_eq!(pin.size(), Vec2::new(48.0, 16.0));
    assert_eq!(graph.hovered(), Some(Hovered::Pin(out)));

    // The next cycle starts from a clean hover slate.
    graph.begin_cycle();
    assert_eq!(graph.hovered(), None);
}

#[test]
fn variable_input_node_shrinks_with_its_declarations() {
    let registry = registry();
    let mut graph = Graph::default();
    let collector = graph.add_node("Collector", Pos2::new(300.0, 0.0));
    let source = registry
        .instantiate(&mut graph, "constant", Pos2::ZERO)
        .unwrap();
    graph.set_output_value::<i32>(source, "value", 4).unwrap();
    let out = graph.output_ref(source, "value").unwrap();

    // Cycle 1: the host declares two inputs and wires the second.
    graph.begin_cycle();
    graph
        .show_input::<i32>(collector, "p0", "p0", 0, ConnectionFilter::NUMBERS)
        .unwrap();
    graph
        .show_input::<i32>(collector, "p1", "p1", 0, ConnectionFilter::NUMBERS)
        .unwrap();
    graph.end_cycle();
    let p1 = graph.input_ref(collector, "p1").unwrap();
    graph.connect(out, p1).unwrap();
    assert_eq!(graph.link_count(), 1);

    // Cycle 2: the linked value is visible through the re-declaration.
    graph.begin_cycle();
    graph
        .show_input::<i32>(collector, "p0", "p0", 0, ConnectionFilter::NUMBERS)
        .unwrap();
    let linked = graph
        .show_input::<i32>(collector, "p1", "p1", 0, ConnectionFilter::NUMBERS)
        .unwrap();
    assert_eq!(linked, 4);
    graph.end_cycle();

    // Cycle 3: "p1" is no longer declared, so it is swept with its link.
    graph.begin_cycle();
    graph
        .show_input::<i32>(collector, "p0", "p0", 0, ConnectionFilter::NUMBERS)
        .unwrap();
    graph.end_cycle();

    assert!(matches!(
        graph.input_value::<i32>(collector, "p1"),
        Err(GraphError::KeyNotFound { .. })
    ));
    assert_eq!(graph.link_count(), 0);
    assert_eq!(graph.node(collector).unwrap().pin_count(), 1);
}

#[test]
fn removing_a_node_leaves_no_dangling_references() {
    let registry = registry();
    let mut graph = Graph::default();
    let source = registry
        .instantiate(&mut graph, "constant", Pos2::ZERO)
        .unwrap();
    let adder = registry
        .instantiate(&mut graph, "adder", Pos2::new(200.0, 0.0))
        .unwrap();
    let out = graph.output_ref(source, "value").unwrap();
    let in_a = graph.input_ref(adder, "a").unwrap();
    let in_b = graph.input_ref(adder, "b").unwrap();
    graph.connect(out, in_a).unwrap();
    graph.connect(out, in_b).unwrap();

    graph.remove_node(source);

    assert!(graph.links().all(|l| !l.involves_node(source)));
    assert_eq!(graph.link_count(), 0);
    assert_eq!(graph.output_value::<i32>(adder, "sum").unwrap(), 0);
}
