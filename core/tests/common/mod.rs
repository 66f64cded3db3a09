#![allow(dead_code)]

use graph_route_core::{props, Element, Graph, Properties};

/// Seven vertices: two people who wrote four projects, plus a technology
/// vertex (`blueprints`) that has no outgoing edges.
///
/// Adjacency order is insertion order, so the per-vertex order of outgoing
/// edges below is significant: v3 yields e6, e5, e7 in that order.
pub fn pacer_graph() -> Graph {
    let mut g = Graph::new();
    let vertices: [(u64, &str, &str); 7] = [
        (0, "pangloss", "person"),
        (1, "pacer", "project"),
        (2, "gremlin", "project"),
        (3, "pipes", "project"),
        (4, "rexster", "project"),
        (5, "okram", "person"),
        (6, "blueprints", "technology"),
    ];
    for (id, name, kind) in vertices {
        g.add_vertex(id, props([("name", name), ("type", kind)]))
            .unwrap();
    }

    let edges: [(u64, u64, u64, &str); 12] = [
        (0, 0, 1, "wrote"),
        (1, 5, 4, "wrote"),
        (2, 4, 2, "uses"),
        (3, 1, 2, "uses"),
        (4, 2, 3, "uses"),
        (6, 3, 6, "uses"),
        (5, 3, 1, "uses"),
        (7, 3, 6, "depends_on"),
        (8, 0, 6, "likes"),
        (13, 5, 2, "wrote"),
        (12, 5, 3, "wrote"),
        (9, 5, 6, "likes"),
    ];
    for (id, tail, head, label) in edges {
        g.add_edge(id, tail, head, label, props([("weight", id as i64)]))
            .unwrap();
    }
    g
}

pub fn v(g: &Graph, id: u64) -> Element {
    g.vertex(id).unwrap()
}

pub fn e(g: &Graph, id: u64) -> Element {
    g.edge(id).unwrap()
}

/// A graph with `n` vertices and no edges.
pub fn make_isolated(n: u64) -> Graph {
    let mut g = Graph::new();
    for i in 0..n {
        g.add_vertex(i, Properties::new()).unwrap();
    }
    g
}
