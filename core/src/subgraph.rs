use std::collections::HashSet;

use tracing::debug;

use crate::element::{EdgeId, ElementId, VertexId};
use crate::error::{Result, RouteError};
use crate::graph::{End, Graph};
use crate::path::Path;

/// Copy every vertex and edge on `paths` into a new graph.
///
/// Ids, labels and properties are preserved. Each element is copied once, in
/// first-seen order. Edge endpoints are copied even when no path visits them,
/// but no edge outside the paths is ever added.
pub(crate) fn materialize<I>(source: &Graph, paths: I) -> Result<Graph>
where
    I: IntoIterator<Item = Result<Path>>,
{
    // Phase 1: collect the element sets in first-seen order
    let mut vertex_set: HashSet<VertexId> = HashSet::new();
    let mut edge_set: HashSet<EdgeId> = HashSet::new();
    let mut vertices: Vec<VertexId> = Vec::new();
    let mut edges: Vec<(EdgeId, VertexId, VertexId)> = Vec::new();
    let mut path_count = 0usize;

    for path in paths {
        let path = path?;
        path_count += 1;
        for &element in &path {
            source.check_owned(element)?;
            match element.id() {
                ElementId::Vertex(id) => {
                    if vertex_set.insert(id) {
                        vertices.push(id);
                    }
                }
                ElementId::Edge(id) => {
                    if !edge_set.insert(id) {
                        continue;
                    }
                    let tail = source.endpoint(element, End::Tail)?.id().raw();
                    let head = source.endpoint(element, End::Head)?.id().raw();
                    for endpoint in [tail, head] {
                        if vertex_set.insert(endpoint) {
                            vertices.push(endpoint);
                        }
                    }
                    edges.push((id, tail, head));
                }
            }
        }
    }

    // Phase 2: copy by value
    let mut target = Graph::with_capacity(vertices.len(), edges.len());
    for id in vertices {
        let element = source
            .vertex(id)
            .ok_or(RouteError::MissingElement(ElementId::Vertex(id)))?;
        target.add_vertex(id, source.properties(element)?.clone())?;
    }
    for (id, tail, head) in edges {
        let element = source
            .edge(id)
            .ok_or(RouteError::MissingElement(ElementId::Edge(id)))?;
        let label = source.label(element)?.unwrap_or_default();
        target.add_edge(id, tail, head, label, source.properties(element)?.clone())?;
    }

    debug!(
        paths = path_count,
        vertices = target.vertex_count(),
        edges = target.edge_count(),
        "subgraph materialized"
    );
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::props;

    fn make_chain(n: u64) -> Graph {
        let mut g = Graph::new();
        for i in 0..n {
            g.add_vertex(i, props([("name", format!("n{}", i))])).unwrap();
        }
        for i in 0..n.saturating_sub(1) {
            g.add_edge(i, i, i + 1, "next", props([("weight", i as i64)]))
                .unwrap();
        }
        g
    }

    fn path_of(g: &Graph, vertices: &[u64], edges: &[u64]) -> Path {
        let mut elements = Vec::new();
        for (i, &v) in vertices.iter().enumerate() {
            elements.push(g.vertex(v).unwrap());
            if let Some(&e) = edges.get(i) {
                elements.push(g.edge(e).unwrap());
            }
        }
        Path::from(elements)
    }

    #[test]
    fn test_single_path() {
        let g = make_chain(4);
        let sub = materialize(&g, vec![Ok(path_of(&g, &[0, 1], &[0]))]).unwrap();
        assert_eq!(sub.vertex_count(), 2);
        assert_eq!(sub.edge_count(), 1);
        let edge = sub.edge(0).unwrap();
        assert_eq!(sub.label(edge).unwrap(), Some("next"));
        assert_eq!(
            sub.property(edge, "weight").unwrap().and_then(|v| v.as_int()),
            Some(0)
        );
        assert_ne!(sub.id(), g.id());
    }

    #[test]
    fn test_overlapping_paths_dedupe() {
        let g = make_chain(4);
        let paths = vec![
            Ok(path_of(&g, &[0, 1, 2], &[0, 1])),
            Ok(path_of(&g, &[1, 2, 3], &[1, 2])),
        ];
        let sub = materialize(&g, paths).unwrap();
        assert_eq!(sub.vertex_count(), 4);
        assert_eq!(sub.edge_count(), 3);
    }

    #[test]
    fn test_edge_only_path_copies_endpoints() {
        let g = make_chain(3);
        let edge = g.edge(1).unwrap();
        let sub = materialize(&g, vec![Ok(Path::from(vec![edge]))]).unwrap();
        assert_eq!(sub.vertex_count(), 2);
        assert!(sub.vertex(1).is_some());
        assert!(sub.vertex(2).is_some());
    }

    #[test]
    fn test_foreign_element_rejected() {
        let g = make_chain(2);
        let other = make_chain(2);
        let path = Path::from(vec![other.vertex(0).unwrap()]);
        assert!(matches!(
            materialize(&g, vec![Ok(path)]),
            Err(RouteError::CrossGraph { .. })
        ));
    }

    #[test]
    fn test_empty() {
        let g = make_chain(2);
        let sub = materialize(&g, Vec::new()).unwrap();
        assert_eq!(sub.vertex_count(), 0);
        assert_eq!(sub.edge_count(), 0);
    }
}
