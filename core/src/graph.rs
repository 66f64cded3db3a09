use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::element::{EdgeId, Element, ElementId, ElementKind, Properties, Value, VertexId};
use crate::error::{Result, RouteError};

/// Interned edge label index (avoids storing duplicate strings per edge).
pub type LabelId = u16;

/// Maximum number of distinct edge labels per graph.
pub const MAX_LABELS: usize = LabelId::MAX as usize + 1;

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a graph. Two graphs never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(u64);

impl GraphId {
    pub(crate) fn new() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

/// Which incident edges a vertex expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    Outgoing,
    Incoming,
    Both,
}

/// An edge endpoint. Edges point from tail to head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    Tail,
    Head,
}

#[derive(Debug, Clone, Default)]
struct VertexRecord {
    properties: Properties,
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    label: LabelId,
    tail: VertexId,
    head: VertexId,
    properties: Properties,
}

/// In-memory property graph: adjacency lists + element records + label interning.
///
/// Edges are indexed in both directions: `outgoing[a]` holds edges whose
/// tail is a, `incoming[b]` edges whose head is b. Enumeration and adjacency
/// both follow insertion order, so two passes over an unchanged graph agree.
pub struct Graph {
    id: GraphId,
    vertices: HashMap<VertexId, VertexRecord>,
    edges: HashMap<EdgeId, EdgeRecord>,
    vertex_order: Vec<VertexId>,
    edge_order: Vec<EdgeId>,
    outgoing: HashMap<VertexId, Vec<EdgeId>>,
    incoming: HashMap<VertexId, Vec<EdgeId>>,
    labels: Vec<String>,
    label_map: HashMap<String, LabelId>,
    /// Next id handed out by `create_*`; `None` once the id space is used up.
    next_vertex_id: Option<VertexId>,
    next_edge_id: Option<EdgeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Pre-allocate for a known graph size.
    pub fn with_capacity(vertex_count: usize, edge_count: usize) -> Self {
        Self {
            id: GraphId::new(),
            vertices: HashMap::with_capacity(vertex_count),
            edges: HashMap::with_capacity(edge_count),
            vertex_order: Vec::with_capacity(vertex_count),
            edge_order: Vec::with_capacity(edge_count),
            outgoing: HashMap::with_capacity(vertex_count),
            incoming: HashMap::with_capacity(vertex_count),
            labels: Vec::new(),
            label_map: HashMap::new(),
            next_vertex_id: Some(0),
            next_edge_id: Some(0),
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Intern a label string, returning its compact ID.
    pub fn intern_label(&mut self, label: &str) -> Result<LabelId> {
        if let Some(&id) = self.label_map.get(label) {
            return Ok(id);
        }
        let id = LabelId::try_from(self.labels.len())
            .map_err(|_| RouteError::LabelOverflow(MAX_LABELS))?;
        self.labels.push(label.to_string());
        self.label_map.insert(label.to_string(), id);
        Ok(id)
    }

    /// Look up an already-interned label.
    pub fn label_id(&self, label: &str) -> Option<LabelId> {
        self.label_map.get(label).copied()
    }

    /// Resolve a LabelId back to its string name.
    pub fn label_name(&self, id: LabelId) -> Option<&str> {
        self.labels.get(id as usize).map(|s| s.as_str())
    }

    /// Add a vertex under an explicit id.
    pub fn add_vertex(&mut self, id: VertexId, properties: Properties) -> Result<Element> {
        if self.vertices.contains_key(&id) {
            return Err(RouteError::DuplicateId(ElementId::Vertex(id)));
        }
        self.vertices.insert(id, VertexRecord { properties });
        self.vertex_order.push(id);
        self.next_vertex_id = next_free(self.next_vertex_id, id);
        Ok(Element::vertex(self.id, id))
    }

    /// Add a vertex under the next free id.
    pub fn create_vertex(&mut self, properties: Properties) -> Result<Element> {
        let id = self
            .next_vertex_id
            .ok_or(RouteError::IdsExhausted(ElementKind::Vertex))?;
        self.add_vertex(id, properties)
    }

    /// Add a directed edge `tail -> head` under an explicit id.
    /// Also inserts into the incoming adjacency list.
    pub fn add_edge(
        &mut self,
        id: EdgeId,
        tail: VertexId,
        head: VertexId,
        label: &str,
        properties: Properties,
    ) -> Result<Element> {
        if self.edges.contains_key(&id) {
            return Err(RouteError::DuplicateId(ElementId::Edge(id)));
        }
        for endpoint in [tail, head] {
            if !self.vertices.contains_key(&endpoint) {
                return Err(RouteError::MissingElement(ElementId::Vertex(endpoint)));
            }
        }
        let label = self.intern_label(label)?;
        self.edges.insert(
            id,
            EdgeRecord {
                label,
                tail,
                head,
                properties,
            },
        );
        self.edge_order.push(id);
        self.outgoing.entry(tail).or_default().push(id);
        self.incoming.entry(head).or_default().push(id);
        self.next_edge_id = next_free(self.next_edge_id, id);
        Ok(Element::edge(self.id, id))
    }

    /// Add a directed edge under the next free id.
    pub fn create_edge(
        &mut self,
        label: &str,
        tail: Element,
        head: Element,
        properties: Properties,
    ) -> Result<Element> {
        let id = self
            .next_edge_id
            .ok_or(RouteError::IdsExhausted(ElementKind::Edge))?;
        let tail = self.owned_vertex(tail)?;
        let head = self.owned_vertex(head)?;
        self.add_edge(id, tail, head, label, properties)
    }

    /// All vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = Element> + '_ {
        let graph = self.id;
        self.vertex_order
            .iter()
            .map(move |&id| Element::vertex(graph, id))
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = Element> + '_ {
        let graph = self.id;
        self.edge_order.iter().map(move |&id| Element::edge(graph, id))
    }

    pub fn vertex(&self, id: VertexId) -> Option<Element> {
        self.vertices
            .contains_key(&id)
            .then(|| Element::vertex(self.id, id))
    }

    pub fn edge(&self, id: EdgeId) -> Option<Element> {
        self.edges
            .contains_key(&id)
            .then(|| Element::edge(self.id, id))
    }

    /// Whether `element` is owned by this graph and still present.
    pub fn contains(&self, element: Element) -> bool {
        element.graph() == self.id
            && match element.id() {
                ElementId::Vertex(id) => self.vertices.contains_key(&id),
                ElementId::Edge(id) => self.edges.contains_key(&id),
            }
    }

    /// Fail with `CrossGraph` unless `element` belongs to this graph.
    pub fn check_owned(&self, element: Element) -> Result<()> {
        if element.graph() != self.id {
            return Err(RouteError::CrossGraph {
                expected: self.id,
                found: element.graph(),
            });
        }
        Ok(())
    }

    fn owned_vertex(&self, element: Element) -> Result<VertexId> {
        self.check_owned(element)?;
        element.as_vertex().ok_or(RouteError::KindMismatch {
            stage: "create_edge",
            expected: ElementKind::Vertex.name(),
            found: element.id(),
        })
    }

    pub fn properties(&self, element: Element) -> Result<&Properties> {
        self.check_owned(element)?;
        let found = match element.id() {
            ElementId::Vertex(id) => self.vertices.get(&id).map(|v| &v.properties),
            ElementId::Edge(id) => self.edges.get(&id).map(|e| &e.properties),
        };
        found.ok_or(RouteError::MissingElement(element.id()))
    }

    pub fn property(&self, element: Element, key: &str) -> Result<Option<&Value>> {
        Ok(self.properties(element)?.get(key))
    }

    /// Edge label. Vertices carry no label and yield `None`.
    pub fn label(&self, element: Element) -> Result<Option<&str>> {
        self.check_owned(element)?;
        match element.id() {
            ElementId::Vertex(_) => Ok(None),
            ElementId::Edge(id) => {
                let record = self.edge_record(id)?;
                Ok(self.label_name(record.label))
            }
        }
    }

    pub(crate) fn edge_label_id(&self, id: EdgeId) -> Result<LabelId> {
        Ok(self.edge_record(id)?.label)
    }

    fn edge_record(&self, id: EdgeId) -> Result<&EdgeRecord> {
        self.edges
            .get(&id)
            .ok_or(RouteError::MissingElement(ElementId::Edge(id)))
    }

    /// The tail or head vertex of an edge.
    pub fn endpoint(&self, edge: Element, end: End) -> Result<Element> {
        self.check_owned(edge)?;
        let id = edge.as_edge().ok_or(RouteError::KindMismatch {
            stage: "endpoint",
            expected: ElementKind::Edge.name(),
            found: edge.id(),
        })?;
        let record = self.edge_record(id)?;
        let vertex = match end {
            End::Tail => record.tail,
            End::Head => record.head,
        };
        Ok(Element::vertex(self.id, vertex))
    }

    /// Get outgoing edge ids for a vertex.
    pub(crate) fn edges_out(&self, id: VertexId) -> &[EdgeId] {
        self.outgoing.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get incoming edge ids for a vertex.
    pub(crate) fn edges_in(&self, id: VertexId) -> &[EdgeId] {
        self.incoming.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Raw adjacency for one vertex: outgoing first, then incoming for `Both`.
    pub(crate) fn adjacency(
        &self,
        vertex: Element,
        direction: TraversalDirection,
    ) -> Result<std::iter::Chain<std::slice::Iter<'_, EdgeId>, std::slice::Iter<'_, EdgeId>>> {
        self.check_owned(vertex)?;
        let id = vertex.as_vertex().ok_or(RouteError::KindMismatch {
            stage: "incident_edges",
            expected: ElementKind::Vertex.name(),
            found: vertex.id(),
        })?;
        if !self.vertices.contains_key(&id) {
            return Err(RouteError::MissingElement(vertex.id()));
        }
        let (out, inc): (&[EdgeId], &[EdgeId]) = match direction {
            TraversalDirection::Outgoing => (self.edges_out(id), &[]),
            TraversalDirection::Incoming => (self.edges_in(id), &[]),
            TraversalDirection::Both => (self.edges_out(id), self.edges_in(id)),
        };
        Ok(out.iter().chain(inc.iter()))
    }

    /// Incident edges of a vertex, optionally restricted to some labels.
    /// An empty `labels` slice means every label.
    pub fn incident_edges<'a>(
        &'a self,
        vertex: Element,
        direction: TraversalDirection,
        labels: &[&str],
    ) -> Result<impl Iterator<Item = Element> + 'a> {
        let wanted: Option<Vec<LabelId>> = if labels.is_empty() {
            None
        } else {
            Some(labels.iter().filter_map(|l| self.label_id(l)).collect())
        };
        let graph = self.id;
        Ok(self
            .adjacency(vertex, direction)?
            .filter(move |&&id| match &wanted {
                None => true,
                Some(w) => self
                    .edges
                    .get(&id)
                    .is_some_and(|record| w.contains(&record.label)),
            })
            .map(move |&id| Element::edge(graph, id)))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let vertex_mem = self.vertices.len() * (size_of::<VertexId>() * 2 + size_of::<VertexRecord>());
        let edge_mem = self.edges.len() * (size_of::<EdgeId>() * 2 + size_of::<EdgeRecord>());
        let out_edges: usize = self.outgoing.values().map(|v| v.len() * size_of::<EdgeId>()).sum();
        let in_edges: usize = self.incoming.values().map(|v| v.len() * size_of::<EdgeId>()).sum();
        let property_mem: usize = self
            .vertices
            .values()
            .map(|v| v.properties.len())
            .chain(self.edges.values().map(|e| e.properties.len()))
            .sum::<usize>()
            * 64;

        vertex_mem + edge_mem + out_edges + in_edges + property_mem
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("vertices", &self.vertices.len())
            .field("edges", &self.edges.len())
            .finish()
    }
}

/// The allocation cursor after `taken` was inserted. Ids past `u64::MAX` do not exist.
fn next_free(cursor: Option<u64>, taken: u64) -> Option<u64> {
    let after = taken.checked_add(1)?;
    cursor.map(|c| c.max(after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::props;

    fn make_chain(n: u64) -> Graph {
        let mut g = Graph::new();
        for i in 0..n {
            g.add_vertex(i, Properties::new()).unwrap();
        }
        for i in 0..n - 1 {
            g.add_edge(i, i, i + 1, "NEXT", Properties::new()).unwrap();
        }
        g
    }

    fn make_star(leaves: u64) -> Graph {
        let mut g = Graph::new();
        g.add_vertex(0, props([("kind", "hub")])).unwrap();
        for i in 1..=leaves {
            g.add_vertex(i, props([("kind", "leaf")])).unwrap();
            g.add_edge(i, 0, i, "HAS", Properties::new()).unwrap();
        }
        g
    }

    #[test]
    fn test_graph_counts() {
        let g = make_star(50);
        assert_eq!(g.vertex_count(), 51);
        assert_eq!(g.edge_count(), 50);
    }

    #[test]
    fn test_graph_ids_unique() {
        assert_ne!(Graph::new().id(), Graph::new().id());
    }

    #[test]
    fn test_enumeration_insertion_order() {
        let mut g = Graph::new();
        for id in [5, 1, 3] {
            g.add_vertex(id, Properties::new()).unwrap();
        }
        let ids: Vec<_> = g.vertices().map(|v| v.as_vertex().unwrap()).collect();
        assert_eq!(ids, vec![5, 1, 3]);
    }

    #[test]
    fn test_duplicate_vertex_rejected() {
        let mut g = Graph::new();
        g.add_vertex(1, Properties::new()).unwrap();
        assert_eq!(
            g.add_vertex(1, Properties::new()),
            Err(RouteError::DuplicateId(ElementId::Vertex(1)))
        );
    }

    #[test]
    fn test_edge_requires_endpoints() {
        let mut g = Graph::new();
        g.add_vertex(0, Properties::new()).unwrap();
        assert_eq!(
            g.add_edge(0, 0, 9, "X", Properties::new()),
            Err(RouteError::MissingElement(ElementId::Vertex(9)))
        );
    }

    #[test]
    fn test_create_allocates_past_explicit_ids() {
        let mut g = Graph::new();
        g.add_vertex(7, Properties::new()).unwrap();
        let v = g.create_vertex(Properties::new()).unwrap();
        assert_eq!(v.as_vertex(), Some(8));
        let w = g.vertex(7).unwrap();
        let e = g.create_edge("LINK", w, v, Properties::new()).unwrap();
        assert_eq!(g.endpoint(e, End::Tail).unwrap(), w);
        assert_eq!(g.endpoint(e, End::Head).unwrap(), v);
    }

    #[test]
    fn test_create_after_max_id() {
        let mut g = Graph::new();
        g.add_vertex(u64::MAX - 1, Properties::new()).unwrap();
        let last = g.create_vertex(Properties::new()).unwrap();
        assert_eq!(last.as_vertex(), Some(u64::MAX));
        assert_eq!(
            g.create_vertex(Properties::new()),
            Err(RouteError::IdsExhausted(ElementKind::Vertex))
        );
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.vertices().count(), 2);

        let tail = g.vertex(u64::MAX - 1).unwrap();
        g.add_edge(u64::MAX, u64::MAX - 1, u64::MAX, "LINK", Properties::new())
            .unwrap();
        assert_eq!(
            g.create_edge("LINK", tail, last, Properties::new()),
            Err(RouteError::IdsExhausted(ElementKind::Edge))
        );
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_explicit_ids_below_cursor_keep_it() {
        let mut g = Graph::new();
        g.add_vertex(u64::MAX, Properties::new()).unwrap();
        g.add_vertex(3, Properties::new()).unwrap();
        assert!(matches!(
            g.create_vertex(Properties::new()),
            Err(RouteError::IdsExhausted(ElementKind::Vertex))
        ));
        assert_eq!(g.vertices().count(), g.vertex_count());
    }

    #[test]
    fn test_label_interning() {
        let mut g = Graph::new();
        let a = g.intern_label("IMPLIES").unwrap();
        let b = g.intern_label("IMPLIES").unwrap();
        assert_eq!(a, b);
        assert_eq!(g.label_name(a), Some("IMPLIES"));
        assert_eq!(g.label_name(999), None);
    }

    #[test]
    fn test_label_overflow() {
        let mut g = Graph::new();
        for i in 0..MAX_LABELS {
            g.intern_label(&format!("REL_{}", i)).unwrap();
        }
        assert_eq!(
            g.intern_label("one_too_many"),
            Err(RouteError::LabelOverflow(MAX_LABELS))
        );
    }

    #[test]
    fn test_incident_edges_directions() {
        let g = make_chain(3);
        let middle = g.vertex(1).unwrap();
        let out: Vec<_> = g
            .incident_edges(middle, TraversalDirection::Outgoing, &[])
            .unwrap()
            .collect();
        assert_eq!(out, vec![g.edge(1).unwrap()]);
        let inc: Vec<_> = g
            .incident_edges(middle, TraversalDirection::Incoming, &[])
            .unwrap()
            .collect();
        assert_eq!(inc, vec![g.edge(0).unwrap()]);
        let both: Vec<_> = g
            .incident_edges(middle, TraversalDirection::Both, &[])
            .unwrap()
            .collect();
        assert_eq!(both, vec![g.edge(1).unwrap(), g.edge(0).unwrap()]);
    }

    #[test]
    fn test_incident_edges_label_filter() {
        let mut g = make_chain(2);
        g.add_edge(10, 0, 1, "OTHER", Properties::new()).unwrap();
        let v0 = g.vertex(0).unwrap();
        let only: Vec<_> = g
            .incident_edges(v0, TraversalDirection::Outgoing, &["OTHER"])
            .unwrap()
            .collect();
        assert_eq!(only, vec![g.edge(10).unwrap()]);
        let none = g
            .incident_edges(v0, TraversalDirection::Outgoing, &["MISSING"])
            .unwrap()
            .count();
        assert_eq!(none, 0);
    }

    #[test]
    fn test_cross_graph_property_lookup() {
        let g = make_chain(2);
        let other = make_chain(2);
        let foreign = other.vertex(0).unwrap();
        assert!(matches!(
            g.properties(foreign),
            Err(RouteError::CrossGraph { .. })
        ));
        assert!(!g.contains(foreign));
    }

    #[test]
    fn test_label_lookup() {
        let g = make_chain(2);
        assert_eq!(g.label(g.edge(0).unwrap()).unwrap(), Some("NEXT"));
        assert_eq!(g.label(g.vertex(0).unwrap()).unwrap(), None);
    }

    #[test]
    fn test_endpoint_on_vertex_is_kind_mismatch() {
        let g = make_chain(2);
        assert!(matches!(
            g.endpoint(g.vertex(0).unwrap(), End::Head),
            Err(RouteError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_memory_usage_nonzero() {
        let g = make_star(100);
        assert!(g.memory_usage() > 0);
    }
}
