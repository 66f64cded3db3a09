use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::GraphId;

/// Graph-scoped vertex identifier.
pub type VertexId = u64;

/// Graph-scoped edge identifier.
pub type EdgeId = u64;

/// Identity of a vertex or edge within its owning graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementId {
    Vertex(VertexId),
    Edge(EdgeId),
}

impl ElementId {
    /// The numeric id without its kind.
    pub fn raw(self) -> u64 {
        match self {
            ElementId::Vertex(id) | ElementId::Edge(id) => id,
        }
    }

    pub fn kind(self) -> ElementKind {
        match self {
            ElementId::Vertex(_) => ElementKind::Vertex,
            ElementId::Edge(_) => ElementKind::Edge,
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Vertex(id) => write!(f, "v[{}]", id),
            ElementId::Edge(id) => write!(f, "e[{}]", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Vertex,
    Edge,
}

impl ElementKind {
    pub const fn name(self) -> &'static str {
        match self {
            ElementKind::Vertex => "vertex",
            ElementKind::Edge => "edge",
        }
    }
}

/// A copyable handle to a vertex or edge, tagged with its owning graph.
///
/// Two handles are equal only if they name the same id in the same graph,
/// which is what uniqueness and `except` compare on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element {
    graph: GraphId,
    id: ElementId,
}

impl Element {
    pub(crate) fn vertex(graph: GraphId, id: VertexId) -> Self {
        Self {
            graph,
            id: ElementId::Vertex(id),
        }
    }

    pub(crate) fn edge(graph: GraphId, id: EdgeId) -> Self {
        Self {
            graph,
            id: ElementId::Edge(id),
        }
    }

    pub fn graph(&self) -> GraphId {
        self.graph
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.id.kind()
    }

    pub fn is_vertex(&self) -> bool {
        matches!(self.id, ElementId::Vertex(_))
    }

    pub fn is_edge(&self) -> bool {
        matches!(self.id, ElementId::Edge(_))
    }

    pub fn as_vertex(&self) -> Option<VertexId> {
        match self.id {
            ElementId::Vertex(id) => Some(id),
            ElementId::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<EdgeId> {
        match self.id {
            ElementId::Edge(id) => Some(id),
            ElementId::Vertex(_) => None,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

/// A property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

/// Property bag. Keys are unique and iterate in sorted order.
pub type Properties = BTreeMap<String, Value>;

/// Build a property bag from key/value pairs.
pub fn props<K, V, I>(pairs: I) -> Properties
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_identity_includes_graph() {
        let a = Element::vertex(GraphId::new(), 1);
        let b = Element::vertex(GraphId::new(), 1);
        assert_ne!(a, b);
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_vertex_and_edge_ids_distinct() {
        let g = GraphId::new();
        assert_ne!(Element::vertex(g, 3), Element::edge(g, 3));
        assert_eq!(Element::edge(g, 3).as_edge(), Some(3));
        assert_eq!(Element::edge(g, 3).as_vertex(), None);
    }

    #[test]
    fn test_value_json_untagged() {
        let bag: Properties = serde_json::from_str(r#"{"name":"pacer","stars":12,"alive":true}"#)
            .unwrap();
        assert_eq!(bag["name"], Value::from("pacer"));
        assert_eq!(bag["stars"], Value::Int(12));
        assert_eq!(bag["alive"], Value::Bool(true));
    }

    #[test]
    fn test_props_helper() {
        let p = props([("type", "person"), ("name", "okram")]);
        assert_eq!(p.len(), 2);
        assert_eq!(p["type"].as_str(), Some("person"));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ElementId::Vertex(4).to_string(), "v[4]");
        assert_eq!(ElementId::Edge(13).to_string(), "e[13]");
    }
}
