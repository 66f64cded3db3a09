use std::iter::Chain;
use std::slice;

use crate::element::{EdgeId, Element, ElementKind};
use crate::error::{Result, RouteError};
use crate::filter::Predicate;
use crate::graph::{End, Graph, LabelId, TraversalDirection};
use crate::pipe::{BoxedPipe, Pipe, Traverser, Visit};

/// Which endpoint(s) an edge expands to. `Out` is the tail, `In` the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VertexEnd {
    Out,
    In,
    Both,
}

/// A traversal stage specification.
#[derive(Clone)]
pub(crate) enum Expand {
    Edges {
        direction: TraversalDirection,
        labels: Vec<String>,
        filter: Option<Predicate>,
    },
    Vertices(VertexEnd),
}

impl Expand {
    pub(crate) fn stage_name(&self) -> &'static str {
        match self {
            Expand::Edges { direction, .. } => match direction {
                TraversalDirection::Outgoing => "out_edges",
                TraversalDirection::Incoming => "in_edges",
                TraversalDirection::Both => "both_edges",
            },
            Expand::Vertices(end) => match end {
                VertexEnd::Out => "out_vertex",
                VertexEnd::In => "in_vertex",
                VertexEnd::Both => "both_vertices",
            },
        }
    }

    /// Display arguments, e.g. `OUT_EDGES, [wrote], &block`.
    pub(crate) fn describe_args(&self) -> Vec<String> {
        match self {
            Expand::Edges {
                direction,
                labels,
                filter,
            } => {
                let mut args = vec![match direction {
                    TraversalDirection::Outgoing => "OUT_EDGES".to_string(),
                    TraversalDirection::Incoming => "IN_EDGES".to_string(),
                    TraversalDirection::Both => "BOTH_EDGES".to_string(),
                }];
                if !labels.is_empty() {
                    args.push(format!("[{}]", labels.join(", ")));
                }
                if filter.is_some() {
                    args.push("&block".to_string());
                }
                args
            }
            Expand::Vertices(end) => vec![match end {
                VertexEnd::Out => "OUT_VERTEX".to_string(),
                VertexEnd::In => "IN_VERTEX".to_string(),
                VertexEnd::Both => "BOTH_VERTICES".to_string(),
            }],
        }
    }

    pub(crate) fn pipe<'g>(&self, upstream: BoxedPipe<'g>, graph: &'g Graph) -> BoxedPipe<'g> {
        match self {
            Expand::Edges {
                direction,
                labels,
                filter,
            } => {
                // Labels unknown to the graph can never match.
                let labels = if labels.is_empty() {
                    LabelMatch::Any
                } else {
                    LabelMatch::Only(labels.iter().filter_map(|l| graph.label_id(l)).collect())
                };
                Box::new(EdgesPipe {
                    upstream,
                    graph,
                    stage: self.stage_name(),
                    direction: *direction,
                    labels,
                    filter: filter.clone(),
                    current: None,
                })
            }
            Expand::Vertices(end) => Box::new(VerticesPipe {
                upstream,
                graph,
                stage: self.stage_name(),
                end: *end,
                pending: None,
            }),
        }
    }
}

enum LabelMatch {
    Any,
    Only(Vec<LabelId>),
}

type Adjacency<'g> = Chain<slice::Iter<'g, EdgeId>, slice::Iter<'g, EdgeId>>;

/// Vertex → incident edges, walked lazily one adjacency slot per pull.
struct EdgesPipe<'g> {
    upstream: BoxedPipe<'g>,
    graph: &'g Graph,
    stage: &'static str,
    direction: TraversalDirection,
    labels: LabelMatch,
    filter: Option<Predicate>,
    current: Option<(Traverser, Adjacency<'g>)>,
}

impl Pipe for EdgesPipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        loop {
            if let Some((source, edges)) = self.current.as_mut() {
                for &id in edges.by_ref() {
                    if let LabelMatch::Only(wanted) = &self.labels {
                        if !wanted.contains(&self.graph.edge_label_id(id)?) {
                            continue;
                        }
                    }
                    let next = source.step(Element::edge(self.graph.id(), id));
                    if let Some(f) = &self.filter {
                        if !f(&Visit::new(self.graph, &next)) {
                            continue;
                        }
                    }
                    return Ok(Some(next));
                }
                self.current = None;
            }

            let Some(source) = self.upstream.pull()? else {
                return Ok(None);
            };
            let element = source.element();
            self.graph.check_owned(element)?;
            if !element.is_vertex() {
                return Err(RouteError::KindMismatch {
                    stage: self.stage,
                    expected: ElementKind::Vertex.name(),
                    found: element.id(),
                });
            }
            let edges = self.graph.adjacency(element, self.direction)?;
            self.current = Some((source, edges));
        }
    }
}

/// Edge → endpoint vertex (or both endpoints, tail first).
struct VerticesPipe<'g> {
    upstream: BoxedPipe<'g>,
    graph: &'g Graph,
    stage: &'static str,
    end: VertexEnd,
    pending: Option<Traverser>,
}

impl Pipe for VerticesPipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        if let Some(head) = self.pending.take() {
            return Ok(Some(head));
        }
        let Some(source) = self.upstream.pull()? else {
            return Ok(None);
        };
        let edge = source.element();
        self.graph.check_owned(edge)?;
        if !edge.is_edge() {
            return Err(RouteError::KindMismatch {
                stage: self.stage,
                expected: ElementKind::Edge.name(),
                found: edge.id(),
            });
        }
        let next = match self.end {
            VertexEnd::Out => source.step(self.graph.endpoint(edge, End::Tail)?),
            VertexEnd::In => source.step(self.graph.endpoint(edge, End::Head)?),
            VertexEnd::Both => {
                let tail = self.graph.endpoint(edge, End::Tail)?;
                let head = self.graph.endpoint(edge, End::Head)?;
                self.pending = Some(source.step(head));
                source.step(tail)
            }
        };
        Ok(Some(next))
    }
}
