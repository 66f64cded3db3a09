use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::element::{Element, ElementKind, Properties};
use crate::error::Result;
use crate::graph::Graph;
use crate::pipe::{BoxedPipe, Pipe, Traverser, Visit};

/// Boolean test over the element being visited.
pub type Predicate = Arc<dyn Fn(&Visit<'_>) -> bool>;

/// A filter stage: conjunctive property equality, or an arbitrary predicate.
#[derive(Clone)]
pub enum Filter {
    /// Every key must be present with an equal value; extra keys are ignored.
    Properties(Properties),
    Predicate(Predicate),
}

impl Filter {
    pub fn matches(&self, visit: &Visit<'_>) -> bool {
        match self {
            Filter::Properties(wanted) => wanted
                .iter()
                .all(|(key, value)| visit.property(key) == Some(value)),
            Filter::Predicate(f) => f(visit),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Properties(p) => f.debug_tuple("Properties").field(p).finish(),
            Filter::Predicate(_) => f.write_str("Predicate(&block)"),
        }
    }
}

/// `[key="value", ...]`
pub(crate) fn describe_properties(properties: &Properties) -> String {
    let pairs: Vec<String> = properties
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    format!("[{}]", pairs.join(", "))
}

pub(crate) struct FilterPipe<'g> {
    upstream: BoxedPipe<'g>,
    graph: &'g Graph,
    filter: Filter,
}

impl<'g> FilterPipe<'g> {
    pub(crate) fn new(upstream: BoxedPipe<'g>, graph: &'g Graph, filter: Filter) -> Self {
        Self {
            upstream,
            graph,
            filter,
        }
    }
}

impl Pipe for FilterPipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        while let Some(t) = self.upstream.pull()? {
            if self.filter.matches(&Visit::new(self.graph, &t)) {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }
}

/// Passes only vertices or only edges.
pub(crate) struct KindPipe<'g> {
    upstream: BoxedPipe<'g>,
    kind: ElementKind,
}

impl<'g> KindPipe<'g> {
    pub(crate) fn new(upstream: BoxedPipe<'g>, kind: ElementKind) -> Self {
        Self { upstream, kind }
    }
}

impl Pipe for KindPipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        while let Some(t) = self.upstream.pull()? {
            if t.element().kind() == self.kind {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }
}

/// Drops elements equal to the element bound to `name` on their own path.
pub(crate) struct ExceptPipe<'g> {
    upstream: BoxedPipe<'g>,
    name: Arc<str>,
}

impl<'g> ExceptPipe<'g> {
    pub(crate) fn new(upstream: BoxedPipe<'g>, name: Arc<str>) -> Self {
        Self { upstream, name }
    }
}

impl Pipe for ExceptPipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        while let Some(t) = self.upstream.pull()? {
            if t.var(&self.name)? != t.element() {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }
}

/// First occurrence of each element identity, in arrival order.
pub(crate) struct UniquePipe<'g> {
    upstream: BoxedPipe<'g>,
    seen: HashSet<Element>,
}

impl<'g> UniquePipe<'g> {
    pub(crate) fn new(upstream: BoxedPipe<'g>) -> Self {
        Self {
            upstream,
            seen: HashSet::new(),
        }
    }
}

impl Pipe for UniquePipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        while let Some(t) = self.upstream.pull()? {
            if self.seen.insert(t.element()) {
                return Ok(Some(t));
            }
        }
        Ok(None)
    }
}
