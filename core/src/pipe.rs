//! Pull-based execution of a route specification.
//!
//! Each stage of a [`Route`] becomes one [`Pipe`] that owns its upstream.
//! Calling `pull()` on the terminal pipe recursively pulls upstream until it
//! can yield one [`Traverser`] or report exhaustion; nothing runs between
//! calls.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace, warn};

use crate::config::RouteConfig;
use crate::element::{Element, ElementId, Properties, Value};
use crate::error::Result;
use crate::graph::{End, Graph, TraversalDirection};
use crate::path::Path;
use crate::route::{MapFn, Route, RouteNode, Stage};

/// One element in flight, carrying the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traverser {
    element: Element,
    path: Path,
    branch: Option<usize>,
}

impl Traverser {
    pub(crate) fn root(element: Element) -> Self {
        Self {
            element,
            path: Path::start(element),
            branch: None,
        }
    }

    /// Advance to `element`, extending the path by one slot.
    pub(crate) fn step(&self, element: Element) -> Self {
        let mut path = self.path.clone();
        path.push(element);
        Self {
            element,
            path,
            branch: self.branch,
        }
    }

    pub(crate) fn bind(&mut self, name: &Arc<str>) {
        self.path.bind(Arc::clone(name));
    }

    pub(crate) fn set_branch(&mut self, branch: Option<usize>) {
        self.branch = branch;
    }

    pub fn element(&self) -> Element {
        self.element
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> Path {
        self.path
    }

    /// Index of the branch that produced this element, when the last merge
    /// kept branch origins.
    pub fn branch(&self) -> Option<usize> {
        self.branch
    }

    /// The element bound to `name` on this traverser's path.
    pub fn var(&self, name: &str) -> Result<Element> {
        self.path.var(name)
    }
}

/// Read-only view of the element a predicate, split policy or map is looking at.
pub struct Visit<'a> {
    graph: &'a Graph,
    traverser: &'a Traverser,
}

impl<'a> Visit<'a> {
    pub(crate) fn new(graph: &'a Graph, traverser: &'a Traverser) -> Self {
        Self { graph, traverser }
    }

    pub fn element(&self) -> Element {
        self.traverser.element
    }

    pub fn id(&self) -> ElementId {
        self.traverser.element.id()
    }

    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    pub fn path(&self) -> &'a Path {
        &self.traverser.path
    }

    pub fn branch(&self) -> Option<usize> {
        self.traverser.branch
    }

    pub fn property(&self, key: &str) -> Option<&'a Value> {
        self.graph.property(self.element(), key).ok().flatten()
    }

    pub fn properties(&self) -> Option<&'a Properties> {
        self.graph.properties(self.element()).ok()
    }

    /// Edge label; `None` for vertices.
    pub fn label(&self) -> Option<&'a str> {
        self.graph.label(self.element()).ok().flatten()
    }

    pub fn var(&self, name: &str) -> Result<Element> {
        self.traverser.var(name)
    }

    pub fn endpoint(&self, end: End) -> Result<Element> {
        self.graph.endpoint(self.element(), end)
    }

    /// Number of incident edges in `direction`. Zero for edges.
    pub fn degree(&self, direction: TraversalDirection) -> usize {
        self.graph
            .adjacency(self.element(), direction)
            .map(|edges| edges.count())
            .unwrap_or(0)
    }
}

/// A single execution stage.
pub(crate) trait Pipe {
    /// Produce the next traverser, `Ok(None)` once exhausted.
    fn pull(&mut self) -> Result<Option<Traverser>>;
}

pub(crate) type BoxedPipe<'g> = Box<dyn Pipe + 'g>;

/// State shared while turning one specification into pipes.
pub(crate) struct BuildContext<'g> {
    pub(crate) graph: &'g Graph,
    pub(crate) config: Arc<RouteConfig>,
    samplers: u64,
}

impl<'g> BuildContext<'g> {
    fn new(graph: &'g Graph, config: Arc<RouteConfig>) -> Self {
        Self {
            graph,
            config,
            samplers: 0,
        }
    }

    /// A fresh generator per sampling stage; seeded ones stay reproducible.
    pub(crate) fn rng(&mut self) -> StdRng {
        let index = self.samplers;
        self.samplers += 1;
        match self.config.sample_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index)),
            None => StdRng::from_entropy(),
        }
    }
}

/// Build the pipe chain for `node`. `start` feeds the `Start` stage of a
/// branch sub-pipeline and is consumed by it.
pub(crate) fn build<'g>(
    node: &RouteNode,
    ctx: &mut BuildContext<'g>,
    start: &mut Option<BoxedPipe<'g>>,
) -> BoxedPipe<'g> {
    let upstream = node.upstream.as_ref().map(|up| build(up, ctx, start));
    let graph = ctx.graph;

    match &node.stage {
        Stage::Vertices => Box::new(SourcePipe::new(Box::new(graph.vertices()))),
        Stage::Edges => Box::new(SourcePipe::new(Box::new(graph.edges()))),
        Stage::Start { .. } => start.take().unwrap_or_else(|| Box::new(EmptyPipe)),
        stage => {
            let upstream = upstream.unwrap_or_else(|| Box::new(EmptyPipe));
            match stage {
                Stage::Filter(filter) => {
                    Box::new(crate::filter::FilterPipe::new(upstream, graph, filter.clone()))
                }
                Stage::Kind(kind) => Box::new(crate::filter::KindPipe::new(upstream, *kind)),
                Stage::Except(name) => {
                    Box::new(crate::filter::ExceptPipe::new(upstream, Arc::clone(name)))
                }
                Stage::Unique => Box::new(crate::filter::UniquePipe::new(upstream)),
                Stage::Expand(expand) => expand.pipe(upstream, graph),
                Stage::Bind(name) => Box::new(BindPipe {
                    upstream,
                    name: Arc::clone(name),
                }),
                Stage::Branch(spec) => spec.pipe(upstream, ctx),
                Stage::Sample(sample) => sample.pipe(upstream, ctx.rng()),
                Stage::At(index) => Box::new(AtPipe {
                    upstream,
                    index: *index,
                    position: 0,
                    done: false,
                }),
                Stage::Map(f) => Box::new(MapPipe {
                    upstream,
                    graph,
                    f: Arc::clone(f),
                }),
                Stage::Vertices | Stage::Edges | Stage::Start { .. } => upstream,
            }
        }
    }
}

/// Execution state of one pass over a route. Not restartable: call
/// [`Route::iter`] again for a fresh pass.
pub struct Traversal<'g> {
    pipe: BoxedPipe<'g>,
    exhausted: bool,
}

impl<'g> Traversal<'g> {
    pub(crate) fn new(route: &Route<'g>) -> Self {
        let config = Arc::clone(route.config());
        if config.log_routes {
            debug!(route = %route, "building traversal");
        }
        let mut ctx = BuildContext::new(route.graph(), config);
        let pipe = build(route.node(), &mut ctx, &mut None);
        Self {
            pipe,
            exhausted: false,
        }
    }

    /// Pull the next traverser. Keeps returning `Ok(None)` once exhausted.
    pub fn pull(&mut self) -> Result<Option<Traverser>> {
        if self.exhausted {
            return Ok(None);
        }
        match self.pipe.pull() {
            Ok(None) => {
                trace!("traversal exhausted");
                self.exhausted = true;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "route pull failed");
                Err(e)
            }
            found => found,
        }
    }
}

impl Iterator for Traversal<'_> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pull().map(|t| t.map(|t| t.element)).transpose()
    }
}

impl std::iter::FusedIterator for Traversal<'_> {}

/// Direct enumeration of graph vertices or edges.
struct SourcePipe<'g> {
    elements: Box<dyn Iterator<Item = Element> + 'g>,
}

impl<'g> SourcePipe<'g> {
    fn new(elements: Box<dyn Iterator<Item = Element> + 'g>) -> Self {
        Self { elements }
    }
}

impl Pipe for SourcePipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        Ok(self.elements.next().map(Traverser::root))
    }
}

/// A start reference that was never attached to a branch.
struct EmptyPipe;

impl Pipe for EmptyPipe {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        Ok(None)
    }
}

struct BindPipe<'g> {
    upstream: BoxedPipe<'g>,
    name: Arc<str>,
}

impl Pipe for BindPipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        Ok(self.upstream.pull()?.map(|mut t| {
            t.bind(&self.name);
            t
        }))
    }
}

/// Keeps only the element at one position of the upstream sequence.
struct AtPipe<'g> {
    upstream: BoxedPipe<'g>,
    index: usize,
    position: usize,
    done: bool,
}

impl Pipe for AtPipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        while !self.done {
            let Some(t) = self.upstream.pull()? else {
                self.done = true;
                break;
            };
            let position = self.position;
            self.position += 1;
            if position == self.index {
                self.done = true;
                return Ok(Some(t));
            }
        }
        Ok(None)
    }
}

/// Transforms each element into another element of the same graph.
struct MapPipe<'g> {
    upstream: BoxedPipe<'g>,
    graph: &'g Graph,
    f: MapFn,
}

impl Pipe for MapPipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        let Some(t) = self.upstream.pull()? else {
            return Ok(None);
        };
        let mapped = (self.f)(&Visit::new(self.graph, &t))?;
        self.graph.check_owned(mapped)?;
        Ok(Some(t.step(mapped)))
    }
}
