use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::branch::{BranchSpec, ExclusiveSplit, MergePolicy, SplitPolicy};
use crate::config::RouteConfig;
use crate::element::{Element, ElementId, ElementKind, Properties, Value};
use crate::error::{Result, RouteError};
use crate::expand::{Expand, VertexEnd};
use crate::filter::{describe_properties, Filter, Predicate};
use crate::graph::{Graph, TraversalDirection};
use crate::path::PathsRoute;
use crate::pipe::{Traversal, Visit};
use crate::sample::Sample;

/// Element transformation used by [`Route::map`].
pub type MapFn = Arc<dyn Fn(&Visit<'_>) -> Result<Element>>;

/// What a route yields, judged from its last element-producing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Vertices,
    Edges,
    Mixed,
}

impl RouteKind {
    fn of(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Vertex => RouteKind::Vertices,
            ElementKind::Edge => RouteKind::Edges,
        }
    }

    fn name(self) -> &'static str {
        match self {
            RouteKind::Vertices => "Vertices",
            RouteKind::Edges => "Edges",
            RouteKind::Mixed => "Elements",
        }
    }

    fn short(self) -> &'static str {
        match self {
            RouteKind::Vertices => "V",
            RouteKind::Edges => "E",
            RouteKind::Mixed => "*",
        }
    }
}

pub(crate) enum Stage {
    Vertices,
    Edges,
    /// Entry point of a branch sub-pipeline. Carries what the branch
    /// inherits from the upstream it splits.
    Start {
        kind: RouteKind,
        inherited: Arc<[Arc<str>]>,
    },
    Filter(Filter),
    Kind(ElementKind),
    Expand(Expand),
    Bind(Arc<str>),
    Except(Arc<str>),
    Branch(BranchSpec),
    Unique,
    Sample(Sample),
    At(usize),
    Map(MapFn),
}

/// One stage plus the (shared, immutable) route it wraps.
pub(crate) struct RouteNode {
    pub(crate) stage: Stage,
    pub(crate) upstream: Option<Arc<RouteNode>>,
}

impl RouteNode {
    fn root(stage: Stage) -> Arc<Self> {
        Arc::new(Self {
            stage,
            upstream: None,
        })
    }

    /// Nodes from the root source to this one.
    fn chain(&self) -> Vec<&RouteNode> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(up) = current.upstream.as_deref() {
            chain.push(up);
            current = up;
        }
        chain.reverse();
        chain
    }

    fn root_node(self: &Arc<Self>) -> &Arc<RouteNode> {
        let mut current = self;
        while let Some(up) = current.upstream.as_ref() {
            current = up;
        }
        current
    }

    fn kind(&self) -> RouteKind {
        match &self.stage {
            Stage::Vertices => RouteKind::Vertices,
            Stage::Edges => RouteKind::Edges,
            Stage::Start { kind, .. } => *kind,
            Stage::Kind(kind) => RouteKind::of(*kind),
            Stage::Expand(Expand::Edges { .. }) => RouteKind::Edges,
            Stage::Expand(Expand::Vertices(_)) => RouteKind::Vertices,
            Stage::Map(_) => RouteKind::Mixed,
            Stage::Branch(spec) => {
                let mut kinds = spec.branches.iter().map(|b| b.kind());
                let first = kinds.next().unwrap_or(RouteKind::Mixed);
                if kinds.all(|k| k == first) {
                    first
                } else {
                    RouteKind::Mixed
                }
            }
            Stage::Filter(_)
            | Stage::Bind(_)
            | Stage::Except(_)
            | Stage::Unique
            | Stage::Sample(_)
            | Stage::At(_) => self
                .upstream
                .as_ref()
                .map_or(RouteKind::Mixed, |up| up.kind()),
        }
    }

    /// Every binding name declared in this specification, branches included.
    fn collect_names(&self, names: &mut HashSet<Arc<str>>) {
        for node in self.chain() {
            match &node.stage {
                Stage::Bind(name) => {
                    names.insert(Arc::clone(name));
                }
                Stage::Start { inherited, .. } => {
                    names.extend(inherited.iter().cloned());
                }
                Stage::Branch(spec) => {
                    for branch in &spec.branches {
                        branch.collect_names(names);
                    }
                }
                _ => {}
            }
        }
    }

    fn describe(&self) -> String {
        let mut segments: Vec<Segment> = Vec::new();
        let mut kind = RouteKind::Mixed;
        for node in self.chain() {
            match &node.stage {
                Stage::Vertices | Stage::Edges => {
                    kind = node.kind();
                    segments.push(Segment::producing(kind.name(), Vec::new()));
                }
                Stage::Start { kind: k, .. } => {
                    kind = *k;
                    segments.push(Segment::plain(k.short(), Vec::new()));
                }
                Stage::Filter(Filter::Properties(p)) => {
                    let args = describe_properties(p);
                    match segments.last_mut().filter(|s| s.producing) {
                        Some(last) => last.args.push(args),
                        None => segments.push(Segment::producing(kind.name(), vec![args])),
                    }
                }
                Stage::Filter(Filter::Predicate(_)) => {
                    segments.push(Segment::plain(kind.name(), vec!["&block".into()]));
                }
                Stage::Kind(k) => {
                    kind = RouteKind::of(*k);
                    segments.push(Segment::plain(kind.name(), Vec::new()));
                }
                Stage::Expand(expand) => {
                    kind = node.kind();
                    segments.push(Segment::producing(kind.name(), expand.describe_args()));
                }
                Stage::Bind(name) => segments.push(Segment::plain(&format!(":{}", name), Vec::new())),
                Stage::Except(name) => {
                    segments.push(Segment::plain(kind.name(), vec![format!("except :{}", name)]));
                }
                Stage::Branch(spec) => {
                    kind = node.kind();
                    let inner: Vec<String> = spec
                        .branches
                        .iter()
                        .map(|b| format!("#<{}>", b.describe()))
                        .collect();
                    segments.push(Segment::plain(
                        &format!("{} {{ {} }}", spec.describe_header(), inner.join(" | ")),
                        Vec::new(),
                    ));
                }
                Stage::Unique => segments.push(Segment::plain("Unique", Vec::new())),
                Stage::Sample(sample) => segments.push(Segment::plain(&sample.describe(), Vec::new())),
                Stage::At(index) => segments.push(Segment::plain("At", vec![index.to_string()])),
                Stage::Map(_) => {
                    kind = RouteKind::Mixed;
                    segments.push(Segment::producing("Map", vec!["&block".into()]));
                }
            }
        }
        segments
            .iter()
            .map(Segment::render)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

struct Segment {
    name: String,
    args: Vec<String>,
    /// Property filters fold into the arguments of a producing segment.
    producing: bool,
}

impl Segment {
    fn producing(name: &str, args: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            args,
            producing: true,
        }
    }

    fn plain(name: &str, args: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            args,
            producing: false,
        }
    }

    fn render(&self) -> String {
        if self.args.is_empty() {
            self.name.clone()
        } else {
            format!("{}({})", self.name, self.args.join(", "))
        }
    }
}

/// Anything a branch builder may hand back: a route, or a fallible one.
pub trait IntoRoute<'g> {
    fn into_route(self) -> Result<Route<'g>>;
}

impl<'g> IntoRoute<'g> for Route<'g> {
    fn into_route(self) -> Result<Route<'g>> {
        Ok(self)
    }
}

impl<'g> IntoRoute<'g> for Result<Route<'g>> {
    fn into_route(self) -> Result<Route<'g>> {
        self
    }
}

/// A lazy pipeline specification over one graph.
///
/// Immutable: every builder call returns a new route wrapping this one, so a
/// route can be extended in several directions and executed any number of
/// times. Each [`Route::iter`] call starts an independent pass.
#[derive(Clone)]
pub struct Route<'g> {
    graph: &'g Graph,
    config: Arc<RouteConfig>,
    node: Arc<RouteNode>,
}

impl<'g> Route<'g> {
    /// Every vertex of `graph`, in enumeration order.
    pub fn vertices(graph: &'g Graph) -> Self {
        Self::source(graph, Stage::Vertices)
    }

    /// Every edge of `graph`, in enumeration order.
    pub fn edges(graph: &'g Graph) -> Self {
        Self::source(graph, Stage::Edges)
    }

    fn source(graph: &'g Graph, stage: Stage) -> Self {
        Self {
            graph,
            config: Arc::new(RouteConfig::default()),
            node: RouteNode::root(stage),
        }
    }

    fn push(&self, stage: Stage) -> Self {
        Self {
            graph: self.graph,
            config: Arc::clone(&self.config),
            node: Arc::new(RouteNode {
                stage,
                upstream: Some(Arc::clone(&self.node)),
            }),
        }
    }

    /// Replace the execution settings. Applies to this route and everything built on it.
    pub fn with_config(mut self, config: RouteConfig) -> Result<Self> {
        config.validate()?;
        self.config = Arc::new(config);
        Ok(self)
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn config(&self) -> &Arc<RouteConfig> {
        &self.config
    }

    pub(crate) fn node(&self) -> &RouteNode {
        &self.node
    }

    /// True only for the zero-stage enumeration of a graph's vertices or edges.
    pub fn is_root(&self) -> bool {
        self.node.upstream.is_none() && matches!(self.node.stage, Stage::Vertices | Stage::Edges)
    }

    pub fn is_from_graph(&self, graph: &Graph) -> bool {
        self.graph.id() == graph.id()
    }

    pub fn kind(&self) -> RouteKind {
        self.node.kind()
    }

    /// Number of branches of the branching stage this route ends with; 0 otherwise.
    pub fn branch_count(&self) -> usize {
        match &self.node.stage {
            Stage::Branch(spec) => spec.branches.len(),
            _ => 0,
        }
    }

    pub(crate) fn describe(&self) -> String {
        self.node.describe()
    }

    fn declared_names(&self) -> HashSet<Arc<str>> {
        let mut names = HashSet::new();
        self.node.collect_names(&mut names);
        names
    }

    // --- filters ---

    /// Keep elements whose properties equal every given value.
    pub fn filter_props(&self, properties: Properties) -> Result<Self> {
        if properties.is_empty() {
            return Err(RouteError::InvalidFilter(
                "property filter needs at least one key".into(),
            ));
        }
        Ok(self.push(Stage::Filter(Filter::Properties(properties))))
    }

    /// Keep elements whose `key` property equals `value`.
    pub fn has(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut properties = Properties::new();
        properties.insert(key.to_string(), value.into());
        self.push(Stage::Filter(Filter::Properties(properties)))
    }

    /// Keep elements for which `predicate` returns true.
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Visit<'_>) -> bool + 'static,
    {
        self.push(Stage::Filter(Filter::Predicate(Arc::new(predicate))))
    }

    pub fn only_vertices(&self) -> Self {
        self.push(Stage::Kind(ElementKind::Vertex))
    }

    pub fn only_edges(&self) -> Self {
        self.push(Stage::Kind(ElementKind::Edge))
    }

    /// Drop elements equal to the element bound to `name` on their own path.
    pub fn except(&self, name: &str) -> Result<Self> {
        let name: Arc<str> = Arc::from(name);
        if !self.declared_names().contains(&name) {
            return Err(RouteError::UnknownBinding(name.to_string()));
        }
        Ok(self.push(Stage::Except(name)))
    }

    // --- traversal ---

    fn expand_edges(&self, direction: TraversalDirection, labels: &[&str], filter: Option<Predicate>) -> Self {
        self.push(Stage::Expand(Expand::Edges {
            direction,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            filter,
        }))
    }

    /// Outgoing edges of each vertex. An empty `labels` slice means every label.
    pub fn out_edges(&self, labels: &[&str]) -> Self {
        self.expand_edges(TraversalDirection::Outgoing, labels, None)
    }

    pub fn in_edges(&self, labels: &[&str]) -> Self {
        self.expand_edges(TraversalDirection::Incoming, labels, None)
    }

    /// Outgoing edges followed by incoming edges of each vertex.
    pub fn both_edges(&self, labels: &[&str]) -> Self {
        self.expand_edges(TraversalDirection::Both, labels, None)
    }

    /// Outgoing edges that also satisfy `predicate`.
    pub fn out_edges_where<F>(&self, labels: &[&str], predicate: F) -> Self
    where
        F: Fn(&Visit<'_>) -> bool + 'static,
    {
        self.expand_edges(TraversalDirection::Outgoing, labels, Some(Arc::new(predicate)))
    }

    pub fn in_edges_where<F>(&self, labels: &[&str], predicate: F) -> Self
    where
        F: Fn(&Visit<'_>) -> bool + 'static,
    {
        self.expand_edges(TraversalDirection::Incoming, labels, Some(Arc::new(predicate)))
    }

    pub fn both_edges_where<F>(&self, labels: &[&str], predicate: F) -> Self
    where
        F: Fn(&Visit<'_>) -> bool + 'static,
    {
        self.expand_edges(TraversalDirection::Both, labels, Some(Arc::new(predicate)))
    }

    /// Tail vertex of each edge.
    pub fn out_vertex(&self) -> Self {
        self.push(Stage::Expand(Expand::Vertices(VertexEnd::Out)))
    }

    /// Head vertex of each edge.
    pub fn in_vertex(&self) -> Self {
        self.push(Stage::Expand(Expand::Vertices(VertexEnd::In)))
    }

    /// Tail then head of each edge.
    pub fn both_vertices(&self) -> Self {
        self.push(Stage::Expand(Expand::Vertices(VertexEnd::Both)))
    }

    /// Transform each element into another element of the same graph.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(&Visit<'_>) -> Result<Element> + 'static,
    {
        self.push(Stage::Map(Arc::new(f)))
    }

    // --- bindings ---

    /// Name this position. Fails if the name is already declared anywhere in the route.
    pub fn bind(&self, name: &str) -> Result<Self> {
        let name: Arc<str> = Arc::from(name);
        if self.declared_names().contains(&name) {
            return Err(RouteError::DuplicateBinding(name.to_string()));
        }
        Ok(self.push(Stage::Bind(name)))
    }

    // --- branching ---

    /// Add a branch built by `f` from a start reference of this route's elements.
    ///
    /// Consecutive `branch` calls add branches to the same branching stage;
    /// any other stage closes it.
    pub fn branch<F, R>(&self, f: F) -> Result<Self>
    where
        F: FnOnce(Route<'g>) -> R,
        R: IntoRoute<'g>,
    {
        let (upstream, mut spec) = match &self.node.stage {
            Stage::Branch(spec) => match self.node.upstream.as_ref() {
                Some(up) => (Arc::clone(up), Some(spec.clone())),
                None => (Arc::clone(&self.node), None),
            },
            _ => (Arc::clone(&self.node), None),
        };

        // Only names bound upstream of the branching stage reach a new branch.
        let mut upstream_names = HashSet::new();
        upstream.collect_names(&mut upstream_names);
        let mut inherited: Vec<Arc<str>> = upstream_names.iter().cloned().collect();
        inherited.sort();
        let start = Route {
            graph: self.graph,
            config: Arc::clone(&self.config),
            node: RouteNode::root(Stage::Start {
                kind: upstream.kind(),
                inherited: inherited.into(),
            }),
        };
        let start_node = Arc::clone(&start.node);

        let built = f(start).into_route()?;
        if built.graph.id() != self.graph.id() {
            return Err(RouteError::CrossGraph {
                expected: self.graph.id(),
                found: built.graph.id(),
            });
        }
        if !Arc::ptr_eq(built.node.root_node(), &start_node) {
            return Err(RouteError::InvalidBranch(
                "branch must extend the start reference it was given".into(),
            ));
        }

        if let Some(spec) = spec.as_ref() {
            let mut sibling_names = HashSet::new();
            for sibling in &spec.branches {
                sibling.collect_names(&mut sibling_names);
            }
            let mut own_names = HashSet::new();
            built.node.collect_names(&mut own_names);
            let mut clashes: Vec<&Arc<str>> = own_names
                .intersection(&sibling_names)
                .filter(|name| !upstream_names.contains(*name))
                .collect();
            clashes.sort();
            if let Some(name) = clashes.first() {
                return Err(RouteError::DuplicateBinding(name.to_string()));
            }
        }

        let spec = match spec.as_mut() {
            Some(spec) => {
                spec.branches.push(built.node);
                spec.clone()
            }
            None => BranchSpec::new(built.node),
        };
        debug!(branches = spec.branches.len(), "branch added");
        Ok(Self {
            graph: self.graph,
            config: Arc::clone(&self.config),
            node: Arc::new(RouteNode {
                stage: Stage::Branch(spec),
                upstream: Some(upstream),
            }),
        })
    }

    /// Apply `f` to the open branching stage; other routes are returned unchanged.
    fn with_branch_spec(&self, f: impl FnOnce(&mut BranchSpec)) -> Self {
        match &self.node.stage {
            Stage::Branch(spec) => {
                let mut spec = spec.clone();
                f(&mut spec);
                Self {
                    graph: self.graph,
                    config: Arc::clone(&self.config),
                    node: Arc::new(RouteNode {
                        stage: Stage::Branch(spec),
                        upstream: self.node.upstream.clone(),
                    }),
                }
            }
            _ => {
                debug!("merge/split option ignored: route does not end in a branch");
                self.clone()
            }
        }
    }

    /// Route each upstream element with `policy` instead of copying it to every branch.
    pub fn split<P>(&self, policy: P) -> Self
    where
        P: SplitPolicy + 'static,
    {
        let policy: Arc<dyn SplitPolicy> = Arc::new(policy);
        self.with_branch_spec(|spec| spec.split = Some(policy))
    }

    /// Route each upstream element to the one branch `classify` picks, or to none.
    pub fn split_by<F>(&self, classify: F) -> Self
    where
        F: Fn(&Visit<'_>) -> Option<usize> + 'static,
    {
        self.split(ExclusiveSplit::new(classify))
    }

    pub fn merge(&self, policy: MergePolicy) -> Self {
        self.with_branch_spec(|spec| spec.merge = policy)
    }

    pub fn round_robin(&self) -> Self {
        self.merge(MergePolicy::RoundRobin)
    }

    /// Drain each branch in turn before moving to the next.
    ///
    /// Later branches queue every element routed to them while earlier ones
    /// drain. Under the default copy split, more than
    /// [`RouteConfig::max_split_buffer`] upstream elements fail with
    /// [`RouteError::SplitOverflow`]; raise the bound with
    /// [`Route::with_config`] for larger inputs.
    pub fn exhaustive(&self) -> Self {
        self.merge(MergePolicy::Exhaustive)
    }

    pub fn mixed(&self) -> Self {
        self.merge(MergePolicy::Mixed)
    }

    /// Apply `f` to this route `times` times in sequence.
    pub fn repeat<F, R>(&self, times: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(Route<'g>) -> R,
        R: IntoRoute<'g>,
    {
        let mut route = self.clone();
        for _ in 0..times {
            route = f(route).into_route()?;
        }
        Ok(route)
    }

    // --- uniqueness & sampling ---

    pub fn unique(&self) -> Self {
        self.push(Stage::Unique)
    }

    /// Exactly `count` elements in upstream order. Pulling fails with
    /// `InvalidSample` if the upstream turns out to be shorter.
    pub fn sample_count(&self, count: usize) -> Self {
        self.push(Stage::Sample(Sample::Count(count)))
    }

    /// Keep each element with probability `p`, which must lie in [0, 1].
    pub fn sample_probability(&self, p: f64) -> Result<Self> {
        Ok(self.push(Stage::Sample(Sample::probability(p)?)))
    }

    /// Only the element at zero-based `index` of the upstream sequence.
    pub fn at(&self, index: usize) -> Self {
        self.push(Stage::At(index))
    }

    // --- paths ---

    pub fn paths(&self) -> PathsRoute<'g> {
        PathsRoute::new(self.clone())
    }

    // --- execution ---

    /// Start a fresh pass.
    pub fn iter(&self) -> Traversal<'g> {
        Traversal::new(self)
    }

    pub fn to_vec(&self) -> Result<Vec<Element>> {
        self.iter().collect()
    }

    pub fn count(&self) -> Result<usize> {
        let mut traversal = self.iter();
        let mut count = 0;
        while traversal.pull()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    pub fn first(&self) -> Result<Option<Element>> {
        self.iter().next().transpose()
    }

    pub fn ids(&self) -> Result<Vec<ElementId>> {
        self.iter().map(|e| e.map(|e| e.id())).collect()
    }

    /// Labels of the edges produced; vertices are skipped.
    pub fn labels(&self) -> Result<Vec<String>> {
        let mut labels = Vec::new();
        for element in self.iter() {
            if let Some(label) = self.graph.label(element?)? {
                labels.push(label.to_string());
            }
        }
        Ok(labels)
    }

    /// The `key` property of every produced element that has one.
    pub fn values(&self, key: &str) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        for element in self.iter() {
            if let Some(value) = self.graph.property(element?, key)? {
                values.push(value.clone());
            }
        }
        Ok(values)
    }

    /// Count produced elements per key.
    pub fn group_count<K, F>(&self, mut key: F) -> Result<BTreeMap<K, usize>>
    where
        K: Ord,
        F: FnMut(&Visit<'_>) -> K,
    {
        let mut counts = BTreeMap::new();
        let mut traversal = self.iter();
        while let Some(t) = traversal.pull()? {
            *counts.entry(key(&Visit::new(self.graph, &t))).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

impl fmt::Display for Route<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}>", self.describe())
    }
}

impl fmt::Debug for Route<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("graph", &self.graph.id())
            .field("stages", &self.describe())
            .finish()
    }
}

impl<'g> IntoIterator for &Route<'g> {
    type Item = Result<Element>;
    type IntoIter = Traversal<'g>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Route entry points on the graph itself.
impl Graph {
    pub fn v(&self) -> Route<'_> {
        Route::vertices(self)
    }

    pub fn e(&self) -> Route<'_> {
        Route::edges(self)
    }

    /// Vertices matching every given property.
    pub fn v_where(&self, properties: Properties) -> Result<Route<'_>> {
        Route::vertices(self).filter_props(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::props;

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
    fn test_builders_do_not_mutate() {
        let g = make_star(3);
        let base = g.v();
        let _extended = base.out_edges(&[]).in_vertex();
        assert!(base.is_root());
        assert_eq!(base.count().unwrap(), 4);
    }

    #[test]
    fn test_describe_folds_property_filters() {
        let g = make_star(3);
        let route = g.v().has("kind", "hub").has("name", "x").out_edges(&["HAS"]);
        assert_eq!(
            route.describe(),
            "Vertices([kind=\"hub\"], [name=\"x\"]) -> Edges(OUT_EDGES, [HAS])"
        );
        let after_unique = g.v().unique().has("kind", "leaf");
        assert_eq!(after_unique.describe(), "Vertices -> Unique -> Vertices([kind=\"leaf\"])");
    }

    #[test]
    fn test_describe_misc_stages() {
        let g = make_star(2);
        let route = g
            .v()
            .filter(|_| true)
            .only_edges()
            .map(|v| Ok(v.element()))
            .sample_probability(0.5)
            .unwrap();
        assert_eq!(
            route.describe(),
            "Vertices -> Vertices(&block) -> Edges -> Map(&block) -> Sample(p=0.5)"
        );
    }

    #[test]
    fn test_consecutive_branches_share_stage() {
        let g = make_star(2);
        let route = g
            .v()
            .branch(|b| b)
            .unwrap()
            .exhaustive()
            .branch(|b| b.out_edges(&[]))
            .unwrap();
        assert_eq!(route.branch_count(), 2);
        let reopened = route.unique().branch(|b| b).unwrap();
        assert_eq!(reopened.branch_count(), 1);
    }

    #[test]
    fn test_names_visible_through_branches() {
        let g = make_star(2);
        let route = g
            .v()
            .branch(|b| b.bind("inner"))
            .unwrap();
        assert!(route.except("inner").is_ok());
        assert_eq!(
            route.bind("inner").unwrap_err(),
            RouteError::DuplicateBinding("inner".into())
        );
    }

    #[test]
    fn test_with_config_keeps_stages() {
        let g = make_star(2);
        let route = g
            .v()
            .has("kind", "leaf")
            .with_config(RouteConfig::default().with_seed(1))
            .unwrap();
        assert_eq!(route.config().sample_seed, Some(1));
        assert_eq!(route.count().unwrap(), 2);
    }

    #[test]
    fn test_debug_output() {
        let g = make_star(1);
        let text = format!("{:?}", g.e());
        assert!(text.contains("Route"));
        assert!(text.contains("Edges"));
    }
}
