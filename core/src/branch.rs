//! Branching: one upstream split into N sub-pipelines, merged back into one.
//!
//! The split side queues upstream traversers per branch (`SplitState`); each
//! branch sub-pipeline starts from a `BranchSource` that drains its own
//! queue, pulling the shared upstream only when that queue is empty. The
//! merge side (`MergePipe`) interleaves branch outputs under a
//! [`MergePolicy`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, RouteError};
use crate::graph::Graph;
use crate::pipe::{build, BoxedPipe, BuildContext, Pipe, Traverser, Visit};
use crate::route::RouteNode;

/// Branch indices an upstream element is routed to.
pub type BranchSet = Vec<usize>;

/// Decides which branches receive each upstream element.
pub trait SplitPolicy {
    /// Indices outside `0..branch_count` are ignored.
    fn classify(&self, visit: &Visit<'_>, branch_count: usize) -> BranchSet;
}

impl<F> SplitPolicy for F
where
    F: Fn(&Visit<'_>, usize) -> BranchSet,
{
    fn classify(&self, visit: &Visit<'_>, branch_count: usize) -> BranchSet {
        self(visit, branch_count)
    }
}

/// Every branch receives every element. The default routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopySplit;

impl SplitPolicy for CopySplit {
    fn classify(&self, _visit: &Visit<'_>, branch_count: usize) -> BranchSet {
        (0..branch_count).collect()
    }
}

/// Routes each element to at most one branch chosen by a classifier.
pub struct ExclusiveSplit<F> {
    classify: F,
}

impl<F> ExclusiveSplit<F>
where
    F: Fn(&Visit<'_>) -> Option<usize>,
{
    pub fn new(classify: F) -> Self {
        Self { classify }
    }
}

impl<F> SplitPolicy for ExclusiveSplit<F>
where
    F: Fn(&Visit<'_>) -> Option<usize>,
{
    fn classify(&self, visit: &Visit<'_>, _branch_count: usize) -> BranchSet {
        (self.classify)(visit).into_iter().collect()
    }
}

/// How branch outputs interleave into the merged sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// One result from each live branch in turn; exhausted branches are skipped.
    #[default]
    RoundRobin,
    /// Drain branch 0, then branch 1, and so on.
    Exhaustive,
    /// Round-robin order with the branch-origin tag erased.
    Mixed,
}

/// The specification of one branching stage.
#[derive(Clone)]
pub(crate) struct BranchSpec {
    pub(crate) branches: Vec<Arc<RouteNode>>,
    pub(crate) split: Option<Arc<dyn SplitPolicy>>,
    pub(crate) merge: MergePolicy,
}

impl BranchSpec {
    pub(crate) fn new(first: Arc<RouteNode>) -> Self {
        Self {
            branches: vec![first],
            split: None,
            merge: MergePolicy::default(),
        }
    }

    pub(crate) fn describe_header(&self) -> String {
        let mut args = Vec::new();
        match self.merge {
            MergePolicy::RoundRobin => {}
            MergePolicy::Exhaustive => args.push("exhaustive"),
            MergePolicy::Mixed => args.push("mixed"),
        }
        if self.split.is_some() {
            args.push("&split");
        }
        if args.is_empty() {
            "Branched".to_string()
        } else {
            format!("Branched({})", args.join(", "))
        }
    }

    pub(crate) fn pipe<'g>(&self, upstream: BoxedPipe<'g>, ctx: &mut BuildContext<'g>) -> BoxedPipe<'g> {
        let state = Rc::new(RefCell::new(SplitState {
            upstream,
            graph: ctx.graph,
            policy: self.split.clone(),
            queues: vec![VecDeque::new(); self.branches.len()],
            exhausted: false,
            limit: ctx.config.max_split_buffer,
        }));
        let branches = self
            .branches
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let source: BoxedPipe<'g> = Box::new(BranchSource {
                    state: Rc::clone(&state),
                    index,
                });
                build(node, ctx, &mut Some(source))
            })
            .collect::<Vec<_>>();
        let live = vec![true; branches.len()];
        Box::new(MergePipe {
            branches,
            live,
            cursor: 0,
            policy: self.merge,
        })
    }
}

impl fmt::Debug for BranchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchSpec")
            .field("branches", &self.branches.len())
            .field("split", &self.split.is_some())
            .field("merge", &self.merge)
            .finish()
    }
}

/// Shared upstream plus one pending queue per branch.
struct SplitState<'g> {
    upstream: BoxedPipe<'g>,
    graph: &'g Graph,
    policy: Option<Arc<dyn SplitPolicy>>,
    queues: Vec<VecDeque<Traverser>>,
    exhausted: bool,
    limit: usize,
}

impl SplitState<'_> {
    fn pull_for(&mut self, branch: usize) -> Result<Option<Traverser>> {
        loop {
            if let Some(t) = self.queues.get_mut(branch).and_then(|q| q.pop_front()) {
                return Ok(Some(t));
            }
            if self.exhausted {
                return Ok(None);
            }
            match self.upstream.pull()? {
                Some(t) => self.route(t)?,
                None => {
                    trace!("branch split upstream exhausted");
                    self.exhausted = true;
                }
            }
        }
    }

    fn route(&mut self, t: Traverser) -> Result<()> {
        let count = self.queues.len();
        let targets = match &self.policy {
            None => (0..count).collect(),
            Some(policy) => policy.classify(&Visit::new(self.graph, &t), count),
        };
        for index in targets {
            let Some(queue) = self.queues.get_mut(index) else {
                continue;
            };
            if queue.len() >= self.limit {
                return Err(RouteError::SplitOverflow {
                    branch: index,
                    limit: self.limit,
                });
            }
            queue.push_back(t.clone());
        }
        Ok(())
    }
}

/// Root of one branch sub-pipeline.
struct BranchSource<'g> {
    state: Rc<RefCell<SplitState<'g>>>,
    index: usize,
}

impl Pipe for BranchSource<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        self.state.borrow_mut().pull_for(self.index)
    }
}

struct MergePipe<'g> {
    branches: Vec<BoxedPipe<'g>>,
    live: Vec<bool>,
    cursor: usize,
    policy: MergePolicy,
}

impl MergePipe<'_> {
    fn tag(&self, mut t: Traverser, index: usize) -> Traverser {
        match self.policy {
            MergePolicy::Mixed => t.set_branch(None),
            MergePolicy::RoundRobin | MergePolicy::Exhaustive => t.set_branch(Some(index)),
        }
        t
    }

    fn pull_round_robin(&mut self) -> Result<Option<Traverser>> {
        let count = self.branches.len();
        for _ in 0..count {
            let index = self.cursor;
            self.cursor = (self.cursor + 1) % count;
            if !self.live[index] {
                continue;
            }
            match self.branches[index].pull()? {
                Some(t) => return Ok(Some(self.tag(t, index))),
                None => {
                    trace!(branch = index, "branch exhausted");
                    self.live[index] = false;
                }
            }
        }
        Ok(None)
    }

    fn pull_exhaustive(&mut self) -> Result<Option<Traverser>> {
        while self.cursor < self.branches.len() {
            let index = self.cursor;
            match self.branches[index].pull()? {
                Some(t) => return Ok(Some(self.tag(t, index))),
                None => {
                    trace!(branch = index, "branch exhausted");
                    self.cursor += 1;
                }
            }
        }
        Ok(None)
    }
}

impl Pipe for MergePipe<'_> {
    fn pull(&mut self) -> Result<Option<Traverser>> {
        match self.policy {
            MergePolicy::RoundRobin | MergePolicy::Mixed => self.pull_round_robin(),
            MergePolicy::Exhaustive => self.pull_exhaustive(),
        }
    }
}
