use thiserror::Error;

use crate::element::{ElementId, ElementKind};
use crate::graph::GraphId;

/// Errors raised while building or executing a route.
///
/// Construction-time variants (`DuplicateBinding`, `InvalidFilter`,
/// `InvalidBranch`, out-of-range sample probabilities) are returned by the
/// builder call that introduced them. Everything else fails only the
/// `pull()` that observed it; the traversal can keep being pulled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// An element owned by one graph was handed to a route or graph bound to another.
    #[error("cross-graph access: expected element of {expected}, found one of {found}")]
    CrossGraph { expected: GraphId, found: GraphId },

    /// A binding name that was never declared, or not bound on this element's path.
    #[error("unknown binding: {0}")]
    UnknownBinding(String),

    /// A binding name declared twice within one route.
    #[error("duplicate binding: {0}")]
    DuplicateBinding(String),

    /// Transpose over paths of unequal length.
    #[error("ragged paths: path {index} has length {found}, expected {expected}")]
    RaggedPaths {
        expected: usize,
        found: usize,
        index: usize,
    },

    /// Sample count larger than the upstream, or probability outside [0, 1].
    #[error("invalid sample: {0}")]
    InvalidSample(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A branch builder returned a route that does not extend its start reference.
    #[error("invalid branch: {0}")]
    InvalidBranch(String),

    /// A vertex-only stage received an edge, or the reverse.
    #[error("{stage} expects {expected} elements, got {found}")]
    KindMismatch {
        stage: &'static str,
        expected: &'static str,
        found: ElementId,
    },

    #[error("element not found: {0}")]
    MissingElement(ElementId),

    #[error("duplicate element id: {0}")]
    DuplicateId(ElementId),

    /// `create_vertex`/`create_edge` after an id of `u64::MAX` was taken.
    #[error("no free {} id left", .0.name())]
    IdsExhausted(ElementKind),

    /// A lagging branch accumulated more queued elements than the configured bound.
    #[error("split buffer overflow: branch {branch} reached {limit} pending elements")]
    SplitOverflow { branch: usize, limit: usize },

    #[error("label table exceeded maximum of {0} labels")]
    LabelOverflow(usize),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RouteError>;
