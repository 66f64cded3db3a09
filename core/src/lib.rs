//! graph-route-core: lazy, composable route engine over an in-memory property graph.
//!
//! A pure Rust library. Callers compose a [`Route`] (expand to adjacent
//! edges/vertices, filter, branch and merge, bind named positions, record
//! paths) and pull results one element at a time; no intermediate
//! collections are materialized except where a stage must buffer (count
//! sampling, lagging branches).
//!
//! Ships a small adjacency-list [`Graph`] as the storage collaborator so the
//! engine can be used and benchmarked standalone.

mod branch;
mod config;
mod element;
mod error;
mod expand;
mod filter;
mod graph;
mod path;
mod pipe;
mod route;
mod sample;
mod subgraph;

pub use branch::{BranchSet, CopySplit, ExclusiveSplit, MergePolicy, SplitPolicy};
pub use config::{RouteConfig, DEFAULT_MAX_SPLIT_BUFFER};
pub use element::{props, EdgeId, Element, ElementId, ElementKind, Properties, Value, VertexId};
pub use error::{Result, RouteError};
pub use filter::{Filter, Predicate};
pub use graph::{End, Graph, GraphId, LabelId, TraversalDirection, MAX_LABELS};
pub use path::{transpose, Path, PathsRoute, PathsTraversal};
pub use pipe::{Traversal, Traverser, Visit};
pub use route::{IntoRoute, MapFn, Route, RouteKind};
