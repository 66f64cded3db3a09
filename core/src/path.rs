use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use crate::element::Element;
use crate::error::{Result, RouteError};
use crate::graph::Graph;
use crate::pipe::Traversal;
use crate::route::Route;

/// The elements visited to produce one result, in traversal order.
///
/// One slot per element-producing stage. Bindings name a slot rather than
/// duplicating the element, so filters and bindings never change the length.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    elements: Vec<Element>,
    bindings: Vec<(Arc<str>, usize)>,
}

impl Path {
    pub(crate) fn start(element: Element) -> Self {
        Self {
            elements: vec![element],
            bindings: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Tag the current (last) slot with `name`.
    pub(crate) fn bind(&mut self, name: Arc<str>) {
        let slot = self.elements.len().saturating_sub(1);
        self.bindings.push((name, slot));
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Element> {
        self.elements.get(index).copied()
    }

    pub fn last(&self) -> Option<Element> {
        self.elements.last().copied()
    }

    /// The element bound to `name` on this path.
    pub fn var(&self, name: &str) -> Result<Element> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound.as_ref() == name)
            .and_then(|&(_, slot)| self.elements.get(slot).copied())
            .ok_or_else(|| RouteError::UnknownBinding(name.to_string()))
    }

    /// Binding names and the slot each one tags, in binding order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.bindings.iter().map(|(name, slot)| (name.as_ref(), *slot))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }
}

impl From<Vec<Element>> for Path {
    fn from(elements: Vec<Element>) -> Self {
        Self {
            elements,
            bindings: Vec::new(),
        }
    }
}

impl Index<usize> for Path {
    type Output = Element;

    fn index(&self, index: usize) -> &Element {
        &self.elements[index]
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", element)?;
        }
        f.write_str(")")
    }
}

/// Column-wise transposition: N paths of length L become L columns of length N.
///
/// Input order is preserved within each column. Paths of unequal length are
/// rejected rather than padded.
pub fn transpose<P: AsRef<[Element]>>(paths: &[P]) -> Result<Vec<Vec<Element>>> {
    let Some(first) = paths.first() else {
        return Ok(Vec::new());
    };
    let width = first.as_ref().len();
    if let Some((index, ragged)) = paths
        .iter()
        .enumerate()
        .find(|(_, p)| p.as_ref().len() != width)
    {
        return Err(RouteError::RaggedPaths {
            expected: width,
            found: ragged.as_ref().len(),
            index,
        });
    }

    let mut columns: Vec<Vec<Element>> = (0..width)
        .map(|_| Vec::with_capacity(paths.len()))
        .collect();
    for path in paths {
        for (column, element) in columns.iter_mut().zip(path.as_ref()) {
            column.push(*element);
        }
    }
    Ok(columns)
}

impl AsRef<[Element]> for Path {
    fn as_ref(&self) -> &[Element] {
        &self.elements
    }
}

/// A route whose results are the paths that reached each element.
#[derive(Clone)]
pub struct PathsRoute<'g> {
    route: Route<'g>,
}

impl<'g> PathsRoute<'g> {
    pub(crate) fn new(route: Route<'g>) -> Self {
        Self { route }
    }

    pub fn graph(&self) -> &'g Graph {
        self.route.graph()
    }

    pub fn iter(&self) -> PathsTraversal<'g> {
        PathsTraversal {
            inner: self.route.iter(),
        }
    }

    pub fn to_vec(&self) -> Result<Vec<Path>> {
        self.iter().collect()
    }

    /// Drain and transpose the recorded paths.
    pub fn transpose(&self) -> Result<Vec<Vec<Element>>> {
        transpose(&self.to_vec()?)
    }

    /// Drain the paths into a new graph holding exactly the visited elements.
    pub fn subgraph(&self) -> Result<Graph> {
        crate::subgraph::materialize(self.graph(), self.iter())
    }
}

impl fmt::Display for PathsRoute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{} -> Paths>", self.route.describe())
    }
}

/// Execution of a [`PathsRoute`].
pub struct PathsTraversal<'g> {
    inner: Traversal<'g>,
}

impl<'g> PathsTraversal<'g> {
    pub fn pull(&mut self) -> Result<Option<Path>> {
        Ok(self.inner.pull()?.map(|t| t.into_path()))
    }
}

impl Iterator for PathsTraversal<'_> {
    type Item = Result<Path>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pull().transpose()
    }
}

impl std::iter::FusedIterator for PathsTraversal<'_> {}
