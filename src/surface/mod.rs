//! Drawing surface abstraction.
//!
//! The renderer only builds and rearranges a tree of drawable nodes; how
//! those nodes are turned into pixels is up to the surface. [`SvgDocument`]
//! is the in-memory implementation shipped with the crate.

mod svg;

pub use svg::{NodeId, SvgDocument};

/// The kinds of drawable node the renderer creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Container for other nodes.
    Group,
    /// Small circle marking a point.
    PointMarker,
    /// Path built from a `d` attribute.
    Path,
    /// Closed polygon built from a `points` attribute.
    ClosedShape,
}

/// A tree of drawable nodes that layers are rendered into.
///
/// Nodes are created detached and become part of the tree once appended.
/// Implementations are single-threaded; nothing here requires `Send`.
pub trait DrawingSurface {
    /// Handle to a node of this surface.
    type Node: Copy + Eq + std::fmt::Debug;

    /// The top-level node that layer groups are appended to.
    fn root(&self) -> Self::Node;

    /// Creates a new detached node.
    fn create(&mut self, kind: ShapeKind) -> Self::Node;

    /// Appends `child` as the last child of `parent`.
    ///
    /// A child that already has a parent is moved, so appending an
    /// existing child of `parent` moves it to the end.
    fn append_child(&mut self, parent: Self::Node, child: Self::Node);

    /// Sets an attribute, replacing any previous value.
    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str);

    /// Adds a style class. Adding a class twice has no effect.
    fn add_class(&mut self, node: Self::Node, class: &str);

    /// Detaches `node` from its parent and discards it with its subtree.
    fn remove(&mut self, node: Self::Node);

    /// Discards every child of `node`.
    fn clear_children(&mut self, node: Self::Node);

    /// Puts the detached node `new` where `old` sits among its siblings,
    /// then discards `old` with its subtree.
    fn replace(&mut self, old: Self::Node, new: Self::Node);

    /// Children of `node` in order.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
}
