//! In-memory SVG document.

use super::{DrawingSurface, ShapeKind};
use std::fmt::Write as _;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Handle to a node inside an [`SvgDocument`].
///
/// Slots are reused after removal; the generation tells a live node apart
/// from an earlier occupant of the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

const ROOT: NodeId = NodeId {
    index: 0,
    generation: 0,
};

#[derive(Debug, Clone)]
struct SvgNode {
    /// `None` for the `<svg>` root element
    kind: Option<ShapeKind>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
}

impl SvgNode {
    fn new(kind: Option<ShapeKind>) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
            classes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<SvgNode>,
}

/// Arena-backed SVG element tree.
///
/// Removed nodes free their slot for the next [`DrawingSurface::create`].
/// A stale [`NodeId`] refers to nothing, even after its slot is reused.
#[derive(Debug, Clone)]
pub struct SvgDocument {
    slots: Vec<Slot>,
    /// Indices of empty slots
    free: Vec<usize>,
    live: usize,
}

impl Default for SvgDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgDocument {
    /// Creates a document holding only the `<svg>` root.
    pub fn new() -> Self {
        let mut root = SvgNode::new(None);
        root.attributes.push(("xmlns".to_string(), SVG_NAMESPACE.to_string()));
        Self {
            slots: vec![Slot {
                generation: ROOT.generation,
                node: Some(root),
            }],
            free: Vec::new(),
            live: 1,
        }
    }

    /// Creates a document whose root is sized to `width` x `height` pixels.
    pub fn with_size(width: f64, height: f64) -> Self {
        let mut doc = Self::new();
        doc.set_size(width, height);
        doc
    }

    /// Sets the root `width`, `height` and `viewBox`.
    pub fn set_size(&mut self, width: f64, height: f64) {
        let root = self.root();
        self.set_attribute(root, "width", &width.to_string());
        self.set_attribute(root, "height", &height.to_string());
        self.set_attribute(root, "viewBox", &format!("0 0 {} {}", width, height));
    }

    fn node(&self, id: NodeId) -> Option<&SvgNode> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut SvgNode> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// True while the node has not been removed.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Kind of the node; `None` for the root or a removed node.
    pub fn kind(&self, id: NodeId) -> Option<ShapeKind> {
        self.node(id).and_then(|n| n.kind)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).and_then(|n| {
            n.attributes
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn classes(&self, id: NodeId) -> &[String] {
        self.node(id).map(|n| n.classes.as_slice()).unwrap_or(&[])
    }

    /// Number of nodes below `id`, not counting `id` itself.
    pub fn descendant_count(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut stack = self.children(id);
        while let Some(next) = stack.pop() {
            count += 1;
            stack.extend(self.children(next));
        }
        count
    }

    /// Number of live nodes, the root included.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Number of slots allocated, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.node(node).and_then(|n| n.parent) {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node_mut(id).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|c| *c != id);
        }
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(next.index)
                .filter(|slot| slot.generation == next.generation)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(next.index);
                self.live -= 1;
                stack.extend(node.children);
            }
        }
    }

    /// Serializes the document as SVG markup.
    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        self.write_node(&mut out, self.root(), 0);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId, depth: usize) {
        let Some(node) = self.node(id) else {
            return;
        };
        let tag = match node.kind {
            None => "svg",
            Some(ShapeKind::Group) => "g",
            Some(ShapeKind::PointMarker) => "circle",
            Some(ShapeKind::Path) => "path",
            Some(ShapeKind::ClosedShape) => "polygon",
        };

        let indent = "  ".repeat(depth);
        let _ = write!(out, "{}<{}", indent, tag);
        if !node.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&node.classes.join(" ")));
        }
        for (name, value) in &node.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }

        if node.children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push_str(">\n");
        for child in &node.children {
            self.write_node(out, *child, depth + 1);
        }
        let _ = writeln!(out, "{}</{}>", indent, tag);
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

impl DrawingSurface for SvgDocument {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        ROOT
    }

    fn create(&mut self, kind: ShapeKind) -> NodeId {
        let node = Some(SvgNode::new(Some(kind)));
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = node;
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node,
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if child == self.root()
            || child == parent
            || !self.contains(parent)
            || !self.contains(child)
            || self.is_ancestor(child, parent)
        {
            log::warn!("Refusing to append {:?} under {:?}", child, parent);
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(node) = self.node_mut(node) else {
            return;
        };
        match node.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => node.attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(node) = self.node_mut(node) {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    fn remove(&mut self, node: NodeId) {
        if node == self.root() {
            log::warn!("Refusing to remove the document root");
            return;
        }
        self.detach(node);
        self.free_subtree(node);
    }

    fn clear_children(&mut self, node: NodeId) {
        let children = match self.node_mut(node) {
            Some(n) => std::mem::take(&mut n.children),
            None => return,
        };
        for child in children {
            self.free_subtree(child);
        }
    }

    fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == self.root()
            || old == new
            || !self.contains(old)
            || !self.contains(new)
            || self.parent(new).is_some()
            || self.is_ancestor(new, old)
        {
            log::warn!("Refusing to replace {:?} with {:?}", old, new);
            return;
        }
        if let Some(parent) = self.parent(old) {
            if let Some(siblings) = self.node_mut(parent).map(|n| &mut n.children) {
                if let Some(slot) = siblings.iter_mut().find(|c| **c == old) {
                    *slot = new;
                }
            }
            if let Some(node) = self.node_mut(new) {
                node.parent = Some(parent);
            }
            if let Some(node) = self.node_mut(old) {
                node.parent = None;
            }
        }
        self.free_subtree(old);
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_moves_existing_child_to_end() {
        let mut doc = SvgDocument::new();
        let root = doc.root();
        let a = doc.create(ShapeKind::Group);
        let b = doc.create(ShapeKind::Group);
        doc.append_child(root, a);
        doc.append_child(root, b);
        assert_eq!(doc.children(root), vec![a, b]);

        doc.append_child(root, a);
        assert_eq!(doc.children(root), vec![b, a]);
    }

    #[test]
    fn test_append_reparents() {
        let mut doc = SvgDocument::new();
        let root = doc.root();
        let g1 = doc.create(ShapeKind::Group);
        let g2 = doc.create(ShapeKind::Group);
        let dot = doc.create(ShapeKind::PointMarker);
        doc.append_child(root, g1);
        doc.append_child(root, g2);
        doc.append_child(g1, dot);
        doc.append_child(g2, dot);
        assert!(doc.children(g1).is_empty());
        assert_eq!(doc.children(g2), vec![dot]);
        assert_eq!(doc.parent(dot), Some(g2));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let mut doc = SvgDocument::new();
        let outer = doc.create(ShapeKind::Group);
        let inner = doc.create(ShapeKind::Group);
        doc.append_child(outer, inner);
        doc.append_child(inner, outer);
        assert_eq!(doc.parent(outer), None);
        assert_eq!(doc.children(inner), Vec::<NodeId>::new());
    }

    #[test]
    fn test_remove_discards_subtree() {
        let mut doc = SvgDocument::new();
        let root = doc.root();
        let group = doc.create(ShapeKind::Group);
        let path = doc.create(ShapeKind::Path);
        doc.append_child(root, group);
        doc.append_child(group, path);
        assert_eq!(doc.len(), 3);

        doc.remove(group);
        assert!(doc.children(root).is_empty());
        assert!(!doc.contains(group));
        assert!(!doc.contains(path));
        assert_eq!(doc.len(), 1);

        doc.remove(root);
        assert!(doc.contains(root));
    }

    #[test]
    fn test_removed_slots_are_reused() {
        let mut doc = SvgDocument::new();
        let root = doc.root();
        let old = doc.create(ShapeKind::Path);
        doc.append_child(root, old);
        doc.remove(old);
        assert_eq!(doc.len(), 1);

        let new = doc.create(ShapeKind::PointMarker);
        assert_eq!(doc.capacity(), 2);
        assert_ne!(old, new);
        assert!(!doc.contains(old));
        assert_eq!(doc.kind(old), None);

        // A stale id must not reach the node now living in its slot
        doc.set_attribute(old, "d", "M0,0");
        doc.remove(old);
        assert!(doc.contains(new));
        assert_eq!(doc.attribute(new, "d"), None);
    }

    #[test]
    fn test_replace_keeps_sibling_position() {
        let mut doc = SvgDocument::new();
        let root = doc.root();
        let a = doc.create(ShapeKind::Group);
        let b = doc.create(ShapeKind::Group);
        let inner = doc.create(ShapeKind::Path);
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.append_child(a, inner);

        let fresh = doc.create(ShapeKind::Group);
        doc.replace(a, fresh);
        assert_eq!(doc.children(root), vec![fresh, b]);
        assert_eq!(doc.parent(fresh), Some(root));
        assert!(!doc.contains(a));
        assert!(!doc.contains(inner));
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_replace_rejects_attached_node_and_root() {
        let mut doc = SvgDocument::new();
        let root = doc.root();
        let a = doc.create(ShapeKind::Group);
        let b = doc.create(ShapeKind::Group);
        doc.append_child(root, a);
        doc.append_child(root, b);

        doc.replace(a, b);
        assert_eq!(doc.children(root), vec![a, b]);

        let detached = doc.create(ShapeKind::Group);
        doc.replace(root, detached);
        assert!(doc.contains(root));
        assert_eq!(doc.parent(detached), None);
    }

    #[test]
    fn test_clear_children() {
        let mut doc = SvgDocument::new();
        let group = doc.create(ShapeKind::Group);
        let a = doc.create(ShapeKind::PointMarker);
        let b = doc.create(ShapeKind::PointMarker);
        doc.append_child(group, a);
        doc.append_child(group, b);
        doc.clear_children(group);
        assert!(doc.children(group).is_empty());
        assert!(!doc.contains(a));
        assert!(doc.contains(group));
    }

    #[test]
    fn test_attributes_and_classes() {
        let mut doc = SvgDocument::new();
        let node = doc.create(ShapeKind::Path);
        doc.set_attribute(node, "d", "M0,0");
        doc.set_attribute(node, "d", "M1,1");
        doc.add_class(node, "roads");
        doc.add_class(node, "roads");
        doc.add_class(node, "kind--highway");
        assert_eq!(doc.attribute(node, "d"), Some("M1,1"));
        assert_eq!(doc.classes(node), ["roads", "kind--highway"]);
        assert_eq!(doc.kind(node), Some(ShapeKind::Path));
    }

    #[test]
    fn test_serialization() {
        let mut doc = SvgDocument::with_size(100.0, 50.0);
        let root = doc.root();
        let group = doc.create(ShapeKind::Group);
        doc.add_class(group, "cities");
        let dot = doc.create(ShapeKind::PointMarker);
        doc.set_attribute(dot, "cx", "10");
        doc.set_attribute(dot, "data-properties", r#"{"name":"A&B"}"#);
        doc.append_child(group, dot);
        doc.append_child(root, group);

        let expected = concat!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" ",
            "width=\"100\" height=\"50\" viewBox=\"0 0 100 50\">\n",
            "  <g class=\"cities\">\n",
            "    <circle cx=\"10\" data-properties=\"{&quot;name&quot;:&quot;A&amp;B&quot;}\"/>\n",
            "  </g>\n",
            "</svg>\n",
        );
        assert_eq!(doc.to_svg_string(), expected);
    }
}
