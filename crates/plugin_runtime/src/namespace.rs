//! Hierarchical, dot-addressed namespace tree.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. Each node
//! owns a [`HashedVec`] of children keyed by path segment, an optional value,
//! and a back-reference to its parent that is only ever used for ancestor
//! checks.
//!
//! ```rust
//! use plugin_runtime::namespace::{NamespaceTree, NodeValue};
//!
//! let mut tree = NamespaceTree::new();
//! tree.set("window.width", NodeValue::cloneable(800)).unwrap();
//! assert_eq!(tree.get("window.width"), Some(&800));
//! assert!(tree.node("window").is_some());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::container::HashedVec;

/// Default path delimiter.
pub const DEFAULT_DELIMITER: char = '.';

/// Key given to the root node of every tree.
pub const ROOT_KEY: &str = "root";

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Errors produced by namespace tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    /// A path contained an empty segment
    #[error("Invalid path: {0:?}")]
    InvalidPath(String),

    /// The final node of a path already holds a value, or a sibling with the same key exists
    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    /// No node at the given path
    #[error("Path not found: {0}")]
    NotFound(String),

    /// The node id does not refer to a live node
    #[error("Stale node id: {0:?}")]
    StaleNode(NodeId),

    /// Reparenting would make a node its own ancestor
    #[error("Cannot move {0} below itself")]
    Cycle(String),

    /// A value-bearing node cannot be duplicated
    #[error("Node {0} holds a value without a duplicate capability")]
    NotDuplicable(String),
}

/// A value stored in a tree node, tagged with what the tree may do with it.
pub enum NodeValue<T> {
    /// Owned by the tree and dropped with the node. `duplicate` is used when
    /// the node's subtree is copied; without it the copy is refused.
    Owned {
        value: T,
        duplicate: Option<fn(&T) -> T>,
    },
    /// Shared with the caller; the tree only holds a reference count and
    /// duplicates share it.
    Shared(Arc<T>),
}

impl<T> NodeValue<T> {
    /// Owned value that cannot be duplicated.
    pub fn owned(value: T) -> Self {
        Self::Owned {
            value,
            duplicate: None,
        }
    }

    /// Owned value duplicated with a custom function.
    pub fn with_duplicate(value: T, duplicate: fn(&T) -> T) -> Self {
        Self::Owned {
            value,
            duplicate: Some(duplicate),
        }
    }

    pub fn shared(value: Arc<T>) -> Self {
        Self::Shared(value)
    }

    pub fn get(&self) -> &T {
        match self {
            Self::Owned { value, .. } => value,
            Self::Shared(value) => value,
        }
    }

    /// Mutable access, only for owned values.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Owned { value, .. } => Some(value),
            Self::Shared(_) => None,
        }
    }

    pub fn is_duplicable(&self) -> bool {
        !matches!(self, Self::Owned { duplicate: None, .. })
    }

    fn try_duplicate(&self) -> Option<Self> {
        match self {
            Self::Owned {
                value,
                duplicate: Some(duplicate),
            } => Some(Self::Owned {
                value: duplicate(value),
                duplicate: Some(*duplicate),
            }),
            Self::Owned { duplicate: None, .. } => None,
            Self::Shared(value) => Some(Self::Shared(Arc::clone(value))),
        }
    }

    /// Takes an owned value out; shared values come back as `None`.
    pub fn into_owned(self) -> Option<T> {
        match self {
            Self::Owned { value, .. } => Some(value),
            Self::Shared(_) => None,
        }
    }
}

impl<T: Clone> NodeValue<T> {
    /// Owned value duplicated through [`Clone`].
    pub fn cloneable(value: T) -> Self {
        Self::with_duplicate(value, T::clone)
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owned { value, duplicate } => f
                .debug_struct("Owned")
                .field("value", value)
                .field("duplicable", &duplicate.is_some())
                .finish(),
            Self::Shared(value) => f.debug_tuple("Shared").field(value).finish(),
        }
    }
}

struct Node<T> {
    key: String,
    value: Option<NodeValue<T>>,
    children: HashedVec<NodeId>,
    parent: Option<NodeId>,
}

impl<T> Node<T> {
    fn new(key: &str, parent: Option<NodeId>) -> Self {
        Self {
            key: key.to_string(),
            value: None,
            children: HashedVec::new(),
            parent,
        }
    }
}

/// Arena-backed tree addressed by delimited paths.
pub struct NamespaceTree<T> {
    nodes: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    root: NodeId,
    delimiter: char,
}

impl<T> Default for NamespaceTree<T> {
    fn default() -> Self {
        Self::with_delimiter(DEFAULT_DELIMITER)
    }
}

impl<T> NamespaceTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            nodes: vec![Some(Node::new(ROOT_KEY, None))],
            free: Vec::new(),
            root: NodeId(0),
            delimiter,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// True when the root has no children and no value.
    pub fn is_empty(&self) -> bool {
        self.node_ref(self.root)
            .map(|root| root.children.is_empty() && root.value.is_none())
            .unwrap_or(true)
    }

    fn node_ref(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn live(&self, id: NodeId) -> Result<&Node<T>, NamespaceError> {
        self.node_ref(id).ok_or(NamespaceError::StaleNode(id))
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn segments<'a>(&self, path: &'a str) -> Result<Vec<&'a str>, NamespaceError> {
        let segments: Vec<&str> = path.split(self.delimiter).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(NamespaceError::InvalidPath(path.to_string()));
        }
        Ok(segments)
    }

    /// Assigns `value` to the node at `path` below the root, creating every
    /// missing intermediate node without a value.
    pub fn set(&mut self, path: &str, value: NodeValue<T>) -> Result<NodeId, NamespaceError> {
        self.set_at(self.root, path, value)
    }

    /// Like [`set`](Self::set) but relative to `base`.
    ///
    /// Fails without mutating anything when the final node already holds a
    /// value.
    pub fn set_at(
        &mut self,
        base: NodeId,
        path: &str,
        value: NodeValue<T>,
    ) -> Result<NodeId, NamespaceError> {
        let segments = self.segments(path)?;
        self.live(base)?;

        if let Some(existing) = self.node_at(base, path) {
            if self.node_ref(existing).is_some_and(|n| n.value.is_some()) {
                return Err(NamespaceError::AlreadyExists(path.to_string()));
            }
        }

        let mut current = base;
        for segment in segments {
            current = match self.child(current, segment) {
                Some(child) => child,
                None => self.add_child(current, segment),
            };
        }
        if let Some(node) = self.node_mut(current) {
            node.value = Some(value);
        }
        Ok(current)
    }

    fn add_child(&mut self, parent: NodeId, key: &str) -> NodeId {
        let id = self.alloc(Node::new(key, Some(parent)));
        if let Some(node) = self.node_mut(parent) {
            // Callers only add keys they just failed to find.
            let _ = node.children.insert(key, id);
        }
        id
    }

    /// Direct child of `parent` with the given key.
    pub fn child(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.node_ref(parent)?.children.get(key).copied()
    }

    /// Node at `path` below the root. Missing segments are never created.
    pub fn node(&self, path: &str) -> Option<NodeId> {
        self.node_at(self.root, path)
    }

    pub fn node_at(&self, base: NodeId, path: &str) -> Option<NodeId> {
        let segments = self.segments(path).ok()?;
        segments
            .into_iter()
            .try_fold(base, |current, segment| self.child(current, segment))
    }

    /// Value stored at `path`.
    pub fn get(&self, path: &str) -> Option<&T> {
        self.node(path).and_then(|id| self.value(id))
    }

    /// Mutable access to an owned value at `path`.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut T> {
        let id = self.node(path)?;
        self.value_mut(id)
    }

    pub fn value(&self, id: NodeId) -> Option<&T> {
        self.node_ref(id)?.value.as_ref().map(NodeValue::get)
    }

    pub fn value_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id)?.value.as_mut().and_then(NodeValue::get_mut)
    }

    pub fn key(&self, id: NodeId) -> Option<&str> {
        self.node_ref(id).map(|n| n.key.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node_ref(id)?.parent
    }

    /// Children of a node, in hash order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node_ref(id)
            .map(|n| n.children.values().copied().collect())
            .unwrap_or_default()
    }

    /// Full delimited path of a node, excluding the root key.
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let mut parts = Vec::new();
        let mut current = self.node_ref(id)?;
        while let Some(parent) = current.parent {
            parts.push(current.key.as_str());
            current = self.node_ref(parent)?;
        }
        parts.reverse();
        Some(parts.join(&self.delimiter.to_string()))
    }

    /// True if `ancestor` lies on the parent chain of `node`.
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Detaches the value of a node, leaving the node in place.
    pub fn take_value(&mut self, id: NodeId) -> Option<NodeValue<T>> {
        self.node_mut(id)?.value.take()
    }

    /// Moves `node` (with its subtree) below `new_parent`.
    ///
    /// Refused when `new_parent` is `node` or one of its descendants, and when
    /// `new_parent` already has a child with the same key.
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> Result<(), NamespaceError> {
        let key = self.live(node)?.key.clone();
        self.live(new_parent)?;

        if node == new_parent || self.is_descendant(new_parent, node) {
            tracing::warn!("⚠️ Refusing to move '{}' below itself", key);
            return Err(NamespaceError::Cycle(key));
        }
        if self.child(new_parent, &key).is_some() {
            return Err(NamespaceError::AlreadyExists(key));
        }

        let old_parent = self.parent(node);
        if let Some(parent) = self.node_mut(new_parent) {
            let _ = parent.children.insert(&key, node);
        }
        if let Some(old) = old_parent.and_then(|id| self.node_mut(id)) {
            old.children.remove(&key);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = Some(new_parent);
        }
        Ok(())
    }

    /// Takes the value at `path` without touching the node's children. The
    /// node and any ancestors left without value or children are pruned.
    pub fn remove_value(&mut self, path: &str) -> Result<Option<NodeValue<T>>, NamespaceError> {
        let id = self
            .node(path)
            .ok_or_else(|| NamespaceError::NotFound(path.to_string()))?;
        let value = self.take_value(id);

        let mut current = Some(id);
        while let Some(node) = current.filter(|&n| n != self.root) {
            let prunable = self
                .node_ref(node)
                .is_some_and(|n| n.value.is_none() && n.children.is_empty());
            if !prunable {
                break;
            }
            current = self.parent(node);
            self.destroy(node)?;
        }
        Ok(value)
    }

    /// Destroys the node at `path` with its whole subtree, then prunes
    /// ancestors left without value or children. Returns the removed node's
    /// value.
    pub fn remove(&mut self, path: &str) -> Result<Option<NodeValue<T>>, NamespaceError> {
        let id = self
            .node(path)
            .ok_or_else(|| NamespaceError::NotFound(path.to_string()))?;
        let value = self.destroy(id)?;
        self.clean();
        Ok(value)
    }

    /// Destroys a node and all of its descendants, children before parents.
    /// The root itself is only emptied.
    pub fn destroy(&mut self, id: NodeId) -> Result<Option<NodeValue<T>>, NamespaceError> {
        let node = self.live(id)?;
        let key = node.key.clone();
        let parent = node.parent;

        for child in self.children(id) {
            self.destroy(child)?;
        }

        if id == self.root {
            return Ok(self.node_mut(id).and_then(|n| n.value.take()));
        }
        if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
            p.children.remove(&key);
        }
        let node = self.nodes[id.0].take();
        self.free.push(id.0);
        Ok(node.and_then(|n| n.value))
    }

    /// Removes every node that has neither a value nor children, repeating
    /// until nothing changes. Returns the number of nodes removed.
    pub fn clean(&mut self) -> usize {
        let mut removed = 0;
        loop {
            let prunable: Vec<NodeId> = self
                .nodes
                .iter()
                .enumerate()
                .filter_map(|(index, slot)| {
                    let node = slot.as_ref()?;
                    let id = NodeId(index);
                    (id != self.root && node.value.is_none() && node.children.is_empty())
                        .then_some(id)
                })
                .collect();
            if prunable.is_empty() {
                return removed;
            }
            for id in prunable {
                if self.destroy(id).is_ok() {
                    removed += 1;
                }
            }
        }
    }

    /// Drops every node except the root.
    pub fn clear(&mut self) {
        let root = self.root;
        // The root is always live.
        let _ = self.destroy(root);
    }

    /// Deep copy of `source` and its descendants into a fresh, detached tree
    /// whose root takes the place of `source`.
    ///
    /// Nothing is copied unless every value in the subtree can be duplicated.
    pub fn duplicate_subtree(&self, source: NodeId) -> Result<NamespaceTree<T>, NamespaceError> {
        self.live(source)?;
        self.check_duplicable(source)?;

        let mut copy = NamespaceTree::with_delimiter(self.delimiter);
        let root = copy.root;
        self.copy_into(source, &mut copy, root)?;
        Ok(copy)
    }

    fn check_duplicable(&self, id: NodeId) -> Result<(), NamespaceError> {
        let node = self.live(id)?;
        if node.value.as_ref().is_some_and(|v| !v.is_duplicable()) {
            let path = self.path_of(id).unwrap_or_else(|| node.key.clone());
            tracing::warn!("⚠️ Cannot duplicate '{}': value has no duplicate capability", path);
            return Err(NamespaceError::NotDuplicable(path));
        }
        node.children
            .values()
            .try_for_each(|child| self.check_duplicable(*child))
    }

    fn copy_into(
        &self,
        from: NodeId,
        target: &mut NamespaceTree<T>,
        to: NodeId,
    ) -> Result<(), NamespaceError> {
        let node = self.live(from)?;
        if let Some(value) = &node.value {
            let duplicated = value
                .try_duplicate()
                .ok_or_else(|| NamespaceError::NotDuplicable(node.key.clone()))?;
            if let Some(slot) = target.node_mut(to) {
                slot.value = Some(duplicated);
            }
        }
        for (key, child) in node.children.iter() {
            let copy = target.add_child(to, key);
            self.copy_into(*child, target, copy)?;
        }
        Ok(())
    }

    /// Moves the top-level children of `other` below `target`.
    ///
    /// All-or-nothing: if any of them collides with an existing child of
    /// `target`, nothing is moved and `other` is returned untouched.
    pub fn graft(
        &mut self,
        target: NodeId,
        mut other: NamespaceTree<T>,
    ) -> Result<(), (NamespaceError, NamespaceTree<T>)> {
        if let Err(e) = self.live(target) {
            return Err((e, other));
        }
        let other_root = other.root;
        let keys: Vec<(String, NodeId)> = match other.node_ref(other_root) {
            Some(root) => root
                .children
                .iter()
                .map(|(k, id)| (k.to_string(), *id))
                .collect(),
            None => Vec::new(),
        };
        if let Some((key, _)) = keys.iter().find(|(k, _)| self.child(target, k).is_some()) {
            return Err((NamespaceError::AlreadyExists(key.clone()), other));
        }

        for (_, id) in keys {
            other.move_subtree(id, self, target);
        }
        Ok(())
    }

    fn move_subtree(&mut self, id: NodeId, target: &mut NamespaceTree<T>, under: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        self.free.push(id.0);
        let new_id = target.add_child(under, &node.key);
        if let Some(slot) = target.node_mut(new_id) {
            slot.value = node.value;
        }
        for child in node.children.values() {
            self.move_subtree(*child, target, new_id);
        }
    }

    /// Mutable access to every owned value in the tree, in arena order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.nodes
            .iter_mut()
            .flatten()
            .filter_map(|node| node.value.as_mut().and_then(NodeValue::get_mut))
    }

    /// Every value-bearing node as `(full path, value)`, depth first.
    pub fn entries(&self) -> Vec<(String, &T)> {
        let mut out = Vec::new();
        self.collect_entries(self.root, &mut out);
        out
    }

    fn collect_entries<'a>(&'a self, id: NodeId, out: &mut Vec<(String, &'a T)>) {
        if let Some(value) = self.value(id) {
            if let Some(path) = self.path_of(id) {
                out.push((path, value));
            }
        }
        for child in self.children(id) {
            self.collect_entries(child, out);
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
        let Some(node) = self.node_ref(id) else {
            return Ok(());
        };
        let marker = if node.value.is_some() { " *" } else { "" };
        writeln!(f, "{:indent$}{}{}", "", node.key, marker, indent = depth * 2)?;
        for child in node.children.values() {
            self.fmt_node(f, *child, depth + 1)?;
        }
        Ok(())
    }
}

impl<T> fmt::Debug for NamespaceTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceTree")
            .field("nodes", &self.len())
            .field("delimiter", &self.delimiter)
            .finish()
    }
}

/// Indented dump of the tree; nodes holding a value are marked with `*`.
impl<T> fmt::Display for NamespaceTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, self.root, 0)
    }
}

/// Checks that `name` only uses `[0-9A-Za-z_]` and the delimiter.
pub fn is_valid_name(name: &str, delimiter: char) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == delimiter)
}

/// [`is_valid_name`] plus no empty segment: `a..b`, `a.` and `.a` are
/// refused, as is the empty string.
pub fn is_valid_path(path: &str, delimiter: char) -> bool {
    is_valid_name(path, delimiter) && path.split(delimiter).all(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("this.is.valid", '.'));
        assert!(is_valid_name("this_is.valid", '.'));
        assert!(is_valid_name("Plugin_42.tick", '.'));
        assert!(!is_valid_name("this is invalid", '.'));
        assert!(!is_valid_name("this-is.invalid", '.'));
        assert!(is_valid_name("a/b", '/'));
        assert!(!is_valid_name("a.b", '/'));
    }

    #[test]
    fn test_set_then_get() {
        let mut tree = NamespaceTree::new();
        tree.set("a.b.c", NodeValue::owned(7)).unwrap();
        assert_eq!(tree.get("a.b.c"), Some(&7));

        // Intermediate nodes exist without values
        let a = tree.node("a").unwrap();
        let b = tree.node("a.b").unwrap();
        assert!(tree.value(a).is_none());
        assert!(tree.value(b).is_none());
        assert_eq!(tree.parent(b), Some(a));
        assert_eq!(tree.path_of(tree.node("a.b.c").unwrap()).unwrap(), "a.b.c");
    }

    #[test]
    fn test_get_does_not_create() {
        let mut tree: NamespaceTree<i32> = NamespaceTree::new();
        tree.set("a.b", NodeValue::owned(1)).unwrap();
        let before = tree.len();
        assert!(tree.get("a.x.y").is_none());
        assert!(tree.get("").is_none());
        assert_eq!(tree.len(), before);
    }

    #[test]
    fn test_set_existing_value_fails() {
        let mut tree = NamespaceTree::new();
        tree.set("a.b", NodeValue::owned(1)).unwrap();
        let err = tree.set("a.b", NodeValue::owned(2)).unwrap_err();
        assert_eq!(err, NamespaceError::AlreadyExists("a.b".to_string()));
        assert_eq!(tree.get("a.b"), Some(&1));

        // An intermediate node can still receive a value
        tree.set("a", NodeValue::owned(3)).unwrap();
        assert_eq!(tree.get("a"), Some(&3));
    }

    #[test]
    fn test_invalid_paths() {
        let mut tree = NamespaceTree::new();
        assert!(matches!(
            tree.set("a..b", NodeValue::owned(1)),
            Err(NamespaceError::InvalidPath(_))
        ));
        assert!(matches!(
            tree.set("", NodeValue::owned(1)),
            Err(NamespaceError::InvalidPath(_))
        ));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_custom_delimiter() {
        let mut tree = NamespaceTree::with_delimiter('/');
        tree.set("x/y", NodeValue::owned("v")).unwrap();
        assert_eq!(tree.get("x/y"), Some(&"v"));
        assert!(tree.get("x.y").is_none());
    }

    #[test]
    fn test_duplicate_subtree() {
        let mut tree = NamespaceTree::new();
        tree.set("menu.title", NodeValue::cloneable("Main".to_string())).unwrap();
        tree.set("menu.items.first", NodeValue::cloneable("Play".to_string())).unwrap();
        tree.set("menu.items.second", NodeValue::shared(Arc::new("Quit".to_string())))
            .unwrap();

        let menu = tree.node("menu").unwrap();
        let copy = tree.duplicate_subtree(menu).unwrap();
        assert_eq!(copy.get("title").map(String::as_str), Some("Main"));
        assert_eq!(copy.get("items.first").map(String::as_str), Some("Play"));
        assert_eq!(copy.get("items.second").map(String::as_str), Some("Quit"));
        // Source untouched
        assert_eq!(tree.get("menu.title").map(String::as_str), Some("Main"));
    }

    #[test]
    fn test_duplicate_subtree_is_all_or_nothing() {
        let mut tree = NamespaceTree::new();
        tree.set("cfg.a", NodeValue::cloneable(1)).unwrap();
        tree.set("cfg.b.c", NodeValue::owned(2)).unwrap();
        tree.set("cfg.d", NodeValue::cloneable(3)).unwrap();
        let before = tree.to_string();
        let len = tree.len();

        let cfg = tree.node("cfg").unwrap();
        let err = tree.duplicate_subtree(cfg).unwrap_err();
        assert_eq!(err, NamespaceError::NotDuplicable("cfg.b.c".to_string()));
        assert_eq!(tree.to_string(), before);
        assert_eq!(tree.len(), len);
        assert_eq!(tree.get("cfg.b.c"), Some(&2));
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut tree: NamespaceTree<i32> = NamespaceTree::new();
        tree.set("a.b.c", NodeValue::owned(1)).unwrap();
        let a = tree.node("a").unwrap();
        let c = tree.node("a.b.c").unwrap();

        assert!(matches!(tree.reparent(a, a), Err(NamespaceError::Cycle(_))));
        assert!(matches!(tree.reparent(a, c), Err(NamespaceError::Cycle(_))));
        assert!(matches!(tree.reparent(tree.root(), c), Err(NamespaceError::Cycle(_))));
        assert_eq!(tree.get("a.b.c"), Some(&1));
    }

    #[test]
    fn test_reparent_moves_subtree() {
        let mut tree = NamespaceTree::new();
        tree.set("a.b.c", NodeValue::owned(1)).unwrap();
        tree.set("x", NodeValue::owned(2)).unwrap();
        let b = tree.node("a.b").unwrap();
        let x = tree.node("x").unwrap();

        tree.reparent(b, x).unwrap();
        assert_eq!(tree.get("x.b.c"), Some(&1));
        assert!(tree.get("a.b.c").is_none());
        assert!(tree.node("a").is_some());
        assert!(tree.is_descendant(tree.node("x.b.c").unwrap(), x));
    }

    #[test]
    fn test_reparent_refuses_key_clash() {
        let mut tree = NamespaceTree::new();
        tree.set("a.k", NodeValue::owned(1)).unwrap();
        tree.set("b.k", NodeValue::owned(2)).unwrap();
        let ak = tree.node("a.k").unwrap();
        let b = tree.node("b").unwrap();
        assert!(matches!(tree.reparent(ak, b), Err(NamespaceError::AlreadyExists(_))));
        assert_eq!(tree.get("a.k"), Some(&1));
        assert_eq!(tree.get("b.k"), Some(&2));
    }

    #[test]
    fn test_remove_prunes_empty_ancestors() {
        let mut tree = NamespaceTree::new();
        tree.set("plugin.events.tick", NodeValue::owned(1)).unwrap();
        tree.set("plugin.value", NodeValue::owned(2)).unwrap();

        let removed = tree.remove("plugin.events.tick").unwrap();
        assert_eq!(removed.and_then(NodeValue::into_owned), Some(1));
        assert!(tree.node("plugin.events").is_none());
        assert!(tree.node("plugin").is_some());

        tree.remove("plugin.value").unwrap();
        assert!(tree.node("plugin").is_none());
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
        assert!(matches!(tree.remove("plugin"), Err(NamespaceError::NotFound(_))));
    }

    #[test]
    fn test_remove_value_keeps_children() {
        let mut tree = NamespaceTree::new();
        tree.set("a.tick", NodeValue::owned(1)).unwrap();
        tree.set("a.tick.fast", NodeValue::owned(2)).unwrap();

        let removed = tree.remove_value("a.tick").unwrap();
        assert_eq!(removed.and_then(NodeValue::into_owned), Some(1));
        assert_eq!(tree.get("a.tick"), None);
        assert_eq!(tree.get("a.tick.fast"), Some(&2));

        // The emptied chain goes once its last value is gone
        tree.remove_value("a.tick.fast").unwrap();
        assert!(tree.node("a").is_none());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_path_validation() {
        assert!(is_valid_path("plugin.event", '.'));
        assert!(!is_valid_path("", '.'));
        assert!(!is_valid_path("plugin.", '.'));
        assert!(!is_valid_path(".plugin", '.'));
        assert!(!is_valid_path("x..y", '.'));
        assert!(!is_valid_path("x y", '.'));
        assert!(is_valid_path("x/y", '/'));
        assert!(!is_valid_path("x//y", '/'));
    }

    #[test]
    fn test_destroy_recycles_slots() {
        let mut tree = NamespaceTree::new();
        tree.set("a.b", NodeValue::owned(1)).unwrap();
        let a = tree.node("a").unwrap();
        tree.destroy(a).unwrap();
        assert_eq!(tree.len(), 1);
        tree.set("c.d", NodeValue::owned(2)).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get("c.d"), Some(&2));
        // The old id is no longer valid for "a"
        assert!(tree.node("a").is_none());
    }

    #[test]
    fn test_graft_duplicated_children() {
        let mut tree = NamespaceTree::new();
        tree.set("template.color", NodeValue::cloneable("red")).unwrap();
        tree.set("template.size", NodeValue::cloneable("large")).unwrap();
        tree.set("button.size", NodeValue::cloneable("small")).unwrap();
        tree.set("label", NodeValue::owned("x")).unwrap();

        let template = tree.node("template").unwrap();
        let label = tree.node("label").unwrap();
        let button = tree.node("button").unwrap();

        // Clash on "size": nothing moves
        let copy = tree.duplicate_subtree(template).unwrap();
        let (err, _) = tree.graft(button, copy).unwrap_err();
        assert_eq!(err, NamespaceError::AlreadyExists("size".to_string()));
        assert!(tree.node("button.color").is_none());

        let copy = tree.duplicate_subtree(template).unwrap();
        tree.graft(label, copy).unwrap();
        assert_eq!(tree.get("label.color"), Some(&"red"));
        assert_eq!(tree.get("label.size"), Some(&"large"));
        assert_eq!(tree.get("template.color"), Some(&"red"));
    }

    #[test]
    fn test_entries_and_display() {
        let mut tree = NamespaceTree::new();
        tree.set("a.b", NodeValue::owned(1)).unwrap();
        tree.set("c", NodeValue::owned(2)).unwrap();
        let mut entries: Vec<(String, i32)> =
            tree.entries().into_iter().map(|(p, v)| (p, *v)).collect();
        entries.sort();
        assert_eq!(entries, vec![("a.b".to_string(), 1), ("c".to_string(), 2)]);

        let dump = tree.to_string();
        assert!(dump.starts_with("root\n"));
        assert!(dump.contains("    b *"));
    }
}
