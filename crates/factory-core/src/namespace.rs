//! Namespace registry
//!
//! A tree keyed by dotted path segments. Resolving a path walks the tree from
//! the root and creates any missing nodes, so resolution is not read-only.
//! Resolving the same path twice yields the identical node. A node may carry
//! a class as its payload and still act as a namespace for deeper paths.
//!
//! Registrations are append-only. Once a node has carried a class it is never
//! given to another one, even after that class is dropped. The payload itself
//! is held weakly because every class keeps its registry alive, so a node
//! whose class is gone reports no class but keeps the name claimed.

use crate::class::{ClassDescriptor, WeakClass};
use crate::{FactoryError, FactoryResult};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

struct NodeInner {
    name: String,
    parent: Weak<NodeInner>,
    children: RefCell<IndexMap<String, NamespaceNode>>,
    payload: RefCell<Option<WeakClass>>,
}

/// One segment of the namespace tree
#[derive(Clone)]
pub struct NamespaceNode(Rc<NodeInner>);

impl NamespaceNode {
    fn root() -> Self {
        NamespaceNode(Rc::new(NodeInner {
            name: String::new(),
            parent: Weak::new(),
            children: RefCell::new(IndexMap::new()),
            payload: RefCell::new(None),
        }))
    }

    /// Segment name (empty for the root)
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Parent node (None for the root)
    pub fn parent(&self) -> Option<NamespaceNode> {
        self.0.parent.upgrade().map(NamespaceNode)
    }

    /// Every node behaves as a namespace, including nodes carrying a class
    pub fn is_namespace(&self) -> bool {
        true
    }

    /// Check if this is the implicit root node
    pub fn is_root(&self) -> bool {
        self.0.parent.upgrade().is_none()
    }

    /// Full dotted path from the root
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if !node.is_root() {
                segments.push(node.name().to_string());
            }
            current = node.parent();
        }
        segments.reverse();
        segments.join(".")
    }

    /// Get a direct child
    pub fn child(&self, segment: &str) -> Option<NamespaceNode> {
        self.0.children.borrow().get(segment).cloned()
    }

    /// Names of direct children in creation order
    pub fn child_names(&self) -> Vec<String> {
        self.0.children.borrow().keys().cloned().collect()
    }

    fn child_or_create(&self, segment: &str) -> NamespaceNode {
        if let Some(existing) = self.child(segment) {
            return existing;
        }

        let node = NamespaceNode(Rc::new(NodeInner {
            name: segment.to_string(),
            parent: Rc::downgrade(&self.0),
            children: RefCell::new(IndexMap::new()),
            payload: RefCell::new(None),
        }));
        self.0
            .children
            .borrow_mut()
            .insert(segment.to_string(), node.clone());
        node
    }

    /// Attach a class as this node's payload
    ///
    /// The first payload wins; returns false if the node has ever carried a
    /// class.
    pub fn attach(&self, class: &ClassDescriptor) -> bool {
        let mut payload = self.0.payload.borrow_mut();
        if payload.is_some() {
            return false;
        }
        *payload = Some(class.downgrade());
        true
    }

    /// Class carried by this node, if any is still alive
    pub fn class(&self) -> Option<ClassDescriptor> {
        self.0.payload.borrow().as_ref().and_then(WeakClass::upgrade)
    }

    /// Check if a class has ever been attached to this node
    pub fn is_claimed(&self) -> bool {
        self.0.payload.borrow().is_some()
    }

    /// Check whether both handles refer to the same node
    pub fn ptr_eq(&self, other: &NamespaceNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for NamespaceNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for NamespaceNode {}

impl fmt::Debug for NamespaceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceNode")
            .field("path", &self.path())
            .field("children", &self.child_names())
            .field("has_class", &self.class().is_some())
            .finish()
    }
}

/// Registry of namespace nodes
///
/// Cloning the registry shares the same tree.
#[derive(Clone, Debug)]
pub struct NamespaceRegistry {
    root: NamespaceNode,
}

impl NamespaceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            root: NamespaceNode::root(),
        }
    }

    /// The implicit empty-path root
    pub fn root(&self) -> &NamespaceNode {
        &self.root
    }

    /// Resolve a dotted path, creating missing nodes
    pub fn resolve(&self, path: &str) -> FactoryResult<NamespaceNode> {
        let segments = split_path(path)?;

        let mut current = self.root.clone();
        for segment in segments {
            current = current.child_or_create(segment);
        }
        Ok(current)
    }

    /// Resolve a dotted path and attach a class to the terminal node
    pub fn define(&self, path: &str, class: &ClassDescriptor) -> FactoryResult<NamespaceNode> {
        let node = self.resolve(path)?;
        if !node.attach(class) {
            tracing::debug!(path, "namespace node already carries a class");
        }
        Ok(node)
    }

    /// Look up a dotted path without creating anything
    pub fn get(&self, path: &str) -> Option<NamespaceNode> {
        let segments = split_path(path).ok()?;

        let mut current = self.root.clone();
        for segment in segments {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Check if a path has been resolved before
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Split and validate a dotted path
pub(crate) fn split_path(path: &str) -> FactoryResult<Vec<&str>> {
    if path.is_empty() {
        return Err(FactoryError::InvalidArgument(
            "namespace path must be a non-empty string".to_string(),
        ));
    }

    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.trim().is_empty()) {
        return Err(FactoryError::InvalidArgument(format!(
            "namespace path '{}' contains an empty segment",
            path
        )));
    }
    Ok(segments)
}
