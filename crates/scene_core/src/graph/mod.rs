//! # Node graph
//!
//! Arena owning every node and component of a scene. Nodes form a forest:
//! each node has at most one parent, an ordered list of children and its
//! attached components grouped by type name. All links are [`NodeId`] and
//! [`ComponentId`] handles into the arena, so there are no ownership cycles
//! and stale handles are detected instead of dangling.
//!
//! ## Submodules
//!
//! - `structure`: parenting with cycle guard, removal and destruction
//! - `attach`: component attach/detach with singleton enforcement
//! - `dispatch`: listener registration, dispatch, bubbling and broadcast
//! - `traverse`: pre-order walks, hierarchy dump, world matrices
//! - `animate`: mutation entry points that emit MUTATE events
//! - `persist`: node serialization through the [`Serializer`](crate::serialize::Serializer)

mod animate;
mod attach;
mod dispatch;
mod persist;
mod structure;
mod traverse;

pub use attach::AttachError;
pub use persist::{GraphLoad, LoadReport, NODE_TYPE};
pub use traverse::{GraphIter, GraphWalker};

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::core::config::EventConfig;
use crate::events::Listeners;
use crate::foundation::collections::{ComponentId, NodeId, SlotMap};
use crate::mutate::{FieldApplyError, Mutable, Mutator, MutatorValue};
use crate::components::Component;

/// What a structural operation expected to find attached to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// A child node
    Child(NodeId),
    /// A component
    Component(ComponentId),
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Child(node) => write!(f, "child {node:?}"),
            Self::Component(component) => write!(f, "component {component:?}"),
        }
    }
}

/// Graph errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The node handle is stale or from another graph
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    /// The component handle is stale or from another graph
    #[error("component {0:?} does not exist")]
    UnknownComponent(ComponentId),

    /// A second instance of a singleton component type was attached
    #[error("node {node:?} already has a `{type_name}`, which allows a single instance")]
    SingletonViolation {
        /// Node that already holds an instance
        node: NodeId,
        /// Component type name
        type_name: &'static str,
    },

    /// The requested parenting would make a node its own ancestor
    #[error("appending {child:?} to {parent:?} would create a cycle")]
    CycleRejected {
        /// Requested parent
        parent: NodeId,
        /// Requested child
        child: NodeId,
    },

    /// The node does not hold the child or component named in the request
    #[error("{target} is not attached to node {owner:?}")]
    StructuralMismatch {
        /// Node the request was made on
        owner: NodeId,
        /// What was expected to be attached
        target: Attachment,
    },
}

/// A node of the graph
pub struct NodeData {
    name: String,
    active: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    components: IndexMap<&'static str, Vec<ComponentId>>,
    listeners: Listeners,
    captures: Listeners,
}

impl NodeData {
    fn new(name: String) -> Self {
        Self {
            name,
            active: true,
            parent: None,
            children: Vec::new(),
            components: IndexMap::new(),
            listeners: Listeners::default(),
            captures: Listeners::default(),
        }
    }

    /// Node name, not necessarily unique
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the node itself is active
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Parent node
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Component type names present on the node, with their instances
    pub fn component_types(&self) -> impl Iterator<Item = (&'static str, &[ComponentId])> {
        self.components.iter().map(|(name, ids)| (*name, ids.as_slice()))
    }
}

impl fmt::Debug for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeData")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

impl Mutable for NodeData {
    fn mutator(&self) -> Mutator {
        Mutator::new()
            .with("name", self.name.as_str())
            .with("active", self.active)
    }

    fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
        match key {
            "name" => self.name = value.expect_str(key)?.to_owned(),
            "active" => self.active = value.expect_bool(key)?,
            _ => return Err(FieldApplyError::unknown(key)),
        }
        Ok(())
    }
}

/// Arena of nodes and components
pub struct Graph {
    nodes: SlotMap<NodeId, NodeData>,
    components: SlotMap<ComponentId, Box<dyn Component>>,
    audio_listened: Option<NodeId>,
    next_listener: u64,
    config: EventConfig,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::with_config(EventConfig::default())
    }

    /// Create an empty graph with explicit event settings
    pub fn with_config(config: EventConfig) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            components: SlotMap::with_key(),
            audio_listened: None,
            next_listener: 0,
            config,
        }
    }

    /// Event settings
    pub const fn config(&self) -> &EventConfig {
        &self.config
    }

    /// Create a detached node
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let name = name.into();
        log::trace!("Creating node {name}");
        self.nodes.insert(NodeData::new(name))
    }

    /// Whether the handle refers to a live node
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Node data
    pub fn node(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node)
    }

    pub(crate) fn data(&self, node: NodeId) -> Result<&NodeData, GraphError> {
        self.nodes.get(node).ok_or(GraphError::UnknownNode(node))
    }

    pub(crate) fn data_mut(&mut self, node: NodeId) -> Result<&mut NodeData, GraphError> {
        self.nodes.get_mut(node).ok_or(GraphError::UnknownNode(node))
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of attached components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Nodes without a parent
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, data)| data.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Node name
    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).map(NodeData::name)
    }

    /// Rename a node
    pub fn set_name(&mut self, node: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        self.data_mut(node)?.name = name.into();
        Ok(())
    }

    /// Parent of a node
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.parent
    }

    /// Children of a node in order, empty for unknown nodes
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node).map_or(&[], NodeData::children)
    }

    /// Child at `index`
    pub fn child(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.children(node).get(index).copied()
    }

    /// Number of children
    pub fn n_children(&self, node: NodeId) -> usize {
        self.children(node).len()
    }

    /// Position of `child` among the children of `parent`
    pub fn find_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    /// Children of `parent` with the given name, in order
    pub fn children_by_name(&self, parent: NodeId, name: &str) -> Vec<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|&child| self.name(child) == Some(name))
            .collect()
    }

    /// Root of the tree containing `node`
    pub fn ancestor(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        self.nodes.get(current)?;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        Some(current)
    }

    /// Nodes from the root down to and including `node`
    pub fn path(&self, node: NodeId) -> Vec<NodeId> {
        if !self.contains(node) {
            return Vec::new();
        }
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return self.contains(candidate);
            }
            current = self.parent(candidate);
        }
        false
    }

    /// Whether the node itself is active
    pub fn is_active(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(NodeData::is_active)
    }

    /// Mark the root of the audio graph; appends and removals below it emit
    /// audio graph events
    pub fn set_audio_listened(&mut self, node: Option<NodeId>) {
        self.audio_listened = node;
    }

    /// Root of the audio graph
    pub const fn audio_listened(&self) -> Option<NodeId> {
        self.audio_listened
    }

    fn in_audio_graph(&self, node: NodeId) -> bool {
        self.config.audio_graph_events
            && self
                .audio_listened
                .is_some_and(|root| self.is_descendant_of(node, root))
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("components", &self.components.len())
            .field("audio_listened", &self.audio_listened)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_on_small_tree() {
        let mut graph = Graph::new();
        let root = graph.create_node("root");
        let a = graph.create_node("a");
        let b = graph.create_node("b");
        let leaf = graph.create_node("leaf");
        graph.add_child(root, a).unwrap();
        graph.add_child(root, b).unwrap();
        graph.add_child(b, leaf).unwrap();

        assert_eq!(graph.children(root), [a, b]);
        assert_eq!(graph.child(root, 1), Some(b));
        assert_eq!(graph.n_children(b), 1);
        assert_eq!(graph.find_child(root, b), Some(1));
        assert_eq!(graph.find_child(a, b), None);
        assert_eq!(graph.ancestor(leaf), Some(root));
        assert_eq!(graph.path(leaf), [root, b, leaf]);
        assert!(graph.is_descendant_of(leaf, root));
        assert!(graph.is_descendant_of(leaf, leaf));
        assert!(!graph.is_descendant_of(a, b));
        assert_eq!(graph.roots(), [root]);
    }

    #[test]
    fn test_children_by_name() {
        let mut graph = Graph::new();
        let root = graph.create_node("root");
        for name in ["wheel", "body", "wheel"] {
            let child = graph.create_node(name);
            graph.add_child(root, child).unwrap();
        }
        assert_eq!(graph.children_by_name(root, "wheel").len(), 2);
        assert!(graph.children_by_name(root, "door").is_empty());
    }

    #[test]
    fn test_stale_handle_is_reported() {
        let mut graph = Graph::new();
        let node = graph.create_node("gone");
        graph.destroy_node(node).unwrap();

        assert!(!graph.contains(node));
        assert_eq!(graph.set_name(node, "x"), Err(GraphError::UnknownNode(node)));
        assert!(graph.children(node).is_empty());
        assert!(graph.path(node).is_empty());
        assert_eq!(graph.ancestor(node), None);
    }

    #[test]
    fn test_node_mutator() {
        let mut graph = Graph::new();
        let node = graph.create_node("lamp");
        let data = graph.node(node).unwrap();
        assert_eq!(data.mutator().string("name"), Some("lamp"));
        assert_eq!(data.mutator().boolean("active"), Some(true));
    }
}
