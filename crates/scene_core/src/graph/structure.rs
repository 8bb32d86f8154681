//! Parenting, removal and destruction

use super::{Attachment, Graph, GraphError};
use crate::events::{Event, EventType};
use crate::foundation::collections::NodeId;

impl Graph {
    /// Append `child` to the children of `parent`
    ///
    /// A child that already has another parent is removed from it first.
    /// Appending a node to itself or to one of its descendants is rejected
    /// and leaves the graph unchanged. Appending an existing child again is a
    /// no-op. After linking, `ChildAppend` is broadcast to the child's
    /// subtree.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        self.data(parent)?;
        if self.data(child)?.parent == Some(parent) {
            return Ok(());
        }
        self.ensure_acyclic(parent, child)?;

        if let Some(previous) = self.parent(child) {
            self.remove_child(previous, child)?;
            // removal handlers may have restructured the graph
            self.data(parent)?;
            self.data(child)?;
            self.ensure_acyclic(parent, child)?;
            self.unlink(child);
        }

        self.data_mut(parent)?.children.push(child);
        self.data_mut(child)?.parent = Some(parent);
        log::debug!(
            "Appended {} to {}",
            self.name(child).unwrap_or_default(),
            self.name(parent).unwrap_or_default()
        );

        self.notify_append(child)
    }

    /// Remove `child` from the children of `parent`
    ///
    /// `ChildRemove` is broadcast to the child's subtree before the link is
    /// cut, so handlers still see the full ancestry.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        self.data(parent)?;
        if self.data(child)?.parent != Some(parent) {
            return Err(GraphError::StructuralMismatch {
                owner: parent,
                target: Attachment::Child(child),
            });
        }

        self.notify_removal(child)?;

        if self.parent(child) == Some(parent) {
            self.unlink(child);
            log::debug!(
                "Removed {} from {}",
                self.name(child).unwrap_or_default(),
                self.name(parent).unwrap_or_default()
            );
        }
        Ok(())
    }

    /// Put `replacement` at the position of `old` among the children of
    /// `parent`
    ///
    /// Events follow [`remove_child`](Self::remove_child) for `old` and
    /// [`add_child`](Self::add_child) for `replacement`.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, replacement: NodeId) -> Result<(), GraphError> {
        if old == replacement {
            return Ok(());
        }
        self.data(replacement)?;
        self.ensure_acyclic(parent, replacement)?;
        if self.find_child(parent, old).is_none() {
            return Err(GraphError::StructuralMismatch {
                owner: parent,
                target: Attachment::Child(old),
            });
        }
        if let Some(previous) = self.parent(replacement) {
            self.remove_child(previous, replacement)?;
        }
        self.notify_removal(old)?;

        // removal handlers may have restructured the graph
        self.data(replacement)?;
        self.ensure_acyclic(parent, replacement)?;
        self.unlink(replacement);
        let index = self.find_child(parent, old).ok_or(GraphError::StructuralMismatch {
            owner: parent,
            target: Attachment::Child(old),
        })?;
        self.data_mut(parent)?.children[index] = replacement;
        self.data_mut(old)?.parent = None;
        self.data_mut(replacement)?.parent = Some(parent);
        log::debug!(
            "Replaced {} with {} under {}",
            self.name(old).unwrap_or_default(),
            self.name(replacement).unwrap_or_default(),
            self.name(parent).unwrap_or_default()
        );

        self.notify_append(replacement)
    }

    /// Remove every child of `parent`, returning the removed nodes
    pub fn remove_all_children(&mut self, parent: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let children = self.data(parent)?.children.clone();
        let mut removed = Vec::with_capacity(children.len());
        for child in children {
            match self.remove_child(parent, child) {
                Ok(()) => removed.push(child),
                // moved or destroyed by an earlier handler
                Err(GraphError::StructuralMismatch { .. } | GraphError::UnknownNode(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(removed)
    }

    /// Detach `node` from its parent and drop it with its whole subtree
    ///
    /// Every component of the subtree receives `ComponentRemove` before it
    /// is dropped.
    pub fn destroy_node(&mut self, node: NodeId) -> Result<(), GraphError> {
        if let Some(parent) = self.data(node)?.parent {
            self.remove_child(parent, node)?;
        }
        let subtree: Vec<NodeId> = self.iter_graph(node).collect();
        for &id in subtree.iter().rev() {
            let components = self.all_components(id);
            for component in components {
                match self.remove_component(id, component) {
                    Ok(_) | Err(GraphError::UnknownComponent(_) | GraphError::UnknownNode(_)) => {}
                    Err(err) => return Err(err),
                }
            }
        }
        for id in subtree {
            self.unlink(id);
            self.nodes.remove(id);
            if self.audio_listened == Some(id) {
                self.audio_listened = None;
            }
        }
        Ok(())
    }

    fn notify_append(&mut self, child: NodeId) -> Result<(), GraphError> {
        self.broadcast_event(&Event::new(EventType::ChildAppend, child))?;
        if self.in_audio_graph(child) {
            self.broadcast_event(&Event::new(EventType::AudioChildAppend, child))?;
        }
        Ok(())
    }

    fn notify_removal(&mut self, child: NodeId) -> Result<(), GraphError> {
        self.broadcast_event(&Event::new(EventType::ChildRemove, child))?;
        if self.in_audio_graph(child) {
            self.broadcast_event(&Event::new(EventType::AudioChildRemove, child))?;
        }
        Ok(())
    }

    fn ensure_acyclic(&self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        if self.is_descendant_of(parent, child) {
            log::warn!("Rejected appending {child:?} to {parent:?}: cycle");
            return Err(GraphError::CycleRejected { parent, child });
        }
        Ok(())
    }

    /// Cut the parent link of `child` without events
    fn unlink(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get_mut(child).and_then(|data| data.parent.take()) else {
            return;
        };
        if let Some(data) = self.nodes.get_mut(parent) {
            data.children.retain(|&c| c != child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::components::ComponentTransform;

    fn chain(graph: &mut Graph, names: &[&str]) -> Vec<NodeId> {
        let nodes: Vec<NodeId> = names.iter().map(|name| graph.create_node(*name)).collect();
        for pair in nodes.windows(2) {
            graph.add_child(pair[0], pair[1]).unwrap();
        }
        nodes
    }

    #[test]
    fn test_cycle_is_rejected_without_changes() {
        let mut graph = Graph::new();
        let nodes = chain(&mut graph, &["a", "b", "c"]);
        let (a, b, c) = (nodes[0], nodes[1], nodes[2]);

        assert_eq!(
            graph.add_child(c, a),
            Err(GraphError::CycleRejected { parent: c, child: a })
        );
        assert_eq!(graph.add_child(a, a), Err(GraphError::CycleRejected { parent: a, child: a }));
        assert_eq!(graph.parent(a), None);
        assert_eq!(graph.children(a), [b]);
        assert_eq!(graph.children(b), [c]);
        assert!(graph.children(c).is_empty());
    }

    #[test]
    fn test_reparenting_removes_from_previous_parent() {
        let mut graph = Graph::new();
        let a = graph.create_node("a");
        let b = graph.create_node("b");
        let x = graph.create_node("x");
        graph.add_child(a, x).unwrap();
        graph.add_child(b, x).unwrap();

        assert!(graph.children(a).is_empty());
        assert_eq!(graph.children(b), [x]);
        assert_eq!(graph.parent(x), Some(b));
    }

    #[test]
    fn test_appending_twice_is_a_no_op() {
        let mut graph = Graph::new();
        let a = graph.create_node("a");
        let x = graph.create_node("x");
        graph.add_child(a, x).unwrap();
        graph.add_child(a, x).unwrap();
        assert_eq!(graph.children(a), [x]);
    }

    #[test]
    fn test_remove_unrelated_child_is_mismatch() {
        let mut graph = Graph::new();
        let a = graph.create_node("a");
        let x = graph.create_node("x");
        assert_eq!(
            graph.remove_child(a, x),
            Err(GraphError::StructuralMismatch {
                owner: a,
                target: Attachment::Child(x)
            })
        );
    }

    #[test]
    fn test_remove_child_handlers_still_see_ancestry() {
        let mut graph = Graph::new();
        let nodes = chain(&mut graph, &["root", "mid", "leaf"]);
        let (root, mid, leaf) = (nodes[0], nodes[1], nodes[2]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let record = Rc::clone(&seen);
        graph
            .add_event_listener(leaf, EventType::ChildRemove, move |graph: &mut Graph, _: &Event| {
                record.borrow_mut().push(graph.ancestor(leaf));
                false
            })
            .unwrap();

        graph.remove_child(root, mid).unwrap();

        assert_eq!(*seen.borrow(), [Some(root)]);
        assert_eq!(graph.ancestor(leaf), Some(mid));
    }

    #[test]
    fn test_replace_child_keeps_position() {
        let mut graph = Graph::new();
        let root = graph.create_node("root");
        let first = graph.create_node("first");
        let second = graph.create_node("second");
        let third = graph.create_node("third");
        for child in [first, second, third] {
            graph.add_child(root, child).unwrap();
        }
        let other = graph.create_node("other");
        graph.replace_child(root, second, other).unwrap();

        assert_eq!(graph.children(root), [first, other, third]);
        assert_eq!(graph.parent(second), None);
        assert_eq!(graph.parent(other), Some(root));
    }

    #[test]
    fn test_replace_with_sibling_moves_it() {
        let mut graph = Graph::new();
        let root = graph.create_node("root");
        let first = graph.create_node("first");
        let second = graph.create_node("second");
        graph.add_child(root, first).unwrap();
        graph.add_child(root, second).unwrap();

        graph.replace_child(root, first, second).unwrap();
        assert_eq!(graph.children(root), [second]);
        assert_eq!(graph.parent(first), None);
    }

    #[test]
    fn test_replace_rechecks_cycles_after_removal_handlers() {
        let mut graph = Graph::new();
        let root = graph.create_node("root");
        let old = graph.create_node("old");
        let replacement = graph.create_node("replacement");
        graph.add_child(root, old).unwrap();
        graph
            .add_event_listener(old, EventType::ChildRemove, move |graph: &mut Graph, _: &Event| {
                let _ = graph.add_child(replacement, root);
                false
            })
            .unwrap();

        let err = graph.replace_child(root, old, replacement).unwrap_err();

        assert_eq!(err, GraphError::CycleRejected { parent: root, child: replacement });
        assert_eq!(graph.parent(root), Some(replacement));
        assert_eq!(graph.children(root), [old]);
    }

    #[test]
    fn test_remove_all_children() {
        let mut graph = Graph::new();
        let root = graph.create_node("root");
        let kids: Vec<NodeId> = (0..3).map(|i| graph.create_node(format!("kid{i}"))).collect();
        for &kid in &kids {
            graph.add_child(root, kid).unwrap();
        }
        assert_eq!(graph.remove_all_children(root).unwrap(), kids);
        assert_eq!(graph.n_children(root), 0);
        assert!(kids.iter().all(|&kid| graph.parent(kid).is_none()));
    }

    #[test]
    fn test_destroy_node_drops_subtree_and_components() {
        let mut graph = Graph::new();
        let nodes = chain(&mut graph, &["root", "mid", "leaf"]);
        let (root, mid, leaf) = (nodes[0], nodes[1], nodes[2]);
        graph.add(leaf, ComponentTransform::default()).unwrap();

        graph.destroy_node(mid).unwrap();

        assert!(graph.contains(root));
        assert!(!graph.contains(mid));
        assert!(!graph.contains(leaf));
        assert!(graph.children(root).is_empty());
        assert_eq!(graph.component_count(), 0);
    }
}
