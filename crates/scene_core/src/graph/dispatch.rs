//! Listener registration and event delivery
//!
//! Three delivery modes:
//! - [`Graph::dispatch_event`]: capture listeners of the ancestors root
//!   first, then the target, then (when bubbling) the regular listeners of
//!   the ancestors parent first
//! - [`Graph::dispatch_event_to_target_only`]: the target's listeners only
//! - [`Graph::broadcast_event`]: every node of the target's subtree in
//!   pre-order, capture listeners before regular ones on each node
//!
//! A handler returning true stops dispatch from reaching further nodes; the
//! remaining handlers of the current node still run. Broadcast ignores the
//! return value.

use std::rc::Rc;

use super::{Graph, GraphError};
use crate::events::{Event, EventHandler, EventPhase, EventType};
use crate::foundation::collections::{ListenerId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerKind {
    Capture,
    Regular,
}

impl Graph {
    /// Register a handler for `event_type` on `node`
    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        event_type: EventType,
        handler: impl EventHandler + 'static,
    ) -> Result<ListenerId, GraphError> {
        self.register(node, event_type, Rc::new(handler), ListenerKind::Regular)
    }

    /// Register a handler that runs while an event travels down to a
    /// descendant, before the target's own handlers
    pub fn add_capture_listener(
        &mut self,
        node: NodeId,
        event_type: EventType,
        handler: impl EventHandler + 'static,
    ) -> Result<ListenerId, GraphError> {
        self.register(node, event_type, Rc::new(handler), ListenerKind::Capture)
    }

    /// Unregister a handler, returns whether it was registered on `node`
    pub fn remove_event_listener(&mut self, node: NodeId, id: ListenerId) -> bool {
        self.nodes
            .get_mut(node)
            .is_some_and(|data| data.listeners.remove(id) | data.captures.remove(id))
    }

    fn register(
        &mut self,
        node: NodeId,
        event_type: EventType,
        handler: Rc<dyn EventHandler>,
        kind: ListenerKind,
    ) -> Result<ListenerId, GraphError> {
        self.data(node)?;
        self.next_listener += 1;
        let id = ListenerId::new(self.next_listener);
        let data = self.data_mut(node)?;
        match kind {
            ListenerKind::Capture => data.captures.add(event_type, id, handler),
            ListenerKind::Regular => data.listeners.add(event_type, id, handler),
        }
        Ok(id)
    }

    /// Deliver `event` to its target, bubbling to the ancestors if `bubble`
    pub fn dispatch_event(&mut self, event: &Event, bubble: bool) -> Result<(), GraphError> {
        let target = event.target;
        let mut ancestors = self.path(target);
        if ancestors.pop().is_none() {
            return Err(GraphError::UnknownNode(target));
        }

        for &ancestor in &ancestors {
            if self.invoke(ancestor, ListenerKind::Capture, event, EventPhase::Capturing) {
                return Ok(());
            }
        }

        let captured = self.invoke(target, ListenerKind::Capture, event, EventPhase::AtTarget);
        let consumed = self.invoke(target, ListenerKind::Regular, event, EventPhase::AtTarget);
        if captured || consumed || !bubble {
            return Ok(());
        }

        for &ancestor in ancestors.iter().rev() {
            if self.invoke(ancestor, ListenerKind::Regular, event, EventPhase::Bubbling) {
                break;
            }
        }
        Ok(())
    }

    /// Deliver `event` to the regular listeners of its target alone
    ///
    /// Capture listeners do not run.
    pub fn dispatch_event_to_target_only(&mut self, event: &Event) -> Result<(), GraphError> {
        self.data(event.target)?;
        self.invoke(event.target, ListenerKind::Regular, event, EventPhase::AtTarget);
        Ok(())
    }

    /// Deliver `event` to every node of its target's subtree, pre-order
    ///
    /// Children are read when their parent is reached, so nodes a handler
    /// appends below an unvisited node are visited too, and nodes removed
    /// before being reached are skipped.
    pub fn broadcast_event(&mut self, event: &Event) -> Result<(), GraphError> {
        self.data(event.target)?;
        let mut stack = vec![event.target];
        while let Some(node) = stack.pop() {
            if !self.contains(node) {
                continue;
            }
            let phase = if node == event.target {
                EventPhase::AtTarget
            } else {
                EventPhase::Capturing
            };
            self.invoke(node, ListenerKind::Capture, event, phase);
            self.invoke(node, ListenerKind::Regular, event, phase);
            stack.extend(self.children(node).iter().rev().copied());
        }
        Ok(())
    }

    /// Run the handlers of one node, returns whether any consumed the event
    fn invoke(&mut self, node: NodeId, kind: ListenerKind, event: &Event, phase: EventPhase) -> bool {
        let handlers = match (self.nodes.get(node), kind) {
            (Some(data), ListenerKind::Capture) => data.captures.snapshot(event.event_type),
            (Some(data), ListenerKind::Regular) => data.listeners.snapshot(event.event_type),
            (None, _) => return false,
        };
        if handlers.is_empty() {
            return false;
        }
        if self.config.trace_dispatch {
            log::trace!(
                "{} at {} ({phase:?}, {} handlers)",
                event.event_type.name(),
                self.name(node).unwrap_or_default(),
                handlers.len()
            );
        }

        let mut current = event.clone();
        current.current_target = node;
        current.phase = phase;
        let mut consumed = false;
        for handler in handlers {
            consumed |= handler.on_event(self, &current);
        }
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    type Log = Rc<RefCell<Vec<(String, EventPhase)>>>;

    fn recorder(log: &Log, label: &str, consume: bool) -> impl EventHandler + 'static {
        let log = Rc::clone(log);
        let label = label.to_owned();
        move |_: &mut Graph, event: &Event| {
            log.borrow_mut().push((label.clone(), event.phase));
            consume
        }
    }

    fn tree(graph: &mut Graph) -> (NodeId, NodeId, NodeId) {
        let root = graph.create_node("root");
        let mid = graph.create_node("mid");
        let leaf = graph.create_node("leaf");
        graph.add_child(root, mid).unwrap();
        graph.add_child(mid, leaf).unwrap();
        (root, mid, leaf)
    }

    fn labels(log: &Log) -> Vec<String> {
        log.borrow().iter().map(|(label, _)| label.clone()).collect()
    }

    #[test]
    fn test_dispatch_order_capture_target_bubble() {
        let mut graph = Graph::new();
        let (root, mid, leaf) = tree(&mut graph);
        let log = Log::default();
        for (node, name) in [(root, "root"), (mid, "mid"), (leaf, "leaf")] {
            graph
                .add_capture_listener(node, EventType::Mutate, recorder(&log, &format!("{name}-capture"), false))
                .unwrap();
            graph
                .add_event_listener(node, EventType::Mutate, recorder(&log, name, false))
                .unwrap();
        }

        graph.dispatch_event(&Event::new(EventType::Mutate, leaf), true).unwrap();

        assert_eq!(
            labels(&log),
            ["root-capture", "mid-capture", "leaf-capture", "leaf", "mid", "root"]
        );
        let phases: Vec<EventPhase> = log.borrow().iter().map(|(_, phase)| *phase).collect();
        assert_eq!(
            phases,
            [
                EventPhase::Capturing,
                EventPhase::Capturing,
                EventPhase::AtTarget,
                EventPhase::AtTarget,
                EventPhase::Bubbling,
                EventPhase::Bubbling,
            ]
        );
    }

    #[test]
    fn test_consumed_event_stops_bubbling() {
        let mut graph = Graph::new();
        let (root, mid, leaf) = tree(&mut graph);
        let log = Log::default();
        graph.add_event_listener(leaf, EventType::Mutate, recorder(&log, "leaf", false)).unwrap();
        graph.add_event_listener(mid, EventType::Mutate, recorder(&log, "mid", true)).unwrap();
        graph.add_event_listener(mid, EventType::Mutate, recorder(&log, "mid-2", false)).unwrap();
        graph.add_event_listener(root, EventType::Mutate, recorder(&log, "root", false)).unwrap();

        graph.dispatch_event(&Event::new(EventType::Mutate, leaf), true).unwrap();

        assert_eq!(labels(&log), ["leaf", "mid", "mid-2"]);
    }

    #[test]
    fn test_without_bubble_only_target_handlers_run() {
        let mut graph = Graph::new();
        let (root, _, leaf) = tree(&mut graph);
        let log = Log::default();
        graph.add_event_listener(leaf, EventType::Mutate, recorder(&log, "leaf", false)).unwrap();
        graph.add_event_listener(root, EventType::Mutate, recorder(&log, "root", false)).unwrap();

        graph.dispatch_event(&Event::new(EventType::Mutate, leaf), false).unwrap();
        graph.dispatch_event_to_target_only(&Event::new(EventType::Mutate, leaf)).unwrap();

        assert_eq!(labels(&log), ["leaf", "leaf"]);
    }

    #[test]
    fn test_target_only_dispatch_skips_capture_listeners() {
        let mut graph = Graph::new();
        let (root, _, leaf) = tree(&mut graph);
        let log = Log::default();
        graph
            .add_capture_listener(root, EventType::Mutate, recorder(&log, "root-capture", false))
            .unwrap();
        graph
            .add_capture_listener(leaf, EventType::Mutate, recorder(&log, "leaf-capture", true))
            .unwrap();
        graph.add_event_listener(leaf, EventType::Mutate, recorder(&log, "leaf", false)).unwrap();

        graph.dispatch_event_to_target_only(&Event::new(EventType::Mutate, leaf)).unwrap();

        assert_eq!(labels(&log), ["leaf"]);
    }

    #[test]
    fn test_broadcast_is_pre_order_and_ignores_ancestors() {
        let mut graph = Graph::new();
        let (root, mid, leaf) = tree(&mut graph);
        let sibling = graph.create_node("sibling");
        graph.add_child(root, sibling).unwrap();
        let log = Log::default();
        for (node, name) in [(root, "root"), (mid, "mid"), (leaf, "leaf"), (sibling, "sibling")] {
            graph
                .add_event_listener(node, EventType::NodeDeserialized, recorder(&log, name, true))
                .unwrap();
        }

        graph.broadcast_event(&Event::new(EventType::NodeDeserialized, root)).unwrap();
        assert_eq!(labels(&log), ["root", "mid", "leaf", "sibling"]);

        log.borrow_mut().clear();
        graph.broadcast_event(&Event::new(EventType::NodeDeserialized, mid)).unwrap();
        assert_eq!(labels(&log), ["mid", "leaf"]);
    }

    #[test]
    fn test_child_append_reaches_each_descendant_once() {
        let mut graph = Graph::new();
        let parent = graph.create_node("parent");
        let subtree = graph.create_node("subtree");
        let kids: Vec<NodeId> = (0..3).map(|i| graph.create_node(format!("kid{i}"))).collect();
        for &kid in &kids {
            graph.add_child(subtree, kid).unwrap();
        }
        let log = Log::default();
        for &node in kids.iter().chain([&subtree, &parent]) {
            let name = graph.name(node).unwrap().to_owned();
            graph.add_event_listener(node, EventType::ChildAppend, recorder(&log, &name, false)).unwrap();
        }

        graph.add_child(parent, subtree).unwrap();

        assert_eq!(labels(&log), ["subtree", "kid0", "kid1", "kid2"]);
    }

    #[test]
    fn test_handler_may_restructure_during_broadcast() {
        let mut graph = Graph::new();
        let (root, mid, leaf) = tree(&mut graph);
        let log = Log::default();
        graph
            .add_event_listener(mid, EventType::NodeDeserialized, move |graph: &mut Graph, _: &Event| {
                graph.remove_child(mid, leaf).unwrap();
                false
            })
            .unwrap();
        graph
            .add_event_listener(leaf, EventType::NodeDeserialized, recorder(&log, "leaf", false))
            .unwrap();

        graph.broadcast_event(&Event::new(EventType::NodeDeserialized, root)).unwrap();

        assert!(labels(&log).is_empty());
        assert_eq!(graph.parent(leaf), None);
    }

    #[test]
    fn test_remove_event_listener() {
        let mut graph = Graph::new();
        let node = graph.create_node("node");
        let log = Log::default();
        let id = graph.add_event_listener(node, EventType::Mutate, recorder(&log, "node", false)).unwrap();

        assert!(graph.remove_event_listener(node, id));
        assert!(!graph.remove_event_listener(node, id));
        graph.dispatch_event(&Event::new(EventType::Mutate, node), true).unwrap();
        assert!(labels(&log).is_empty());
    }

    #[test]
    fn test_unknown_target_is_an_error() {
        let mut graph = Graph::new();
        let node = graph.create_node("node");
        graph.destroy_node(node).unwrap();
        let event = Event::new(EventType::Mutate, node);
        assert_eq!(graph.dispatch_event(&event, true), Err(GraphError::UnknownNode(node)));
        assert_eq!(graph.broadcast_event(&event), Err(GraphError::UnknownNode(node)));
    }
}
