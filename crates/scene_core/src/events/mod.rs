//! Node event system
//!
//! Key principles:
//! - Events are addressed to a node of a [`Graph`] and carry typed detail
//! - Registration per node and event type (only interested handlers run)
//! - Three delivery modes: bubbling dispatch, target-only dispatch and
//!   broadcast to a whole subtree (see [`Graph::dispatch_event`])
//! - Handler returns bool (true = consumed, stops forwarding to further nodes)
//!
//! Handlers receive the graph mutably and may restructure it; delivery works
//! on snapshots of the handler lists and child lists taken before invoking.

use std::collections::HashMap;
use std::rc::Rc;

use crate::foundation::collections::{ComponentId, ListenerId, NodeId};
use crate::graph::Graph;
use crate::mutate::Mutator;

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A component was attached to the node
    ComponentAdd,
    /// A component is about to be detached from the node
    ComponentRemove,
    /// A component was activated
    ComponentActivate,
    /// A component was deactivated
    ComponentDeactivate,
    /// The node was appended to a parent
    ChildAppend,
    /// The node is about to be removed from its parent
    ChildRemove,
    /// A component or the node itself was mutated
    Mutate,
    /// The node was activated
    NodeActivate,
    /// The node was deactivated
    NodeDeactivate,
    /// The node's subtree was written to a serialization
    NodeSerialized,
    /// The node's subtree finished deserializing, resources included
    NodeDeserialized,
    /// A subtree joined the listened audio graph
    AudioChildAppend,
    /// A subtree is about to leave the listened audio graph
    AudioChildRemove,
}

impl EventType {
    /// Stable event name
    pub const fn name(self) -> &'static str {
        match self {
            Self::ComponentAdd => "componentAdd",
            Self::ComponentRemove => "componentRemove",
            Self::ComponentActivate => "componentActivate",
            Self::ComponentDeactivate => "componentDeactivate",
            Self::ChildAppend => "childAppend",
            Self::ChildRemove => "childRemove",
            Self::Mutate => "mutate",
            Self::NodeActivate => "nodeActivate",
            Self::NodeDeactivate => "nodeDeactivate",
            Self::NodeSerialized => "nodeSerialized",
            Self::NodeDeserialized => "nodeDeserialized",
            Self::AudioChildAppend => "childAppendToAudioGraph",
            Self::AudioChildRemove => "childRemoveFromAudioGraph",
        }
    }
}

/// Where in the delivery an event currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    /// Capture listeners of ancestors, root first
    Capturing,
    /// Listeners of the node the event was addressed to
    AtTarget,
    /// Listeners of ancestors, parent first
    Bubbling,
}

/// Typed payload of an event
#[derive(Debug, Clone, Default)]
pub enum EventDetail {
    /// No payload
    #[default]
    None,
    /// The component the event is about
    Component(ComponentId),
    /// The mutator that was applied, and the component it was applied to
    Mutator {
        /// Mutated component, `None` when the node itself was mutated
        component: Option<ComponentId>,
        /// Applied mutator
        mutator: Rc<Mutator>,
    },
}

/// Event addressed to a node
#[derive(Debug, Clone)]
pub struct Event {
    /// Type of event
    pub event_type: EventType,
    /// Node the event was addressed to
    pub target: NodeId,
    /// Node whose handlers are currently running
    pub current_target: NodeId,
    /// Current delivery phase
    pub phase: EventPhase,
    /// Payload
    pub detail: EventDetail,
}

impl Event {
    /// Create a new event addressed to `target`
    pub fn new(event_type: EventType, target: NodeId) -> Self {
        Self {
            event_type,
            target,
            current_target: target,
            phase: EventPhase::AtTarget,
            detail: EventDetail::None,
        }
    }

    /// Attach a payload (builder pattern)
    #[must_use]
    pub fn with_detail(mut self, detail: EventDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Component the event is about, if any
    pub const fn component(&self) -> Option<ComponentId> {
        match &self.detail {
            EventDetail::Component(id) => Some(*id),
            EventDetail::Mutator { component, .. } => *component,
            EventDetail::None => None,
        }
    }

    /// Applied mutator for [`EventType::Mutate`] events
    pub fn mutator(&self) -> Option<&Mutator> {
        match &self.detail {
            EventDetail::Mutator { mutator, .. } => Some(mutator),
            _ => None,
        }
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding to further nodes)
/// Returns false to allow forwarding
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&self, graph: &mut Graph, event: &Event) -> bool;
}

impl<F> EventHandler for F
where
    F: Fn(&mut Graph, &Event) -> bool,
{
    fn on_event(&self, graph: &mut Graph, event: &Event) -> bool {
        self(graph, event)
    }
}

/// Handlers registered on one node, per event type
#[derive(Default)]
pub(crate) struct Listeners {
    handlers: HashMap<EventType, Vec<(ListenerId, Rc<dyn EventHandler>)>>,
}

impl Listeners {
    /// Register a handler for a specific event type
    pub(crate) fn add(&mut self, event_type: EventType, id: ListenerId, handler: Rc<dyn EventHandler>) {
        self.handlers.entry(event_type).or_default().push((id, handler));
    }

    /// Remove a handler by id, returns whether it was found
    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let mut found = false;
        for handlers in self.handlers.values_mut() {
            let before = handlers.len();
            handlers.retain(|(existing, _)| *existing != id);
            found |= handlers.len() != before;
        }
        found
    }

    /// Snapshot of the handlers for `event_type`, in registration order
    pub(crate) fn snapshot(&self, event_type: EventType) -> Vec<Rc<dyn EventHandler>> {
        self.handlers
            .get(&event_type)
            .map(|handlers| handlers.iter().map(|(_, handler)| Rc::clone(handler)).collect())
            .unwrap_or_default()
    }

    /// Number of handlers for `event_type`
    pub(crate) fn count(&self, event_type: EventType) -> usize {
        self.handlers.get(&event_type).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(event_type, handlers)| (event_type.name(), handlers.len()))
            .collect();
        f.debug_struct("Listeners").field("handlers", &counts).finish()
    }
}
