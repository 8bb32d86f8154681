//! Specialized collection types
//!
//! Nodes and components live in slot maps owned by the [`Graph`](crate::graph::Graph).
//! Parent links, child lists and component owners hold these keys instead of
//! references, so the tree never forms an ownership cycle.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a node stored in a graph arena
    pub struct NodeId;

    /// Stable handle to a component attached somewhere in a graph arena
    pub struct ComponentId;
}

/// Handle returned when registering an event listener, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Create a listener id from a raw counter value
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw counter value of this id
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_stay_valid_after_unrelated_removal() {
        let mut nodes: SlotMap<NodeId, &str> = SlotMap::with_key();
        let a = nodes.insert("a");
        let b = nodes.insert("b");
        nodes.remove(a);

        assert_eq!(nodes.get(b), Some(&"b"));
        assert!(nodes.get(a).is_none());

        // A reused slot gets a new version, the stale key stays dead
        let c = nodes.insert("c");
        assert_ne!(a, c);
        assert!(nodes.get(a).is_none());
    }

    #[test]
    fn test_listener_id_ordering() {
        assert!(ListenerId::new(1) < ListenerId::new(2));
        assert_eq!(ListenerId::new(7).raw(), 7);
    }
}
