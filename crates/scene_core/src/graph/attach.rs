//! Component attach and detach

use thiserror::Error;

use super::{Attachment, Graph, GraphError};
use crate::components::Component;
use crate::events::{Event, EventDetail, EventType};
use crate::foundation::collections::{ComponentId, NodeId};

/// A component the graph refused to attach, handed back to the caller
#[derive(Debug, Error)]
#[error("component `{type_name}` was not attached: {error}")]
pub struct AttachError {
    /// Why the component was refused
    pub error: GraphError,
    /// Type name of the refused component
    pub type_name: &'static str,
    /// The refused component, unchanged
    pub component: Box<dyn Component>,
}

impl AttachError {
    /// Take back the refused component
    pub fn into_component(self) -> Box<dyn Component> {
        self.component
    }
}

impl Graph {
    /// Attach a component to `node`
    ///
    /// A second instance of a singleton type is refused and returned inside
    /// the error. On success the component's owner is set and it receives
    /// `ComponentAdd`, which is then dispatched to the node alone.
    pub fn add_component(
        &mut self,
        node: NodeId,
        mut component: Box<dyn Component>,
    ) -> Result<ComponentId, AttachError> {
        let type_name = component.type_name();
        let refuse = |error: GraphError, component: Box<dyn Component>| AttachError {
            error,
            type_name,
            component,
        };
        let Some(data) = self.nodes.get(node) else {
            return Err(refuse(GraphError::UnknownNode(node), component));
        };
        if component.is_singleton() && data.components.get(type_name).is_some_and(|ids| !ids.is_empty()) {
            log::warn!("Refused second `{type_name}` on {}", data.name);
            return Err(refuse(GraphError::SingletonViolation { node, type_name }, component));
        }

        component.core_mut().set_node(Some(node));
        let id = self.components.insert(component);
        if let Some(data) = self.nodes.get_mut(node) {
            data.components.entry(type_name).or_default().push(id);
        }
        log::debug!("Attached `{type_name}` to {}", self.name(node).unwrap_or_default());

        self.fire_component_event(id, EventType::ComponentAdd);
        Ok(id)
    }

    /// Attach a component by value
    pub fn add<C: Component>(&mut self, node: NodeId, component: C) -> Result<ComponentId, AttachError> {
        self.add_component(node, Box::new(component))
    }

    /// Detach a component from `node` and hand it back
    ///
    /// `ComponentRemove` is delivered while the component is still attached.
    pub fn remove_component(&mut self, node: NodeId, id: ComponentId) -> Result<Box<dyn Component>, GraphError> {
        self.data(node)?;
        let owner = self.component(id).ok_or(GraphError::UnknownComponent(id))?.node();
        if owner != Some(node) {
            return Err(GraphError::StructuralMismatch {
                owner: node,
                target: Attachment::Component(id),
            });
        }

        self.fire_component_event(id, EventType::ComponentRemove);

        // a handler may already have detached it
        let mut component = self.components.remove(id).ok_or(GraphError::UnknownComponent(id))?;
        let type_name = component.type_name();
        if let Some(data) = self.nodes.get_mut(node) {
            if let Some(ids) = data.components.get_mut(type_name) {
                ids.retain(|&existing| existing != id);
                if ids.is_empty() {
                    data.components.shift_remove(type_name);
                }
            }
        }
        component.core_mut().set_node(None);
        log::debug!("Detached `{type_name}` from {}", self.name(node).unwrap_or_default());
        Ok(component)
    }

    /// Move a component to another node
    ///
    /// If the destination refuses it, the component goes back to its
    /// previous node and the refusal is returned. Either way the component
    /// gets a new handle; the returned one is valid on success.
    pub fn move_component(&mut self, id: ComponentId, to: NodeId) -> Result<ComponentId, GraphError> {
        let from = self
            .component(id)
            .ok_or(GraphError::UnknownComponent(id))?
            .node()
            .ok_or(GraphError::UnknownComponent(id))?;
        if from == to {
            return Ok(id);
        }
        self.data(to)?;
        let component = self.remove_component(from, id)?;
        match self.add_component(to, component) {
            Ok(moved) => Ok(moved),
            Err(refused) => {
                let error = refused.error.clone();
                self.add_component(from, refused.into_component())
                    .map_err(|restore| restore.error)?;
                Err(error)
            }
        }
    }

    /// Activate or deactivate a component
    ///
    /// Fires `ComponentActivate` or `ComponentDeactivate` when the flag
    /// changes.
    pub fn set_component_active(&mut self, id: ComponentId, active: bool) -> Result<(), GraphError> {
        let component = self.components.get_mut(id).ok_or(GraphError::UnknownComponent(id))?;
        if component.is_active() == active {
            return Ok(());
        }
        component.core_mut().set_active(active);
        let event_type = if active {
            EventType::ComponentActivate
        } else {
            EventType::ComponentDeactivate
        };
        self.fire_component_event(id, event_type);
        Ok(())
    }

    /// Deliver a lifecycle event to the component, then to its node alone
    pub(crate) fn fire_component_event(&mut self, id: ComponentId, event_type: EventType) {
        let Some(component) = self.components.get_mut(id) else {
            return;
        };
        let Some(node) = component.node() else {
            return;
        };
        let event = Event::new(event_type, node).with_detail(EventDetail::Component(id));
        component.on_lifecycle(&event);
        // the node is known to exist, it owns the component
        let _ = self.dispatch_event_to_target_only(&event);
    }

    /// Component by handle
    pub fn component(&self, id: ComponentId) -> Option<&dyn Component> {
        self.components.get(id).map(|component| &**component)
    }

    /// Component by handle, mutable
    ///
    /// Changes made through this reference emit no events; use
    /// [`Graph::mutate_component`] for observed changes.
    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut dyn Component> {
        match self.components.get_mut(id) {
            Some(component) => Some(component.as_mut()),
            None => None,
        }
    }

    /// Component by handle, downcast to its concrete type
    pub fn component_as<C: Component>(&self, id: ComponentId) -> Option<&C> {
        self.component(id)?.downcast_ref()
    }

    /// Component by handle, downcast to its concrete type, mutable
    pub fn component_as_mut<C: Component>(&mut self, id: ComponentId) -> Option<&mut C> {
        self.component_mut(id)?.downcast_mut()
    }

    /// Node a component is attached to
    pub fn owner(&self, id: ComponentId) -> Option<NodeId> {
        self.component(id)?.node()
    }

    /// Every component of `node`, grouped by type in first-attach order
    pub fn all_components(&self, node: NodeId) -> Vec<ComponentId> {
        self.nodes
            .get(node)
            .map(|data| data.components.values().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Components of `node` with the given type name, in attach order
    pub fn components_by_type(&self, node: NodeId, type_name: &str) -> &[ComponentId] {
        self.nodes
            .get(node)
            .and_then(|data| data.components.get(type_name))
            .map_or(&[], Vec::as_slice)
    }

    /// Handles of the components of `node` of type `C`
    pub fn component_ids_of<C: Component>(&self, node: NodeId) -> Vec<ComponentId> {
        self.all_components(node)
            .into_iter()
            .filter(|&id| self.component_as::<C>(id).is_some())
            .collect()
    }

    /// Components of `node` of type `C`
    pub fn components_of<C: Component>(&self, node: NodeId) -> Vec<&C> {
        self.all_components(node)
            .into_iter()
            .filter_map(|id| self.component_as::<C>(id))
            .collect()
    }

    /// First component of `node` of type `C`
    pub fn component_of<C: Component>(&self, node: NodeId) -> Option<&C> {
        self.all_components(node)
            .into_iter()
            .find_map(|id| self.component_as::<C>(id))
    }
}
