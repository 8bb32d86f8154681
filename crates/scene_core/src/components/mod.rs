//! # Components
//!
//! Units of data and behavior attached to nodes. Every component carries a
//! [`ComponentCore`] with its owner handle, active flag and singleton flag;
//! the graph keeps the owner handle in sync, components never set it
//! themselves.
//!
//! ## Built-in components
//!
//! - [`ComponentTransform`]: local transform, at most one per node
//! - [`ComponentMesh`]: mesh resource reference with a pivot
//! - [`ComponentMaterial`]: material resource reference, tint and alpha sorting
//! - [`ComponentLight`]: polymorphic light source

pub mod light;
pub mod material;
pub mod mesh;
pub mod transform;

pub use light::{ComponentLight, Light, LightAmbient, LightDirectional, LightPoint, LightSpot};
pub use material::ComponentMaterial;
pub use mesh::ComponentMesh;
pub use transform::ComponentTransform;

use std::any::Any;
use std::fmt;

use crate::events::Event;
use crate::foundation::collections::NodeId;
use crate::mutate::{FieldApplyError, Mutable, Mutator, MutatorValue};
use crate::registry::SubclassBase;
use crate::resources::RenderInjectable;
use crate::serialize::{put, DeserializeContext, Serializable, Serialization, Value};

/// Name of the base section every component nests its core fields under
pub const COMPONENT_BASE: &str = "Component";

/// Data attached to a node
pub trait Component: Mutable + Serializable + Any + fmt::Debug {
    /// Shared component state
    fn core(&self) -> &ComponentCore;

    /// Shared component state, mutable
    fn core_mut(&mut self) -> &mut ComponentCore;

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Upcast for downcasting to the concrete type, mutable
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Called for add, remove, activate and deactivate of this component
    ///
    /// Add runs after the component joined its node, remove runs while it is
    /// still attached.
    fn on_lifecycle(&mut self, _event: &Event) {}

    /// Render input capability, for components that feed the renderer
    fn render_injector(&self) -> Option<&dyn RenderInjectable> {
        None
    }
}

impl SubclassBase for dyn Component {
    const BASE_NAME: &'static str = "Component";
}

impl dyn Component + '_ {
    /// Downcast to a concrete component type
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Downcast to a concrete component type, mutable
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }

    /// Whether at most one instance of this type may sit on a node
    pub fn is_singleton(&self) -> bool {
        self.core().is_singleton()
    }

    /// Whether the component is active
    pub fn is_active(&self) -> bool {
        self.core().is_active()
    }

    /// Node the component is attached to
    pub fn node(&self) -> Option<NodeId> {
        self.core().node()
    }
}

/// State shared by every component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentCore {
    node: Option<NodeId>,
    singleton: bool,
    active: bool,
}

impl ComponentCore {
    /// Core of an active, detached component
    pub const fn new(singleton: bool) -> Self {
        Self {
            node: None,
            singleton,
            active: true,
        }
    }

    /// Whether at most one instance of this type may sit on a node
    pub const fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Whether the component is active
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Node the component is attached to
    pub const fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub(crate) fn set_node(&mut self, node: Option<NodeId>) {
        self.node = node;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Mutator holding the core attributes, to be extended by the component
    pub fn mutator(&self) -> Mutator {
        Mutator::new().with("active", self.active)
    }

    /// Apply a core attribute, unknown field for anything else
    pub fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
        match key {
            "active" => {
                self.active = value.expect_bool(key)?;
                Ok(())
            }
            _ => Err(FieldApplyError::unknown(key)),
        }
    }

    /// Nest the core section under `"Component"`
    pub fn serialize_into(&self, section: &mut Serialization) {
        let mut base = Serialization::new();
        put(&mut base, "active", &self.active);
        section.insert(COMPONENT_BASE.to_owned(), Value::Object(base));
    }

    /// Read the `"Component"` section, if present
    pub fn deserialize_from(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) {
        if let Some(base) = ctx.base_section(section, COMPONENT_BASE) {
            ctx.scoped(COMPONENT_BASE, |ctx| ctx.optional(base, "active", &mut self.active));
        }
    }
}

/// Implements the `Component` accessors for a struct with a `core` field
macro_rules! component_accessors {
    () => {
        fn core(&self) -> &$crate::components::ComponentCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut $crate::components::ComponentCore {
            &mut self.core
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}

pub(crate) use component_accessors;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use crate::serialize::Serializer;
    use serde_json::json;

    #[test]
    fn test_core_defaults() {
        let core = ComponentCore::new(true);
        assert!(core.is_singleton());
        assert!(core.is_active());
        assert!(core.node().is_none());
    }

    #[test]
    fn test_core_mutator_and_apply() {
        let mut core = ComponentCore::new(false);
        assert_eq!(core.mutator().boolean("active"), Some(true));
        core.apply_field("active", &false.into()).unwrap();
        assert!(!core.is_active());
        assert!(matches!(
            core.apply_field("visible", &true.into()),
            Err(FieldApplyError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_registered_builtins_construct_detached_components() {
        let registry = registry::global();
        for descriptor in registry.list::<dyn Component>() {
            let component = registry.construct::<dyn Component>(descriptor.name).unwrap();
            assert_eq!(component.type_name(), descriptor.name);
            assert!(component.node().is_none());
        }
        assert!(registry
            .construct::<dyn Component>("ComponentTransform")
            .unwrap()
            .is_singleton());
        assert!(!registry.construct::<dyn Component>("ComponentMesh").unwrap().is_singleton());
    }

    #[test]
    fn test_inactive_flag_survives_serialization() {
        let serializer = Serializer::new(registry::global());
        let mut mesh = ComponentMesh::default();
        mesh.core_mut().set_active(false);

        let doc = serializer.serialize(&mesh);
        assert_eq!(
            serde_json::Value::Object(doc.clone()),
            json!({"ComponentMesh": {"pivot": {
                "translation": {"x": 0.0, "y": 0.0, "z": 0.0},
                "rotation": {"x": 0.0, "y": 0.0, "z": 0.0},
                "scaling": {"x": 1.0, "y": 1.0, "z": 1.0}
            }, "Component": {"active": false}}})
        );

        let loaded = serializer.deserialize::<dyn Component>(&doc).unwrap();
        assert!(!loaded.value.is_active());
    }
}
