//! # Resources
//!
//! Shared, id-referenced assets such as meshes and materials. Components hold
//! [`ResourceRef`]s; the serializer stores only the id and resolves it through
//! a [`ResourceProvider`] once the node structure has been rebuilt.
//!
//! ## Contents
//!
//! - [`Resource`]: base trait, registered under the `Resource` base
//! - [`ResourceLibrary`]: in-memory provider with lazy deserialization
//! - [`mesh`]: procedural meshes
//! - [`material`]: materials, coats and the render injection capability

pub mod library;
pub mod material;
pub mod mesh;

pub use library::ResourceLibrary;
pub use material::{Coat, CoatColored, CoatRemissive, Material, RenderData, RenderInjectable};
pub use mesh::{Mesh, MeshCube, MeshQuad, MeshSphere};

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use thiserror::Error;

use crate::registry::SubclassBase;
use crate::serialize::{put, DeserializeContext, Serializable, SerializeError, Serialization};

/// Shared asset referenced by id
pub trait Resource: Serializable + Any + fmt::Debug {
    /// Unique id within a library
    fn id_resource(&self) -> &str;

    /// Assign the id, done by the library on registration
    fn set_id_resource(&mut self, id: String);

    /// Display name, not necessarily unique
    fn name(&self) -> &str;

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mesh view of this resource, if it is one
    fn as_mesh(&self) -> Option<&dyn Mesh> {
        None
    }
}

impl SubclassBase for dyn Resource {
    const BASE_NAME: &'static str = "Resource";
}

impl dyn Resource + '_ {
    /// Downcast to a concrete resource type
    pub fn downcast_ref<T: Resource>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }
}

/// Resource errors
#[derive(Debug, Error)]
pub enum ResourceError {
    /// No resource and no stored serialization with this id
    #[error("resource `{id}` not found")]
    NotFound {
        /// Requested id
        id: String,
    },

    /// The stored serialization could not be rebuilt
    #[error("resource `{id}` failed to load: {source}")]
    Load {
        /// Requested id
        id: String,
        /// Deserialization failure
        #[source]
        source: Box<SerializeError>,
    },

    /// The resource exists but is not of the kind the field needs
    #[error("resource `{id}` is not a {expected}")]
    WrongKind {
        /// Offered id
        id: String,
        /// Kind the field accepts
        expected: &'static str,
    },

    /// The object has no resource field with this name
    #[error("`{type_name}` has no resource field `{field}`")]
    UnknownField {
        /// Type of the receiving object
        type_name: &'static str,
        /// Requested field
        field: String,
    },
}

/// Asynchronous lookup of resources by id
#[async_trait(?Send)]
pub trait ResourceProvider {
    /// Fetch the resource with the given id
    async fn get_resource(&self, id: &str) -> Result<Rc<dyn Resource>, ResourceError>;
}

/// Component-side handle to a resource, possibly not resolved yet
#[derive(Clone, Default)]
pub struct ResourceRef {
    id: Option<String>,
    resource: Option<Rc<dyn Resource>>,
}

impl ResourceRef {
    /// Reference to a loaded resource
    pub fn new(resource: Rc<dyn Resource>) -> Self {
        Self {
            id: Some(resource.id_resource().to_owned()),
            resource: Some(resource),
        }
    }

    /// Reference known only by id, resolved later
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            resource: None,
        }
    }

    /// Referenced id, if any
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The resource, once resolved
    pub const fn get(&self) -> Option<&Rc<dyn Resource>> {
        self.resource.as_ref()
    }

    /// Whether the reference points at a loaded resource
    pub const fn is_resolved(&self) -> bool {
        self.resource.is_some()
    }

    /// Point the reference at `resource`
    pub fn resolve(&mut self, resource: Rc<dyn Resource>) {
        self.id = Some(resource.id_resource().to_owned());
        self.resource = Some(resource);
    }

    /// Write the id under `idResource`, nothing if unset
    pub fn serialize_into(&self, section: &mut Serialization) {
        if let Some(id) = &self.id {
            put(section, "idResource", id);
        }
    }
}

impl fmt::Debug for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRef")
            .field("id", &self.id)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Id and name shared by every resource, serialized under the base section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceCore {
    /// Unique id within a library
    pub id_resource: String,
    /// Display name
    pub name: String,
}

impl ResourceCore {
    /// Create a core with a name and no id yet
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id_resource: String::new(),
            name: name.into(),
        }
    }

    /// Section holding `idResource` and `name`
    pub fn serialize(&self) -> Serialization {
        let mut section = Serialization::new();
        put(&mut section, "idResource", &self.id_resource);
        put(&mut section, "name", &self.name);
        section
    }

    /// Read `idResource` (required) and `name`
    pub fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) {
        ctx.required(section, "idResource", &mut self.id_resource);
        ctx.optional(section, "name", &mut self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_ref_resolution() {
        let mut reference = ResourceRef::pending("MeshCube|1");
        assert_eq!(reference.id(), Some("MeshCube|1"));
        assert!(!reference.is_resolved());

        let mut cube = MeshCube::named("cube");
        cube.set_id_resource("MeshCube|1".to_owned());
        reference.resolve(Rc::new(cube));
        assert!(reference.is_resolved());
        assert_eq!(reference.get().map(|r| r.name()), Some("cube"));
    }

    #[test]
    fn test_unset_reference_writes_nothing() {
        let mut section = Serialization::new();
        ResourceRef::default().serialize_into(&mut section);
        assert!(section.is_empty());

        ResourceRef::pending("Material|2").serialize_into(&mut section);
        assert_eq!(section["idResource"], "Material|2");
    }

    #[test]
    fn test_downcast_through_trait_object() {
        let resource: Rc<dyn Resource> = Rc::new(MeshQuad::named("quad"));
        assert!(resource.downcast_ref::<MeshQuad>().is_some());
        assert!(resource.downcast_ref::<MeshCube>().is_none());
        assert!(resource.as_mesh().is_some());
    }
}
