//! Mesh component

use std::rc::Rc;

use super::{component_accessors, Component, ComponentCore};
use crate::foundation::math::Transform;
use crate::mutate::{mutate_nested, AttributeType, FieldApplyError, Mutable, Mutator, MutatorValue};
use crate::resources::{Mesh, Resource, ResourceError, ResourceRef};
use crate::serialize::{put, DeserializeContext, Serializable, SerializeError, Serialization};

/// Attaches a mesh resource to a node, offset by a pivot transform
#[derive(Debug, Clone)]
pub struct ComponentMesh {
    core: ComponentCore,
    mesh: ResourceRef,
    /// Offset of the mesh relative to the node
    pub pivot: Transform,
}

impl ComponentMesh {
    /// Create a mesh component for a loaded mesh
    pub fn new(mesh: Rc<dyn Resource>) -> Result<Self, ResourceError> {
        let mut component = Self::default();
        component.link_resource("mesh", mesh)?;
        Ok(component)
    }

    /// The referenced mesh, once resolved
    pub fn mesh(&self) -> Option<&dyn Mesh> {
        self.mesh.get()?.as_mesh()
    }

    /// The reference, resolved or not
    pub const fn mesh_ref(&self) -> &ResourceRef {
        &self.mesh
    }
}

impl Default for ComponentMesh {
    fn default() -> Self {
        Self {
            core: ComponentCore::new(false),
            mesh: ResourceRef::default(),
            pivot: Transform::identity(),
        }
    }
}

impl Component for ComponentMesh {
    component_accessors!();
}

impl Mutable for ComponentMesh {
    fn mutator(&self) -> Mutator {
        self.core.mutator().with("pivot", self.pivot.mutator())
    }

    fn attribute_type(&self, key: &str) -> Option<AttributeType> {
        (key == "pivot").then(|| AttributeType::mutable("Transform"))
    }

    fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
        match key {
            "pivot" => mutate_nested(&mut self.pivot, key, value),
            _ => self.core.apply_field(key, value),
        }
    }
}

impl Serializable for ComponentMesh {
    fn type_name(&self) -> &'static str {
        "ComponentMesh"
    }

    fn serialize(&self) -> Serialization {
        let mut section = Serialization::new();
        self.mesh.serialize_into(&mut section);
        put(&mut section, "pivot", &self.pivot);
        self.core.serialize_into(&mut section);
        section
    }

    fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) -> Result<(), SerializeError> {
        if let Some(id) = ctx.request_resource(section, "idResource", "mesh") {
            self.mesh = ResourceRef::pending(id);
        }
        ctx.optional(section, "pivot", &mut self.pivot);
        self.core.deserialize_from(section, ctx);
        Ok(())
    }

    fn link_resource(&mut self, field: &str, resource: Rc<dyn Resource>) -> Result<(), ResourceError> {
        if field != "mesh" {
            return Err(ResourceError::UnknownField {
                type_name: self.type_name(),
                field: field.to_owned(),
            });
        }
        if resource.as_mesh().is_none() {
            return Err(ResourceError::WrongKind {
                id: resource.id_resource().to_owned(),
                expected: "mesh",
            });
        }
        self.mesh.resolve(resource);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Material, MeshCube};

    fn cube() -> Rc<dyn Resource> {
        let mut cube = MeshCube::named("cube");
        cube.set_id_resource("MeshCube|1".to_owned());
        Rc::new(cube)
    }

    #[test]
    fn test_new_links_mesh() {
        let component = ComponentMesh::new(cube()).unwrap();
        assert_eq!(component.mesh().map(|mesh| mesh.vertex_count()), Some(24));
        assert_eq!(component.mesh_ref().id(), Some("MeshCube|1"));
    }

    #[test]
    fn test_rejects_non_mesh_resource() {
        let err = ComponentMesh::new(Rc::new(Material::default())).unwrap_err();
        assert!(matches!(err, ResourceError::WrongKind { expected: "mesh", .. }));
    }

    #[test]
    fn test_serializes_resource_id() {
        let section = ComponentMesh::new(cube()).unwrap().serialize();
        assert_eq!(section["idResource"], "MeshCube|1");
        assert!(section.contains_key("pivot"));
        assert!(section.contains_key("Component"));
    }

    #[test]
    fn test_mutator_excludes_resource_reference() {
        let component = ComponentMesh::new(cube()).unwrap();
        let mutator = component.mutator();
        assert_eq!(mutator.keys().collect::<Vec<_>>(), ["active", "pivot"]);
    }
}
