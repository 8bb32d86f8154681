//! Procedural meshes
//!
//! Only the topology counts and bounding radius are modelled here; vertex
//! buffers belong to the renderer. Each mesh nests its id and name under a
//! `"Mesh"` base section.

use std::any::Any;

use super::{Resource, ResourceCore};
use crate::serialize::{put, DeserializeContext, Serializable, SerializeError, Serialization, Value};

/// Geometry resource
pub trait Mesh: Resource {
    /// Number of vertices the renderer will generate
    fn vertex_count(&self) -> u32;

    /// Number of triangle indices the renderer will generate
    fn index_count(&self) -> u32;

    /// Radius of the bounding sphere around the origin
    fn radius(&self) -> f32;
}

const MESH_BASE: &str = "Mesh";

fn serialize_base(core: &ResourceCore, section: &mut Serialization) {
    section.insert(MESH_BASE.to_owned(), Value::Object(core.serialize()));
}

fn deserialize_base(core: &mut ResourceCore, section: &Serialization, ctx: &mut DeserializeContext<'_>) {
    if let Some(base) = ctx.base_section(section, MESH_BASE) {
        ctx.scoped(MESH_BASE, |ctx| core.deserialize(base, ctx));
    }
}

macro_rules! resource_accessors {
    () => {
        fn id_resource(&self) -> &str {
            &self.core.id_resource
        }

        fn set_id_resource(&mut self, id: String) {
            self.core.id_resource = id;
        }

        fn name(&self) -> &str {
            &self.core.name
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_mesh(&self) -> Option<&dyn Mesh> {
            Some(self)
        }
    };
}

/// Unit cube centered on the origin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshCube {
    core: ResourceCore,
}

impl MeshCube {
    /// Create a cube with a display name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            core: ResourceCore::named(name),
        }
    }
}

impl Resource for MeshCube {
    resource_accessors!();
}

impl Mesh for MeshCube {
    fn vertex_count(&self) -> u32 {
        24
    }

    fn index_count(&self) -> u32 {
        36
    }

    fn radius(&self) -> f32 {
        0.75_f32.sqrt()
    }
}

impl Serializable for MeshCube {
    fn type_name(&self) -> &'static str {
        "MeshCube"
    }

    fn serialize(&self) -> Serialization {
        let mut section = Serialization::new();
        serialize_base(&self.core, &mut section);
        section
    }

    fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) -> Result<(), SerializeError> {
        deserialize_base(&mut self.core, section, ctx);
        Ok(())
    }
}

/// Unit quad in the xy plane
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshQuad {
    core: ResourceCore,
}

impl MeshQuad {
    /// Create a quad with a display name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            core: ResourceCore::named(name),
        }
    }
}

impl Resource for MeshQuad {
    resource_accessors!();
}

impl Mesh for MeshQuad {
    fn vertex_count(&self) -> u32 {
        4
    }

    fn index_count(&self) -> u32 {
        6
    }

    fn radius(&self) -> f32 {
        0.5_f32.sqrt()
    }
}

impl Serializable for MeshQuad {
    fn type_name(&self) -> &'static str {
        "MeshQuad"
    }

    fn serialize(&self) -> Serialization {
        let mut section = Serialization::new();
        serialize_base(&self.core, &mut section);
        section
    }

    fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) -> Result<(), SerializeError> {
        deserialize_base(&mut self.core, section, ctx);
        Ok(())
    }
}

/// UV sphere of radius 0.5
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshSphere {
    core: ResourceCore,
    sectors: u32,
    stacks: u32,
}

impl MeshSphere {
    const MIN_SECTORS: u32 = 3;
    const MIN_STACKS: u32 = 2;

    /// Create a sphere with the given resolution, clamped to the minimum
    pub fn new(name: impl Into<String>, sectors: u32, stacks: u32) -> Self {
        Self {
            core: ResourceCore::named(name),
            sectors: sectors.max(Self::MIN_SECTORS),
            stacks: stacks.max(Self::MIN_STACKS),
        }
    }

    /// Segments around the equator
    pub const fn sectors(&self) -> u32 {
        self.sectors
    }

    /// Segments from pole to pole
    pub const fn stacks(&self) -> u32 {
        self.stacks
    }
}

impl Default for MeshSphere {
    fn default() -> Self {
        Self::new("", 8, 8)
    }
}

impl Resource for MeshSphere {
    resource_accessors!();
}

impl Mesh for MeshSphere {
    fn vertex_count(&self) -> u32 {
        (self.sectors + 1) * (self.stacks + 1)
    }

    fn index_count(&self) -> u32 {
        self.sectors * (self.stacks - 1) * 6
    }

    fn radius(&self) -> f32 {
        0.5
    }
}

impl Serializable for MeshSphere {
    fn type_name(&self) -> &'static str {
        "MeshSphere"
    }

    fn serialize(&self) -> Serialization {
        let mut section = Serialization::new();
        put(&mut section, "sectors", &self.sectors);
        put(&mut section, "stacks", &self.stacks);
        serialize_base(&self.core, &mut section);
        section
    }

    fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) -> Result<(), SerializeError> {
        let mut sectors = self.sectors;
        let mut stacks = self.stacks;
        ctx.optional(section, "sectors", &mut sectors);
        ctx.optional(section, "stacks", &mut stacks);
        if sectors < Self::MIN_SECTORS {
            ctx.invalid("sectors", format!("at least {} required", Self::MIN_SECTORS));
        } else {
            self.sectors = sectors;
        }
        if stacks < Self::MIN_STACKS {
            ctx.invalid("stacks", format!("at least {} required", Self::MIN_STACKS));
        } else {
            self.stacks = stacks;
        }
        deserialize_base(&mut self.core, section, ctx);
        Ok(())
    }
}
