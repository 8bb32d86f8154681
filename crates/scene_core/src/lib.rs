//! # Scene Core
//!
//! Runtime object model of a scene graph engine: a node tree with attached
//! components, a reflection protocol for editors and animation, a name based
//! subclass registry and a JSON serializer that rebuilds polymorphic objects.
//!
//! ## Features
//!
//! - **Mutators**: read and write any object's public attributes as an
//!   ordered name to value map
//! - **Subclass registry**: construct concrete types from their names
//! - **Serializer**: `{ "TypeName": {…} }` documents with field-level error
//!   reporting and asynchronous resource resolution
//! - **Node graph**: arena of nodes and components with a cycle guard
//! - **Events**: capture, bubble, target-only and broadcast delivery
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_core::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = RegistryBuilder::with_builtins().build();
//!     let mut graph = Graph::new();
//!     let root = graph.create_node("root");
//!     let child = graph.create_node("child");
//!     graph.add_child(root, child)?;
//!     graph.add(child, ComponentTransform::from_translation(Vec3::new(0.0, 1.0, 0.0)))?;
//!
//!     let serializer = Serializer::new(&registry);
//!     let document = serializer.serialize_node(&mut graph, root)?;
//!     println!("{}", serializer.stringify(&document)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod config;
pub mod core;
pub mod foundation;

pub mod components;
pub mod events;
pub mod graph;
pub mod mutate;
pub mod registry;
pub mod resources;
pub mod serialize;

#[cfg(test)]
mod tests;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        components::{
            Component, ComponentCore, ComponentLight, ComponentMaterial, ComponentMesh, ComponentTransform, Light,
            LightAmbient, LightDirectional, LightPoint, LightSpot,
        },
        core::{Config, EventConfig, SceneConfig, SerializationConfig},
        events::{Event, EventDetail, EventHandler, EventPhase, EventType},
        foundation::{
            collections::{ComponentId, ListenerId, NodeId},
            math::{Color, Mat4, Transform, Vec3},
        },
        graph::{AttachError, Graph, GraphError, GraphLoad, GraphWalker, LoadReport},
        mutate::{AttributeType, FieldApplyError, MutateReport, Mutable, Mutator, MutatorValue},
        registry::{RegistryBuilder, RegistryError, SubclassBase, TypeRegistry},
        resources::{
            Coat, CoatColored, CoatRemissive, Material, Mesh, MeshCube, MeshQuad, MeshSphere, RenderInjectable,
            Resource, ResourceError, ResourceLibrary, ResourceProvider, ResourceRef,
        },
        serialize::{FieldError, Serializable, Serialization, SerializeError, Serializer},
    };
}
