//! Registration of the built-in types

use super::RegistryBuilder;
use crate::components::{
    Component, ComponentLight, ComponentMaterial, ComponentMesh, ComponentTransform, Light, LightAmbient,
    LightDirectional, LightPoint, LightSpot,
};
use crate::resources::{Coat, CoatColored, CoatRemissive, Material, MeshCube, MeshQuad, MeshSphere, Resource};

/// Register every built-in component, light, resource and coat type
pub fn register_builtins(builder: &mut RegistryBuilder) {
    builder.register::<dyn Component>("ComponentTransform", || Box::<ComponentTransform>::default());
    builder.register::<dyn Component>("ComponentMesh", || Box::<ComponentMesh>::default());
    builder.register::<dyn Component>("ComponentMaterial", || Box::<ComponentMaterial>::default());
    builder.register::<dyn Component>("ComponentLight", || Box::<ComponentLight>::default());

    builder.register::<dyn Light>("LightAmbient", || Box::<LightAmbient>::default());
    builder.register::<dyn Light>("LightDirectional", || Box::<LightDirectional>::default());
    builder.register::<dyn Light>("LightPoint", || Box::<LightPoint>::default());
    builder.register::<dyn Light>("LightSpot", || Box::<LightSpot>::default());

    builder.register::<dyn Resource>("MeshCube", || Box::<MeshCube>::default());
    builder.register::<dyn Resource>("MeshQuad", || Box::<MeshQuad>::default());
    builder.register::<dyn Resource>("MeshSphere", || Box::<MeshSphere>::default());
    builder.register::<dyn Resource>("Material", || Box::<Material>::default());

    builder.register::<dyn Coat>("CoatColored", || Box::<CoatColored>::default());
    builder.register::<dyn Coat>("CoatRemissive", || Box::<CoatRemissive>::default());
}
