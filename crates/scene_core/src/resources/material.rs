//! Materials and coats
//!
//! A [`Material`] is a resource holding one polymorphic [`Coat`]. Coats, and
//! the components that use them, contribute shader inputs through the
//! [`RenderInjectable`] capability without the object model knowing anything
//! about the renderer.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;

use super::{Resource, ResourceCore};
use crate::foundation::math::Color;
use crate::registry::SubclassBase;
use crate::serialize::{put, wrap, DeserializeContext, Serializable, SerializeError, Serialization, Value};

/// Shader inputs collected for one draw
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderData {
    shader: Option<String>,
    uniforms: IndexMap<String, Vec<f32>>,
}

impl RenderData {
    /// Create an empty set of inputs
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the shader
    pub fn set_shader(&mut self, shader: impl Into<String>) {
        self.shader = Some(shader.into());
    }

    /// Selected shader
    pub fn shader(&self) -> Option<&str> {
        self.shader.as_deref()
    }

    /// Set a uniform value, replacing a previous one of the same name
    pub fn set_uniform(&mut self, name: impl Into<String>, values: &[f32]) {
        self.uniforms.insert(name.into(), values.to_vec());
    }

    /// Value of a uniform
    pub fn uniform(&self, name: &str) -> Option<&[f32]> {
        self.uniforms.get(name).map(Vec::as_slice)
    }
}

/// Capability of contributing shader inputs
pub trait RenderInjectable {
    /// Write this object's inputs into `data`
    fn inject_render_data(&self, data: &mut RenderData);
}

/// Surface description of a material
pub trait Coat: RenderInjectable + Serializable + fmt::Debug + Any {
    /// Shader this coat is written for
    fn shader(&self) -> &'static str;

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;
}

impl SubclassBase for dyn Coat {
    const BASE_NAME: &'static str = "Coat";
}

impl dyn Coat + '_ {
    /// Downcast to a concrete coat type
    pub fn downcast_ref<T: Coat>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }
}

/// Flat single color
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoatColored {
    /// Surface color
    pub color: Color,
}

impl CoatColored {
    /// Create a coat of the given color
    pub const fn new(color: Color) -> Self {
        Self { color }
    }
}

impl RenderInjectable for CoatColored {
    fn inject_render_data(&self, data: &mut RenderData) {
        data.set_shader(self.shader());
        data.set_uniform("u_color", &self.color.to_array());
    }
}

impl Coat for CoatColored {
    fn shader(&self) -> &'static str {
        "ShaderFlat"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Serializable for CoatColored {
    fn type_name(&self) -> &'static str {
        "CoatColored"
    }

    fn serialize(&self) -> Serialization {
        let mut section = Serialization::new();
        put(&mut section, "color", &self.color);
        section
    }

    fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) -> Result<(), SerializeError> {
        ctx.optional(section, "color", &mut self.color);
        Ok(())
    }
}

/// Color with diffuse and specular reflection
#[derive(Debug, Clone, PartialEq)]
pub struct CoatRemissive {
    /// Surface color
    pub color: Color,
    /// Diffuse reflection factor
    pub diffuse: f32,
    /// Specular reflection factor
    pub specular: f32,
}

impl Default for CoatRemissive {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            diffuse: 1.0,
            specular: 0.0,
        }
    }
}

impl RenderInjectable for CoatRemissive {
    fn inject_render_data(&self, data: &mut RenderData) {
        data.set_shader(self.shader());
        data.set_uniform("u_color", &self.color.to_array());
        data.set_uniform("u_diffuse", &[self.diffuse]);
        data.set_uniform("u_specular", &[self.specular]);
    }
}

impl Coat for CoatRemissive {
    fn shader(&self) -> &'static str {
        "ShaderPhong"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Serializable for CoatRemissive {
    fn type_name(&self) -> &'static str {
        "CoatRemissive"
    }

    fn serialize(&self) -> Serialization {
        let mut section = Serialization::new();
        put(&mut section, "color", &self.color);
        put(&mut section, "diffuse", &self.diffuse);
        put(&mut section, "specular", &self.specular);
        section
    }

    fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) -> Result<(), SerializeError> {
        ctx.optional(section, "color", &mut self.color);
        ctx.optional(section, "diffuse", &mut self.diffuse);
        ctx.optional(section, "specular", &mut self.specular);
        Ok(())
    }
}

/// Resource pairing a name with a coat
#[derive(Debug)]
pub struct Material {
    core: ResourceCore,
    coat: Box<dyn Coat>,
}

impl Material {
    /// Create a material with the given coat
    pub fn new(name: impl Into<String>, coat: Box<dyn Coat>) -> Self {
        Self {
            core: ResourceCore::named(name),
            coat,
        }
    }

    /// The material's coat
    pub fn coat(&self) -> &dyn Coat {
        self.coat.as_ref()
    }

    /// Replace the coat
    pub fn set_coat(&mut self, coat: Box<dyn Coat>) {
        self.coat = coat;
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new("", Box::<CoatColored>::default())
    }
}

impl RenderInjectable for Material {
    fn inject_render_data(&self, data: &mut RenderData) {
        self.coat.inject_render_data(data);
    }
}

impl Resource for Material {
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
}

impl Serializable for Material {
    fn type_name(&self) -> &'static str {
        "Material"
    }

    fn serialize(&self) -> Serialization {
        let mut section = self.core.serialize();
        section.insert("coat".to_owned(), Value::Object(wrap(self.coat.as_ref())));
        section
    }

    fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) -> Result<(), SerializeError> {
        self.core.deserialize(section, ctx);
        if let Some(coat) = section.get("coat") {
            self.coat = ctx.scoped("coat", |ctx| ctx.construct::<dyn Coat>(coat))?;
        }
        Ok(())
    }
}
