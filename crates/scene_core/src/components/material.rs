//! Material component

use std::rc::Rc;

use super::{component_accessors, Component, ComponentCore};
use crate::foundation::math::Color;
use crate::mutate::{mutate_nested, AttributeType, FieldApplyError, Mutable, Mutator, MutatorValue};
use crate::resources::{Material, RenderData, RenderInjectable, Resource, ResourceError, ResourceRef};
use crate::serialize::{put, DeserializeContext, Serializable, SerializeError, Serialization};

/// Attaches a material resource to a node, tinted by a color
#[derive(Debug, Clone)]
pub struct ComponentMaterial {
    core: ComponentCore,
    material: ResourceRef,
    /// Tint multiplied with the material's color
    pub color: Color,
    /// Render after opaque objects, sorted back to front
    pub sort_for_alpha: bool,
}

impl ComponentMaterial {
    /// Create a material component for a loaded material
    pub fn new(material: Rc<dyn Resource>) -> Result<Self, ResourceError> {
        let mut component = Self::default();
        component.link_resource("material", material)?;
        Ok(component)
    }

    /// The referenced material, once resolved
    pub fn material(&self) -> Option<&Material> {
        self.material.get()?.downcast_ref()
    }

    /// The reference, resolved or not
    pub const fn material_ref(&self) -> &ResourceRef {
        &self.material
    }
}

impl Default for ComponentMaterial {
    fn default() -> Self {
        Self {
            core: ComponentCore::new(false),
            material: ResourceRef::default(),
            color: Color::WHITE,
            sort_for_alpha: false,
        }
    }
}

impl RenderInjectable for ComponentMaterial {
    fn inject_render_data(&self, data: &mut RenderData) {
        if let Some(material) = self.material() {
            material.inject_render_data(data);
        }
        data.set_uniform("u_tint", &self.color.to_array());
    }
}

impl Component for ComponentMaterial {
    component_accessors!();

    fn render_injector(&self) -> Option<&dyn RenderInjectable> {
        Some(self)
    }
}

impl Mutable for ComponentMaterial {
    fn mutator(&self) -> Mutator {
        self.core
            .mutator()
            .with("color", self.color.mutator())
            .with("sortForAlpha", self.sort_for_alpha)
    }

    fn attribute_type(&self, key: &str) -> Option<AttributeType> {
        (key == "color").then(|| AttributeType::mutable("Color"))
    }

    fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
        match key {
            "color" => mutate_nested(&mut self.color, key, value),
            "sortForAlpha" => {
                self.sort_for_alpha = value.expect_bool(key)?;
                Ok(())
            }
            _ => self.core.apply_field(key, value),
        }
    }
}

impl Serializable for ComponentMaterial {
    fn type_name(&self) -> &'static str {
        "ComponentMaterial"
    }

    fn serialize(&self) -> Serialization {
        let mut section = Serialization::new();
        self.material.serialize_into(&mut section);
        put(&mut section, "color", &self.color);
        put(&mut section, "sortForAlpha", &self.sort_for_alpha);
        self.core.serialize_into(&mut section);
        section
    }

    fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) -> Result<(), SerializeError> {
        if let Some(id) = ctx.request_resource(section, "idResource", "material") {
            self.material = ResourceRef::pending(id);
        }
        ctx.optional(section, "color", &mut self.color);
        ctx.optional(section, "sortForAlpha", &mut self.sort_for_alpha);
        self.core.deserialize_from(section, ctx);
        Ok(())
    }

    fn link_resource(&mut self, field: &str, resource: Rc<dyn Resource>) -> Result<(), ResourceError> {
        if field != "material" {
            return Err(ResourceError::UnknownField {
                type_name: self.type_name(),
                field: field.to_owned(),
            });
        }
        if resource.downcast_ref::<Material>().is_none() {
            return Err(ResourceError::WrongKind {
                id: resource.id_resource().to_owned(),
                expected: "material",
            });
        }
        self.material.resolve(resource);
        Ok(())
    }
}
