//! Light component and light types
//!
//! [`ComponentLight`] holds one polymorphic [`Light`]. The concrete type is
//! exposed to editors as the `typeLight` class selector, and switching it
//! keeps the attributes the old and new type share (such as the color).

use std::any::Any;
use std::fmt;

use super::{component_accessors, Component, ComponentCore};
use crate::foundation::math::Color;
use crate::mutate::{mutate_nested, AttributeType, FieldApplyError, Mutable, Mutator, MutatorValue};
use crate::registry::{self, SubclassBase, SubclassSet, TypeRegistry};
use crate::serialize::{wrap, DeserializeContext, Serializable, SerializeError, Serialization, Value};

const LIGHT_BASE: &str = "Light";

/// Light source description
pub trait Light: Mutable + Serializable + fmt::Debug + Any {
    /// Emitted color
    fn color(&self) -> Color;

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;
}

impl SubclassBase for dyn Light {
    const BASE_NAME: &'static str = "Light";
}

impl dyn Light + '_ {
    /// Downcast to a concrete light type
    pub fn downcast_ref<T: Light>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }
}

fn light_base_section(color: &Color) -> Value {
    let mut base = Serialization::new();
    crate::serialize::put(&mut base, "color", color);
    Value::Object(base)
}

fn read_light_base(color: &mut Color, section: &Serialization, ctx: &mut DeserializeContext<'_>) {
    if let Some(base) = ctx.base_section(section, LIGHT_BASE) {
        ctx.scoped(LIGHT_BASE, |ctx| ctx.optional(base, "color", color));
    }
}

macro_rules! simple_light {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            /// Emitted color
            pub color: Color,
        }

        impl $name {
            /// Create a light of the given color
            pub const fn new(color: Color) -> Self {
                Self { color }
            }
        }

        impl Light for $name {
            fn color(&self) -> Color {
                self.color
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        impl Mutable for $name {
            fn mutator(&self) -> Mutator {
                Mutator::new().with("color", self.color.mutator())
            }

            fn attribute_type(&self, key: &str) -> Option<AttributeType> {
                (key == "color").then(|| AttributeType::mutable("Color"))
            }

            fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
                match key {
                    "color" => mutate_nested(&mut self.color, key, value),
                    _ => Err(FieldApplyError::unknown(key)),
                }
            }
        }

        impl Serializable for $name {
            fn type_name(&self) -> &'static str {
                stringify!($name)
            }

            fn serialize(&self) -> Serialization {
                let mut section = Serialization::new();
                section.insert(LIGHT_BASE.to_owned(), light_base_section(&self.color));
                section
            }

            fn deserialize(
                &mut self,
                section: &Serialization,
                ctx: &mut DeserializeContext<'_>,
            ) -> Result<(), SerializeError> {
                read_light_base(&mut self.color, section, ctx);
                Ok(())
            }
        }
    };
}

simple_light!(
    /// Uniform light from every direction
    LightAmbient
);
simple_light!(
    /// Parallel light along the node's z axis
    LightDirectional
);
simple_light!(
    /// Light radiating from the node's position
    LightPoint
);

/// Cone of light along the node's z axis
#[derive(Debug, Clone, PartialEq)]
pub struct LightSpot {
    /// Emitted color
    pub color: Color,
    /// Full opening angle of the cone in degrees
    pub angle: f32,
}

impl LightSpot {
    /// Create a spot light
    pub const fn new(color: Color, angle: f32) -> Self {
        Self { color, angle }
    }

    fn valid_angle(angle: f32) -> bool {
        angle > 0.0 && angle <= 180.0
    }
}

impl Default for LightSpot {
    fn default() -> Self {
        Self::new(Color::WHITE, 45.0)
    }
}

impl Light for LightSpot {
    fn color(&self) -> Color {
        self.color
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Mutable for LightSpot {
    fn mutator(&self) -> Mutator {
        Mutator::new()
            .with("color", self.color.mutator())
            .with("angle", f64::from(self.angle))
    }

    fn attribute_type(&self, key: &str) -> Option<AttributeType> {
        (key == "color").then(|| AttributeType::mutable("Color"))
    }

    fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
        match key {
            "color" => mutate_nested(&mut self.color, key, value),
            "angle" => {
                let angle = value.expect_f32(key)?;
                if !Self::valid_angle(angle) {
                    return Err(FieldApplyError::invalid(key, "angle must be in (0, 180]"));
                }
                self.angle = angle;
                Ok(())
            }
            _ => Err(FieldApplyError::unknown(key)),
        }
    }
}

impl Serializable for LightSpot {
    fn type_name(&self) -> &'static str {
        "LightSpot"
    }

    fn serialize(&self) -> Serialization {
        let mut section = Serialization::new();
        crate::serialize::put(&mut section, "angle", &self.angle);
        section.insert(LIGHT_BASE.to_owned(), light_base_section(&self.color));
        section
    }

    fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) -> Result<(), SerializeError> {
        let mut angle = self.angle;
        ctx.optional(section, "angle", &mut angle);
        if Self::valid_angle(angle) {
            self.angle = angle;
        } else {
            ctx.invalid("angle", "angle must be in (0, 180]");
        }
        read_light_base(&mut self.color, section, ctx);
        Ok(())
    }
}

/// Attaches a light source to a node
///
/// Type switches resolve through the registry the component was
/// deserialized with, or bound to by [`with_registry`](Self::with_registry);
/// an unbound component uses [`registry::global`].
#[derive(Debug)]
pub struct ComponentLight {
    core: ComponentCore,
    light: Box<dyn Light>,
    light_types: Option<SubclassSet<dyn Light>>,
}

impl ComponentLight {
    /// Create a light component
    pub fn new(light: Box<dyn Light>) -> Self {
        Self {
            core: ComponentCore::new(false),
            light,
            light_types: None,
        }
    }

    /// Resolve light types through `registry`
    #[must_use]
    pub fn with_registry(mut self, registry: &TypeRegistry) -> Self {
        self.bind_registry(registry);
        self
    }

    /// Resolve light types through `registry` from now on
    pub fn bind_registry(&mut self, registry: &TypeRegistry) {
        self.light_types = Some(registry.subclasses::<dyn Light>());
    }

    /// The light source
    pub fn light(&self) -> &dyn Light {
        self.light.as_ref()
    }

    /// Replace the light source
    pub fn set_light(&mut self, light: Box<dyn Light>) {
        self.light = light;
    }

    /// Switch to another registered light type, keeping shared attributes
    pub fn set_type(&mut self, type_name: &str) -> Result<(), FieldApplyError> {
        if self.light.type_name() == type_name {
            return Ok(());
        }
        let constructed = match &self.light_types {
            Some(types) => types.construct(type_name),
            None => registry::global().construct::<dyn Light>(type_name),
        };
        let mut light = constructed.map_err(|_| FieldApplyError::UnknownSubclass {
                field: "typeLight".to_owned(),
                type_name: type_name.to_owned(),
            })?;
        light.mutate(&self.light.mutator(), None);
        log::debug!("Light switched from {} to {type_name}", self.light.type_name());
        self.light = light;
        Ok(())
    }

    fn light_types(&self) -> Vec<String> {
        self.light_types
            .as_ref()
            .map_or_else(|| registry::global().names::<dyn Light>(), SubclassSet::names)
    }
}

impl Default for ComponentLight {
    fn default() -> Self {
        Self::new(Box::<LightAmbient>::default())
    }
}

impl Component for ComponentLight {
    component_accessors!();
}

impl Mutable for ComponentLight {
    fn mutator(&self) -> Mutator {
        self.core
            .mutator()
            .with("typeLight", self.light.type_name())
            .with("light", self.light.mutator())
    }

    fn mutator_for_user_interface(&self) -> Mutator {
        let options = self.light_types().into_iter().map(MutatorValue::String).collect::<Vec<_>>();
        let selector = Mutator::new()
            .with("selected", self.light.type_name())
            .with("options", options);
        self.core
            .mutator()
            .with("typeLight", selector)
            .with("light", self.light.mutator_for_user_interface())
    }

    fn attribute_type(&self, key: &str) -> Option<AttributeType> {
        match key {
            "typeLight" => Some(AttributeType::ClassSelector {
                base: LIGHT_BASE.to_owned(),
                subclasses: self.light_types(),
            }),
            "light" => Some(AttributeType::mutable(self.light.type_name())),
            _ => None,
        }
    }

    fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
        match key {
            "typeLight" => {
                // Accept the plain name as well as the editor's selector descriptor
                let type_name = match value {
                    MutatorValue::Mutator(selector) => selector
                        .string("selected")
                        .ok_or_else(|| FieldApplyError::invalid(key, "selector without `selected`"))?,
                    other => other.expect_str(key)?,
                };
                self.set_type(type_name)
            }
            "light" => mutate_nested(self.light.as_mut(), key, value),
            _ => self.core.apply_field(key, value),
        }
    }
}

impl Serializable for ComponentLight {
    fn type_name(&self) -> &'static str {
        "ComponentLight"
    }

    fn serialize(&self) -> Serialization {
        let mut section = Serialization::new();
        section.insert("light".to_owned(), Value::Object(wrap(self.light.as_ref())));
        self.core.serialize_into(&mut section);
        section
    }

    fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) -> Result<(), SerializeError> {
        self.bind_registry(ctx.registry());
        if let Some(light) = section.get("light") {
            self.light = ctx.scoped("light", |ctx| ctx.construct::<dyn Light>(light))?;
        }
        self.core.deserialize_from(section, ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::Serializer;

    fn red() -> Color {
        Color::new(1.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_switching_type_keeps_color() {
        let mut component = ComponentLight::new(Box::new(LightPoint::new(red())));
        let report = component.mutate(&Mutator::new().with("typeLight", "LightSpot"), None);

        assert!(report.is_clean());
        let spot = component.light().downcast_ref::<LightSpot>().unwrap();
        assert_eq!(spot.color, red());
        assert!((spot.angle - 45.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unknown_light_type_is_reported() {
        let mut component = ComponentLight::default();
        let report = component.mutate(&Mutator::new().with("typeLight", "LightLaser"), None);

        assert!(matches!(report.errors[0], FieldApplyError::UnknownSubclass { .. }));
        assert_eq!(component.light().type_name(), "LightAmbient");
    }

    #[test]
    fn test_user_interface_mutator_lists_light_types() {
        let component = ComponentLight::new(Box::new(LightDirectional::new(red())));
        let ui = component.mutator_for_user_interface();
        let selector = ui.mutator("typeLight").unwrap();

        assert_eq!(selector.string("selected"), Some("LightDirectional"));
        let options: Vec<&str> = selector
            .get("options")
            .and_then(MutatorValue::as_array)
            .unwrap()
            .iter()
            .filter_map(MutatorValue::as_str)
            .collect();
        assert_eq!(options, ["LightAmbient", "LightDirectional", "LightPoint", "LightSpot"]);

        // Writing the editor's mutator back is accepted
        let mut copy = ComponentLight::default();
        assert!(copy.mutate(&ui, None).is_clean());
        assert_eq!(copy.light().type_name(), "LightDirectional");
    }

    simple_light!(LightArea);

    fn area_registry() -> TypeRegistry {
        crate::registry::RegistryBuilder::with_builtins()
            .with::<dyn Light>("LightArea", || Box::<LightArea>::default())
            .build()
    }

    fn type_options(component: &dyn Component) -> Vec<String> {
        component
            .mutator_for_user_interface()
            .mutator("typeLight")
            .and_then(|selector| selector.get("options"))
            .and_then(MutatorValue::as_array)
            .unwrap()
            .iter()
            .filter_map(MutatorValue::as_str)
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_type_switch_resolves_through_loading_registry() {
        let registry = area_registry();
        let serializer = Serializer::new(&registry);
        let doc = serializer.serialize(&ComponentLight::new(Box::new(LightPoint::new(red()))));
        let mut loaded = serializer.deserialize::<dyn Component>(&doc).unwrap().value;

        assert!(type_options(loaded.as_ref()).contains(&"LightArea".to_owned()));
        let report = loaded.mutate(&Mutator::new().with("typeLight", "LightArea"), None);
        assert!(report.is_clean());
        let light = loaded.downcast_ref::<ComponentLight>().unwrap();
        assert_eq!(light.light().downcast_ref::<LightArea>().unwrap().color, red());
    }

    #[test]
    fn test_unbound_light_uses_global_types() {
        let registry = area_registry();
        let switch = Mutator::new().with("typeLight", "LightArea");

        let mut unbound = ComponentLight::default();
        assert!(!type_options(&unbound).contains(&"LightArea".to_owned()));
        let report = unbound.mutate(&switch, None);
        assert!(matches!(report.errors[0], FieldApplyError::UnknownSubclass { .. }));

        let mut bound = ComponentLight::default().with_registry(&registry);
        assert!(bound.mutate(&switch, None).is_clean());
        assert_eq!(bound.light().type_name(), "LightArea");
    }

    #[test]
    fn test_class_selector_attribute_type() {
        let component = ComponentLight::default();
        let types = component.mutator_attribute_types(&component.mutator());
        assert_eq!(
            types["typeLight"],
            AttributeType::ClassSelector {
                base: "Light".to_owned(),
                subclasses: vec![
                    "LightAmbient".to_owned(),
                    "LightDirectional".to_owned(),
                    "LightPoint".to_owned(),
                    "LightSpot".to_owned(),
                ],
            }
        );
        assert_eq!(types["light"], AttributeType::mutable("LightAmbient"));
    }

    #[test]
    fn test_polymorphic_light_round_trip() {
        let serializer = Serializer::new(registry::global());
        let component = ComponentLight::new(Box::new(LightSpot::new(red(), 30.0)));
        let doc = serializer.serialize(&component);

        let section = doc["ComponentLight"].as_object().unwrap();
        assert!(section["light"].as_object().unwrap().contains_key("LightSpot"));

        let loaded = serializer.deserialize::<dyn Component>(&doc).unwrap();
        assert!(loaded.errors.is_empty());
        let light = loaded.value.downcast_ref::<ComponentLight>().unwrap();
        let spot = light.light().downcast_ref::<LightSpot>().unwrap();
        assert_eq!(spot.color, red());
        assert!((spot.angle - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_spot_angle_validation() {
        let mut spot = LightSpot::default();
        let report = spot.mutate(&Mutator::new().with("angle", 270.0), None);
        assert_eq!(report.errors.len(), 1);
        assert!((spot.angle - 45.0).abs() < f32::EPSILON);
    }
}
