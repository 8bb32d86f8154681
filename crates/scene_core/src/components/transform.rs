//! Transform component

use super::{component_accessors, Component, ComponentCore};
use crate::foundation::math::{Mat4, Transform, Vec3};
use crate::mutate::{mutate_nested, AttributeType, FieldApplyError, Mutable, Mutator, MutatorValue};
use crate::serialize::{put, DeserializeContext, Serializable, SerializeError, Serialization};

/// Local transform of a node relative to its parent
///
/// A node carries at most one.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentTransform {
    core: ComponentCore,
    /// Transform relative to the parent node
    pub local: Transform,
}

impl ComponentTransform {
    /// Create a transform component
    pub const fn new(local: Transform) -> Self {
        Self {
            core: ComponentCore::new(true),
            local,
        }
    }

    /// Create a transform component with only a translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(Transform::from_translation(translation))
    }

    /// Local matrix
    pub fn matrix(&self) -> Mat4 {
        self.local.matrix()
    }
}

impl Default for ComponentTransform {
    fn default() -> Self {
        Self::new(Transform::identity())
    }
}

impl Component for ComponentTransform {
    component_accessors!();
}

impl Mutable for ComponentTransform {
    fn mutator(&self) -> Mutator {
        self.core.mutator().with("local", self.local.mutator())
    }

    fn mutator_for_animation(&self) -> Mutator {
        Mutator::new().with("local", self.local.mutator())
    }

    fn attribute_type(&self, key: &str) -> Option<AttributeType> {
        (key == "local").then(|| AttributeType::mutable("Transform"))
    }

    fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
        match key {
            "local" => mutate_nested(&mut self.local, key, value),
            _ => self.core.apply_field(key, value),
        }
    }
}

impl Serializable for ComponentTransform {
    fn type_name(&self) -> &'static str {
        "ComponentTransform"
    }

    fn serialize(&self) -> Serialization {
        let mut section = Serialization::new();
        put(&mut section, "local", &self.local);
        self.core.serialize_into(&mut section);
        section
    }

    fn deserialize(&mut self, section: &Serialization, ctx: &mut DeserializeContext<'_>) -> Result<(), SerializeError> {
        ctx.optional(section, "local", &mut self.local);
        self.core.deserialize_from(section, ctx);
        Ok(())
    }
}
