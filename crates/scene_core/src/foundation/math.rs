//! Math utilities and types
//!
//! Vectors and matrices come from nalgebra. [`Transform`] and [`Color`] are the
//! value types components expose; all of them implement [`Mutable`] and
//! [`FieldValue`] so they can be edited, animated and persisted.

pub use nalgebra::{Matrix4, Unit, UnitQuaternion, Vector3};

use serde_json::{Map, Value};

use crate::mutate::{mutate_nested, AttributeType, FieldApplyError, Mutable, Mutator, MutatorValue};
use crate::serialize::{number_object, read_numbers, FieldValue};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

impl Mutable for Vec3 {
    fn mutator(&self) -> Mutator {
        Mutator::new()
            .with("x", f64::from(self.x))
            .with("y", f64::from(self.y))
            .with("z", f64::from(self.z))
    }

    fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
        match key {
            "x" => self.x = value.expect_f32(key)?,
            "y" => self.y = value.expect_f32(key)?,
            "z" => self.z = value.expect_f32(key)?,
            _ => return Err(FieldApplyError::unknown(key)),
        }
        Ok(())
    }
}

impl FieldValue for Vec3 {
    const KIND: &'static str = "vector {x, y, z}";

    fn to_json(&self) -> Value {
        number_object(&[("x", self.x), ("y", self.y), ("z", self.z)])
    }

    fn from_json(value: &Value) -> Option<Self> {
        let [x, y, z] = read_numbers(value, ["x", "y", "z"])?;
        Some(Self::new(x, y, z))
    }
}

/// Local transform: translation, rotation as euler angles in degrees, scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position relative to the parent
    pub translation: Vec3,
    /// Rotation around x, y and z in degrees, applied in that order
    pub rotation: Vec3,
    /// Scale factors
    pub scaling: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scaling: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only a translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Rotation as a quaternion
    pub fn quaternion(&self) -> Quat {
        Quat::from_euler_angles(
            self.rotation.x.to_radians(),
            self.rotation.y.to_radians(),
            self.rotation.z.to_radians(),
        )
    }

    /// Matrix applying scaling, then rotation, then translation
    pub fn matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.translation)
            * self.quaternion().to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scaling)
    }
}

impl Mutable for Transform {
    fn mutator(&self) -> Mutator {
        Mutator::new()
            .with("translation", self.translation.mutator())
            .with("rotation", self.rotation.mutator())
            .with("scaling", self.scaling.mutator())
    }

    fn attribute_type(&self, key: &str) -> Option<AttributeType> {
        matches!(key, "translation" | "rotation" | "scaling").then(|| AttributeType::mutable("Vector3"))
    }

    fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
        match key {
            "translation" => mutate_nested(&mut self.translation, key, value),
            "rotation" => mutate_nested(&mut self.rotation, key, value),
            "scaling" => mutate_nested(&mut self.scaling, key, value),
            _ => Err(FieldApplyError::unknown(key)),
        }
    }
}

impl FieldValue for Transform {
    const KIND: &'static str = "transform {translation, rotation, scaling}";

    fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("translation".to_owned(), self.translation.to_json());
        map.insert("rotation".to_owned(), self.rotation.to_json());
        map.insert("scaling".to_owned(), self.scaling.to_json());
        Value::Object(map)
    }

    fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            translation: Vec3::from_json(object.get("translation")?)?,
            rotation: Vec3::from_json(object.get("rotation")?)?,
            scaling: Vec3::from_json(object.get("scaling")?)?,
        })
    }
}

/// RGBA color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Create a color from its components
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Components as an array, in `r, g, b, a` order
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Mutable for Color {
    fn mutator(&self) -> Mutator {
        Mutator::new()
            .with("r", f64::from(self.r))
            .with("g", f64::from(self.g))
            .with("b", f64::from(self.b))
            .with("a", f64::from(self.a))
    }

    fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
        let channel = value.expect_f32(key);
        let slot = match key {
            "r" => &mut self.r,
            "g" => &mut self.g,
            "b" => &mut self.b,
            "a" => &mut self.a,
            _ => return Err(FieldApplyError::unknown(key)),
        };
        let channel = channel?;
        if !(0.0..=1.0).contains(&channel) {
            return Err(FieldApplyError::invalid(key, format!("{channel} is outside 0..=1")));
        }
        *slot = channel;
        Ok(())
    }
}

impl FieldValue for Color {
    const KIND: &'static str = "color {r, g, b, a}";

    fn to_json(&self) -> Value {
        number_object(&[("r", self.r), ("g", self.g), ("b", self.b), ("a", self.a)])
    }

    fn from_json(value: &Value) -> Option<Self> {
        let [r, g, b, a] = read_numbers(value, ["r", "g", "b", "a"])?;
        Some(Self::new(r, g, b, a))
    }
}
