//! Conversions between field values and their JSON form

use serde_json::{Map, Value};

use super::Serialization;

/// A value that can be stored as one field of a serialization section
pub trait FieldValue: Sized {
    /// Expected JSON shape, used in error messages
    const KIND: &'static str;

    /// JSON form of the value
    fn to_json(&self) -> Value;

    /// Parse the JSON form, `None` if it has the wrong shape
    fn from_json(value: &Value) -> Option<Self>;
}

impl FieldValue for f64 {
    const KIND: &'static str = "number";

    fn to_json(&self) -> Value {
        Value::from(*self)
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FieldValue for f32 {
    const KIND: &'static str = "number";

    fn to_json(&self) -> Value {
        Value::from(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64().map(|n| n as Self)
    }
}

impl FieldValue for u32 {
    const KIND: &'static str = "unsigned integer";

    fn to_json(&self) -> Value {
        Value::from(*self)
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|n| Self::try_from(n).ok())
    }
}

impl FieldValue for bool {
    const KIND: &'static str = "boolean";

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FieldValue for String {
    const KIND: &'static str = "string";

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

/// Write `value` under `key`
pub fn put<T: FieldValue>(section: &mut Serialization, key: &str, value: &T) {
    section.insert(key.to_owned(), value.to_json());
}

/// Build a JSON object from `(key, value)` pairs of numbers
pub fn number_object(pairs: &[(&str, f32)]) -> Value {
    let map: Map<String, Value> = pairs
        .iter()
        .map(|(key, n)| ((*key).to_owned(), Value::from(f64::from(*n))))
        .collect();
    Value::Object(map)
}

/// Read numbers named `keys` from a JSON object, all of them must be present
#[allow(clippy::cast_possible_truncation)]
pub fn read_numbers<const N: usize>(value: &Value, keys: [&str; N]) -> Option<[f32; N]> {
    let object = value.as_object()?;
    let mut out = [0.0; N];
    for (slot, key) in out.iter_mut().zip(keys) {
        *slot = object.get(key)?.as_f64()? as f32;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitive_round_trip_shapes() {
        assert_eq!(f32::from_json(&json!(0.5)), Some(0.5));
        assert_eq!(u32::from_json(&json!(7)), Some(7));
        assert_eq!(u32::from_json(&json!(-7)), None);
        assert_eq!(bool::from_json(&json!("true")), None);
        assert_eq!(String::from_json(&json!("cube")).as_deref(), Some("cube"));
    }

    #[test]
    fn test_read_numbers_requires_every_key() {
        let value = json!({"x": 1.0, "y": 2.0, "z": 3.0});
        assert_eq!(read_numbers(&value, ["x", "y", "z"]), Some([1.0, 2.0, 3.0]));
        assert_eq!(read_numbers(&value, ["x", "w"]), None);
        assert_eq!(read_numbers(&json!([1, 2]), ["x"]), None);
    }

    #[test]
    fn test_number_object() {
        assert_eq!(number_object(&[("r", 1.0), ("a", 0.5)]), json!({"r": 1.0, "a": 0.5}));
    }
}
