//! Mutator data model
//!
//! A [`Mutator`] is an ordered map of attribute name to [`MutatorValue`]. It is
//! the common currency between editors, animation and the serializer: it can
//! be produced from any [`Mutable`](super::Mutable), applied back to it, and
//! round-tripped through JSON with serde.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::FieldApplyError;

/// A single value inside a [`Mutator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MutatorValue {
    /// Boolean flag
    Boolean(bool),
    /// Any numeric attribute, stored as `f64`
    Number(f64),
    /// Text, enum option names and class selector values
    String(String),
    /// Ordered list of values
    Array(Vec<MutatorValue>),
    /// Nested mutator of a mutable sub-object
    Mutator(Mutator),
}

impl MutatorValue {
    /// Short kind name used in error messages
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Mutator(_) => "mutator",
        }
    }

    /// Numeric value, if this is a number
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean value, if this is a boolean
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// String value, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Nested mutator, if this is one
    pub const fn as_mutator(&self) -> Option<&Mutator> {
        match self {
            Self::Mutator(m) => Some(m),
            _ => None,
        }
    }

    /// Array items, if this is an array
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric value narrowed to `f32`, or a type mismatch for `field`
    #[allow(clippy::cast_possible_truncation)]
    pub fn expect_f32(&self, field: &str) -> Result<f32, FieldApplyError> {
        self.as_f64()
            .map(|n| n as f32)
            .ok_or_else(|| FieldApplyError::mismatch(field, "number", self))
    }

    /// Boolean value, or a type mismatch for `field`
    pub fn expect_bool(&self, field: &str) -> Result<bool, FieldApplyError> {
        self.as_bool()
            .ok_or_else(|| FieldApplyError::mismatch(field, "boolean", self))
    }

    /// String value, or a type mismatch for `field`
    pub fn expect_str(&self, field: &str) -> Result<&str, FieldApplyError> {
        self.as_str()
            .ok_or_else(|| FieldApplyError::mismatch(field, "string", self))
    }

    /// Nested mutator, or a type mismatch for `field`
    pub fn expect_mutator(&self, field: &str) -> Result<&Mutator, FieldApplyError> {
        self.as_mutator()
            .ok_or_else(|| FieldApplyError::mismatch(field, "mutator", self))
    }
}

impl From<bool> for MutatorValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for MutatorValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for MutatorValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for MutatorValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<Mutator> for MutatorValue {
    fn from(value: Mutator) -> Self {
        Self::Mutator(value)
    }
}

impl From<Vec<Self>> for MutatorValue {
    fn from(value: Vec<Self>) -> Self {
        Self::Array(value)
    }
}

/// Ordered map of attribute names to values
///
/// Insertion order is kept, so a mutator produced by an object lists its
/// attributes in declaration order and is applied back in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mutator {
    entries: IndexMap<String, MutatorValue>,
}

impl Mutator {
    /// Create an empty mutator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry (builder pattern)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MutatorValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an entry, returning the previous value
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<MutatorValue>,
    ) -> Option<MutatorValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove an entry, keeping the order of the remaining ones
    pub fn remove(&mut self, key: &str) -> Option<MutatorValue> {
        self.entries.shift_remove(key)
    }

    /// Get the value of an entry
    pub fn get(&self, key: &str) -> Option<&MutatorValue> {
        self.entries.get(key)
    }

    /// Get a mutable reference to the value of an entry
    pub fn get_mut(&mut self, key: &str) -> Option<&mut MutatorValue> {
        self.entries.get_mut(key)
    }

    /// Whether the mutator has an entry for `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mutator has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in order
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, MutatorValue> {
        self.entries.iter()
    }

    /// Entries in order, values mutable
    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, MutatorValue> {
        self.entries.iter_mut()
    }

    /// Numeric entry
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(MutatorValue::as_f64)
    }

    /// Boolean entry
    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(MutatorValue::as_bool)
    }

    /// String entry
    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MutatorValue::as_str)
    }

    /// Nested mutator entry
    pub fn mutator(&self, key: &str) -> Option<&Self> {
        self.get(key).and_then(MutatorValue::as_mutator)
    }

    /// Extract the branch of this mutator along `path`
    ///
    /// The result keeps the nesting of the path, so `["local", "translation"]`
    /// yields `{ "local": { "translation": {…} } }`. Returns `None` if any
    /// step of the path is missing or is not a nested mutator.
    pub fn from_path(&self, path: &[&str]) -> Option<Self> {
        let (key, rest) = path.split_first()?;
        let value = self.get(key)?;
        let branch = if rest.is_empty() {
            value.clone()
        } else {
            MutatorValue::Mutator(value.as_mutator()?.from_path(rest)?)
        };
        Some(Self::new().with(*key, branch))
    }

    /// Refresh the values of the entries present in `self` from `source`
    ///
    /// Keys missing from `source` are left untouched and no keys are added.
    /// Nested mutators are refreshed recursively.
    pub fn update_from(&mut self, source: &Self) {
        for (key, value) in &mut self.entries {
            let Some(fresh) = source.get(key) else {
                continue;
            };
            match (value, fresh) {
                (MutatorValue::Mutator(inner), MutatorValue::Mutator(fresh_inner)) => {
                    inner.update_from(fresh_inner);
                }
                (slot, fresh) => *slot = fresh.clone(),
            }
        }
    }
}

impl<'a> IntoIterator for &'a Mutator {
    type Item = (&'a String, &'a MutatorValue);
    type IntoIter = indexmap::map::Iter<'a, String, MutatorValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, MutatorValue)> for Mutator {
    fn from_iter<T: IntoIterator<Item = (K, MutatorValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Editor-facing type information for one mutator attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    /// Numeric value
    Number,
    /// Boolean flag
    Boolean,
    /// Free text
    String,
    /// One of a fixed set of option names
    Enum {
        /// Allowed option names
        options: Vec<String>,
    },
    /// Nested mutable object of the named type
    Mutable {
        /// Type name of the nested object
        type_name: String,
    },
    /// Selector among the registered subclasses of a base type
    ClassSelector {
        /// Base type name the subclasses are registered under
        base: String,
        /// Registered subclass names, in registration order
        subclasses: Vec<String>,
    },
    /// List of values
    Array,
}

impl AttributeType {
    /// Derive a type descriptor from the shape of a value
    pub fn infer(value: &MutatorValue) -> Self {
        match value {
            MutatorValue::Boolean(_) => Self::Boolean,
            MutatorValue::Number(_) => Self::Number,
            MutatorValue::String(_) => Self::String,
            MutatorValue::Array(_) => Self::Array,
            MutatorValue::Mutator(_) => Self::Mutable {
                type_name: "Mutator".to_owned(),
            },
        }
    }

    /// Nested mutable descriptor for `type_name`
    pub fn mutable(type_name: &str) -> Self {
        Self::Mutable {
            type_name: type_name.to_owned(),
        }
    }
}

/// Attribute name to type descriptor, in mutator order
pub type AttributeTypes = IndexMap<String, AttributeType>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Mutator {
        Mutator::new()
            .with("active", true)
            .with(
                "local",
                Mutator::new().with("translation", Mutator::new().with("x", 1.0).with("y", 2.0)),
            )
            .with("name", "cube")
    }

    #[test]
    fn test_order_is_preserved() {
        let mut mutator = sample();
        assert_eq!(mutator.keys().collect::<Vec<_>>(), ["active", "local", "name"]);

        mutator.remove("local");
        mutator.insert("range", 4.0);
        assert_eq!(mutator.keys().collect::<Vec<_>>(), ["active", "name", "range"]);
    }

    #[test]
    fn test_from_path_keeps_nesting() {
        let branch = sample().from_path(&["local", "translation"]).unwrap();
        let translation = branch
            .mutator("local")
            .and_then(|local| local.mutator("translation"))
            .unwrap();
        assert_eq!(translation.number("x"), Some(1.0));
        assert_eq!(branch.len(), 1);

        assert!(sample().from_path(&["local", "missing"]).is_none());
        assert!(sample().from_path(&["name", "deeper"]).is_none());
        assert!(sample().from_path(&[]).is_none());
    }

    #[test]
    fn test_update_from_only_refreshes_existing_keys() {
        let mut partial = Mutator::new().with("name", "old").with(
            "local",
            Mutator::new().with("translation", Mutator::new().with("x", 0.0)),
        );
        partial.update_from(&sample());

        assert_eq!(partial.string("name"), Some("cube"));
        assert!(!partial.contains_key("active"));
        let translation = partial.mutator("local").and_then(|l| l.mutator("translation")).unwrap();
        // Refreshing a nested mutator does not add keys either
        assert_eq!(translation.number("x"), Some(1.0));
        assert!(!translation.contains_key("y"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"active":true,"local":{"translation":{"x":1.0,"y":2.0}},"name":"cube"}"#
        );

        let back: Mutator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_expect_reports_mismatch() {
        let err = MutatorValue::from("five").expect_f32("range").unwrap_err();
        assert_eq!(
            err,
            FieldApplyError::TypeMismatch {
                field: "range".to_owned(),
                expected: "number",
                found: "string",
            }
        );
        assert_eq!(MutatorValue::from(2.5).expect_f32("range").unwrap(), 2.5);
    }

    #[test]
    fn test_infer_attribute_types() {
        assert_eq!(AttributeType::infer(&true.into()), AttributeType::Boolean);
        assert_eq!(AttributeType::infer(&1.0.into()), AttributeType::Number);
        assert_eq!(
            AttributeType::infer(&Mutator::new().into()),
            AttributeType::mutable("Mutator")
        );
    }
}
