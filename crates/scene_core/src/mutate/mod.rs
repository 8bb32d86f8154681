//! # Mutable reflection protocol
//!
//! Objects that editors, animation and persistence need to inspect implement
//! [`Mutable`]. The protocol is deliberately small:
//!
//! ## Surface
//!
//! - [`Mutable::mutator`]: public attributes as an ordered [`Mutator`]
//! - [`Mutable::mutator_attribute_types`]: type descriptors for a mutator's keys
//! - [`Mutable::mutate`]: apply a (partial) mutator, reporting per-key problems
//!
//! Applying is best effort. Unknown keys are skipped silently, keys whose value
//! cannot be applied are collected into the returned [`MutateReport`] and the
//! remaining keys are still applied.

mod mutator;

pub use mutator::{AttributeType, AttributeTypes, Mutator, MutatorValue};

use thiserror::Error;

/// Problem applying a single mutator key
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldApplyError {
    /// The object has no attribute with this name
    #[error("unknown field `{field}`")]
    UnknownField {
        /// Offending key
        field: String,
    },

    /// The value has the wrong shape for the attribute
    #[error("field `{field}` expects a {expected}, got a {found}")]
    TypeMismatch {
        /// Offending key
        field: String,
        /// Expected value kind
        expected: &'static str,
        /// Kind that was supplied
        found: &'static str,
    },

    /// The value has the right shape but is not acceptable
    #[error("field `{field}` rejected value: {reason}")]
    InvalidValue {
        /// Offending key
        field: String,
        /// Human readable reason
        reason: String,
    },

    /// A class selector named a type that is not registered for the base
    #[error("field `{field}` names unregistered subclass `{type_name}`")]
    UnknownSubclass {
        /// Offending key
        field: String,
        /// Requested subclass name
        type_name: String,
    },

    /// Some keys of a nested mutator failed
    #[error("field `{field}` was only partially applied ({} nested errors)", .errors.len())]
    Nested {
        /// Key of the nested object
        field: String,
        /// Errors reported by the nested object
        errors: Vec<FieldApplyError>,
        /// Whether some nested keys were applied despite the errors
        partial: bool,
    },
}

impl FieldApplyError {
    /// Unknown field error
    pub fn unknown(field: &str) -> Self {
        Self::UnknownField {
            field: field.to_owned(),
        }
    }

    /// Type mismatch between `expected` and the kind of `found`
    pub fn mismatch(field: &str, expected: &'static str, found: &MutatorValue) -> Self {
        Self::TypeMismatch {
            field: field.to_owned(),
            expected,
            found: found.kind(),
        }
    }

    /// Invalid value error
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }

    /// Key the error refers to
    pub fn field(&self) -> &str {
        match self {
            Self::UnknownField { field }
            | Self::TypeMismatch { field, .. }
            | Self::InvalidValue { field, .. }
            | Self::UnknownSubclass { field, .. }
            | Self::Nested { field, .. } => field,
        }
    }

    /// True when the object was changed even though the key failed
    pub const fn partially_applied(&self) -> bool {
        matches!(self, Self::Nested { partial: true, .. })
    }
}

/// Outcome of applying a mutator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutateReport {
    /// Keys that were applied
    pub applied: Vec<String>,
    /// Keys the target does not know, skipped
    pub ignored: Vec<String>,
    /// Keys that were recognized but could not be applied
    pub errors: Vec<FieldApplyError>,
}

impl MutateReport {
    /// True when no key failed to apply
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when at least one key was applied, possibly in part
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }

    /// Merge `other` into this report, prefixing its keys with `prefix/`
    pub fn absorb(&mut self, prefix: &str, other: Self) {
        let prefixed = |key: String| format!("{prefix}/{key}");
        self.applied.extend(other.applied.into_iter().map(prefixed));
        self.ignored.extend(other.ignored.into_iter().map(prefixed));
        self.errors.extend(other.errors);
    }
}

/// Reflection protocol for editor, animation and persistence access
///
/// Implementors provide [`mutator`](Mutable::mutator) and
/// [`apply_field`](Mutable::apply_field); everything else has a default.
/// `mutate(&obj.mutator(), None)` must leave the object unchanged.
pub trait Mutable {
    /// Public attributes in declaration order, nested objects as nested mutators
    fn mutator(&self) -> Mutator;

    /// Mutator shown to editors
    ///
    /// Polymorphic attributes may be replaced by a descriptor of the candidate
    /// subclasses so a generic UI can offer a picker.
    fn mutator_for_user_interface(&self) -> Mutator {
        self.mutator()
    }

    /// Mutator exposing the animatable attributes
    fn mutator_for_animation(&self) -> Mutator {
        self.mutator()
    }

    /// Declared type of an attribute, if it cannot be inferred from its value
    fn attribute_type(&self, _key: &str) -> Option<AttributeType> {
        None
    }

    /// Type descriptors for every key of `mutator`
    fn mutator_attribute_types(&self, mutator: &Mutator) -> AttributeTypes {
        mutator
            .iter()
            .map(|(key, value)| {
                let declared = self.attribute_type(key);
                (key.clone(), declared.unwrap_or_else(|| AttributeType::infer(value)))
            })
            .collect()
    }

    /// Apply one attribute
    ///
    /// Return [`FieldApplyError::UnknownField`] for keys the object does not
    /// have; the default `mutate` treats those as silently ignored.
    fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError>;

    /// Apply every key of `mutator`, or only the keys named in `selection`
    fn mutate(&mut self, mutator: &Mutator, selection: Option<&[&str]>) -> MutateReport {
        let mut report = MutateReport::default();
        for (key, value) in mutator {
            if selection.is_some_and(|keys| !keys.contains(&key.as_str())) {
                continue;
            }
            match self.apply_field(key, value) {
                Ok(()) => report.applied.push(key.clone()),
                Err(FieldApplyError::UnknownField { .. }) => {
                    log::trace!("Ignoring unknown mutator key `{key}`");
                    report.ignored.push(key.clone());
                }
                Err(err) => {
                    log::warn!("Mutate skipped key: {err}");
                    if err.partially_applied() {
                        report.applied.push(key.clone());
                    }
                    report.errors.push(err);
                }
            }
        }
        report
    }

    /// Refresh the values of the keys already present in `mutator`
    fn update_mutator(&self, mutator: &mut Mutator) {
        mutator.update_from(&self.mutator());
    }
}

/// Apply a nested mutator value to a sub-object
///
/// Used by `apply_field` implementations for attributes that are themselves
/// mutable. Keys the sub-object fails on are returned as one
/// [`FieldApplyError::Nested`]; the keys that did apply stay applied and
/// the error is marked partial, so the outer key still counts as applied.
pub fn mutate_nested<M: Mutable + ?Sized>(
    target: &mut M,
    field: &str,
    value: &MutatorValue,
) -> Result<(), FieldApplyError> {
    let report = target.mutate(value.expect_mutator(field)?, None);
    if report.is_clean() {
        Ok(())
    } else {
        Err(FieldApplyError::Nested {
            field: field.to_owned(),
            partial: report.changed(),
            errors: report.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Lamp {
        range: f32,
        enabled: bool,
        label: String,
    }

    impl Mutable for Lamp {
        fn mutator(&self) -> Mutator {
            Mutator::new()
                .with("range", f64::from(self.range))
                .with("enabled", self.enabled)
                .with("label", self.label.as_str())
        }

        fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
            match key {
                "range" => {
                    let range = value.expect_f32(key)?;
                    if range < 0.0 {
                        return Err(FieldApplyError::invalid(key, "range must not be negative"));
                    }
                    self.range = range;
                }
                "enabled" => self.enabled = value.expect_bool(key)?,
                "label" => self.label = value.expect_str(key)?.to_owned(),
                _ => return Err(FieldApplyError::unknown(key)),
            }
            Ok(())
        }
    }

    #[test]
    fn test_mutate_with_own_mutator_is_identity() {
        let mut lamp = Lamp {
            range: 3.5,
            enabled: true,
            label: "lamp".to_owned(),
        };
        let snapshot = lamp.mutator();
        let report = lamp.mutate(&snapshot, None);

        assert!(report.is_clean());
        assert_eq!(report.applied, ["range", "enabled", "label"]);
        assert_eq!(lamp.mutator(), snapshot);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let mut lamp = Lamp::default();
        let report = lamp.mutate(&Mutator::new().with("bogus", 1.0).with("enabled", true), None);

        assert!(report.is_clean());
        assert_eq!(report.ignored, ["bogus"]);
        assert!(lamp.enabled);
    }

    #[test]
    fn test_bad_key_does_not_block_the_rest() {
        let mut lamp = Lamp::default();
        let mutator = Mutator::new()
            .with("range", "far")
            .with("enabled", true)
            .with("label", "ok");
        let report = lamp.mutate(&mutator, None);

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field(), "range");
        assert_eq!(report.applied, ["enabled", "label"]);
        assert!(lamp.enabled);
        assert_eq!(lamp.label, "ok");
    }

    #[test]
    fn test_selection_limits_applied_keys() {
        let mut lamp = Lamp::default();
        let mutator = Mutator::new().with("range", 2.0).with("enabled", true);
        let report = lamp.mutate(&mutator, Some(&["enabled"]));

        assert_eq!(report.applied, ["enabled"]);
        assert!(lamp.enabled);
        assert!(lamp.range.abs() < f32::EPSILON);
    }

    #[test]
    fn test_attribute_types_are_inferred() {
        let lamp = Lamp::default();
        let types = lamp.mutator_attribute_types(&lamp.mutator());
        assert_eq!(types["range"], AttributeType::Number);
        assert_eq!(types["enabled"], AttributeType::Boolean);
        assert_eq!(types["label"], AttributeType::String);
    }

    #[test]
    fn test_update_mutator_refreshes_values() {
        let lamp = Lamp {
            range: 8.0,
            ..Lamp::default()
        };
        let mut partial = Mutator::new().with("range", 0.0);
        lamp.update_mutator(&mut partial);
        assert_eq!(partial.number("range"), Some(8.0));
        assert_eq!(partial.len(), 1);
    }

    #[test]
    fn test_mutate_nested_collects_errors() {
        let mut lamp = Lamp::default();
        let value = MutatorValue::from(Mutator::new().with("range", -1.0).with("label", "x"));
        let err = mutate_nested(&mut lamp, "lamp", &value).unwrap_err();

        match err {
            FieldApplyError::Nested { field, errors, partial } => {
                assert_eq!(field, "lamp");
                assert_eq!(errors.len(), 1);
                assert!(partial);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(lamp.label, "x");

        let err = mutate_nested(&mut lamp, "lamp", &MutatorValue::from(1.0)).unwrap_err();
        assert!(matches!(err, FieldApplyError::TypeMismatch { .. }));
    }

    #[test]
    fn test_partially_applied_nested_key_counts_as_applied() {
        struct Holder {
            inner: Lamp,
        }

        impl Mutable for Holder {
            fn mutator(&self) -> Mutator {
                Mutator::new().with("inner", self.inner.mutator())
            }

            fn apply_field(&mut self, key: &str, value: &MutatorValue) -> Result<(), FieldApplyError> {
                match key {
                    "inner" => mutate_nested(&mut self.inner, key, value),
                    _ => Err(FieldApplyError::unknown(key)),
                }
            }
        }

        let mut holder = Holder { inner: Lamp::default() };
        let partly = Mutator::new().with("inner", Mutator::new().with("range", "far").with("enabled", true));
        let report = holder.mutate(&partly, None);
        assert_eq!(report.applied, ["inner"]);
        assert_eq!(report.errors.len(), 1);
        assert!(report.changed());
        assert!(holder.inner.enabled);

        let rejected = Mutator::new().with("inner", Mutator::new().with("range", "far"));
        let report = holder.mutate(&rejected, None);
        assert!(report.applied.is_empty());
        assert!(!report.changed());
    }

    #[test]
    fn test_report_absorb_prefixes_keys() {
        let mut report = MutateReport::default();
        report.absorb(
            "ComponentTransform/0",
            MutateReport {
                applied: vec!["local".to_owned()],
                ..MutateReport::default()
            },
        );
        assert_eq!(report.applied, ["ComponentTransform/0/local"]);
        assert!(report.changed());
    }
}
