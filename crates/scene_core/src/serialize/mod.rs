//! # Serializer
//!
//! Converts objects to and from a JSON document in which every object is
//! wrapped as `{ "TypeName": { …fields… } }`. The outer key selects the
//! concrete type through the [`TypeRegistry`] when reading back.
//!
//! ## Document conventions
//!
//! - Each object writes its own fields and nests the section of its base type
//!   under the base type's name, e.g. `{ "ComponentTransform": { "local": …,
//!   "Component": { "active": true } } }`
//! - Polymorphic fields are stored in the same wrapped form
//! - Resources are referenced by id (`"idResource"`) and resolved after the
//!   structure has been rebuilt
//!
//! ## Error policy
//!
//! An unknown outer type is fatal ([`SerializeError`]). Missing or malformed
//! fields are collected as [`FieldError`]s while loading continues with
//! defaults.

mod context;
mod fields;

pub use context::{DeserializeContext, ResourceRequest};
pub use fields::{number_object, put, read_numbers, FieldValue};
pub use serde_json::Value;

use std::rc::Rc;

use thiserror::Error;

use crate::core::config::SerializationConfig;
use crate::graph::GraphError;
use crate::registry::{RegistryError, SubclassBase, TypeRegistry};
use crate::resources::{Resource, ResourceError, ResourceProvider};

/// JSON object holding one serialized section
pub type Serialization = serde_json::Map<String, Value>;

/// Objects that can be written to and rebuilt from a [`Serialization`]
pub trait Serializable {
    /// Registered type name, used as the outer key
    fn type_name(&self) -> &'static str;

    /// This object's section, without the outer type key
    fn serialize(&self) -> Serialization;

    /// Overwrite the fields of this default-constructed object from `section`
    ///
    /// Field problems go to `ctx`; only failures that make the object
    /// unusable, such as an unknown polymorphic type, are returned.
    fn deserialize(
        &mut self,
        section: &Serialization,
        ctx: &mut DeserializeContext<'_>,
    ) -> Result<(), SerializeError>;

    /// Attach a resource requested through [`DeserializeContext::request_resource`]
    fn link_resource(&mut self, field: &str, _resource: Rc<dyn Resource>) -> Result<(), ResourceError> {
        Err(ResourceError::UnknownField {
            type_name: self.type_name(),
            field: field.to_owned(),
        })
    }
}

/// Fatal serialization errors
#[derive(Debug, Error)]
pub enum SerializeError {
    /// The outer key names a type that is not registered
    #[error("{path}: {source}")]
    Registry {
        /// Location in the document
        path: String,
        /// Registry lookup failure
        #[source]
        source: RegistryError,
    },

    /// A wrapped object does not have exactly one type key
    #[error("{path}: expected exactly one type key, found {found}")]
    MalformedEnvelope {
        /// Location in the document
        path: String,
        /// Number of keys found
        found: usize,
    },

    /// A section that must be an object is something else
    #[error("{path}: section `{key}` is not an object")]
    NotAnObject {
        /// Location in the document
        path: String,
        /// Offending key
        key: String,
    },

    /// The document holds a different type than the caller asked for
    #[error("expected a `{expected}` section, found `{found}`")]
    UnexpectedType {
        /// Requested type
        expected: String,
        /// Type found in the document
        found: String,
    },

    /// Rebuilding the node structure failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The text is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Non-fatal problem with a single field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// A required field is absent, the default was kept
    #[error("{path}: required field `{field}` is missing")]
    MissingRequired {
        /// Location in the document
        path: String,
        /// Missing key
        field: String,
    },

    /// A field has an unusable value, the default was kept
    #[error("{path}: field `{field}` is invalid: {reason}")]
    Invalid {
        /// Location in the document
        path: String,
        /// Offending key
        field: String,
        /// Human readable reason
        reason: String,
    },

    /// A referenced resource could not be attached
    #[error("{path}: resource `{id}` for `{field}` is unresolved: {reason}")]
    Unresolved {
        /// Location in the document
        path: String,
        /// Field the resource belongs to
        field: String,
        /// Requested resource id
        id: String,
        /// Human readable reason
        reason: String,
    },
}

/// A rebuilt value together with its non-fatal problems
#[derive(Debug)]
pub struct Deserialized<T> {
    /// The rebuilt value
    pub value: T,
    /// Field problems encountered while rebuilding
    pub errors: Vec<FieldError>,
    /// Resource ids still to be resolved
    pub requests: Vec<ResourceRequest>,
}

/// Split `{ TypeName: {…} }` into its type name and section
pub fn split_envelope<'d>(
    document: &'d Serialization,
    path: &str,
) -> Result<(&'d str, &'d Serialization), SerializeError> {
    let mut entries = document.iter();
    match (entries.next(), entries.next()) {
        (Some((type_name, Value::Object(section))), None) => Ok((type_name, section)),
        (Some((type_name, _)), None) => Err(SerializeError::NotAnObject {
            path: path.to_owned(),
            key: type_name.clone(),
        }),
        _ => Err(SerializeError::MalformedEnvelope {
            path: path.to_owned(),
            found: document.len(),
        }),
    }
}

/// Wrap an object's section under its type name
pub fn wrap<S: Serializable + ?Sized>(object: &S) -> Serialization {
    let mut document = Serialization::new();
    document.insert(object.type_name().to_owned(), Value::Object(object.serialize()));
    document
}

/// Entry point for writing and reading documents
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'r> {
    registry: &'r TypeRegistry,
    config: SerializationConfig,
}

impl<'r> Serializer<'r> {
    /// Create a serializer resolving types through `registry`
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            config: SerializationConfig::default(),
        }
    }

    /// Use the given output settings
    #[must_use]
    pub fn with_config(mut self, config: SerializationConfig) -> Self {
        self.config = config;
        self
    }

    /// Registry used for type resolution
    pub const fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    /// Output settings
    pub const fn config(&self) -> &SerializationConfig {
        &self.config
    }

    /// Serialize an object as `{ TypeName: section }`
    pub fn serialize<S: Serializable + ?Sized>(&self, object: &S) -> Serialization {
        wrap(object)
    }

    /// Rebuild an object of base `B` from a wrapped document
    ///
    /// Resource references are returned unresolved in
    /// [`Deserialized::requests`].
    pub fn deserialize<B>(&self, document: &Serialization) -> Result<Deserialized<Box<B>>, SerializeError>
    where
        B: SubclassBase + Serializable + ?Sized,
    {
        let mut ctx = DeserializeContext::new(self.registry);
        let value = ctx.construct::<B>(&Value::Object(document.clone()))?;
        let requests = ctx.take_requests();
        Ok(Deserialized {
            value,
            errors: ctx.into_errors(),
            requests,
        })
    }

    /// Rebuild an object of base `B` and attach its resources from `resources`
    ///
    /// Unresolvable references end up in [`Deserialized::errors`]; the object
    /// is returned either way.
    pub async fn deserialize_resolved<B>(
        &self,
        document: &Serialization,
        resources: &dyn ResourceProvider,
    ) -> Result<Deserialized<Box<B>>, SerializeError>
    where
        B: SubclassBase + Serializable + ?Sized,
    {
        let mut loaded = self.deserialize::<B>(document)?;
        for request in std::mem::take(&mut loaded.requests) {
            let outcome = match resources.get_resource(&request.id).await {
                Ok(resource) => loaded.value.link_resource(&request.field, resource),
                Err(err) => Err(err),
            };
            if let Err(err) = outcome {
                log::warn!("Could not attach resource {}: {err}", request.id);
                loaded.errors.push(FieldError::Unresolved {
                    path: request.path,
                    field: request.field,
                    id: request.id,
                    reason: err.to_string(),
                });
            }
        }
        Ok(loaded)
    }

    /// Serialize objects of one type as `{ TypeName: [section, …] }`
    pub fn serialize_array(&self, type_name: &str, objects: &[&dyn Serializable]) -> Serialization {
        let sections = objects
            .iter()
            .map(|object| Value::Object(object.serialize()))
            .collect();
        let mut document = Serialization::new();
        document.insert(type_name.to_owned(), Value::Array(sections));
        document
    }

    /// Rebuild the objects of a document written by [`serialize_array`](Self::serialize_array)
    pub fn deserialize_array<B>(&self, document: &Serialization) -> Result<Deserialized<Vec<Box<B>>>, SerializeError>
    where
        B: SubclassBase + Serializable + ?Sized,
    {
        let mut entries = document.iter();
        let (type_name, sections) = match (entries.next(), entries.next()) {
            (Some((type_name, Value::Array(sections))), None) => (type_name, sections),
            (Some((type_name, _)), None) => {
                return Err(SerializeError::NotAnObject {
                    path: String::new(),
                    key: type_name.clone(),
                })
            }
            _ => {
                return Err(SerializeError::MalformedEnvelope {
                    path: String::new(),
                    found: document.len(),
                })
            }
        };

        let factory = self
            .registry
            .resolve::<B>(type_name)
            .map_err(|source| SerializeError::Registry {
                path: String::new(),
                source,
            })?;
        let mut ctx = DeserializeContext::new(self.registry);
        let mut values = Vec::with_capacity(sections.len());
        for (index, section) in sections.iter().enumerate() {
            let segment = format!("{type_name}[{index}]");
            let Value::Object(section) = section else {
                return Err(SerializeError::NotAnObject {
                    path: ctx.path(),
                    key: segment,
                });
            };
            let mut object = factory();
            ctx.scoped(segment, |ctx| object.deserialize(section, ctx))?;
            values.push(object);
        }

        let requests = ctx.take_requests();
        Ok(Deserialized {
            value: values,
            errors: ctx.into_errors(),
            requests,
        })
    }

    /// Render a document as JSON text
    pub fn stringify(&self, document: &Serialization) -> Result<String, SerializeError> {
        let text = if self.config.pretty {
            serde_json::to_string_pretty(document)?
        } else {
            serde_json::to_string(document)?
        };
        Ok(text)
    }

    /// Parse JSON text into a document
    pub fn parse(&self, text: &str) -> Result<Serialization, SerializeError> {
        Ok(serde_json::from_str(text)?)
    }
}
