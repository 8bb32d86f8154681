//! Per-load bookkeeping for deserialization

use serde_json::Value;

use super::{split_envelope, FieldError, FieldValue, Serializable, Serialization, SerializeError};
use crate::registry::{SubclassBase, TypeRegistry};

/// A resource reference read during the structural pass, resolved afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Location of the requesting object in the document
    pub path: String,
    /// Field the resource belongs to
    pub field: String,
    /// Resource id to look up
    pub id: String,
}

/// State threaded through [`Serializable::deserialize`]
///
/// Collects field-level problems instead of failing, tracks the current
/// location in the document for error messages, and records resource ids to
/// resolve once the structure has been rebuilt.
pub struct DeserializeContext<'r> {
    registry: &'r TypeRegistry,
    path: Vec<String>,
    errors: Vec<FieldError>,
    requests: Vec<ResourceRequest>,
}

impl<'r> DeserializeContext<'r> {
    /// Create a context resolving types through `registry`
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            path: Vec::new(),
            errors: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Registry used for polymorphic fields
    pub const fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    /// Current location, segments joined with `/`
    pub fn path(&self) -> String {
        self.path.join("/")
    }

    /// Run `f` with `segment` appended to the current location
    pub fn scoped<T>(&mut self, segment: impl Into<String>, f: impl FnOnce(&mut Self) -> T) -> T {
        self.path.push(segment.into());
        let result = f(self);
        self.path.pop();
        result
    }

    /// Read a required field into `target`
    ///
    /// A missing or malformed value is recorded and `target` keeps its default.
    pub fn required<T: FieldValue>(&mut self, section: &Serialization, key: &str, target: &mut T) {
        match section.get(key) {
            Some(value) => self.read_into(value, key, target),
            None => self.errors.push(FieldError::MissingRequired {
                path: self.path(),
                field: key.to_owned(),
            }),
        }
    }

    /// Read an optional field into `target`, leaving it untouched when absent
    pub fn optional<T: FieldValue>(&mut self, section: &Serialization, key: &str, target: &mut T) {
        if let Some(value) = section.get(key) {
            self.read_into(value, key, target);
        }
    }

    fn read_into<T: FieldValue>(&mut self, value: &Value, key: &str, target: &mut T) {
        match T::from_json(value) {
            Some(parsed) => *target = parsed,
            None => self.invalid(key, format!("expected a {}", T::KIND)),
        }
    }

    /// Record an invalid field
    pub fn invalid(&mut self, key: &str, reason: impl Into<String>) {
        let error = FieldError::Invalid {
            path: self.path(),
            field: key.to_owned(),
            reason: reason.into(),
        };
        log::warn!("{error}");
        self.errors.push(error);
    }

    /// The section a subclass nests for its base type, such as `"Component"`
    ///
    /// A missing base section leaves the base fields at their defaults.
    pub fn base_section<'s>(&mut self, section: &'s Serialization, base: &str) -> Option<&'s Serialization> {
        match section.get(base) {
            Some(Value::Object(inner)) => Some(inner),
            Some(_) => {
                self.invalid(base, "expected an object");
                None
            }
            None => None,
        }
    }

    /// Record the resource id stored under `key` for later resolution
    ///
    /// Returns the id if one was present.
    pub fn request_resource(&mut self, section: &Serialization, key: &str, field: &str) -> Option<String> {
        let mut id = String::new();
        self.optional(section, key, &mut id);
        if id.is_empty() {
            return None;
        }
        self.requests.push(ResourceRequest {
            path: self.path(),
            field: field.to_owned(),
            id: id.clone(),
        });
        Some(id)
    }

    /// Reconstruct a polymorphic value stored as `{ TypeName: {…} }`
    pub fn construct<B>(&mut self, value: &Value) -> Result<Box<B>, SerializeError>
    where
        B: SubclassBase + Serializable + ?Sized,
    {
        let Value::Object(envelope) = value else {
            return Err(SerializeError::MalformedEnvelope {
                path: self.path(),
                found: 0,
            });
        };
        let (type_name, section) = split_envelope(envelope, &self.path())?;
        let mut object = self
            .registry
            .construct::<B>(type_name)
            .map_err(|source| SerializeError::Registry {
                path: self.path(),
                source,
            })?;
        self.scoped(type_name, |ctx| object.deserialize(section, ctx))?;
        Ok(object)
    }

    /// Record an already built field error
    pub fn push_error(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Field errors collected so far
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Take the resource requests collected since the last call
    pub fn take_requests(&mut self) -> Vec<ResourceRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Consume the context, returning its field errors
    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}
