//! In-memory resource library
//!
//! Holds loaded resources by id and, optionally, serializations of resources
//! that have not been needed yet. A stored serialization is rebuilt on the
//! first request for its id and cached from then on.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use indexmap::IndexMap;

use super::{Resource, ResourceError, ResourceProvider};
use crate::registry::TypeRegistry;
use crate::serialize::{wrap, Serialization, SerializeError, Serializer, Value};

/// Resource collaborator backed by in-memory maps
pub struct ResourceLibrary<'r> {
    registry: &'r TypeRegistry,
    resources: RefCell<IndexMap<String, Rc<dyn Resource>>>,
    serializations: RefCell<IndexMap<String, Serialization>>,
    counter: Cell<u64>,
}

impl<'r> ResourceLibrary<'r> {
    /// Create an empty library rebuilding stored resources through `registry`
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            resources: RefCell::new(IndexMap::new()),
            serializations: RefCell::new(IndexMap::new()),
            counter: Cell::new(0),
        }
    }

    /// Generate an id of the form `TypeName|n` not used by any known resource
    pub fn generate_id(&self, type_name: &str) -> String {
        loop {
            let next = self.counter.get() + 1;
            self.counter.set(next);
            let candidate = format!("{type_name}|{next}");
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Add a resource, assigning a fresh id when it has none
    ///
    /// A resource with an id already in the library replaces the old one.
    pub fn register(&self, mut resource: Box<dyn Resource>) -> Rc<dyn Resource> {
        if resource.id_resource().is_empty() {
            resource.set_id_resource(self.generate_id(resource.type_name()));
        }
        let id = resource.id_resource().to_owned();
        let resource: Rc<dyn Resource> = Rc::from(resource);
        if self.resources.borrow_mut().insert(id.clone(), Rc::clone(&resource)).is_some() {
            log::warn!("Resource {id} replaced an existing registration");
        } else {
            log::debug!("Registered resource {id}");
        }
        self.serializations.borrow_mut().shift_remove(&id);
        resource
    }

    /// Add a resource under an explicit id
    pub fn register_with_id(&self, id: impl Into<String>, mut resource: Box<dyn Resource>) -> Rc<dyn Resource> {
        resource.set_id_resource(id.into());
        self.register(resource)
    }

    /// Remove a resource, returning it if it was loaded
    pub fn deregister(&self, id: &str) -> Option<Rc<dyn Resource>> {
        self.serializations.borrow_mut().shift_remove(id);
        let removed = self.resources.borrow_mut().shift_remove(id);
        if removed.is_some() {
            log::debug!("Deregistered resource {id}");
        }
        removed
    }

    /// Loaded resource with this id, without triggering a lazy load
    pub fn get(&self, id: &str) -> Option<Rc<dyn Resource>> {
        self.resources.borrow().get(id).cloned()
    }

    /// Whether the id is loaded or stored
    pub fn contains(&self, id: &str) -> bool {
        self.resources.borrow().contains_key(id) || self.serializations.borrow().contains_key(id)
    }

    /// Loaded resources with this display name
    pub fn resources_by_name(&self, name: &str) -> Vec<Rc<dyn Resource>> {
        self.resources
            .borrow()
            .values()
            .filter(|resource| resource.name() == name)
            .cloned()
            .collect()
    }

    /// Ids of loaded and stored resources, loaded first
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.resources.borrow().keys().cloned().collect();
        ids.extend(
            self.serializations
                .borrow()
                .keys()
                .filter(|id| !self.resources.borrow().contains_key(*id))
                .cloned(),
        );
        ids
    }

    /// Number of loaded and stored resources
    pub fn len(&self) -> usize {
        self.ids().len()
    }

    /// Whether the library knows no resources
    pub fn is_empty(&self) -> bool {
        self.resources.borrow().is_empty() && self.serializations.borrow().is_empty()
    }

    /// Store serializations `{ id: { TypeName: {…} }, … }` for lazy loading
    ///
    /// Returns the number of entries stored.
    pub fn load_serializations(&self, document: &Serialization) -> Result<usize, SerializeError> {
        let mut stored = self.serializations.borrow_mut();
        for (id, entry) in document {
            let Value::Object(entry) = entry else {
                return Err(SerializeError::NotAnObject {
                    path: "resources".to_owned(),
                    key: id.clone(),
                });
            };
            stored.insert(id.clone(), entry.clone());
        }
        Ok(document.len())
    }

    /// Serializations of every known resource, keyed by id
    pub fn serialize_all(&self) -> Serialization {
        let mut document = Serialization::new();
        for (id, resource) in self.resources.borrow().iter() {
            document.insert(id.clone(), Value::Object(wrap(resource.as_ref())));
        }
        for (id, stored) in self.serializations.borrow().iter() {
            if !document.contains_key(id) {
                document.insert(id.clone(), Value::Object(stored.clone()));
            }
        }
        document
    }

    /// Forget every resource
    pub fn clear(&self) {
        self.resources.borrow_mut().clear();
        self.serializations.borrow_mut().clear();
    }

    /// Loaded resource with this id, rebuilding it from storage if needed
    pub fn load(&self, id: &str) -> Result<Rc<dyn Resource>, ResourceError> {
        if let Some(resource) = self.get(id) {
            return Ok(resource);
        }
        let stored = self
            .serializations
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound { id: id.to_owned() })?;

        let loaded = Serializer::new(self.registry)
            .deserialize::<dyn Resource>(&stored)
            .map_err(|source| ResourceError::Load {
                id: id.to_owned(),
                source: Box::new(source),
            })?;
        for error in &loaded.errors {
            log::warn!("Resource {id}: {error}");
        }
        if !loaded.requests.is_empty() {
            log::warn!("Resource {id} references other resources, which are left unresolved");
        }

        log::debug!("Lazily loaded resource {id}");
        Ok(self.register_with_id(id, loaded.value))
    }
}

#[async_trait(?Send)]
impl ResourceProvider for ResourceLibrary<'_> {
    async fn get_resource(&self, id: &str) -> Result<Rc<dyn Resource>, ResourceError> {
        self.load(id)
    }
}

impl std::fmt::Debug for ResourceLibrary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLibrary")
            .field("loaded", &self.resources.borrow().len())
            .field("stored", &self.serializations.borrow().len())
            .finish()
    }
}
