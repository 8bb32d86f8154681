//! # Subclass registry
//!
//! Maps `(base type, type name)` to a factory producing a default-constructed
//! instance. Deserialization and class-selector editing resolve concrete types
//! through it, so nothing is ever looked up by string outside this table.
//!
//! ## Lifecycle
//!
//! Registration happens on a [`RegistryBuilder`] during startup. `build()`
//! freezes it into a [`TypeRegistry`] which is read-only afterwards and can be
//! shared freely. The process-wide instance is created lazily by [`global`]
//! with the built-in types, or explicitly once by [`bootstrap`].
//!
//! Bases are identified by their trait object type (`dyn Component`,
//! `dyn Light`, ...) through [`SubclassBase`].

mod builtins;

pub use builtins::register_builtins;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

/// A base type that concrete types can be registered under
pub trait SubclassBase: 'static {
    /// Name of the base, used in errors and class selectors
    const BASE_NAME: &'static str;
}

/// Constructor for a default instance of a registered type
pub type Factory<B> = fn() -> Box<B>;

/// Public description of one registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubclassDescriptor {
    /// Concrete type name
    pub name: &'static str,
    /// Declared base type name
    pub base: &'static str,
    /// Registration index within the base
    pub index: usize,
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No type with this name is registered under the base
    #[error("`{type_name}` is not a registered subclass of `{base}`")]
    Miss {
        /// Base the lookup was made against
        base: &'static str,
        /// Requested type name
        type_name: String,
    },

    /// The process-wide registry was already initialized
    #[error("the global type registry is already initialized")]
    AlreadyBootstrapped,
}

struct SubclassTable<B: ?Sized + 'static> {
    entries: Vec<(SubclassDescriptor, Factory<B>)>,
    by_name: HashMap<&'static str, usize>,
}

impl<B: ?Sized + 'static> Default for SubclassTable<B> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

type TableMap = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

/// Mutable registration phase of a [`TypeRegistry`]
#[derive(Default)]
pub struct RegistryBuilder {
    tables: TableMap,
}

impl RegistryBuilder {
    /// Create a builder with no registrations
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with every built-in component, light, resource and coat
    pub fn with_builtins() -> Self {
        let mut builder = Self::new();
        register_builtins(&mut builder);
        builder
    }

    /// Register `name` under base `B`, returning its registration index
    ///
    /// Registering a name twice under the same base keeps the first factory and
    /// returns the existing index.
    pub fn register<B: SubclassBase + ?Sized>(&mut self, name: &'static str, factory: Factory<B>) -> usize {
        let key = TypeId::of::<B>();
        let mut table: Box<SubclassTable<B>> = self
            .tables
            .remove(&key)
            .and_then(|table| table.downcast().ok())
            .unwrap_or_default();

        let index = if let Some(&index) = table.by_name.get(name) {
            log::debug!("{name} already registered under {}, keeping index {index}", B::BASE_NAME);
            index
        } else {
            let index = table.entries.len();
            let descriptor = SubclassDescriptor {
                name,
                base: B::BASE_NAME,
                index,
            };
            table.entries.push((descriptor, factory));
            table.by_name.insert(name, index);
            log::debug!("Registered {name} under {} at index {index}", B::BASE_NAME);
            index
        };

        self.tables.insert(key, table);
        index
    }

    /// Register `name` under base `B` (builder pattern)
    #[must_use]
    pub fn with<B: SubclassBase + ?Sized>(mut self, name: &'static str, factory: Factory<B>) -> Self {
        self.register(name, factory);
        self
    }

    /// Freeze the registrations
    pub fn build(self) -> TypeRegistry {
        TypeRegistry { tables: self.tables }
    }
}

/// Frozen `(base, name) -> factory` table
pub struct TypeRegistry {
    tables: TableMap,
}

impl TypeRegistry {
    fn table<B: SubclassBase + ?Sized>(&self) -> Option<&SubclassTable<B>> {
        self.tables.get(&TypeId::of::<B>())?.downcast_ref()
    }

    /// Look up the factory registered as `type_name` under base `B`
    pub fn resolve<B: SubclassBase + ?Sized>(&self, type_name: &str) -> Result<Factory<B>, RegistryError> {
        self.table::<B>()
            .and_then(|table| {
                let index = *table.by_name.get(type_name)?;
                table.entries.get(index).map(|(_, factory)| *factory)
            })
            .ok_or_else(|| RegistryError::Miss {
                base: B::BASE_NAME,
                type_name: type_name.to_owned(),
            })
    }

    /// Construct a default instance of `type_name` under base `B`
    pub fn construct<B: SubclassBase + ?Sized>(&self, type_name: &str) -> Result<Box<B>, RegistryError> {
        self.resolve::<B>(type_name).map(|factory| factory())
    }

    /// Registrations under base `B`, in registration order
    pub fn list<B: SubclassBase + ?Sized>(&self) -> Vec<SubclassDescriptor> {
        self.table::<B>()
            .map(|table| table.entries.iter().map(|(descriptor, _)| descriptor.clone()).collect())
            .unwrap_or_default()
    }

    /// Registered type names under base `B`, in registration order
    pub fn names<B: SubclassBase + ?Sized>(&self) -> Vec<String> {
        self.list::<B>().into_iter().map(|d| d.name.to_owned()).collect()
    }

    /// Registration index of `type_name` under base `B`
    pub fn index_of<B: SubclassBase + ?Sized>(&self, type_name: &str) -> Option<usize> {
        self.table::<B>()?.by_name.get(type_name).copied()
    }

    /// Whether `type_name` is registered under base `B`
    pub fn contains<B: SubclassBase + ?Sized>(&self, type_name: &str) -> bool {
        self.index_of::<B>(type_name).is_some()
    }

    /// Detached copy of the registrations under base `B`
    ///
    /// Objects that switch their own polymorphic fields keep one of these so
    /// they resolve through the registry they were built with.
    pub fn subclasses<B: SubclassBase + ?Sized>(&self) -> SubclassSet<B> {
        let entries: Vec<(&'static str, Factory<B>)> = self
            .table::<B>()
            .map(|table| table.entries.iter().map(|(descriptor, factory)| (descriptor.name, *factory)).collect())
            .unwrap_or_default();
        SubclassSet { entries }
    }
}

/// Registrations of one base, taken from a [`TypeRegistry`]
pub struct SubclassSet<B: ?Sized + 'static> {
    entries: Vec<(&'static str, Factory<B>)>,
}

impl<B: SubclassBase + ?Sized> SubclassSet<B> {
    /// Construct a default instance of `type_name`
    pub fn construct(&self, type_name: &str) -> Result<Box<B>, RegistryError> {
        self.entries
            .iter()
            .find(|(name, _)| *name == type_name)
            .map(|(_, factory)| factory())
            .ok_or_else(|| RegistryError::Miss {
                base: B::BASE_NAME,
                type_name: type_name.to_owned(),
            })
    }

    /// Type names in registration order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| (*name).to_owned()).collect()
    }
}

impl<B: ?Sized + 'static> Clone for SubclassSet<B> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<B: ?Sized + 'static> std::fmt::Debug for SubclassSet<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|(name, _)| name)).finish()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("bases", &self.tables.len())
            .finish()
    }
}

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

/// Process-wide registry, initialized with the built-in types on first use
pub fn global() -> &'static TypeRegistry {
    GLOBAL.get_or_init(|| RegistryBuilder::with_builtins().build())
}

/// Install `builder` as the process-wide registry
///
/// Must run before anything calls [`global`]; afterwards the registry is frozen
/// and this returns [`RegistryError::AlreadyBootstrapped`].
pub fn bootstrap(builder: RegistryBuilder) -> Result<&'static TypeRegistry, RegistryError> {
    GLOBAL
        .set(builder.build())
        .map_err(|_| RegistryError::AlreadyBootstrapped)?;
    log::info!("Global type registry bootstrapped");
    Ok(global())
}
