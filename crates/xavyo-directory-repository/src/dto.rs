//! Constructor-based DTO conversion
//!
//! A [`Dto`] lists the constructors it can be built with. Converting an
//! entity picks the constructor with the most parameters that all name
//! properties of the entity, calls it with those property values and then
//! assigns any remaining settable properties the entity has.
//!
//! The chosen constructor is cached per (entity type, DTO type) pair in
//! [`EntityInstantiators`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use xavyo_directory::entity::DirectoryEntity;
use xavyo_directory::entry::AttributeValue;
use xavyo_directory::error::{DirectoryError, DirectoryResult};

/// A type built from entity properties through one of its constructors.
pub trait Dto: Sized + Send + 'static {
    /// Available constructors, in declaration order.
    fn constructors() -> Vec<Constructor<Self>>;

    /// Properties assignable after construction.
    fn settable_properties() -> &'static [&'static str] {
        &[]
    }

    /// Assign one settable property.
    fn set_property(&mut self, _name: &str, _value: AttributeValue) -> DirectoryResult<()> {
        Ok(())
    }
}

/// A constructor: named parameters and the function building the value.
pub struct Constructor<R> {
    pub parameters: &'static [&'static str],
    pub factory: fn(&mut ConstructorArgs) -> DirectoryResult<R>,
}

impl<R> Constructor<R> {
    pub const fn new(
        parameters: &'static [&'static str],
        factory: fn(&mut ConstructorArgs) -> DirectoryResult<R>,
    ) -> Self {
        Self {
            parameters,
            factory,
        }
    }
}

impl<R> Clone for Constructor<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Constructor<R> {}

impl<R> std::fmt::Debug for Constructor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Parameter values handed to a constructor. Unset properties are absent.
#[derive(Debug, Default)]
pub struct ConstructorArgs {
    values: HashMap<&'static str, AttributeValue>,
}

impl ConstructorArgs {
    fn missing(name: &str) -> DirectoryError {
        DirectoryError::mapping(format!("constructor parameter '{name}' has no value"))
    }

    /// Take the raw value of `name`.
    pub fn take(&mut self, name: &str) -> Option<AttributeValue> {
        self.values.remove(name)
    }

    /// Required string parameter.
    pub fn string(&mut self, name: &str) -> DirectoryResult<String> {
        self.optional_string(name)
            .ok_or_else(|| Self::missing(name))
    }

    pub fn optional_string(&mut self, name: &str) -> Option<String> {
        self.take(name)
            .and_then(|value| value.to_strings().into_iter().next())
    }

    /// Required integer parameter.
    pub fn integer(&mut self, name: &str) -> DirectoryResult<i64> {
        self.optional_integer(name)
            .ok_or_else(|| Self::missing(name))
    }

    pub fn optional_integer(&mut self, name: &str) -> Option<i64> {
        self.take(name).and_then(|value| value.as_integer())
    }

    /// Every value of `name`. Empty when unset.
    pub fn strings(&mut self, name: &str) -> Vec<String> {
        self.take(name)
            .map(|value| value.to_strings())
            .unwrap_or_default()
    }

    pub fn boolean(&mut self, name: &str) -> Option<bool> {
        self.take(name).and_then(|value| value.as_boolean())
    }
}

/// Resolved constructor plus the settable properties it leaves over.
struct Binding<R> {
    constructor: Constructor<R>,
    remaining: Vec<&'static str>,
}

impl<R: Dto> Binding<R> {
    fn resolve<S: DirectoryEntity>() -> DirectoryResult<Self> {
        let mut best: Option<Constructor<R>> = None;
        for constructor in R::constructors() {
            let resolvable = constructor
                .parameters
                .iter()
                .all(|p| S::descriptor(p).is_some());
            let better = best.map_or(true, |b| constructor.parameters.len() > b.parameters.len());
            if resolvable && better {
                best = Some(constructor);
            }
        }

        let constructor = best.ok_or_else(|| {
            DirectoryError::mapping(format!(
                "no constructor of {} can be built from {}",
                std::any::type_name::<R>(),
                std::any::type_name::<S>()
            ))
        })?;

        let remaining = R::settable_properties()
            .iter()
            .copied()
            .filter(|p| !constructor.parameters.contains(p))
            .filter(|p| S::descriptor(p).is_some())
            .collect();

        Ok(Self {
            constructor,
            remaining,
        })
    }
}

/// Constructor bindings cached per (source type, DTO type).
#[derive(Debug, Default)]
pub struct EntityInstantiators {
    bindings: DashMap<(TypeId, TypeId), Arc<dyn Any + Send + Sync>>,
}

impl EntityInstantiators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an `R` from `source`.
    pub fn instantiate<S: DirectoryEntity, R: Dto>(&self, source: &S) -> DirectoryResult<R> {
        let binding = self.binding::<S, R>()?;

        let mut args = ConstructorArgs::default();
        for &parameter in binding.constructor.parameters {
            if let Some(value) = source.property(parameter) {
                args.values.insert(parameter, value);
            }
        }
        let mut dto = (binding.constructor.factory)(&mut args)?;

        for &property in &binding.remaining {
            if let Some(value) = source.property(property) {
                dto.set_property(property, value)?;
            }
        }
        Ok(dto)
    }

    /// Parameters of the constructor chosen for (`S`, `R`).
    pub fn parameters<S: DirectoryEntity, R: Dto>(&self) -> DirectoryResult<&'static [&'static str]> {
        Ok(self.binding::<S, R>()?.constructor.parameters)
    }

    /// Number of cached bindings.
    pub fn cached_bindings(&self) -> usize {
        self.bindings.len()
    }

    fn binding<S: DirectoryEntity, R: Dto>(&self) -> DirectoryResult<Arc<Binding<R>>> {
        let key = (TypeId::of::<S>(), TypeId::of::<R>());
        if let Some(binding) = self
            .bindings
            .get(&key)
            .and_then(|cached| Arc::clone(cached.value()).downcast::<Binding<R>>().ok())
        {
            return Ok(binding);
        }

        let binding = Arc::new(Binding::<R>::resolve::<S>()?);
        debug!(
            source = std::any::type_name::<S>(),
            target = std::any::type_name::<R>(),
            parameters = ?binding.constructor.parameters,
            "Resolved DTO constructor"
        );
        self.bindings.insert(key, binding.clone());
        Ok(binding)
    }
}

/// Converts entities of type `S` into DTOs of type `R`.
pub struct DtoInstantiatingConverter<S, R> {
    instantiators: Arc<EntityInstantiators>,
    _types: PhantomData<fn(&S) -> R>,
}

impl<S: DirectoryEntity, R: Dto> DtoInstantiatingConverter<S, R> {
    pub fn new(instantiators: Arc<EntityInstantiators>) -> Self {
        Self {
            instantiators,
            _types: PhantomData,
        }
    }

    pub fn convert(&self, source: &S) -> DirectoryResult<R> {
        self.instantiators.instantiate(source)
    }
}
