use crate::config::DriverConfig;
use crate::driver::{Driver, DriverFactory};
use crate::drivers::{InstanceCache, MemoryFactory, SledFactory};
use crate::error::Error;
use crate::Result;
use slog::{debug, info, o, warn, Logger};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Driver opened when no name is given.
pub const DEFAULT_DRIVER: &str = "memory";

/// Resolves driver names to factories.
///
/// Built once at startup and handed to whatever needs to open drivers. Names
/// are unique for the registry's lifetime and entries are never removed.
pub struct Registry {
    factories: RwLock<HashMap<String, Arc<dyn DriverFactory>>>,
    logger: Logger,
}

impl Registry {
    /// An empty registry.
    pub fn new(logger: Logger) -> Registry {
        Registry {
            factories: RwLock::new(HashMap::new()),
            logger: logger.new(o!("component" => "registry")),
        }
    }

    /// A registry holding the built-in `memory` and `sled` drivers.
    ///
    /// The memory driver shares named instances through one `InstanceCache`
    /// owned by this registry.
    pub fn with_builtins(logger: Logger) -> Registry {
        let registry = Registry::new(logger.clone());
        let cache = Arc::new(InstanceCache::new(logger.clone()));
        registry.register(DEFAULT_DRIVER, MemoryFactory::new(cache));
        registry.register("sled", SledFactory::new(logger));
        registry
    }

    /// Registers `factory` under `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered.
    pub fn register<F: DriverFactory + 'static>(&self, name: &str, factory: F) {
        self.register_shared(name, Some(Arc::new(factory)))
    }

    /// Registers an already shared factory under `name`.
    ///
    /// # Panics
    ///
    /// Panics if `factory` is `None` or `name` is already registered. Both are
    /// wiring mistakes, not runtime conditions.
    pub fn register_shared(&self, name: &str, factory: Option<Arc<dyn DriverFactory>>) {
        let factory = match factory {
            Some(factory) => factory,
            None => panic!("kvstore: register called with no factory for driver {}", name),
        };

        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        if factories.contains_key(name) {
            panic!("kvstore: register called twice for driver {}", name);
        }
        factories.insert(name.to_owned(), factory);
        info!(self.logger, "registered driver"; "name" => name);
    }

    /// Opens a driver by name, falling back to `DEFAULT_DRIVER`.
    ///
    /// `config` is passed to the driver untouched.
    pub fn open(&self, name: Option<&str>, config: &DriverConfig) -> Result<Arc<dyn Driver>> {
        let name = name.unwrap_or(DEFAULT_DRIVER);
        let factory = {
            let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
            factories.get(name).cloned()
        };

        match factory {
            Some(factory) => {
                debug!(self.logger, "opening driver"; "name" => name);
                factory.open(config)
            }
            None => {
                warn!(self.logger, "driver not found"; "name" => name);
                Err(Error::DriverNotFound(name.to_owned()))
            }
        }
    }

    pub fn open_default(&self, config: &DriverConfig) -> Result<Arc<dyn Driver>> {
        self.open(None, config)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::with_builtins(Logger::root(slog::Discard, o!()))
    }
}
