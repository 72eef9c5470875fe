use crate::config::DriverConfig;
use crate::driver::{Driver, DriverFactory};
use crate::value::{self, Value};
use crate::Result;
use slog::{debug, info, o, Logger};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Instance name used when the config does not carry a `name`.
pub const DEFAULT_INSTANCE: &str = "default";

/// In-process driver: a byte map behind a reader/writer lock.
///
/// Reads share the lock, mutations take it exclusively. Nothing is held open,
/// so `close` has nothing to release.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryDriver {
    /// A standalone instance, not shared through any cache.
    pub fn new() -> MemoryDriver {
        MemoryDriver::default()
    }
}

impl Driver for MemoryDriver {
    fn count(&self) -> Result<u64> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data.len() as u64)
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        match data.get(key) {
            Some(bytes) => value::decode(bytes),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        // encode outside the lock, writers only swap bytes
        let bytes = value::encode(&value)?;
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.insert(key.to_owned(), bytes);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data.keys().cloned().collect())
    }

    fn flush(&self) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.clear();
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Shares one `MemoryDriver` per name for as long as the cache lives.
///
/// The map lock only guards lookup and insertion; each instance keeps its own
/// data lock, so traffic on one name never waits on another.
pub struct InstanceCache {
    instances: RwLock<HashMap<String, Arc<MemoryDriver>>>,
    logger: Logger,
}

impl InstanceCache {
    pub fn new(logger: Logger) -> InstanceCache {
        InstanceCache {
            instances: RwLock::new(HashMap::new()),
            logger: logger.new(o!("driver" => "memory")),
        }
    }

    /// Returns the instance for `name`, creating it on first request.
    pub fn get_or_create(&self, name: &str) -> Arc<MemoryDriver> {
        {
            let instances = self.instances.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(instance) = instances.get(name) {
                return Arc::clone(instance);
            }
        }

        let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
        // a racing opener may have inserted between the two locks
        let logger = &self.logger;
        let instance = instances.entry(name.to_owned()).or_insert_with(|| {
            info!(logger, "creating instance"; "name" => name);
            Arc::new(MemoryDriver::new())
        });
        Arc::clone(instance)
    }

    pub fn len(&self) -> usize {
        self.instances.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<String> {
        let instances = self.instances.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = instances.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for InstanceCache {
    fn default() -> Self {
        InstanceCache::new(Logger::root(slog::Discard, o!()))
    }
}

/// Opens named memory instances out of a shared `InstanceCache`.
pub struct MemoryFactory {
    cache: Arc<InstanceCache>,
}

impl MemoryFactory {
    pub fn new(cache: Arc<InstanceCache>) -> MemoryFactory {
        MemoryFactory { cache }
    }

    pub fn cache(&self) -> &Arc<InstanceCache> {
        &self.cache
    }
}

impl DriverFactory for MemoryFactory {
    fn open(&self, config: &DriverConfig) -> Result<Arc<dyn Driver>> {
        let name = config.get("name").unwrap_or(DEFAULT_INSTANCE);
        debug!(self.cache.logger, "opening instance"; "name" => name);
        let instance: Arc<dyn Driver> = self.cache.get_or_create(name);
        Ok(instance)
    }
}
