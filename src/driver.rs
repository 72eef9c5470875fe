use crate::config::DriverConfig;
use crate::value::{self, Value};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Operations every storage backend provides.
///
/// A missing key is never an error: `get` returns `Ok(None)`.
pub trait Driver: Send + Sync {
    /// Number of entries in the namespace.
    fn count(&self) -> Result<u64>;

    /// Whether `key` holds a present value. Goes through `get` so the two
    /// never disagree about presence.
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Creates or overwrites `key`.
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Removes `key`; a missing key is a no-op.
    fn delete(&self, key: &str) -> Result<()>;

    /// All keys of the namespace, in no particular order.
    fn keys(&self) -> Result<Vec<String>>;

    /// Removes every entry of the namespace.
    fn flush(&self) -> Result<()>;

    /// Releases held resources. Calling it again is not an error.
    fn close(&self) -> Result<()>;
}

/// Produces ready-to-use drivers from backend-specific configuration.
pub trait DriverFactory: Send + Sync {
    fn open(&self, config: &DriverConfig) -> Result<Arc<dyn Driver>>;
}

impl<F> DriverFactory for F
where
    F: Fn(&DriverConfig) -> Result<Arc<dyn Driver>> + Send + Sync,
{
    fn open(&self, config: &DriverConfig) -> Result<Arc<dyn Driver>> {
        self(config)
    }
}

/// Typed helpers available on every driver.
pub trait DriverExt: Driver {
    /// Decodes the value at `key` into `dest`.
    ///
    /// Returns `false` and leaves `dest` untouched when the key is absent.
    fn get_into<T: DeserializeOwned>(&self, key: &str, dest: &mut T) -> Result<bool> {
        match self.get(key)? {
            Some(found) => {
                value::populate(found, dest)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stores any `Serialize` type as a structured value.
    fn set_serialized<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, Value::structured(value)?)
    }
}

impl<D: Driver + ?Sized> DriverExt for D {}
