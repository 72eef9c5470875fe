use crate::config::{ConnectionPolicy, DriverConfig};
use crate::driver::{Driver, DriverFactory};
use crate::error::Error;
use crate::value::{self, Value};
use crate::Result;
use slog::{debug, info, o, Logger};
use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Directory used when the config does not carry a `path`.
pub fn default_path() -> PathBuf {
    std::env::temp_dir().join("kvstore-sled")
}

/// Namespace derived from the connection target, so that distinct paths
/// sharing one database never collide.
pub fn namespace_for(path: &Path) -> String {
    format!("ns-{:08x}", crc32fast::hash(path.to_string_lossy().as_bytes()))
}

/// Keeps at most one open sled database per directory.
///
/// sled locks its directory exclusively, so every driver pointing at the same
/// path has to share one `sled::Db`. The pool only holds weak references: a
/// database closes once the last `Handle` to it is dropped. Opening and the
/// final release both happen under the pool lock, so an open never races a
/// database that is still shutting down.
pub struct DatabasePool {
    databases: Mutex<HashMap<PathBuf, Weak<sled::Db>>>,
    logger: Logger,
}

impl DatabasePool {
    pub fn new(logger: Logger) -> Arc<DatabasePool> {
        Arc::new(DatabasePool {
            databases: Mutex::new(HashMap::new()),
            logger: logger.new(o!("driver" => "sled")),
        })
    }

    /// Number of databases currently open.
    pub fn open_count(&self) -> usize {
        self.lock_databases()
            .values()
            .filter(|db| db.strong_count() > 0)
            .count()
    }

    fn lock_databases(&self) -> MutexGuard<'_, HashMap<PathBuf, Weak<sled::Db>>> {
        self.databases.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(self: &Arc<Self>, path: &Path) -> Result<Handle> {
        let mut databases = self.lock_databases();
        if let Some(db) = databases.get(path).and_then(Weak::upgrade) {
            return Ok(Handle {
                db: Some(db),
                path: path.to_path_buf(),
                pool: Arc::clone(self),
            });
        }

        let db = sled::open(path).map_err(|e| Error::Connection {
            target: path.display().to_string(),
            source: Box::new(e),
        })?;
        let db = Arc::new(db);
        databases.insert(path.to_path_buf(), Arc::downgrade(&db));
        info!(self.logger, "connected"; "path" => path.display().to_string());
        Ok(Handle {
            db: Some(db),
            path: path.to_path_buf(),
            pool: Arc::clone(self),
        })
    }
}

/// A reference to a pooled database.
struct Handle {
    db: Option<Arc<sled::Db>>,
    path: PathBuf,
    pool: Arc<DatabasePool>,
}

impl Deref for Handle {
    type Target = sled::Db;

    fn deref(&self) -> &sled::Db {
        match &self.db {
            Some(db) => db,
            None => unreachable!("handle used after release"),
        }
    }
}

impl Clone for Handle {
    fn clone(&self) -> Handle {
        Handle {
            db: self.db.clone(),
            path: self.path.clone(),
            pool: Arc::clone(&self.pool),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let mut databases = self.pool.lock_databases();
        if let Some(db) = self.db.take() {
            // new references are only handed out under this lock
            if Arc::strong_count(&db) == 1 {
                databases.remove(&self.path);
                drop(db);
                info!(self.pool.logger, "disconnected"; "path" => self.path.display().to_string());
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Access {
    Read,
    Write,
}

/// Driver backed by an embedded sled database; the namespace is a sled tree.
///
/// The driver's own reference to the database lives behind a lifecycle lock.
/// With `ConnectionPolicy::PerOperation` that lock is held across acquire,
/// the operation and release. With `ConnectionPolicy::Persistent` operations
/// work on their own reference, so `close` from another caller only drops the
/// driver's reference and never the database under a running operation.
pub struct SledDriver {
    path: PathBuf,
    namespace: String,
    policy: ConnectionPolicy,
    pool: Arc<DatabasePool>,
    connection: Mutex<Option<Handle>>,
    logger: Logger,
}

impl SledDriver {
    /// Opens the database at `path` through `pool`, checking that it can be
    /// reached.
    pub fn open(
        pool: &Arc<DatabasePool>,
        path: PathBuf,
        namespace: Option<String>,
        policy: ConnectionPolicy,
        logger: Logger,
    ) -> Result<SledDriver> {
        let namespace = namespace.unwrap_or_else(|| namespace_for(&path));
        let logger = logger.new(o!(
            "driver" => "sled",
            "path" => path.display().to_string(),
            "namespace" => namespace.clone(),
        ));
        let driver = SledDriver {
            path,
            namespace,
            policy,
            pool: Arc::clone(pool),
            connection: Mutex::new(None),
            logger,
        };

        let handle = driver.pool.acquire(&driver.path)?;
        if policy == ConnectionPolicy::Persistent {
            *driver.lock_connection() = Some(handle);
        } else {
            driver.release(handle)?;
        }
        Ok(driver)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn policy(&self) -> ConnectionPolicy {
        self.policy
    }

    /// Whether this driver holds a reference to its database.
    pub fn is_connected(&self) -> bool {
        self.lock_connection().is_some()
    }

    fn lock_connection(&self) -> MutexGuard<'_, Option<Handle>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, handle: Handle) -> Result<()> {
        handle.flush()?;
        drop(handle);
        debug!(self.logger, "released connection");
        Ok(())
    }

    fn with_tree<T, F>(&self, access: Access, op: F) -> Result<T>
    where
        F: FnOnce(&sled::Tree) -> Result<T>,
    {
        match self.policy {
            ConnectionPolicy::Persistent => {
                let handle = {
                    let mut connection = self.lock_connection();
                    let handle = match connection.take() {
                        Some(handle) => handle,
                        None => self.pool.acquire(&self.path)?,
                    };
                    *connection = Some(handle.clone());
                    handle
                };
                let tree = handle.open_tree(&self.namespace)?;
                op(&tree)
            }
            ConnectionPolicy::PerOperation => {
                let _lifecycle = self.lock_connection();
                let handle = self.pool.acquire(&self.path)?;
                let result = handle
                    .open_tree(&self.namespace)
                    .map_err(Error::from)
                    .and_then(|tree| op(&tree));
                match access {
                    Access::Write => {
                        // release the handle even when the operation failed
                        let released = self.release(handle);
                        let value = result?;
                        released?;
                        Ok(value)
                    }
                    Access::Read => {
                        drop(handle);
                        result
                    }
                }
            }
        }
    }
}

impl Driver for SledDriver {
    fn count(&self) -> Result<u64> {
        self.with_tree(Access::Read, |tree| Ok(tree.len() as u64))
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        debug!(self.logger, "get"; "key" => key);
        self.with_tree(Access::Read, |tree| match tree.get(key)? {
            Some(bytes) => value::decode(&bytes),
            None => Ok(None),
        })
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        debug!(self.logger, "set"; "key" => key);
        let bytes = value::encode(&value)?;
        self.with_tree(Access::Write, |tree| {
            tree.insert(key, bytes)?;
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        debug!(self.logger, "delete"; "key" => key);
        self.with_tree(Access::Write, |tree| {
            tree.remove(key)?;
            Ok(())
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.with_tree(Access::Read, |tree| {
            tree.iter()
                .keys()
                .map(|key| -> Result<String> { Ok(String::from_utf8_lossy(&key?).into_owned()) })
                .collect()
        })
    }

    fn flush(&self) -> Result<()> {
        debug!(self.logger, "flush");
        self.with_tree(Access::Write, |tree| {
            tree.clear()?;
            Ok(())
        })
    }

    fn close(&self) -> Result<()> {
        let held = self.lock_connection().take();
        match held {
            Some(handle) => self.release(handle),
            None => Ok(()),
        }
    }
}

/// Opens sled drivers from `path`, `namespace` and `policy` options.
///
/// All drivers opened here share one `DatabasePool`, so any number of them
/// may point at the same path.
pub struct SledFactory {
    pool: Arc<DatabasePool>,
    logger: Logger,
}

impl SledFactory {
    pub fn new(logger: Logger) -> SledFactory {
        SledFactory {
            pool: DatabasePool::new(logger.clone()),
            logger,
        }
    }
}

impl DriverFactory for SledFactory {
    fn open(&self, config: &DriverConfig) -> Result<Arc<dyn Driver>> {
        let path = config.get_path("path").unwrap_or_else(default_path);
        let namespace = config.get("namespace").map(str::to_owned);
        let policy = config.get_parsed("policy")?.unwrap_or_default();
        let driver = SledDriver::open(&self.pool, path, namespace, policy, self.logger.clone())?;
        Ok(Arc::new(driver))
    }
}
