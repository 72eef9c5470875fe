mod memory;
mod sled;

pub use self::memory::{InstanceCache, MemoryDriver, MemoryFactory, DEFAULT_INSTANCE};
pub use self::sled::{default_path, namespace_for, DatabasePool, SledDriver, SledFactory};
