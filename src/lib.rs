//! This library houses a key-value store abstraction over swappable drivers

mod config;
mod driver;
pub mod drivers;
mod error;
mod registry;
pub mod value;

pub use config::{ConnectionPolicy, DriverConfig};
pub use driver::{Driver, DriverExt, DriverFactory};
pub use error::{BoxError, Error, Result};
pub use registry::{Registry, DEFAULT_DRIVER};
pub use value::Value;
