use crate::error::Error;
use crate::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Backend-specific options, handed verbatim from the registry to a driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverConfig {
    options: BTreeMap<String, String>,
}

impl DriverConfig {
    pub fn new() -> DriverConfig {
        DriverConfig::default()
    }

    /// Config selecting a named instance of the memory driver.
    pub fn instance(name: &str) -> DriverConfig {
        DriverConfig::new().with("name", name)
    }

    /// Config pointing a file backed driver at `path`.
    pub fn path<P: Into<PathBuf>>(path: P) -> DriverConfig {
        DriverConfig::new().with("path", path.into().to_string_lossy())
    }

    pub fn with<K: Into<String>, V: AsRef<str>>(mut self, key: K, value: V) -> DriverConfig {
        self.options.insert(key.into(), value.as_ref().to_owned());
        self
    }

    pub fn set<K: Into<String>, V: AsRef<str>>(&mut self, key: K, value: V) {
        self.options.insert(key.into(), value.as_ref().to_owned());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    /// Parses an option, reporting `InvalidConfig` when it does not parse.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Some(raw) => raw.parse().map(Some).map_err(|_| Error::InvalidConfig {
                key: key.to_owned(),
                value: raw.to_owned(),
            }),
            None => Ok(None),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parses a single `key=value` pair, as given on the command line.
impl FromStr for DriverConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<DriverConfig> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok(DriverConfig::new().with(key.trim(), value.trim()))
            }
            _ => Err(Error::InvalidConfig {
                key: s.to_owned(),
                value: String::new(),
            }),
        }
    }
}

impl Extend<(String, String)> for DriverConfig {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.options.extend(iter)
    }
}

impl IntoIterator for DriverConfig {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.options.into_iter()
    }
}

/// How a connection oriented driver manages its backend handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPolicy {
    /// Connect on first use and hold the handle until `close`.
    Persistent,
    /// Connect, operate and disconnect around every single operation.
    PerOperation,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        ConnectionPolicy::Persistent
    }
}

impl FromStr for ConnectionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<ConnectionPolicy> {
        match s {
            "persistent" => Ok(ConnectionPolicy::Persistent),
            "per-operation" => Ok(ConnectionPolicy::PerOperation),
            _ => Err(Error::InvalidConfig {
                key: "policy".to_owned(),
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for ConnectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionPolicy::Persistent => write!(f, "persistent"),
            ConnectionPolicy::PerOperation => write!(f, "per-operation"),
        }
    }
}
