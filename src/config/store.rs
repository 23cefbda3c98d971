//! # Configuration store: the universe of startable servers.
//!
//! [`ConfigStore`] maps a logical server name to its [`LaunchDescriptor`]. It is
//! read once at startup and never mutated afterwards; its key set is the set of
//! "configured" names reported by `status()`.
//!
//! ## Format
//! The on-disk format is the JSON document used by MCP clients:
//! ```json
//! {
//!   "mcpServers": {
//!     "zotero": {
//!       "command": "uvx",
//!       "args": ["zotero-mcp"],
//!       "env": { "ZOTERO_LOCAL": "true" }
//!     }
//!   }
//! }
//! ```
//! `args` and `env` may be omitted. Unknown keys are ignored.
//!
//! ## Rules
//! - Iteration order is the order of appearance in the document
//! - Names and commands must be non-empty
//! - Any error is fatal for the caller (startup precondition)

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Static description of how to launch one server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchDescriptor {
    /// Executable to run (resolved through `PATH` by the OS).
    pub command: String,
    /// Ordered argument list.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overrides merged on top of the supervisor's own environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl LaunchDescriptor {
    /// Creates a descriptor with no arguments and no environment overrides.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Appends arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds one environment override.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    mcp_servers: serde_json::Map<String, serde_json::Value>,
}

/// Read-only, ordered mapping from server name to [`LaunchDescriptor`].
#[derive(Clone, Debug, Default)]
pub struct ConfigStore {
    order: Vec<String>,
    servers: HashMap<String, LaunchDescriptor>,
}

impl ConfigStore {
    /// Loads the store from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parses the store from a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(raw)?;

        let mut entries = Vec::with_capacity(file.mcp_servers.len());
        for (name, value) in file.mcp_servers {
            let desc: LaunchDescriptor = serde_json::from_value(value)?;
            entries.push((name, desc));
        }
        Self::from_entries(entries)
    }

    /// Builds a store from `(name, descriptor)` pairs, keeping their order.
    ///
    /// A repeated name replaces the earlier descriptor but keeps its position.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, LaunchDescriptor)>,
        S: Into<String>,
    {
        let mut store = Self::default();
        for (name, desc) in entries {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidServer {
                    name,
                    reason: "empty name",
                });
            }
            if desc.command.trim().is_empty() {
                return Err(ConfigError::InvalidServer {
                    name,
                    reason: "empty command",
                });
            }
            if store.servers.insert(name.clone(), desc).is_none() {
                store.order.push(name);
            }
        }
        Ok(store)
    }

    /// Returns the descriptor for `name`, if configured.
    pub fn get(&self, name: &str) -> Option<&LaunchDescriptor> {
        self.servers.get(name)
    }

    /// Returns true if `name` is configured.
    pub fn contains(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }

    /// Configured names in store order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Iterates `(name, descriptor)` pairs in store order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LaunchDescriptor)> {
        self.order
            .iter()
            .filter_map(|name| self.servers.get(name).map(|d| (name.as_str(), d)))
    }

    /// Number of configured servers.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
