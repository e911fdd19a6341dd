//! Generation and store naming.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// One versioned snapshot of the asset set, e.g. `cyberpuzzle-v2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Generation {
    pub namespace: String,
    pub version: String,
}

impl Generation {
    pub fn new(namespace: impl Into<String>, version: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), version: version.into() }
    }

    /// Display identifier, `{namespace}-{version}`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.namespace, self.version)
    }

    /// The store of this generation serving the given purpose.
    pub fn store(&self, purpose: StorePurpose) -> StoreName {
        StoreName { generation: self.clone(), purpose }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.namespace, self.version)
    }
}

/// What a store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorePurpose {
    /// Precached shell plus stylesheets, scripts and fonts.
    Static,
    /// Pages and API responses captured while browsing.
    Dynamic,
    /// Images.
    Images,
}

impl StorePurpose {
    pub const ALL: [StorePurpose; 3] = [StorePurpose::Static, StorePurpose::Dynamic, StorePurpose::Images];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
            Self::Images => "images",
        }
    }
}

impl fmt::Display for StorePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorePurpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            "images" => Ok(Self::Images),
            other => Err(Error::CorruptEntry(format!("unknown store purpose: {other}"))),
        }
    }
}

/// A (generation, purpose) pair naming one physical store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreName {
    pub generation: Generation,
    pub purpose: StorePurpose,
}

impl StoreName {
    /// Physical name, `{namespace}-{version}-{purpose}`.
    pub fn name(&self) -> String {
        format!("{}-{}", self.generation.id(), self.purpose)
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.generation, self.purpose)
    }
}

/// Lifecycle state of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Active,
    /// Replaced by a newer generation; never revived.
    Superseded,
    /// Install aborted.
    Redundant,
}

impl GenerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Superseded => "superseded",
            Self::Redundant => "redundant",
        }
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parsed" => Ok(Self::Parsed),
            "installing" => Ok(Self::Installing),
            "installed" => Ok(Self::Installed),
            "activating" => Ok(Self::Activating),
            "active" => Ok(Self::Active),
            "superseded" => Ok(Self::Superseded),
            "redundant" => Ok(Self::Redundant),
            other => Err(Error::CorruptEntry(format!("unknown generation state: {other}"))),
        }
    }
}
