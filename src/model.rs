//! Node API Model
//!
//! Documents read from and requests written to a node's configuration API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// JSON object as returned by the node API, keys kept in document order
pub type Object = Map<String, Value>;

/// Configuration sections that selective sync can replicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Dns,
    Dhcp,
    Ntp,
    Resolver,
    Database,
    Misc,
    Debug,
}

impl Section {
    /// All sections, in payload order
    pub const ALL: [Section; 7] = [
        Section::Dns,
        Section::Dhcp,
        Section::Ntp,
        Section::Resolver,
        Section::Database,
        Section::Misc,
        Section::Debug,
    ];

    /// Top-level key of this section in a config document
    pub fn key(self) -> &'static str {
        match self {
            Section::Dns => "dns",
            Section::Dhcp => "dhcp",
            Section::Ntp => "ntp",
            Section::Resolver => "resolver",
            Section::Database => "database",
            Section::Misc => "misc",
            Section::Debug => "debug",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Untyped configuration tree returned by `GET /api/config`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub config: Object,
}

impl ConfigDocument {
    pub fn new(config: Object) -> Self {
        Self { config }
    }

    /// Sub-document for a section.
    ///
    /// Returns `Ok(None)` when the section is absent or null, and
    /// [`Error::TypeMismatch`] when it is present but not an object.
    pub fn section(&self, section: Section) -> Result<Option<&Object>> {
        object_at(&self.config, section.key())
    }
}

/// Typed lookup of an object-valued key
pub fn object_at<'a>(object: &'a Object, key: &str) -> Result<Option<&'a Object>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(Error::TypeMismatch {
            key: key.to_string(),
            expected: "object",
        }),
    }
}

/// Body of `PATCH /api/config`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchConfigRequest {
    pub config: PatchConfig,
}

/// Sections written by a config patch; absent sections stay untouched on the node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<Object>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp: Option<Object>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ntp: Option<Object>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<Object>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<Object>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misc: Option<Object>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Object>,
}

impl PatchConfig {
    /// Store the payload for a section
    pub fn set(&mut self, section: Section, value: Option<Object>) {
        let slot = match section {
            Section::Dns => &mut self.dns,
            Section::Dhcp => &mut self.dhcp,
            Section::Ntp => &mut self.ntp,
            Section::Resolver => &mut self.resolver,
            Section::Database => &mut self.database,
            Section::Misc => &mut self.misc,
            Section::Debug => &mut self.debug,
        };
        *slot = value;
    }

    pub fn get(&self, section: Section) -> Option<&Object> {
        match section {
            Section::Dns => self.dns.as_ref(),
            Section::Dhcp => self.dhcp.as_ref(),
            Section::Ntp => self.ntp.as_ref(),
            Section::Resolver => self.resolver.as_ref(),
            Section::Database => self.database.as_ref(),
            Section::Misc => self.misc.as_ref(),
            Section::Debug => self.debug.as_ref(),
        }
    }

    /// Whether no section is written at all
    pub fn is_empty(&self) -> bool {
        Section::ALL.iter().all(|s| self.get(*s).is_none())
    }
}

/// Import selection sent alongside a teleporter snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTeleporterRequest {
    pub config: bool,
    pub dhcp_leases: bool,
    pub gravity: PostGravityRequest,
}

/// Gravity database tables to import from a teleporter snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostGravityRequest {
    pub group: bool,
    pub adlist: bool,
    pub adlist_by_group: bool,
    pub domainlist: bool,
    pub domainlist_by_group: bool,
    pub client: bool,
    pub client_by_group: bool,
}

/// Session returned by `POST /api/auth`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub session: SessionInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub valid: bool,
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub csrf: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body of a failed node API call
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
