//! Shared identifier wrappers for VMS tenancy.
//!
//! Three families of identifiers flow through a provisioning run and must never be mixed up:
//! - [`TenantId`]: short lowercase-alphanumeric id allocated per tenant
//! - [`TemplateCollectionId`]: template-local collection id, only meaningful inside a template
//! - [`CollectionId`] / [`RecordId`]: ids assigned by the remote store

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters a tenant id may contain.
pub const TENANT_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Default tenant id length.
pub const DEFAULT_TENANT_ID_LEN: usize = 8;

/// Longest tenant id accepted; keeps scoped collection names within store limits.
pub const MAX_TENANT_ID_LEN: usize = 32;

/// Error returned when parsing an identifier fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

/// Tenant identifier: lowercase ASCII letters and digits only.
///
/// The id is embedded in collection names and in store filter expressions, so the
/// character set is enforced on every construction path, including deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Draw a random candidate of `len` characters from [`TENANT_ID_ALPHABET`].
    ///
    /// `len` is clamped to `1..=MAX_TENANT_ID_LEN`; callers that must honour an
    /// exact length validate it first (see `TenantIdAllocator::new`).
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        let len = len.clamp(1, MAX_TENANT_ID_LEN);
        let id = (0..len)
            .map(|_| TENANT_ID_ALPHABET[rng.gen_range(0..TENANT_ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn parse(value: &str) -> Result<Self, IdParseError> {
        if value.is_empty() {
            return Err(IdParseError::new("Invalid tenant ID: empty"));
        }
        if value.len() > MAX_TENANT_ID_LEN {
            return Err(IdParseError::new(format!(
                "Invalid tenant ID: longer than {} characters",
                MAX_TENANT_ID_LEN
            )));
        }
        if !value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Err(IdParseError::new(format!(
                "Invalid tenant ID '{}': only lowercase letters and digits are allowed",
                value
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TenantId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

macro_rules! define_opaque_id {
    ($(#[$meta:meta])* $name:ident, $label:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                if value.trim().is_empty() {
                    return Err(IdParseError::new(format!("Invalid {}: empty", $label)));
                }
                Ok(Self(value.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_opaque_id!(
    /// Collection id local to a schema template.
    TemplateCollectionId,
    "template collection ID"
);
define_opaque_id!(
    /// Collection id assigned by the remote store on creation.
    CollectionId,
    "collection ID"
);
define_opaque_id!(
    /// Record id assigned by the remote store.
    RecordId,
    "record ID"
);
