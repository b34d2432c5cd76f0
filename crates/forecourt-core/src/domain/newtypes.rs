//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// MutationId
// ============================================================================

/// Prefix that marks an identifier as locally generated (not yet canonical)
const LOCAL_PREFIX: &str = "local_";

/// Identifier of a queued mutation
///
/// Locally generated ids carry the `local_` prefix so downstream code can
/// detect "this id is not yet canonical". The eventual remote primary key
/// of a created record is a different identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MutationId(String);

impl MutationId {
    /// Create a MutationId from an existing string
    ///
    /// # Errors
    /// Returns `DomainError::InvalidMutationId` if the id is empty or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidMutationId(
                "Mutation id cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidMutationId(format!(
                "Mutation id contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Generate a fresh local id with the `local_` prefix
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{}{}", LOCAL_PREFIX, Uuid::new_v4().simple()))
    }

    /// Returns true if this id was generated locally and is not yet canonical
    #[must_use]
    pub fn is_local(&self) -> bool {
        Self::is_local_str(&self.0)
    }

    /// Returns true if a raw id string carries the local prefix
    ///
    /// Payloads reference related records by raw string ids; this lets the
    /// sync processor recognise references to not-yet-created records.
    #[must_use]
    pub fn is_local_str(s: &str) -> bool {
        s.starts_with(LOCAL_PREFIX)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MutationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MutationId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for MutationId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<MutationId> for String {
    fn from(id: MutationId) -> Self {
        id.0
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Name of a target record type on the backend (e.g. "stations", "sales")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Collection(String);

impl Collection {
    /// Create a new Collection name
    ///
    /// # Errors
    /// Returns `DomainError::InvalidCollection` if the name is empty or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn new(name: String) -> Result<Self, DomainError> {
        if name.is_empty() {
            return Err(DomainError::InvalidCollection(
                "Collection name cannot be empty".to_string(),
            ));
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidCollection(format!(
                "Collection name contains invalid characters: {name}"
            )));
        }

        Ok(Self(name))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Collection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for Collection {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Collection> for String {
    fn from(name: Collection) -> Self {
        name.0
    }
}

// ============================================================================
// Tests
// ============================================================================
