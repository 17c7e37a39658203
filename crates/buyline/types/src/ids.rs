//! Strongly-typed identifiers for buyline entities
//!
//! All IDs are UUID-based but wrapped in newtype structs for type safety.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a media buy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaBuyId(Uuid);

impl MediaBuyId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse from either the display form (`mb:<uuid>`) or a bare UUID.
    pub fn parse_str(raw: &str) -> Option<Self> {
        let trimmed = raw.strip_prefix("mb:").unwrap_or(raw);
        Uuid::parse_str(trimmed).ok().map(Self)
    }
}

impl fmt::Display for MediaBuyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mb:{}", self.0)
    }
}

/// Unique identifier for a workflow step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowStepId(Uuid);

impl WorkflowStepId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse from either the display form (`step:<uuid>`) or a bare UUID.
    pub fn parse_str(raw: &str) -> Option<Self> {
        let trimmed = raw.strip_prefix("step:").unwrap_or(raw);
        Uuid::parse_str(trimmed).ok().map(Self)
    }
}

impl fmt::Display for WorkflowStepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step:{}", self.0)
    }
}

/// Unique identifier for a creative asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreativeId(Uuid);

impl CreativeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse from either the display form (`creative:<uuid>`) or a bare UUID.
    pub fn parse_str(raw: &str) -> Option<Self> {
        let trimmed = raw.strip_prefix("creative:").unwrap_or(raw);
        Uuid::parse_str(trimmed).ok().map(Self)
    }
}

impl fmt::Display for CreativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "creative:{}", self.0)
    }
}

/// Identifier for a tenant (publisher account) owning a set of records
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tenant:{}", self.0)
    }
}

/// Identifier for a principal (authenticated buyer) acting within a tenant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "principal:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_buy_id_generation() {
        let id1 = MediaBuyId::generate();
        let id2 = MediaBuyId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_step_id_display() {
        let id = WorkflowStepId::generate();
        let display = format!("{}", id);
        assert!(display.starts_with("step:"));
    }

    #[test]
    fn test_parse_accepts_prefixed_and_bare() {
        let id = MediaBuyId::generate();
        let prefixed = id.to_string();
        let bare = id.as_uuid().to_string();
        assert_eq!(MediaBuyId::parse_str(&prefixed), Some(id.clone()));
        assert_eq!(MediaBuyId::parse_str(&bare), Some(id));
        assert_eq!(MediaBuyId::parse_str("mb:not-a-uuid"), None);
    }
}
