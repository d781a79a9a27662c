//! Common types used across SiteHost

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use time::OffsetDateTime;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Domain mapping ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct MappingId(pub i64);

impl From<i64> for MappingId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Site ID wrapper (sites are owned by the host platform)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct SiteId(pub i64);

impl From<i64> for SiteId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Site page ID wrapper (pages are owned by the host platform)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct PageId(pub i64);

impl From<i64> for PageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Domain Mapping
// =============================================================================

/// Maximum length of a fully-qualified domain name
pub const MAX_DOMAIN_LEN: usize = 253;

/// A custom domain bound to exactly one site.
///
/// `domain` is always stored normalized: lowercase host, no scheme,
/// no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DomainMapping {
    pub id: MappingId,
    pub site_id: SiteId,
    pub domain: String,
    pub default_page_id: Option<PageId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Values written by an insert or an update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMapping {
    pub site_id: SiteId,
    pub domain: String,
    pub default_page_id: Option<PageId>,
}

/// A mapping joined with the site data needed to synthesize routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteBinding {
    pub mapping: DomainMapping,
    pub site_slug: String,
    pub default_page_slug: Option<String>,
}

impl SiteBinding {
    pub fn domain(&self) -> &str {
        &self.mapping.domain
    }
}

/// One row of the administrative mapping listing.
///
/// Every site appears once; sites without a custom domain have empty
/// mapping fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MappingListing {
    pub site_id: SiteId,
    pub site_title: String,
    pub mapping_id: Option<MappingId>,
    pub domain: Option<String>,
    pub default_page_id: Option<PageId>,
}
