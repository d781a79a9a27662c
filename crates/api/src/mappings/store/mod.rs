//! Pluggable persistence for domain mappings.
//!
//! The [`MappingStore`] trait is the contract the resolver and the reconciler
//! are written against.
//!
//! - [`PgMappingStore`]: Postgres via sqlx, used in production
//! - [`MemoryMappingStore`]: in-process, used by tests and `MAPPING_STORE=memory`
//!
//! Every write commits on its own. Uniqueness violations surface as
//! [`StoreError::Conflict`] and unknown ids as [`StoreError::NotFound`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use sitehost_shared::{DomainMapping, MappingId, MappingListing, NewMapping, SiteBinding, SiteHostError};

pub use memory::MemoryMappingStore;
pub use postgres::PgMappingStore;

/// Errors raised by mapping stores
pub type StoreError = SiteHostError;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Binding for a normalized domain, if any site claims it
    async fn find_by_domain(&self, domain: &str) -> StoreResult<Option<SiteBinding>>;

    /// Binding for the site with this slug, if that site has a domain
    async fn find_by_site_slug(&self, slug: &str) -> StoreResult<Option<SiteBinding>>;

    async fn get(&self, id: MappingId) -> StoreResult<Option<DomainMapping>>;

    async fn insert(&self, mapping: &NewMapping) -> StoreResult<DomainMapping>;

    async fn update(&self, id: MappingId, mapping: &NewMapping) -> StoreResult<DomainMapping>;

    async fn delete(&self, id: MappingId) -> StoreResult<()>;

    /// One row per site ordered by site id, including sites without a mapping
    async fn list(&self) -> StoreResult<Vec<MappingListing>>;

    /// Readiness check
    async fn ping(&self) -> StoreResult<()>;
}
