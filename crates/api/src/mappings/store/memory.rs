//! In-memory mapping store.
//!
//! Enforces the same uniqueness and referential rules as the Postgres schema
//! so reconciliation behaves identically against either store. State is lost
//! when the process exits.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;

use sitehost_shared::{
    DomainMapping, MappingId, MappingListing, NewMapping, PageId, SiteBinding, SiteId,
};

use super::{MappingStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
struct SiteRecord {
    slug: String,
    title: String,
}

#[derive(Debug, Clone)]
struct PageRecord {
    site_id: SiteId,
    slug: String,
}

#[derive(Debug, Default)]
struct Inner {
    sites: BTreeMap<SiteId, SiteRecord>,
    pages: BTreeMap<PageId, PageRecord>,
    mappings: BTreeMap<MappingId, DomainMapping>,
    next_mapping_id: i64,
}

impl Inner {
    fn check_references(&self, mapping: &NewMapping) -> StoreResult<()> {
        if !self.sites.contains_key(&mapping.site_id) {
            return Err(StoreError::Validation(format!("site {} does not exist", mapping.site_id)));
        }
        if let Some(page_id) = mapping.default_page_id {
            match self.pages.get(&page_id) {
                None => return Err(StoreError::Validation(format!("page {} does not exist", page_id))),
                Some(page) if page.site_id != mapping.site_id => {
                    return Err(StoreError::Validation(format!(
                        "page {} does not belong to site {}",
                        page_id, mapping.site_id
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Unique constraint check against every mapping except `skip`
    fn check_unique(&self, mapping: &NewMapping, skip: Option<MappingId>) -> StoreResult<()> {
        for existing in self.mappings.values().filter(|m| Some(m.id) != skip) {
            if existing.domain == mapping.domain {
                return Err(StoreError::Conflict(format!("domain {} is already mapped", mapping.domain)));
            }
            if existing.site_id == mapping.site_id {
                return Err(StoreError::Conflict(format!(
                    "site {} already has a domain",
                    mapping.site_id
                )));
            }
            if let Some(page_id) = mapping.default_page_id {
                if existing.default_page_id == Some(page_id) {
                    return Err(StoreError::Conflict(format!("default page {} is already in use", page_id)));
                }
            }
        }
        Ok(())
    }

    fn binding(&self, mapping: &DomainMapping) -> Option<SiteBinding> {
        let site = self.sites.get(&mapping.site_id)?;
        let default_page_slug = mapping
            .default_page_id
            .and_then(|id| self.pages.get(&id))
            .map(|page| page.slug.clone());

        Some(SiteBinding {
            mapping: mapping.clone(),
            site_slug: site.slug.clone(),
            default_page_slug,
        })
    }
}

fn poison_err<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Internal("mapping store lock poisoned".to_string())
}

/// Mapping store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryMappingStore {
    inner: RwLock<Inner>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host platform site
    pub fn add_site(&self, id: SiteId, slug: impl Into<String>, title: impl Into<String>) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(poison_err)?;
        let slug = slug.into();
        if inner.sites.values().any(|site| site.slug == slug) {
            return Err(StoreError::Conflict(format!("site slug {} is taken", slug)));
        }
        inner.sites.insert(id, SiteRecord { slug, title: title.into() });
        Ok(())
    }

    /// Register a page belonging to a site
    pub fn add_page(&self, id: PageId, site_id: SiteId, slug: impl Into<String>) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(poison_err)?;
        if !inner.sites.contains_key(&site_id) {
            return Err(StoreError::Validation(format!("site {} does not exist", site_id)));
        }
        inner.pages.insert(id, PageRecord { site_id, slug: slug.into() });
        Ok(())
    }

}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn find_by_domain(&self, domain: &str) -> StoreResult<Option<SiteBinding>> {
        let inner = self.inner.read().map_err(poison_err)?;
        Ok(inner
            .mappings
            .values()
            .find(|m| m.domain == domain)
            .and_then(|m| inner.binding(m)))
    }

    async fn find_by_site_slug(&self, slug: &str) -> StoreResult<Option<SiteBinding>> {
        let inner = self.inner.read().map_err(poison_err)?;
        let Some((site_id, _)) = inner.sites.iter().find(|(_, site)| site.slug == slug) else {
            return Ok(None);
        };
        Ok(inner
            .mappings
            .values()
            .find(|m| m.site_id == *site_id)
            .and_then(|m| inner.binding(m)))
    }

    async fn get(&self, id: MappingId) -> StoreResult<Option<DomainMapping>> {
        let inner = self.inner.read().map_err(poison_err)?;
        Ok(inner.mappings.get(&id).cloned())
    }

    async fn insert(&self, mapping: &NewMapping) -> StoreResult<DomainMapping> {
        let mut inner = self.inner.write().map_err(poison_err)?;
        inner.check_references(mapping)?;
        inner.check_unique(mapping, None)?;

        inner.next_mapping_id += 1;
        let now = OffsetDateTime::now_utc();
        let created = DomainMapping {
            id: MappingId(inner.next_mapping_id),
            site_id: mapping.site_id,
            domain: mapping.domain.clone(),
            default_page_id: mapping.default_page_id,
            created_at: now,
            updated_at: now,
        };
        inner.mappings.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: MappingId, mapping: &NewMapping) -> StoreResult<DomainMapping> {
        let mut inner = self.inner.write().map_err(poison_err)?;
        if !inner.mappings.contains_key(&id) {
            return Err(StoreError::NotFound(format!("domain mapping {}", id)));
        }
        inner.check_references(mapping)?;
        inner.check_unique(mapping, Some(id))?;

        let existing = inner
            .mappings
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("domain mapping {}", id)))?;
        existing.site_id = mapping.site_id;
        existing.domain = mapping.domain.clone();
        existing.default_page_id = mapping.default_page_id;
        existing.updated_at = OffsetDateTime::now_utc();
        Ok(existing.clone())
    }

    async fn delete(&self, id: MappingId) -> StoreResult<()> {
        let mut inner = self.inner.write().map_err(poison_err)?;
        match inner.mappings.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("domain mapping {}", id))),
        }
    }

    async fn list(&self) -> StoreResult<Vec<MappingListing>> {
        let inner = self.inner.read().map_err(poison_err)?;
        Ok(inner
            .sites
            .iter()
            .map(|(site_id, site)| {
                let mapping = inner.mappings.values().find(|m| m.site_id == *site_id);
                MappingListing {
                    site_id: *site_id,
                    site_title: site.title.clone(),
                    mapping_id: mapping.map(|m| m.id),
                    domain: mapping.map(|m| m.domain.clone()),
                    default_page_id: mapping.and_then(|m| m.default_page_id),
                }
            })
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        let _guard = self.inner.read().map_err(poison_err)?;
        Ok(())
    }
}
