//! Postgres mapping store

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use sitehost_shared::{
    DomainMapping, MappingId, MappingListing, NewMapping, PageId, SiteBinding, SiteId,
};

use super::{MappingStore, StoreError, StoreResult};

const MAPPING_COLUMNS: &str = "id, site_id, domain, default_page_id, created_at, updated_at";

const BINDING_SELECT: &str = r#"
    SELECT m.id, m.site_id, m.domain, m.default_page_id, m.created_at, m.updated_at,
           s.slug AS site_slug, p.slug AS default_page_slug
    FROM domain_site_mapping m
    JOIN sites s ON s.id = m.site_id
    LEFT JOIN site_pages p ON p.id = m.default_page_id
"#;

#[derive(FromRow)]
struct BindingRow {
    id: MappingId,
    site_id: SiteId,
    domain: String,
    default_page_id: Option<PageId>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    site_slug: String,
    default_page_slug: Option<String>,
}

impl From<BindingRow> for SiteBinding {
    fn from(row: BindingRow) -> Self {
        SiteBinding {
            mapping: DomainMapping {
                id: row.id,
                site_id: row.site_id,
                domain: row.domain,
                default_page_id: row.default_page_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            site_slug: row.site_slug,
            default_page_slug: row.default_page_slug,
        }
    }
}

/// Mapping store backed by the `domain_site_mapping` table
#[derive(Clone)]
pub struct PgMappingStore {
    pool: PgPool,
}

impl PgMappingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MappingStore for PgMappingStore {
    async fn find_by_domain(&self, domain: &str) -> StoreResult<Option<SiteBinding>> {
        let row: Option<BindingRow> = sqlx::query_as(&format!("{} WHERE m.domain = $1", BINDING_SELECT))
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(SiteBinding::from))
    }

    async fn find_by_site_slug(&self, slug: &str) -> StoreResult<Option<SiteBinding>> {
        let row: Option<BindingRow> = sqlx::query_as(&format!("{} WHERE s.slug = $1", BINDING_SELECT))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(SiteBinding::from))
    }

    async fn get(&self, id: MappingId) -> StoreResult<Option<DomainMapping>> {
        let mapping: Option<DomainMapping> = sqlx::query_as(&format!(
            "SELECT {} FROM domain_site_mapping WHERE id = $1",
            MAPPING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(mapping)
    }

    async fn insert(&self, mapping: &NewMapping) -> StoreResult<DomainMapping> {
        let inserted: DomainMapping = sqlx::query_as(&format!(
            r#"
            INSERT INTO domain_site_mapping (site_id, domain, default_page_id)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            MAPPING_COLUMNS
        ))
        .bind(mapping.site_id)
        .bind(&mapping.domain)
        .bind(mapping.default_page_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn update(&self, id: MappingId, mapping: &NewMapping) -> StoreResult<DomainMapping> {
        let updated: Option<DomainMapping> = sqlx::query_as(&format!(
            r#"
            UPDATE domain_site_mapping
            SET site_id = $2, domain = $3, default_page_id = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            MAPPING_COLUMNS
        ))
        .bind(id)
        .bind(mapping.site_id)
        .bind(&mapping.domain)
        .bind(mapping.default_page_id)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| StoreError::NotFound(format!("domain mapping {}", id)))
    }

    async fn delete(&self, id: MappingId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM domain_site_mapping WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("domain mapping {}", id)));
        }
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<MappingListing>> {
        let rows: Vec<MappingListing> = sqlx::query_as(
            r#"
            SELECT s.id AS site_id, s.title AS site_title,
                   m.id AS mapping_id, m.domain, m.default_page_id
            FROM sites s
            LEFT JOIN domain_site_mapping m ON m.site_id = s.id
            ORDER BY s.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
