//! Domain-to-site mappings: validation, persistence, and batch reconciliation

pub mod domain;
pub mod reconciler;
pub mod store;

pub use domain::{is_valid_hostname, normalize_domain, normalize_host};
pub use reconciler::{MappingReconciler, ReconcileReport, ReconcileRow, RowError};
pub use store::{MappingStore, MemoryMappingStore, PgMappingStore, StoreError};
