//! # wcm-store
//!
//! File-backed storage for the waste-collection system.
//!
//! The data directory is the source of truth: every collection is one YAML
//! document, validated against its schema on each write. This crate provides:
//! - [`SchemaRegistry`]: schema loading, caching and name inference
//! - [`DocumentStore`]: load, validate and atomically save collections
//! - [`Repository`]: per-collection CRUD under a collection lock
//! - merge and import of external documents ([`ImportSummary`])
//! - [`TourScheduler`]: tour creation, update and import with scheduling checks
//! - per-type services for staff, vehicles, points, notifications, reports
//! - [`SchemaWatcher`]: schema hot reload

pub mod allocator;
pub mod config;
pub mod document;
pub mod fleet;
pub mod import;
pub mod lock;
pub mod notifications;
pub mod points;
pub mod registry;
pub mod reports;
pub mod repository;
pub mod staff;
pub mod tours;
pub mod watcher;

use std::fs;
use std::sync::Arc;

use tracing::info;

use wcm_core::entity::{DirectWrite, Entity};
use wcm_core::error::Result;
use wcm_core::notification::Notification;
use wcm_core::point::CollectionPoint;
use wcm_core::report::Report;
use wcm_core::scheduling::SchedulingRules;
use wcm_core::staff::{Role, StaffMember, USERS_COLLECTION};
use wcm_core::tour::Tour;
use wcm_core::vehicle::Vehicle;

pub use allocator::IdAllocator;
pub use config::StoreConfig;
pub use document::DocumentStore;
pub use fleet::FleetService;
pub use import::ImportSummary;
pub use lock::CollectionLocks;
pub use notifications::NotificationService;
pub use points::{PointService, PointStatistics};
pub use registry::{infer_schema_name, SchemaRegistry};
pub use reports::ReportService;
pub use repository::Repository;
pub use staff::StaffService;
pub use tours::{TourScheduler, ZoneSchedule};
pub use watcher::{SchemaEvent, SchemaWatcher};

/// State shared by every repository opened from one [`Store`].
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) documents: DocumentStore,
    pub(crate) locks: CollectionLocks,
    pub(crate) ids: IdAllocator,
}

/// Entry point: one data directory, its schemas and its collections.
#[derive(Clone)]
pub struct Store {
    config: StoreConfig,
    shared: Arc<Shared>,
}

impl Store {
    /// Open the store described by `config`. Nothing is read until a
    /// collection is used.
    #[must_use]
    pub fn open(config: StoreConfig) -> Self {
        let registry = Arc::new(SchemaRegistry::new(config.schema_dir()));
        let shared = Arc::new(Shared {
            documents: DocumentStore::new(config.data_dir.clone(), registry),
            locks: CollectionLocks::new(),
            ids: IdAllocator::new(),
        });
        Self { config, shared }
    }

    /// Create the data and schema directories and install the built-in
    /// schemas that are missing. Returns how many schemas were written.
    ///
    /// # Errors
    ///
    /// Returns [`wcm_core::WcmError::Io`] if a directory or file cannot be
    /// created.
    pub fn init(&self) -> Result<usize> {
        fs::create_dir_all(&self.config.data_dir)?;
        let written = self.registry().install_defaults()?;
        info!(data_dir = %self.config.data_dir.display(), "store initialized");
        Ok(written)
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn documents(&self) -> &DocumentStore {
        &self.shared.documents
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        self.shared.documents.registry()
    }

    /// Repository for `T` in its default collection. Tours are reached
    /// through [`Store::tours`] instead:
    ///
    /// ```compile_fail
    /// use wcm_core::tour::Tour;
    /// use wcm_store::{Store, StoreConfig};
    ///
    /// let store = Store::open(StoreConfig::with_data_dir("data"));
    /// let tours = store.repository::<Tour>();
    /// ```
    #[must_use]
    pub fn repository<T: DirectWrite>(&self) -> Repository<T> {
        self.repository_in(T::COLLECTION)
    }

    /// Repository for `T` bound to an explicit collection name.
    #[must_use]
    pub fn repository_in<T: DirectWrite>(&self, collection: &str) -> Repository<T> {
        self.collection(collection)
    }

    fn collection<T: Entity>(&self, name: &str) -> Repository<T> {
        Repository::new(Arc::clone(&self.shared), name)
    }

    /// Staff of one role, in that role's collection.
    #[must_use]
    pub fn staff(&self, role: Role) -> StaffService {
        StaffService::new(self.repository_in(role.policy().collection), Some(role))
    }

    /// Accounts of every role.
    #[must_use]
    pub fn users(&self) -> StaffService {
        StaffService::new(self.repository_in(USERS_COLLECTION), None)
    }

    #[must_use]
    pub fn fleet(&self) -> FleetService {
        FleetService::new(
            self.repository::<Vehicle>(),
            self.repository::<Notification>(),
        )
    }

    #[must_use]
    pub fn points(&self) -> PointService {
        PointService::new(
            self.repository::<CollectionPoint>(),
            self.config.maintenance_fill_threshold,
            self.config.critical_fill_threshold,
        )
    }

    #[must_use]
    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(self.repository::<Notification>())
    }

    #[must_use]
    pub fn reports(&self) -> ReportService {
        ReportService::new(self.repository::<Report>())
    }

    #[must_use]
    pub fn tours(&self) -> TourScheduler {
        self.tours_in(Tour::COLLECTION)
    }

    /// Tour scheduler over an explicitly named tours collection.
    #[must_use]
    pub fn tours_in(&self, collection: &str) -> TourScheduler {
        TourScheduler::new(
            self.collection::<Tour>(collection),
            self.repository_in::<StaffMember>(Role::Employee.policy().collection),
            self.repository::<Vehicle>(),
            self.repository::<CollectionPoint>(),
            SchedulingRules::new(self.config.nominal_bin_capacity),
        )
    }

    /// Watch the schema directory and drop edited schemas from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`wcm_core::WcmError::Io`] if the watcher cannot start.
    pub fn watch_schemas(&self) -> Result<SchemaWatcher> {
        SchemaWatcher::start(Arc::clone(self.registry()))
    }
}
