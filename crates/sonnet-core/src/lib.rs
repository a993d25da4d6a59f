//! sonnet-core - Core library for Sonnet
//!
//! Document models, the libSQL local store, the REST remote store, and the
//! reconciliation engine that keeps them in agreement. Clients (the CLI and
//! any future UI) build a [`LocalDatabase`] handle once and pass stores from
//! it into [`SyncManager`] and [`DocumentService`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod store;
pub mod sync;
pub mod util;

pub use config::{HousekeepingConfig, RemoteConfig, SonnetConfig};
pub use error::{Error, Result, StoreKind};
pub use models::{Document, DocumentId, SyncLog, SyncLogId, Update};
pub use remote::RestRemoteStore;
pub use services::{DocumentPatch, DocumentService, LocalDatabase};
pub use sync::{Session, SyncManager, SyncOutcome};
