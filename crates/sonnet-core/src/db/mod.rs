//! Local database layer for Sonnet

mod connection;
mod document_repository;
mod log_repository;
mod migrations;

pub use connection::Database;
pub use document_repository::LibSqlDocumentStore;
pub use log_repository::LibSqlSyncLogStore;
