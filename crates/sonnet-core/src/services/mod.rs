//! Application-facing services built on the stores

mod database;
mod documents;

pub use database::LocalDatabase;
pub use documents::{DocumentPatch, DocumentService};
