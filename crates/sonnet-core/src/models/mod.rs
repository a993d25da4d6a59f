//! Data models for Sonnet

mod action;
mod block;
mod document;
mod sync_log;
mod update;

pub use action::{available_actions, DocumentAction};
pub use block::{Block, RunMark, TextRun};
pub use document::{flag, read_time_minutes, slugify, CoverImage, Document, DocumentId};
pub use sync_log::{SyncAction, SyncLog, SyncLogId};
pub use update::{Difference, FieldDifference, Update, UpdateSource, UpdateStatus};
