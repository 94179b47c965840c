//! Core domain logic for BlockNote.
//! This crate is the single source of truth for block, buffer and storage
//! invariants.

pub mod config;
pub mod db;
pub mod editor;
pub mod logging;
pub mod media;
pub mod model;
pub mod repo;
pub mod service;
pub mod summary;

pub use config::{ConfigError, CoreConfig, DisplayConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use editor::{
    display_size, BlockSync, DisplaySize, EditOutcome, EditSession, SyncError, SyncResult,
    TextEdit, PLACEHOLDER,
};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use media::{
    capture_block, DirMediaStore, MediaCapture, MediaError, MediaKind, MediaMetadata,
    MediaProbe, MediaStore, StoredMedia,
};
pub use model::block::{BlockId, BlockKind, BlockKindTag, BlockParts, ContentBlock, ValidationError};
pub use model::note::{Category, FullNote, Note, NoteId, NoteSummary};
pub use repo::category_repo::CategoryRepository;
pub use repo::note_repo::{NoteRepository, SqliteNoteRepository};
pub use repo::{RepoError, RepoResult};
pub use service::export::{ExportDocument, ExportedNote, EXPORT_FORMAT_VERSION};
pub use service::note_service::{NoteService, NoteServiceError, ServiceResult};
pub use summary::{NoteChange, SummaryFeed, SummaryFilter};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
