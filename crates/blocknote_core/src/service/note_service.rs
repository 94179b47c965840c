//! Note use-case service.
//!
//! # Responsibility
//! - Provide create/open/save/delete/list APIs over whole notes.
//! - Turn edit sessions into persisted notes and refresh them from storage.
//! - Publish change events after every committed write.
//!
//! # Invariants
//! - Every write is followed by a read-back; the caller receives what storage
//!   holds, not what it sent.
//! - A failed save, media capture or category move leaves persisted state and
//!   the edit session untouched.

use crate::config::DisplayConfig;
use crate::editor::{EditSession, SyncError};
use crate::media::{capture_block, MediaCapture, MediaError, MediaStore};
use crate::model::block::{BlockKind, ContentBlock, ValidationError};
use crate::model::note::{
    Category, FullNote, Note, NoteId, NoteSummary, DEFAULT_CATEGORY_ID, DEFAULT_NOTE_TITLE,
};
use crate::repo::category_repo::CategoryRepository;
use crate::repo::note_repo::NoteRepository;
use crate::repo::RepoError;
use crate::summary::{NoteChange, SummaryFeed, SummaryFilter};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    Validation(ValidationError),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Target category does not exist.
    CategoryNotFound(String),
    /// The mutation targets a protected record.
    Protected(String),
    /// The edit buffer rejected an edit or failed its save scan.
    Sync(SyncError),
    /// Media capture failed; no block was created.
    Media(MediaError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Export document could not be encoded or decoded.
    Serialization(serde_json::Error),
    UnsupportedExportVersion(u32),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NoteNotFound(note_id) => write!(f, "note not found: {note_id}"),
            Self::CategoryNotFound(category_id) => {
                write!(f, "category not found: {category_id}")
            }
            Self::Protected(message) => write!(f, "protected: {message}"),
            Self::Sync(err) => write!(f, "{err}"),
            Self::Media(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "export document error: {err}"),
            Self::UnsupportedExportVersion(version) => {
                write!(f, "unsupported export format version {version}")
            }
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Media(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::Protected(message) => Self::Protected(message),
            RepoError::NotFound {
                entity: "category",
                id,
            } => Self::CategoryNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for NoteServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SyncError> for NoteServiceError {
    fn from(value: SyncError) -> Self {
        match value {
            SyncError::Validation(err) => Self::Validation(err),
            other => Self::Sync(other),
        }
    }
}

impl From<MediaError> for NoteServiceError {
    fn from(value: MediaError) -> Self {
        Self::Media(value)
    }
}

impl From<serde_json::Error> for NoteServiceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

pub type ServiceResult<T> = Result<T, NoteServiceError>;

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository + CategoryRepository> {
    repo: R,
    display: DisplayConfig,
    feed: Arc<SummaryFeed>,
}

impl<R: NoteRepository + CategoryRepository> NoteService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R, display: DisplayConfig) -> Self {
        Self {
            repo,
            display,
            feed: Arc::new(SummaryFeed::new()),
        }
    }

    pub fn display_config(&self) -> &DisplayConfig {
        &self.display
    }

    /// Shared handle to the change feed, for listeners living elsewhere.
    pub fn feed(&self) -> Arc<SummaryFeed> {
        Arc::clone(&self.feed)
    }

    /// Subscribes to committed note changes.
    pub fn subscribe(&self) -> Receiver<NoteChange> {
        self.feed.subscribe()
    }

    /// Persists a new note holding one empty text block.
    ///
    /// A blank title becomes "Untitled"; a missing category becomes the
    /// default category.
    pub fn create_note(
        &mut self,
        title: Option<&str>,
        category_id: Option<&str>,
    ) -> ServiceResult<FullNote> {
        let title = title
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_NOTE_TITLE);
        let category_id = category_id.unwrap_or(DEFAULT_CATEGORY_ID);
        if self.repo.get_category(category_id)?.is_none() {
            return Err(NoteServiceError::CategoryNotFound(category_id.to_string()));
        }

        let mut note = Note::new(title);
        note.category_id = category_id.to_string();
        let body = ContentBlock::new(note.id, BlockKind::text(""), 0)?;
        let full = FullNote::new(note, vec![body])?;

        let saved = self.save_full_note(&full)?;
        info!(
            "event=note_create module=service status=ok note_id={} category_id={}",
            saved.note.id, saved.note.category_id
        );
        Ok(saved)
    }

    /// Loads a note and opens an edit session over it.
    pub fn open_session(&mut self, note_id: NoteId) -> ServiceResult<EditSession> {
        let full = self.get_full_note(note_id)?;
        Ok(EditSession::open(&full, self.display)?)
    }

    /// Saves the session's current buffer and refreshes the session from the
    /// persisted note.
    ///
    /// On any error the session keeps its unsaved buffer.
    pub fn save_session(&mut self, session: &mut EditSession) -> ServiceResult<FullNote> {
        let full = session.to_full_note()?;
        let saved = self.save_full_note(&full)?;
        session.reload(&saved)?;
        Ok(saved)
    }

    /// Atomically persists a full note and returns the stored copy.
    pub fn save_full_note(&mut self, full: &FullNote) -> ServiceResult<FullNote> {
        let version = self.repo.save_full_note(full)?;
        let saved = self
            .repo
            .get_full_note(full.note.id)?
            .ok_or(NoteServiceError::InconsistentState(
                "saved note not found in read-back",
            ))?;
        if saved.note.version != version || saved.blocks.len() != full.blocks.len() {
            return Err(NoteServiceError::InconsistentState(
                "saved note differs from read-back",
            ));
        }

        self.feed.publish(NoteChange::Saved {
            note_id: saved.note.id,
            version,
        });
        Ok(saved)
    }

    pub fn get_full_note(&mut self, note_id: NoteId) -> ServiceResult<FullNote> {
        self.repo
            .get_full_note(note_id)?
            .ok_or(NoteServiceError::NoteNotFound(note_id))
    }

    /// Deletes one note with all its blocks.
    pub fn delete_note(&mut self, note_id: NoteId) -> ServiceResult<()> {
        if !self.repo.delete_full_note(note_id)? {
            return Err(NoteServiceError::NoteNotFound(note_id));
        }
        self.feed.publish(NoteChange::Deleted { note_id });
        Ok(())
    }

    pub fn list_summaries(&self, filter: &SummaryFilter) -> ServiceResult<Vec<NoteSummary>> {
        Ok(self.repo.list_summaries(filter)?)
    }

    /// Text search that also understands `yyyy`, `yyyymm` and `yyyymmdd`.
    pub fn search(
        &self,
        query: &str,
        category_id: Option<&str>,
    ) -> ServiceResult<Vec<NoteSummary>> {
        let mut filter = SummaryFilter::smart_search(query);
        filter.category_id = category_id.map(str::to_string);
        self.list_summaries(&filter)
    }

    /// Stores captured media and inserts its block at `cursor`.
    ///
    /// Returns the cursor position after the inserted placeholder.
    pub fn attach_media(
        &self,
        session: &mut EditSession,
        cursor: usize,
        capture: MediaCapture<'_>,
        store: &dyn MediaStore,
    ) -> ServiceResult<usize> {
        let len = session.engine().char_len();
        if cursor > len {
            return Err(SyncError::EditOutOfBounds {
                start: cursor,
                removed: 0,
                len,
            }
            .into());
        }

        let block = capture_block(store, session.note().id, capture)?;
        let block_id = block.id();
        let next = session.insert_media(cursor, block)?;
        info!(
            "event=media_attach module=service status=ok note_id={} block_id={block_id} cursor={cursor}",
            session.note().id
        );
        Ok(next)
    }

    pub fn list_categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.repo.list_categories()?)
    }

    pub fn get_category(&self, category_id: &str) -> ServiceResult<Option<Category>> {
        Ok(self.repo.get_category(category_id)?)
    }

    pub fn create_category(&mut self, name: &str) -> ServiceResult<Category> {
        Ok(self.repo.create_category(name)?)
    }

    /// Deletes a user category; its notes move to the default category.
    pub fn delete_category(&mut self, category_id: &str) -> ServiceResult<usize> {
        let moved = self.repo.delete_category(category_id)?;
        if moved > 0 {
            self.feed.publish(NoteChange::CategoryChanged {
                category_id: DEFAULT_CATEGORY_ID.to_string(),
            });
        }
        Ok(moved)
    }

    /// Moves a note to another category and returns the updated note.
    pub fn move_note_to_category(
        &mut self,
        note_id: NoteId,
        category_id: &str,
    ) -> ServiceResult<Note> {
        self.repo
            .set_note_category(note_id, category_id)
            .map_err(|err| match err {
                RepoError::NotFound { entity: "note", .. } => {
                    NoteServiceError::NoteNotFound(note_id)
                }
                other => other.into(),
            })?;
        let note = self
            .repo
            .get_note(note_id)?
            .ok_or(NoteServiceError::InconsistentState(
                "moved note not found in read-back",
            ))?;
        self.feed.publish(NoteChange::CategoryChanged {
            category_id: note.category_id.clone(),
        });
        Ok(note)
    }
}
