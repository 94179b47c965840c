//! Editing session for one open note.
//!
//! # Responsibility
//! - Pair the note metadata being edited with its buffer engine.
//! - Produce the `FullNote` handed to persistence on save.
//!
//! # Invariants
//! - Dropping a session without saving changes no persisted state.
//! - `to_full_note` never mutates the session.

use super::sync::{BlockSync, EditOutcome, TextEdit};
use super::SyncResult;
use crate::config::DisplayConfig;
use crate::model::block::ContentBlock;
use crate::model::note::{FullNote, Note};
use crate::model::now_epoch_ms;

#[derive(Debug, Clone)]
pub struct EditSession {
    note: Note,
    sync: BlockSync,
    dirty: bool,
}

impl EditSession {
    /// Opens a session over a loaded note and builds its buffer.
    pub fn open(full: &FullNote, display: DisplayConfig) -> SyncResult<Self> {
        let mut sync = BlockSync::new(full.note.id, display);
        sync.load_from_blocks(&full.blocks)?;
        Ok(Self {
            note: full.note.clone(),
            sync,
            dirty: false,
        })
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    pub fn engine(&self) -> &BlockSync {
        &self.sync
    }

    pub fn text(&self) -> &str {
        self.sync.text()
    }

    /// Whether anything changed since the session was opened or last saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.note.title = title.into();
        self.dirty = true;
    }

    pub fn set_category(&mut self, category_id: impl Into<String>) {
        self.note.category_id = category_id.into();
        self.dirty = true;
    }

    pub fn apply_edit(&mut self, edit: &TextEdit) -> SyncResult<EditOutcome> {
        let outcome = self.sync.apply_edit(edit)?;
        self.dirty = true;
        Ok(outcome)
    }

    pub fn replace_text(&mut self, new_text: &str) -> EditOutcome {
        let outcome = self.sync.replace_text(new_text);
        self.dirty = true;
        outcome
    }

    pub fn insert_media(&mut self, cursor: usize, block: ContentBlock) -> SyncResult<usize> {
        let next = self.sync.insert_media(cursor, block)?;
        self.dirty = true;
        Ok(next)
    }

    pub fn update_media(&mut self, block: ContentBlock) -> SyncResult<()> {
        self.sync.update_media(block)?;
        self.dirty = true;
        Ok(())
    }

    /// Builds the note to persist from the current buffer.
    pub fn to_full_note(&self) -> SyncResult<FullNote> {
        let blocks = self.sync.to_blocks()?;
        let mut note = self.note.clone();
        note.updated_at = now_epoch_ms().max(note.created_at);
        Ok(FullNote { note, blocks })
    }

    /// Re-opens the session over the note as it was persisted.
    pub(crate) fn reload(&mut self, saved: &FullNote) -> SyncResult<()> {
        self.sync.load_from_blocks(&saved.blocks)?;
        self.note = saved.note.clone();
        self.dirty = false;
        Ok(())
    }
}
