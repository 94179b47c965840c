//! Note container, full-note projection and listing views.
//!
//! # Responsibility
//! - Define the note row, its pairing with ordered blocks, and the read-only
//!   listing projections derived from storage.
//!
//! # Invariants
//! - `FullNote.blocks` all reference `FullNote.note.id`.
//! - After `normalize_order`, block positions are exactly `0..n`.

use crate::model::block::{ContentBlock, ValidationError};
use crate::model::now_epoch_ms;
use uuid::Uuid;

/// Stable identifier of one note.
pub type NoteId = Uuid;

/// Category assigned to notes created without an explicit one.
pub const DEFAULT_CATEGORY_ID: &str = "daily";
/// Title assigned to notes created without an explicit one.
pub const DEFAULT_NOTE_TITLE: &str = "Untitled";

/// Note metadata row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    /// User-visible title, may be empty.
    pub title: String,
    pub category_id: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
    /// Bumped by storage on every successful full-note save. Informative only.
    pub version: i64,
}

impl Note {
    /// Creates a note with a generated id in the default category.
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            category_id: DEFAULT_CATEGORY_ID.to_string(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Creates a note with a caller-provided id.
    pub fn with_id(id: NoteId, title: impl Into<String>) -> Result<Self, ValidationError> {
        let mut note = Self::new(title);
        note.id = id;
        note.validate()?;
        Ok(note)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilId("id"));
        }
        if self.category_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("category_id"));
        }
        Ok(())
    }
}

/// A note paired with its ordered block list; the unit of atomic persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullNote {
    pub note: Note,
    pub blocks: Vec<ContentBlock>,
}

impl FullNote {
    /// Pairs a note with blocks, rejecting blocks owned by another note.
    pub fn new(note: Note, blocks: Vec<ContentBlock>) -> Result<Self, ValidationError> {
        let full = Self { note, blocks };
        full.validate()?;
        Ok(full)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.note.validate()?;
        for block in &self.blocks {
            if block.note_id() != self.note.id {
                return Err(ValidationError::NoteMismatch {
                    block_id: block.id(),
                    expected: self.note.id,
                    found: block.note_id(),
                });
            }
        }
        Ok(())
    }

    /// Sorts blocks by position and renumbers them densely from zero.
    ///
    /// The sort is stable, so blocks sharing a position keep list order.
    pub fn normalize_order(&mut self) {
        let mut blocks = std::mem::take(&mut self.blocks);
        blocks.sort_by_key(ContentBlock::order);
        self.blocks = blocks
            .into_iter()
            .enumerate()
            .map(|(index, block)| block.with_order(index as u32))
            .collect();
    }
}

/// Listing projection of one note. Derived on every query, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSummary {
    pub id: NoteId,
    pub title: String,
    /// Text block bodies in order, joined by single spaces.
    pub preview: String,
    /// Note `updated_at`, epoch milliseconds.
    pub last_modified: i64,
    pub block_count: u32,
    pub category_id: String,
}

/// User-visible grouping of notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Seeded categories cannot be deleted.
    pub is_default: bool,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::{FullNote, Note};
    use crate::model::block::{BlockKind, BlockParts, ContentBlock, ValidationError};
    use uuid::Uuid;

    fn block_at(note: &Note, order: i64, body: &str) -> ContentBlock {
        ContentBlock::from_parts(BlockParts {
            id: Uuid::new_v4(),
            note_id: note.id,
            kind: BlockKind::text(body),
            order,
            created_at: 0,
            updated_at: 0,
        })
        .unwrap()
    }

    #[test]
    fn normalize_order_closes_gaps() {
        let note = Note::new("gaps");
        let blocks = vec![
            block_at(&note, 7, "c"),
            block_at(&note, 2, "a"),
            block_at(&note, 5, "b"),
        ];
        let mut full = FullNote::new(note, blocks).unwrap();
        full.normalize_order();

        let bodies: Vec<_> = full.blocks.iter().filter_map(|b| b.text_body()).collect();
        let orders: Vec<_> = full.blocks.iter().map(|b| b.order()).collect();
        assert_eq!(bodies, vec!["a", "b", "c"]);
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn full_note_rejects_foreign_block() {
        let note = Note::new("mine");
        let other = Note::new("theirs");
        let foreign = block_at(&other, 0, "x");
        let err = FullNote::new(note, vec![foreign]).unwrap_err();
        assert!(matches!(err, ValidationError::NoteMismatch { .. }));
    }

    #[test]
    fn with_id_rejects_nil() {
        let err = Note::with_id(Uuid::nil(), "x").unwrap_err();
        assert_eq!(err, ValidationError::NilId("id"));
    }
}
