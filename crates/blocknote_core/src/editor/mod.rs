//! Text/block synchronization for one open note.
//!
//! # Responsibility
//! - Convert between the ordered block list and the flat edit buffer in which
//!   every media block occupies exactly one placeholder character.
//! - Track which placeholder stands for which block while the hosting surface
//!   edits the buffer.
//!
//! # Invariants
//! - The buffer is the source of truth; the placeholder mapping is re-derived
//!   from a buffer scan after every edit.
//! - A save scan never drops or fabricates a media block: an unmapped marker
//!   aborts it with `SyncError::Corruption`.
//! - The engine is not internally locked; callers serialize access.

use crate::model::block::{BlockId, BlockKindTag, ValidationError};
use crate::model::note::NoteId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod footprint;
pub mod session;
pub mod sync;

pub use footprint::{display_size, DisplaySize};
pub use session::EditSession;
pub use sync::{BlockSync, EditOutcome, PlaceholderLayout, TextEdit, PLACEHOLDER};

pub type SyncResult<T> = Result<T, SyncError>;

/// Engine failure. Every variant leaves engine state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A placeholder marker in the buffer has no block mapped to it.
    Corruption { position: usize },
    /// An edit or cursor reaches past the end of the buffer (in chars).
    EditOutOfBounds {
        start: usize,
        removed: usize,
        len: usize,
    },
    /// A text block was offered where a media block is required.
    NotMedia(BlockId),
    /// A block belongs to another note than the one being edited.
    ForeignBlock { block_id: BlockId, note_id: NoteId },
    /// No placeholder currently maps to this block.
    UnknownBlock(BlockId),
    /// The block already has a placeholder in the buffer.
    DuplicateBlock(BlockId),
    /// A metadata refresh tried to change a block's kind.
    KindMismatch {
        block_id: BlockId,
        expected: BlockKindTag,
        found: BlockKindTag,
    },
    Validation(ValidationError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Corruption { position } => {
                write!(f, "placeholder at position {position} has no mapped block")
            }
            Self::EditOutOfBounds {
                start,
                removed,
                len,
            } => write!(
                f,
                "edit at {start} removing {removed} chars exceeds buffer length {len}"
            ),
            Self::NotMedia(block_id) => write!(f, "block {block_id} is not a media block"),
            Self::ForeignBlock { block_id, note_id } => {
                write!(f, "block {block_id} belongs to another note than {note_id}")
            }
            Self::UnknownBlock(block_id) => write!(f, "block {block_id} has no placeholder"),
            Self::DuplicateBlock(block_id) => {
                write!(f, "block {block_id} already has a placeholder")
            }
            Self::KindMismatch {
                block_id,
                expected,
                found,
            } => write!(
                f,
                "block {block_id} is `{}`, refusing `{}` replacement",
                expected.as_str(),
                found.as_str()
            ),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for SyncError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
