//! Content block domain model.
//!
//! # Responsibility
//! - Define the typed unit a note body is composed of (text, image, audio).
//! - Validate block structure at construction so invalid blocks are never
//!   observable.
//!
//! # Invariants
//! - `id` and `note_id` are never nil.
//! - `kind` is fixed at construction; mutators only touch fields of the
//!   existing variant.
//! - Media blocks always carry a non-empty `file_path`, and declared pixel
//!   dimensions are strictly positive.

use crate::model::note::NoteId;
use crate::model::now_epoch_ms;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one content block.
pub type BlockId = Uuid;

/// Marker standing in for one media block inside the flat edit buffer.
/// Text bodies may never contain it.
pub const PLACEHOLDER_CHAR: char = '\u{FFFC}';

/// Structural violation detected while building or mutating a block or note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An identifier field is the nil UUID.
    NilId(&'static str),
    /// `order` is below zero.
    NegativeOrder(i64),
    /// A required text field is empty.
    EmptyField(&'static str),
    /// A declared pixel dimension is zero.
    ZeroDimension(&'static str),
    /// A text field contains the placeholder marker.
    ReservedCharacter(&'static str),
    /// A block points at a different note than the one it is saved with.
    NoteMismatch {
        block_id: BlockId,
        expected: NoteId,
        found: NoteId,
    },
    /// A mutation targeted fields of another block kind.
    KindMismatch {
        expected: BlockKindTag,
        found: BlockKindTag,
    },
}

impl ValidationError {
    /// Name of the field that violated its invariant.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NilId(field)
            | Self::EmptyField(field)
            | Self::ZeroDimension(field)
            | Self::ReservedCharacter(field) => field,
            Self::NegativeOrder(_) => "order",
            Self::NoteMismatch { .. } => "note_id",
            Self::KindMismatch { .. } => "kind",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId(field) => write!(f, "{field} must not be nil"),
            Self::NegativeOrder(order) => write!(f, "order must be >= 0, got {order}"),
            Self::EmptyField(field) => write!(f, "{field} must not be empty"),
            Self::ZeroDimension(field) => write!(f, "{field} must be > 0 when set"),
            Self::ReservedCharacter(field) => {
                write!(f, "{field} must not contain the placeholder marker")
            }
            Self::NoteMismatch {
                block_id,
                expected,
                found,
            } => write!(
                f,
                "block {block_id} belongs to note {found}, expected note {expected}"
            ),
            Self::KindMismatch { expected, found } => write!(
                f,
                "block kind is `{}`, cannot apply `{}` fields",
                found.as_str(),
                expected.as_str()
            ),
        }
    }
}

impl Error for ValidationError {}

/// Payload-free discriminant of [`BlockKind`], used for storage and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKindTag {
    Text,
    Image,
    Audio,
}

impl BlockKindTag {
    /// Stable storage name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    /// Parses a storage name produced by [`BlockKindTag::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

/// Kind-specific block payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// A literal run of text, whitespace preserved.
    Text { body: String },
    /// An inline image stored by the media file store.
    Image {
        file_path: String,
        alt_text: Option<String>,
        width_px: Option<u32>,
        height_px: Option<u32>,
    },
    /// An inline audio clip stored by the media file store.
    Audio {
        file_path: String,
        alt_text: Option<String>,
        duration_ms: Option<u64>,
    },
}

impl BlockKind {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    pub fn image(file_path: impl Into<String>, width_px: Option<u32>, height_px: Option<u32>) -> Self {
        Self::Image {
            file_path: file_path.into(),
            alt_text: None,
            width_px,
            height_px,
        }
    }

    pub fn audio(file_path: impl Into<String>, duration_ms: Option<u64>) -> Self {
        Self::Audio {
            file_path: file_path.into(),
            alt_text: None,
            duration_ms,
        }
    }

    pub fn tag(&self) -> BlockKindTag {
        match self {
            Self::Text { .. } => BlockKindTag::Text,
            Self::Image { .. } => BlockKindTag::Image,
            Self::Audio { .. } => BlockKindTag::Audio,
        }
    }

    /// Returns whether this kind is rendered as a placeholder in the buffer.
    pub fn is_media(&self) -> bool {
        match self {
            Self::Text { .. } => false,
            Self::Image { .. } | Self::Audio { .. } => true,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Text { body } => {
                if body.contains(PLACEHOLDER_CHAR) {
                    return Err(ValidationError::ReservedCharacter("body"));
                }
                Ok(())
            }
            Self::Image {
                file_path,
                width_px,
                height_px,
                ..
            } => {
                if file_path.trim().is_empty() {
                    return Err(ValidationError::EmptyField("file_path"));
                }
                if *width_px == Some(0) {
                    return Err(ValidationError::ZeroDimension("width_px"));
                }
                if *height_px == Some(0) {
                    return Err(ValidationError::ZeroDimension("height_px"));
                }
                Ok(())
            }
            Self::Audio { file_path, .. } => {
                if file_path.trim().is_empty() {
                    return Err(ValidationError::EmptyField("file_path"));
                }
                Ok(())
            }
        }
    }
}

/// Unvalidated block fields, as read from storage or an import document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockParts {
    pub id: BlockId,
    pub note_id: NoteId,
    pub kind: BlockKind,
    pub order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Durable content unit of a note.
///
/// Fields are private so a block can only be observed after validation and
/// its `kind` tag can never be reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BlockParts")]
pub struct ContentBlock {
    id: BlockId,
    note_id: NoteId,
    kind: BlockKind,
    order: u32,
    created_at: i64,
    updated_at: i64,
}

impl ContentBlock {
    /// Creates a new block with a generated id and current timestamps.
    pub fn new(note_id: NoteId, kind: BlockKind, order: u32) -> Result<Self, ValidationError> {
        let now = now_epoch_ms();
        Self::from_parts(BlockParts {
            id: Uuid::new_v4(),
            note_id,
            kind,
            order: i64::from(order),
            created_at: now,
            updated_at: now,
        })
    }

    /// Builds a block from raw parts, validating every invariant.
    pub fn from_parts(parts: BlockParts) -> Result<Self, ValidationError> {
        if parts.id.is_nil() {
            return Err(ValidationError::NilId("id"));
        }
        if parts.note_id.is_nil() {
            return Err(ValidationError::NilId("note_id"));
        }
        let order =
            u32::try_from(parts.order).map_err(|_| ValidationError::NegativeOrder(parts.order))?;
        parts.kind.validate()?;

        Ok(Self {
            id: parts.id,
            note_id: parts.note_id,
            kind: parts.kind,
            order,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        })
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn note_id(&self) -> NoteId {
        self.note_id
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Returns the text body for `Text` blocks.
    pub fn text_body(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::Text { body } => Some(body.as_str()),
            BlockKind::Image { .. } | BlockKind::Audio { .. } => None,
        }
    }

    /// Replaces the body of a `Text` block.
    pub fn set_text(&mut self, new_body: impl Into<String>) -> Result<(), ValidationError> {
        match &mut self.kind {
            BlockKind::Text { body } => {
                let new_body = new_body.into();
                if new_body.contains(PLACEHOLDER_CHAR) {
                    return Err(ValidationError::ReservedCharacter("body"));
                }
                *body = new_body;
                self.touch();
                Ok(())
            }
            other => Err(ValidationError::KindMismatch {
                expected: BlockKindTag::Text,
                found: other.tag(),
            }),
        }
    }

    /// Records pixel dimensions of an `Image` block once they are known.
    pub fn set_image_dimensions(&mut self, width: u32, height: u32) -> Result<(), ValidationError> {
        if width == 0 {
            return Err(ValidationError::ZeroDimension("width_px"));
        }
        if height == 0 {
            return Err(ValidationError::ZeroDimension("height_px"));
        }
        match &mut self.kind {
            BlockKind::Image {
                width_px,
                height_px,
                ..
            } => {
                *width_px = Some(width);
                *height_px = Some(height);
                self.touch();
                Ok(())
            }
            other => Err(ValidationError::KindMismatch {
                expected: BlockKindTag::Image,
                found: other.tag(),
            }),
        }
    }

    /// Records the duration of an `Audio` block once it is known.
    pub fn set_audio_duration(&mut self, millis: u64) -> Result<(), ValidationError> {
        match &mut self.kind {
            BlockKind::Audio { duration_ms, .. } => {
                *duration_ms = Some(millis);
                self.touch();
                Ok(())
            }
            other => Err(ValidationError::KindMismatch {
                expected: BlockKindTag::Audio,
                found: other.tag(),
            }),
        }
    }

    /// Sets or clears the alternative text of a media block.
    pub fn set_alt_text(&mut self, alt: Option<String>) -> Result<(), ValidationError> {
        match &mut self.kind {
            BlockKind::Image { alt_text, .. } | BlockKind::Audio { alt_text, .. } => {
                *alt_text = alt;
                self.touch();
                Ok(())
            }
            BlockKind::Text { .. } => Err(ValidationError::KindMismatch {
                expected: BlockKindTag::Image,
                found: BlockKindTag::Text,
            }),
        }
    }

    /// Returns a copy carrying the given position. Only the save scan and
    /// full-note normalization assign positions.
    pub(crate) fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Returns a copy re-keyed under a new identity, timestamps kept.
    pub(crate) fn with_identity(mut self, id: BlockId, note_id: NoteId) -> Self {
        self.id = id;
        self.note_id = note_id;
        self
    }

    fn touch(&mut self) {
        self.updated_at = now_epoch_ms().max(self.created_at);
    }
}

impl TryFrom<BlockParts> for ContentBlock {
    type Error = ValidationError;

    fn try_from(value: BlockParts) -> Result<Self, Self::Error> {
        Self::from_parts(value)
    }
}

impl From<ContentBlock> for BlockParts {
    fn from(value: ContentBlock) -> Self {
        Self {
            id: value.id,
            note_id: value.note_id,
            kind: value.kind,
            order: i64::from(value.order),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockKind, BlockKindTag, BlockParts, ContentBlock, ValidationError};
    use uuid::Uuid;

    fn parts(kind: BlockKind) -> BlockParts {
        BlockParts {
            id: Uuid::new_v4(),
            note_id: Uuid::new_v4(),
            kind,
            order: 0,
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    #[test]
    fn from_parts_rejects_negative_order() {
        let mut raw = parts(BlockKind::text("x"));
        raw.order = -1;
        let err = ContentBlock::from_parts(raw).unwrap_err();
        assert_eq!(err, ValidationError::NegativeOrder(-1));
        assert_eq!(err.field(), "order");
    }

    #[test]
    fn from_parts_rejects_nil_note_id() {
        let mut raw = parts(BlockKind::text("x"));
        raw.note_id = Uuid::nil();
        let err = ContentBlock::from_parts(raw).unwrap_err();
        assert_eq!(err.field(), "note_id");
    }

    #[test]
    fn media_requires_file_path() {
        let err = ContentBlock::from_parts(parts(BlockKind::audio("  ", None))).unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("file_path"));
    }

    #[test]
    fn text_rejects_placeholder_marker() {
        let err = ContentBlock::from_parts(parts(BlockKind::text("a\u{FFFC}b"))).unwrap_err();
        assert_eq!(err, ValidationError::ReservedCharacter("body"));
    }

    #[test]
    fn image_rejects_zero_dimension() {
        let err =
            ContentBlock::from_parts(parts(BlockKind::image("a.jpg", Some(0), Some(10)))).unwrap_err();
        assert_eq!(err, ValidationError::ZeroDimension("width_px"));
    }

    #[test]
    fn mutators_keep_kind_tag() {
        let mut block = ContentBlock::from_parts(parts(BlockKind::image("a.jpg", None, None))).unwrap();
        let err = block.set_text("nope").unwrap_err();
        assert_eq!(
            err,
            ValidationError::KindMismatch {
                expected: BlockKindTag::Text,
                found: BlockKindTag::Image,
            }
        );

        block.set_image_dimensions(640, 480).unwrap();
        assert_eq!(block.kind().tag(), BlockKindTag::Image);
        assert!(block.updated_at() >= block.created_at());
    }
}
