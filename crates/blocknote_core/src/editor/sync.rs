//! Placeholder-aware buffer engine.
//!
//! Positions and lengths are counted in `char`s, matching the cursor model of
//! the hosting text surface.

use super::footprint::{display_size, DisplaySize};
use super::{SyncError, SyncResult};
use crate::config::DisplayConfig;
use crate::model::block::{BlockId, BlockKind, BlockParts, ContentBlock, PLACEHOLDER_CHAR};
use crate::model::note::NoteId;
use crate::model::now_epoch_ms;
use log::{debug, warn};
use uuid::Uuid;

/// Character occupying a media block's single buffer position.
pub const PLACEHOLDER: char = PLACEHOLDER_CHAR;

/// One splice of the buffer, as reported by the hosting surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// First affected char position.
    pub start: usize,
    /// Number of chars removed at `start`.
    pub removed: usize,
    /// Text inserted at `start` after removal.
    pub inserted: String,
}

impl TextEdit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            removed: 0,
            inserted: text.into(),
        }
    }

    pub fn delete(start: usize, len: usize) -> Self {
        Self {
            start,
            removed: len,
            inserted: String::new(),
        }
    }

    pub fn replace(start: usize, removed: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            removed,
            inserted: text.into(),
        }
    }
}

/// What an edit did to the placeholder set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    /// Media blocks whose placeholder disappeared with this edit.
    pub removed_media: Vec<BlockId>,
    /// Markers with no mapped block. Saving fails while this is non-zero.
    pub unmapped_markers: usize,
}

/// Where a placeholder sits and how much room it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderLayout {
    pub position: usize,
    pub block_id: BlockId,
    pub size: DisplaySize,
}

#[derive(Debug, Clone)]
struct Placeholder {
    position: usize,
    block: ContentBlock,
}

/// Where a loaded text block began, carried through edits.
#[derive(Debug, Clone)]
struct TextAnchor {
    position: usize,
    block: ContentBlock,
}

/// Buffer plus placeholder mapping for one open note.
#[derive(Debug, Clone)]
pub struct BlockSync {
    note_id: NoteId,
    display: DisplayConfig,
    buffer: String,
    /// Sorted by `position`; every entry sits on a marker after each edit.
    placeholders: Vec<Placeholder>,
    /// One entry per non-empty text block of the last load, sorted by
    /// `position` with no two entries sharing one. A text run starting at an
    /// anchor keeps that block's id and `created_at`.
    anchors: Vec<TextAnchor>,
}

impl BlockSync {
    pub fn new(note_id: NoteId, display: DisplayConfig) -> Self {
        Self {
            note_id,
            display,
            buffer: String::new(),
            placeholders: Vec::new(),
            anchors: Vec::new(),
        }
    }

    pub fn note_id(&self) -> NoteId {
        self.note_id
    }

    pub fn display_config(&self) -> &DisplayConfig {
        &self.display
    }

    /// Current buffer content.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Buffer length in chars.
    pub fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    /// Rebuilds the buffer and mapping from scratch.
    ///
    /// Blocks are laid out by ascending `order`; on error the previous state is
    /// kept.
    pub fn load_from_blocks(&mut self, blocks: &[ContentBlock]) -> SyncResult<&str> {
        let mut ordered: Vec<&ContentBlock> = blocks.iter().collect();
        ordered.sort_by_key(|block| block.order());

        let mut buffer = String::new();
        let mut position = 0usize;
        let mut placeholders: Vec<Placeholder> = Vec::new();
        let mut anchors = Vec::new();

        for block in ordered {
            if block.note_id() != self.note_id {
                return Err(SyncError::ForeignBlock {
                    block_id: block.id(),
                    note_id: self.note_id,
                });
            }
            match block.kind() {
                BlockKind::Text { body } => {
                    if body.is_empty() {
                        continue;
                    }
                    anchors.push(TextAnchor {
                        position,
                        block: block.clone(),
                    });
                    buffer.push_str(body);
                    position += body.chars().count();
                }
                BlockKind::Image { .. } | BlockKind::Audio { .. } => {
                    if placeholders.iter().any(|p| p.block.id() == block.id()) {
                        return Err(SyncError::DuplicateBlock(block.id()));
                    }
                    buffer.push(PLACEHOLDER);
                    placeholders.push(Placeholder {
                        position,
                        block: block.clone(),
                    });
                    position += 1;
                }
            }
        }

        self.buffer = buffer;
        self.placeholders = placeholders;
        self.anchors = anchors;
        debug!(
            "event=editor_load module=editor status=ok note_id={} blocks={} placeholders={} chars={}",
            self.note_id,
            blocks.len(),
            self.placeholders.len(),
            position
        );
        Ok(&self.buffer)
    }

    /// Applies one splice reported by the surface and re-derives the mapping.
    pub fn apply_edit(&mut self, edit: &TextEdit) -> SyncResult<EditOutcome> {
        let len = self.char_len();
        let end = edit
            .start
            .checked_add(edit.removed)
            .filter(|end| *end <= len)
            .ok_or(SyncError::EditOutOfBounds {
                start: edit.start,
                removed: edit.removed,
                len,
            })?;
        Ok(self.splice(edit.start, end, &edit.inserted))
    }

    /// Accepts a whole new buffer from the surface.
    ///
    /// The change is reduced to one splice between the common prefix and
    /// suffix. When identical adjacent markers make that ambiguous, the later
    /// one is treated as removed; surfaces that know the exact splice should
    /// call [`BlockSync::apply_edit`] instead.
    pub fn replace_text(&mut self, new_text: &str) -> EditOutcome {
        let old: Vec<char> = self.buffer.chars().collect();
        let new: Vec<char> = new_text.chars().collect();

        let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
        let max_suffix = old.len().min(new.len()) - prefix;
        let suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();

        let inserted: String = new[prefix..new.len() - suffix].iter().collect();
        self.splice(prefix, old.len() - suffix, &inserted)
    }

    /// Inserts a media placeholder at `cursor` and returns the cursor after it.
    pub fn insert_media(&mut self, cursor: usize, block: ContentBlock) -> SyncResult<usize> {
        if !block.kind().is_media() {
            return Err(SyncError::NotMedia(block.id()));
        }
        if block.note_id() != self.note_id {
            return Err(SyncError::ForeignBlock {
                block_id: block.id(),
                note_id: self.note_id,
            });
        }
        if self.placeholders.iter().any(|p| p.block.id() == block.id()) {
            return Err(SyncError::DuplicateBlock(block.id()));
        }
        let len = self.char_len();
        if cursor > len {
            return Err(SyncError::EditOutOfBounds {
                start: cursor,
                removed: 0,
                len,
            });
        }

        let mut marker = [0u8; 4];
        let removed_media =
            self.shift_mapping(cursor, cursor, PLACEHOLDER.encode_utf8(&mut marker));
        let index = self.placeholders.partition_point(|p| p.position < cursor);
        debug!(
            "event=editor_insert_media module=editor status=ok note_id={} block_id={} kind={} position={}",
            self.note_id,
            block.id(),
            block.kind().tag().as_str(),
            cursor
        );
        self.placeholders.insert(
            index,
            Placeholder {
                position: cursor,
                block,
            },
        );
        self.settle(cursor, cursor, 1, removed_media);
        Ok(cursor + 1)
    }

    /// Replaces a mapped media block with a refreshed copy of itself, e.g. once
    /// its dimensions or duration become known.
    pub fn update_media(&mut self, block: ContentBlock) -> SyncResult<()> {
        let placeholder = self
            .placeholders
            .iter_mut()
            .find(|p| p.block.id() == block.id())
            .ok_or(SyncError::UnknownBlock(block.id()))?;
        if block.note_id() != self.note_id {
            return Err(SyncError::ForeignBlock {
                block_id: block.id(),
                note_id: self.note_id,
            });
        }
        let (expected, found) = (placeholder.block.kind().tag(), block.kind().tag());
        if expected != found {
            return Err(SyncError::KindMismatch {
                block_id: block.id(),
                expected,
                found,
            });
        }
        placeholder.block = block;
        Ok(())
    }

    /// Block mapped at a buffer position, if that position holds a placeholder.
    pub fn block_at(&self, position: usize) -> Option<&ContentBlock> {
        self.placeholders
            .binary_search_by_key(&position, |p| p.position)
            .ok()
            .map(|index| &self.placeholders[index].block)
    }

    /// Media blocks in buffer order.
    pub fn media_blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.placeholders.iter().map(|p| &p.block)
    }

    /// Footprint of the placeholder standing for `block_id`.
    pub fn display_size(&self, block_id: BlockId) -> Option<DisplaySize> {
        self.placeholders
            .iter()
            .find(|p| p.block.id() == block_id)
            .and_then(|p| display_size(&p.block, &self.display))
    }

    /// Position and footprint of every placeholder, in buffer order.
    pub fn layout(&self) -> Vec<PlaceholderLayout> {
        self.placeholders
            .iter()
            .filter_map(|p| {
                display_size(&p.block, &self.display).map(|size| PlaceholderLayout {
                    position: p.position,
                    block_id: p.block.id(),
                    size,
                })
            })
            .collect()
    }

    /// Marker positions with no mapped block.
    pub fn unmapped_positions(&self) -> Vec<usize> {
        self.marker_positions()
            .into_iter()
            .filter(|position| {
                self.placeholders
                    .binary_search_by_key(position, |p| p.position)
                    .is_err()
            })
            .collect()
    }

    /// Scans the buffer into a fresh, densely ordered block list.
    ///
    /// Plain runs become text blocks (whitespace kept verbatim); each marker
    /// resolves to its mapped media block with metadata unchanged. Every
    /// anchor starts a new run that keeps the anchored block's identity, so
    /// loaded text blocks stay separate. Runs without an anchor get fresh ids.
    /// An anchor left on a marker carries over to the next text run.
    pub fn to_blocks(&self) -> SyncResult<Vec<ContentBlock>> {
        let now = now_epoch_ms();
        let mut blocks = Vec::new();
        let mut run = String::new();
        let mut owner: Option<&ContentBlock> = None;
        let mut mapped = self.placeholders.iter().peekable();
        let mut anchors = self.anchors.iter().peekable();

        for (position, ch) in self.buffer.chars().enumerate() {
            while let Some(anchor) = anchors.next_if(|a| a.position == position) {
                if !run.is_empty() {
                    self.emit_text_run(&mut blocks, &mut run, owner.take(), now)?;
                }
                owner = Some(&anchor.block);
            }
            if ch != PLACEHOLDER {
                run.push(ch);
                continue;
            }
            let placeholder = mapped
                .next_if(|p| p.position == position)
                .ok_or(SyncError::Corruption { position })?;
            if !run.is_empty() {
                self.emit_text_run(&mut blocks, &mut run, owner.take(), now)?;
            }
            let order = blocks.len() as u32;
            blocks.push(placeholder.block.clone().with_order(order));
        }
        if !run.is_empty() {
            self.emit_text_run(&mut blocks, &mut run, owner, now)?;
        }

        debug!(
            "event=editor_sync module=editor status=ok note_id={} blocks={}",
            self.note_id,
            blocks.len()
        );
        Ok(blocks)
    }

    fn emit_text_run(
        &self,
        blocks: &mut Vec<ContentBlock>,
        run: &mut String,
        owner: Option<&ContentBlock>,
        now: i64,
    ) -> SyncResult<()> {
        let body = std::mem::take(run);
        let order = blocks.len() as i64;
        let parts = match owner {
            Some(previous) => {
                let updated_at = if previous.text_body() == Some(body.as_str()) {
                    previous.updated_at()
                } else {
                    now.max(previous.created_at())
                };
                BlockParts {
                    id: previous.id(),
                    note_id: self.note_id,
                    kind: BlockKind::Text { body },
                    order,
                    created_at: previous.created_at(),
                    updated_at,
                }
            }
            None => BlockParts {
                id: Uuid::new_v4(),
                note_id: self.note_id,
                kind: BlockKind::Text { body },
                order,
                created_at: now,
                updated_at: now,
            },
        };
        blocks.push(ContentBlock::from_parts(parts)?);
        Ok(())
    }

    /// Replaces chars `start..end` and shifts, drops and re-validates mapping
    /// entries. Bounds must already be checked.
    fn splice(&mut self, start: usize, end: usize, inserted: &str) -> EditOutcome {
        let removed_media = self.shift_mapping(start, end, inserted);
        self.settle(start, end, inserted.chars().count(), removed_media)
    }

    /// Rewrites the buffer and moves placeholders and anchors with it.
    /// Returns the media whose marker fell inside `start..end`.
    fn shift_mapping(&mut self, start: usize, end: usize, inserted: &str) -> Vec<BlockId> {
        let start_byte = byte_offset(&self.buffer, start);
        let end_byte = byte_offset(&self.buffer, end);
        self.buffer.replace_range(start_byte..end_byte, inserted);

        let inserted_len = inserted.chars().count();
        let shift = |position: usize| position - (end - start) + inserted_len;
        let mut removed_media = Vec::new();
        self.placeholders.retain_mut(|p| {
            if p.position < start {
                true
            } else if p.position < end {
                removed_media.push(p.block.id());
                false
            } else {
                p.position = shift(p.position);
                true
            }
        });

        // Text typed at an anchor joins the anchored block. An anchor whose
        // head was removed restarts at `start`.
        for anchor in &mut self.anchors {
            if anchor.position <= start {
                continue;
            }
            anchor.position = if anchor.position < end {
                start
            } else {
                shift(anchor.position)
            };
        }
        // A block emptied by the edit yields its position to the next anchor.
        self.anchors.dedup_by(|later, earlier| {
            if later.position == earlier.position {
                std::mem::swap(later, earlier);
                true
            } else {
                false
            }
        });
        removed_media
    }

    fn settle(
        &mut self,
        start: usize,
        end: usize,
        inserted_len: usize,
        mut removed_media: Vec<BlockId>,
    ) -> EditOutcome {
        removed_media.extend(self.revalidate());

        let unmapped_markers = self.unmapped_positions().len();
        if unmapped_markers > 0 {
            warn!(
                "event=editor_sync module=editor status=unmapped_marker note_id={} count={}",
                self.note_id, unmapped_markers
            );
        }
        debug!(
            "event=editor_edit module=editor status=ok note_id={} start={} removed={} inserted={} removed_media={}",
            self.note_id,
            start,
            end - start,
            inserted_len,
            removed_media.len()
        );
        EditOutcome {
            removed_media,
            unmapped_markers,
        }
    }

    /// Drops mapping entries whose marker is no longer in the buffer.
    fn revalidate(&mut self) -> Vec<BlockId> {
        let markers = self.marker_positions();
        let mut dropped = Vec::new();
        self.placeholders.retain(|p| {
            let present = markers.binary_search(&p.position).is_ok();
            if !present {
                dropped.push(p.block.id());
            }
            present
        });
        if !dropped.is_empty() {
            warn!(
                "event=editor_sync module=editor status=stale_mapping note_id={} dropped={}",
                self.note_id,
                dropped.len()
            );
        }
        dropped
    }

    fn marker_positions(&self) -> Vec<usize> {
        self.buffer
            .chars()
            .enumerate()
            .filter(|(_, ch)| *ch == PLACEHOLDER)
            .map(|(position, _)| position)
            .collect()
    }
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(offset, _)| offset)
}
