//! Full-note persistence and summary queries.
//!
//! # Responsibility
//! - Save, load and delete a note together with its complete block list as
//!   one atomic unit.
//! - Answer summary listings straight from the current rows.
//!
//! # Invariants
//! - A save replaces the persisted block set wholesale: blocks absent from the
//!   saved list are deleted, never merged.
//! - Persisted block positions are dense and zero-based.
//! - Summary order is `updated_at DESC, id ASC`.
//! - Log lines carry ids, counts and durations only, never note content.

use crate::db::ensure_schema;
use crate::model::block::{BlockKind, BlockKindTag, BlockParts, ContentBlock};
use crate::model::note::{FullNote, Note, NoteId, NoteSummary};
use crate::repo::{RepoError, RepoResult};
use crate::summary::{join_preview, SummaryFilter};
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::time::Instant;
use uuid::Uuid;

/// Repository interface for whole-note use-cases.
pub trait NoteRepository {
    /// Atomically upserts the note row and replaces its block set.
    ///
    /// Returns the persisted version after the save.
    fn save_full_note(&mut self, full: &FullNote) -> RepoResult<i64>;
    /// Loads one note with its blocks in ascending order.
    fn get_full_note(&mut self, note_id: NoteId) -> RepoResult<Option<FullNote>>;
    /// Atomically deletes one note and all its blocks.
    ///
    /// Returns whether a note row existed.
    fn delete_full_note(&mut self, note_id: NoteId) -> RepoResult<bool>;
    /// Loads note metadata without blocks.
    fn get_note(&self, note_id: NoteId) -> RepoResult<Option<Note>>;
    /// Lists summaries matching `filter`, newest first.
    fn list_summaries(&self, filter: &SummaryFilter) -> RepoResult<Vec<NoteSummary>>;
    /// Moves one note to another existing category.
    fn set_note_category(&mut self, note_id: NoteId, category_id: &str) -> RepoResult<()>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    pub(crate) conn: &'conn mut Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_schema(conn)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn save_full_note(&mut self, full: &FullNote) -> RepoResult<i64> {
        full.validate()?;
        let mut normalized = full.clone();
        normalized.normalize_order();

        let started_at = Instant::now();
        let note_id = normalized.note.id;
        match save_in_tx(self.conn, &normalized) {
            Ok(version) => {
                info!(
                    "event=note_save module=repo status=ok note_id={note_id} blocks={} version={version} duration_ms={}",
                    normalized.blocks.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(version)
            }
            Err(err) => {
                error!(
                    "event=note_save module=repo status=error note_id={note_id} blocks={} duration_ms={} error={err}",
                    normalized.blocks.len(),
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    fn get_full_note(&mut self, note_id: NoteId) -> RepoResult<Option<FullNote>> {
        let tx = self.conn.transaction()?;
        let Some(note) = load_note(&tx, note_id)? else {
            debug!("event=note_load module=repo status=missing note_id={note_id}");
            return Ok(None);
        };
        let blocks = load_blocks(&tx, note_id)?;
        tx.commit()?;

        debug!(
            "event=note_load module=repo status=ok note_id={note_id} blocks={}",
            blocks.len()
        );
        let full = FullNote::new(note, blocks).map_err(|err| {
            RepoError::InvalidData(format!("note `{note_id}` has inconsistent blocks: {err}"))
        })?;
        Ok(Some(full))
    }

    fn delete_full_note(&mut self, note_id: NoteId) -> RepoResult<bool> {
        let id_text = note_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let blocks = tx.execute("DELETE FROM note_blocks WHERE note_id = ?1;", [&id_text])?;
        let notes = tx.execute("DELETE FROM notes WHERE id = ?1;", [&id_text])?;
        tx.commit()?;

        info!(
            "event=note_delete module=repo status=ok note_id={note_id} existed={} blocks={blocks}",
            notes > 0
        );
        Ok(notes > 0)
    }

    fn get_note(&self, note_id: NoteId) -> RepoResult<Option<Note>> {
        load_note(self.conn, note_id)
    }

    fn list_summaries(&self, filter: &SummaryFilter) -> RepoResult<Vec<NoteSummary>> {
        let mut sql = String::from(
            "SELECT
                n.id,
                n.title,
                n.category_id,
                n.updated_at,
                b.kind,
                b.body
             FROM notes n
             LEFT JOIN note_blocks b ON b.note_id = n.id
             WHERE 1 = 1",
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(category_id) = filter.category_id.as_ref() {
            sql.push_str(" AND n.category_id = ?");
            bind_values.push(Value::Text(category_id.clone()));
        }

        let mut matchers = Vec::new();
        if let Some(text) = filter.text.as_ref() {
            matchers.push(
                r"(n.title LIKE ? ESCAPE '\'
                   OR EXISTS (
                       SELECT 1
                       FROM note_blocks tb
                       WHERE tb.note_id = n.id
                         AND tb.kind = 'text'
                         AND tb.body LIKE ? ESCAPE '\'
                   ))",
            );
            let pattern = like_pattern(text);
            bind_values.push(Value::Text(pattern.clone()));
            bind_values.push(Value::Text(pattern));
        }
        if let Some(range) = filter.updated_between {
            matchers.push("(n.updated_at BETWEEN ? AND ?)");
            bind_values.push(Value::Integer(range.start_ms));
            bind_values.push(Value::Integer(range.end_ms));
        }
        if !matchers.is_empty() {
            sql.push_str(" AND (");
            sql.push_str(&matchers.join(" OR "));
            sql.push(')');
        }

        sql.push_str(" ORDER BY n.updated_at DESC, n.id ASC, b.position ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut summaries: Vec<SummaryRows> = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let is_same_note = summaries
                .last()
                .is_some_and(|current| current.id_text == id_text);
            if !is_same_note {
                summaries.push(SummaryRows {
                    id: parse_uuid(&id_text, "notes.id")?,
                    id_text,
                    title: row.get("title")?,
                    category_id: row.get("category_id")?,
                    updated_at: row.get("updated_at")?,
                    text_bodies: Vec::new(),
                    block_count: 0,
                });
            }

            let kind: Option<String> = row.get("kind")?;
            let body: Option<String> = row.get("body")?;
            if let Some(current) = summaries.last_mut() {
                if let Some(kind) = kind {
                    current.block_count += 1;
                    if kind == BlockKindTag::Text.as_str() {
                        current.text_bodies.push(body.unwrap_or_default());
                    }
                }
            }
        }

        Ok(summaries.into_iter().map(SummaryRows::finish).collect())
    }

    fn set_note_category(&mut self, note_id: NoteId, category_id: &str) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !category_exists_in_tx(&tx, category_id)? {
            return Err(RepoError::NotFound {
                entity: "category",
                id: category_id.to_string(),
            });
        }
        let changed = tx.execute(
            "UPDATE notes SET category_id = ?2 WHERE id = ?1;",
            params![note_id.to_string(), category_id],
        )?;
        if changed == 0 {
            return Err(RepoError::note_not_found(note_id));
        }
        tx.commit()?;
        Ok(())
    }
}

/// Per-note accumulator while folding joined summary rows.
struct SummaryRows {
    id: NoteId,
    id_text: String,
    title: String,
    category_id: String,
    updated_at: i64,
    text_bodies: Vec<String>,
    block_count: u32,
}

impl SummaryRows {
    fn finish(self) -> NoteSummary {
        NoteSummary {
            id: self.id,
            title: self.title,
            preview: join_preview(self.text_bodies.iter().map(String::as_str)),
            last_modified: self.updated_at,
            block_count: self.block_count,
            category_id: self.category_id,
        }
    }
}

fn save_in_tx(conn: &mut Connection, full: &FullNote) -> RepoResult<i64> {
    let note = &full.note;
    let note_id = note.id.to_string();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    tx.execute(
        "INSERT INTO notes (id, title, category_id, created_at, updated_at, version)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            category_id = excluded.category_id,
            updated_at = excluded.updated_at,
            version = notes.version + 1;",
        params![
            note_id,
            note.title,
            note.category_id,
            note.created_at,
            note.updated_at,
        ],
    )?;

    tx.execute("DELETE FROM note_blocks WHERE note_id = ?1;", [&note_id])?;

    {
        let mut insert = tx.prepare(
            "INSERT INTO note_blocks (
                id, note_id, kind, position, body, file_path, alt_text,
                width_px, height_px, duration_ms, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
        )?;
        for block in &full.blocks {
            let columns = BlockColumns::from_kind(block.kind())?;
            insert.execute(params![
                block.id().to_string(),
                note_id,
                block.kind().tag().as_str(),
                i64::from(block.order()),
                columns.body,
                columns.file_path,
                columns.alt_text,
                columns.width_px,
                columns.height_px,
                columns.duration_ms,
                block.created_at(),
                block.updated_at(),
            ])?;
        }
    }

    let version: i64 = tx.query_row(
        "SELECT version FROM notes WHERE id = ?1;",
        [&note_id],
        |row| row.get(0),
    )?;
    tx.commit()?;
    Ok(version)
}

/// Kind-specific column values of one `note_blocks` row.
struct BlockColumns<'a> {
    body: Option<&'a str>,
    file_path: Option<&'a str>,
    alt_text: Option<&'a str>,
    width_px: Option<i64>,
    height_px: Option<i64>,
    duration_ms: Option<i64>,
}

impl<'a> BlockColumns<'a> {
    fn from_kind(kind: &'a BlockKind) -> RepoResult<Self> {
        let columns = match kind {
            BlockKind::Text { body } => Self {
                body: Some(body),
                file_path: None,
                alt_text: None,
                width_px: None,
                height_px: None,
                duration_ms: None,
            },
            BlockKind::Image {
                file_path,
                alt_text,
                width_px,
                height_px,
            } => Self {
                body: None,
                file_path: Some(file_path),
                alt_text: alt_text.as_deref(),
                width_px: width_px.map(i64::from),
                height_px: height_px.map(i64::from),
                duration_ms: None,
            },
            BlockKind::Audio {
                file_path,
                alt_text,
                duration_ms,
            } => Self {
                body: None,
                file_path: Some(file_path),
                alt_text: alt_text.as_deref(),
                width_px: None,
                height_px: None,
                duration_ms: duration_ms
                    .map(|value| {
                        i64::try_from(value).map_err(|_| {
                            RepoError::InvalidData(format!("duration_ms `{value}` is out of range"))
                        })
                    })
                    .transpose()?,
            },
        };
        Ok(columns)
    }
}

fn load_note(conn: &Connection, note_id: NoteId) -> RepoResult<Option<Note>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, category_id, created_at, updated_at, version
         FROM notes
         WHERE id = ?1;",
    )?;
    let mut rows = stmt.query([note_id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let id_text: String = row.get("id")?;
    let note = Note {
        id: parse_uuid(&id_text, "notes.id")?,
        title: row.get("title")?,
        category_id: row.get("category_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        version: row.get("version")?,
    };
    note.validate()
        .map_err(|err| RepoError::InvalidData(format!("note `{id_text}`: {err}")))?;
    Ok(Some(note))
}

fn load_blocks(conn: &Connection, note_id: NoteId) -> RepoResult<Vec<ContentBlock>> {
    let mut stmt = conn.prepare(
        "SELECT
            id, note_id, kind, position, body, file_path, alt_text,
            width_px, height_px, duration_ms, created_at, updated_at
         FROM note_blocks
         WHERE note_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([note_id.to_string()])?;
    let mut blocks = Vec::new();
    while let Some(row) = rows.next()? {
        blocks.push(block_from_row(row)?);
    }
    Ok(blocks)
}

fn block_from_row(row: &Row<'_>) -> RepoResult<ContentBlock> {
    let id_text: String = row.get("id")?;
    let note_id_text: String = row.get("note_id")?;
    let kind_text: String = row.get("kind")?;

    let tag = BlockKindTag::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid kind `{kind_text}` in note_blocks.kind for block `{id_text}`"
        ))
    })?;
    let file_path = || -> RepoResult<String> {
        let value: Option<String> = row.get("file_path")?;
        value.ok_or_else(|| {
            RepoError::InvalidData(format!("media block `{id_text}` has no file_path"))
        })
    };
    let kind = match tag {
        BlockKindTag::Text => BlockKind::Text {
            body: row.get::<_, Option<String>>("body")?.unwrap_or_default(),
        },
        BlockKindTag::Image => BlockKind::Image {
            file_path: file_path()?,
            alt_text: row.get("alt_text")?,
            width_px: optional_u32(row, "width_px")?,
            height_px: optional_u32(row, "height_px")?,
        },
        BlockKindTag::Audio => BlockKind::Audio {
            file_path: file_path()?,
            alt_text: row.get("alt_text")?,
            duration_ms: row
                .get::<_, Option<i64>>("duration_ms")?
                .map(|value| {
                    u64::try_from(value).map_err(|_| {
                        RepoError::InvalidData(format!(
                            "negative duration_ms `{value}` for block `{id_text}`"
                        ))
                    })
                })
                .transpose()?,
        },
    };

    let parts = BlockParts {
        id: parse_uuid(&id_text, "note_blocks.id")?,
        note_id: parse_uuid(&note_id_text, "note_blocks.note_id")?,
        kind,
        order: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    ContentBlock::from_parts(parts)
        .map_err(|err| RepoError::InvalidData(format!("block `{id_text}`: {err}")))
}

fn optional_u32(row: &Row<'_>, column: &'static str) -> RepoResult<Option<u32>> {
    row.get::<_, Option<i64>>(column)?
        .map(|value| {
            u32::try_from(value).map_err(|_| {
                RepoError::InvalidData(format!("value `{value}` in note_blocks.{column} is out of range"))
            })
        })
        .transpose()
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn category_exists_in_tx(tx: &Transaction<'_>, category_id: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1);",
        [category_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Builds a `LIKE` pattern matching `text` as a literal substring.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }
}
