//! JSON export and import of whole notes.
//!
//! # Responsibility
//! - Serialize every note with its ordered blocks into one document.
//! - Re-import a document as new notes through the normal save path.
//!
//! # Invariants
//! - Import never overwrites existing notes: every note and block gets a fresh
//!   id. Timestamps and media paths are kept.
//! - Media files themselves are not part of the document.

use crate::model::block::ContentBlock;
use crate::model::note::{FullNote, Note, NoteId, DEFAULT_CATEGORY_ID};
use crate::model::now_epoch_ms;
use crate::repo::category_repo::CategoryRepository;
use crate::repo::note_repo::NoteRepository;
use crate::service::note_service::{NoteService, NoteServiceError, ServiceResult};
use crate::summary::SummaryFilter;
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const EXPORT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub format_version: u32,
    /// Unix epoch milliseconds.
    pub exported_at: i64,
    pub notes: Vec<ExportedNote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedNote {
    pub id: NoteId,
    pub title: String,
    pub category_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub version: i64,
    pub blocks: Vec<ContentBlock>,
}

impl From<FullNote> for ExportedNote {
    fn from(value: FullNote) -> Self {
        let FullNote { note, blocks } = value;
        Self {
            id: note.id,
            title: note.title,
            category_id: note.category_id,
            created_at: note.created_at,
            updated_at: note.updated_at,
            version: note.version,
            blocks,
        }
    }
}

impl<R: NoteRepository + CategoryRepository> NoteService<R> {
    /// Collects every note, newest first.
    pub fn export_document(&mut self) -> ServiceResult<ExportDocument> {
        let summaries = self.list_summaries(&SummaryFilter::all())?;
        let mut notes = Vec::with_capacity(summaries.len());
        for summary in summaries {
            notes.push(ExportedNote::from(self.get_full_note(summary.id)?));
        }
        info!(
            "event=note_export module=service status=ok notes={}",
            notes.len()
        );
        Ok(ExportDocument {
            format_version: EXPORT_FORMAT_VERSION,
            exported_at: now_epoch_ms(),
            notes,
        })
    }

    pub fn export_json(&mut self) -> ServiceResult<String> {
        let document = self.export_document()?;
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Saves every note of `document` as a new note and returns the new ids.
    ///
    /// Notes referencing an unknown category land in the default category.
    /// Each note is saved atomically; a failure stops the import after the
    /// notes already saved.
    pub fn import_document(&mut self, document: ExportDocument) -> ServiceResult<Vec<NoteId>> {
        if document.format_version != EXPORT_FORMAT_VERSION {
            return Err(NoteServiceError::UnsupportedExportVersion(
                document.format_version,
            ));
        }

        let mut imported = Vec::with_capacity(document.notes.len());
        for exported in document.notes {
            let category_id = if self.get_category(&exported.category_id)?.is_some() {
                exported.category_id
            } else {
                DEFAULT_CATEGORY_ID.to_string()
            };
            let note = Note {
                id: Uuid::new_v4(),
                title: exported.title,
                category_id,
                created_at: exported.created_at,
                updated_at: exported.updated_at,
                version: 1,
            };
            let blocks = exported
                .blocks
                .into_iter()
                .map(|block| block.with_identity(Uuid::new_v4(), note.id))
                .collect();
            let saved = self.save_full_note(&FullNote::new(note, blocks)?)?;
            imported.push(saved.note.id);
        }

        info!(
            "event=note_import module=service status=ok notes={}",
            imported.len()
        );
        Ok(imported)
    }

    pub fn import_json(&mut self, json: &str) -> ServiceResult<Vec<NoteId>> {
        let document: ExportDocument = serde_json::from_str(json)?;
        self.import_document(document)
    }
}
