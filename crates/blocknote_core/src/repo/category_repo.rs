//! Category persistence.
//!
//! # Invariants
//! - Default categories cannot be deleted.
//! - Deleting a category moves its notes to the default category in the same
//!   transaction.

use crate::model::block::ValidationError;
use crate::model::note::{Category, DEFAULT_CATEGORY_ID};
use crate::model::now_epoch_ms;
use crate::repo::note_repo::SqliteNoteRepository;
use crate::repo::{RepoError, RepoResult};
use log::info;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

pub trait CategoryRepository {
    /// Default categories first, then the rest by name.
    fn list_categories(&self) -> RepoResult<Vec<Category>>;
    fn get_category(&self, category_id: &str) -> RepoResult<Option<Category>>;
    /// Creates a user category with a generated id.
    fn create_category(&mut self, name: &str) -> RepoResult<Category>;
    /// Deletes a user category and returns how many notes were moved to the
    /// default category.
    fn delete_category(&mut self, category_id: &str) -> RepoResult<usize>;
}

impl CategoryRepository for SqliteNoteRepository<'_> {
    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, is_default, created_at
             FROM categories
             ORDER BY is_default DESC, name COLLATE NOCASE ASC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(category_from_row(row)?);
        }
        Ok(categories)
    }

    fn get_category(&self, category_id: &str) -> RepoResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, name, is_default, created_at
                 FROM categories
                 WHERE id = ?1;",
                [category_id],
                category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    fn create_category(&mut self, name: &str) -> RepoResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("name").into());
        }

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            is_default: false,
            created_at: now_epoch_ms(),
        };
        self.conn.execute(
            "INSERT INTO categories (id, name, is_default, created_at)
             VALUES (?1, ?2, 0, ?3);",
            params![category.id, category.name, category.created_at],
        )?;
        info!(
            "event=category_create module=repo status=ok category_id={}",
            category.id
        );
        Ok(category)
    }

    fn delete_category(&mut self, category_id: &str) -> RepoResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let is_default: Option<bool> = tx
            .query_row(
                "SELECT is_default FROM categories WHERE id = ?1;",
                [category_id],
                |row| row.get(0),
            )
            .optional()?;
        match is_default {
            None => {
                return Err(RepoError::NotFound {
                    entity: "category",
                    id: category_id.to_string(),
                })
            }
            Some(true) => {
                return Err(RepoError::Protected(format!(
                    "category `{category_id}` is a default category"
                )))
            }
            Some(false) => {}
        }

        let moved = tx.execute(
            "UPDATE notes SET category_id = ?2 WHERE category_id = ?1;",
            params![category_id, DEFAULT_CATEGORY_ID],
        )?;
        tx.execute("DELETE FROM categories WHERE id = ?1;", [category_id])?;
        tx.commit()?;

        info!(
            "event=category_delete module=repo status=ok category_id={category_id} moved_notes={moved}"
        );
        Ok(moved)
    }
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get("id")?,
        name: row.get("name")?,
        is_default: row.get("is_default")?,
        created_at: row.get("created_at")?,
    })
}
