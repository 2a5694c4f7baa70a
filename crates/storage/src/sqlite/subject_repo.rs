use study_core::model::{Subject, SubjectName};

use super::SqliteRepository;
use super::mapping::{conn, map_subject_row, subject_id_from_i64};
use crate::repository::{StorageError, SubjectRepository};

#[async_trait::async_trait]
impl SubjectRepository for SqliteRepository {
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        let rows = sqlx::query("SELECT id, name FROM subjects ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut subjects = Vec::with_capacity(rows.len());
        for row in rows {
            subjects.push(map_subject_row(&row)?);
        }
        Ok(subjects)
    }

    async fn insert_subject(&self, name: &SubjectName) -> Result<Subject, StorageError> {
        let res = sqlx::query("INSERT INTO subjects (name) VALUES (?1) ON CONFLICT(name) DO NOTHING")
            .bind(name.as_str().to_owned())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        Ok(Subject::new(
            subject_id_from_i64(res.last_insert_rowid())?,
            name.clone(),
        ))
    }

    async fn delete_subject(&self, name: &SubjectName) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM subjects WHERE name = ?1")
            .bind(name.as_str().to_owned())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
