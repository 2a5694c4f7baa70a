use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use study_core::model::{Exam, ExamId, NewExam, TopicId};

use super::SqliteRepository;
use super::mapping::{
    conn, date_from_row, date_to_text, exam_id_from_i64, id_i64, ser, topic_id_from_i64,
};
use crate::repository::{ExamRepository, StorageError};

impl SqliteRepository {
    async fn exam_topic_ids(&self, exam: i64) -> Result<Vec<TopicId>, StorageError> {
        let rows = sqlx::query(
            "SELECT topic_id FROM exam_topics WHERE exam_id = ?1 ORDER BY position ASC",
        )
        .bind(exam)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| topic_id_from_i64(row.try_get::<i64, _>("topic_id").map_err(ser)?))
            .collect()
    }

    async fn exam_from_row(&self, row: &SqliteRow) -> Result<Exam, StorageError> {
        let id: i64 = row.try_get("id").map_err(ser)?;
        let topic_ids = self.exam_topic_ids(id).await?;
        Exam::from_persisted(
            exam_id_from_i64(id)?,
            row.try_get::<String, _>("title").map_err(ser)?,
            date_from_row(row, "date")?,
            topic_ids,
        )
        .map_err(ser)
    }
}

async fn write_topic_ids(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    exam: i64,
    topic_ids: &[TopicId],
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM exam_topics WHERE exam_id = ?1")
        .bind(exam)
        .execute(&mut **tx)
        .await
        .map_err(conn)?;

    for (position, topic) in topic_ids.iter().enumerate() {
        sqlx::query("INSERT INTO exam_topics (exam_id, topic_id, position) VALUES (?1, ?2, ?3)")
            .bind(exam)
            .bind(id_i64("topic_id", topic.value())?)
            .bind(i64::try_from(position).map_err(ser)?)
            .execute(&mut **tx)
            .await
            .map_err(conn)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl ExamRepository for SqliteRepository {
    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError> {
        let rows = sqlx::query("SELECT id, title, date FROM exams ORDER BY date ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut exams = Vec::with_capacity(rows.len());
        for row in &rows {
            exams.push(self.exam_from_row(row).await?);
        }
        Ok(exams)
    }

    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError> {
        let row = sqlx::query("SELECT id, title, date FROM exams WHERE id = ?1")
            .bind(id_i64("exam_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => self.exam_from_row(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn insert_new_exam(&self, exam: NewExam) -> Result<Exam, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query("INSERT INTO exams (title, date) VALUES (?1, ?2)")
            .bind(exam.title.clone())
            .bind(date_to_text(exam.date))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        let id = res.last_insert_rowid();
        write_topic_ids(&mut tx, id, &exam.topic_ids).await?;

        tx.commit().await.map_err(conn)?;
        Ok(exam.assign_id(exam_id_from_i64(id)?))
    }

    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let id = id_i64("exam_id", exam.id().value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO exams (id, title, date)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                date = excluded.date
            ",
        )
        .bind(id)
        .bind(exam.title().to_owned())
        .bind(date_to_text(exam.date()))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        write_topic_ids(&mut tx, id, exam.topic_ids()).await?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM exams WHERE id = ?1")
            .bind(id_i64("exam_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn detach_topic(&self, topic: TopicId) -> Result<u64, StorageError> {
        // one row per (exam, topic), so affected rows equal changed exams
        let res = sqlx::query("DELETE FROM exam_topics WHERE topic_id = ?1")
            .bind(id_i64("topic_id", topic.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}
