use study_core::model::{NewTopic, Topic, TopicId};

use super::SqliteRepository;
use super::mapping::{
    conn, date_to_text, flashcards_to_json, id_i64, map_topic_row, topic_id_from_i64,
};
use crate::repository::{StorageError, TopicFilter, TopicRepository};

const TOPIC_COLUMNS: &str = "id, title, subject, stage, next_review, course_link, exercise_link, is_active, flashcards";

#[async_trait::async_trait]
impl TopicRepository for SqliteRepository {
    async fn list_topics(&self, filter: TopicFilter) -> Result<Vec<Topic>, StorageError> {
        let sql = format!(
            "SELECT {TOPIC_COLUMNS} FROM topics WHERE (?1 IS NULL OR is_active = ?1) ORDER BY id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.active)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut topics = Vec::with_capacity(rows.len());
        for row in rows {
            topics.push(map_topic_row(&row)?);
        }
        Ok(topics)
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError> {
        let sql = format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("topic_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_topic_row).transpose()
    }

    async fn insert_new_topic(&self, topic: NewTopic) -> Result<Topic, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO topics (title, subject, stage, next_review, course_link, exercise_link, is_active, flashcards)
            VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, '[]')
            ",
        )
        .bind(topic.title.clone())
        .bind(topic.subject.clone())
        .bind(date_to_text(topic.next_review))
        .bind(topic.course_link.as_ref().map(|u| u.as_str().to_owned()))
        .bind(topic.exercise_link.as_ref().map(|u| u.as_str().to_owned()))
        .bind(topic.is_active)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(topic.assign_id(topic_id_from_i64(res.last_insert_rowid())?))
    }

    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO topics (id, title, subject, stage, next_review, course_link, exercise_link, is_active, flashcards)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                subject = excluded.subject,
                stage = excluded.stage,
                next_review = excluded.next_review,
                course_link = excluded.course_link,
                exercise_link = excluded.exercise_link,
                is_active = excluded.is_active,
                flashcards = excluded.flashcards
            ",
        )
        .bind(id_i64("topic_id", topic.id().value())?)
        .bind(topic.title().to_owned())
        .bind(topic.subject().map(ToOwned::to_owned))
        .bind(i64::from(topic.stage()))
        .bind(date_to_text(topic.next_review()))
        .bind(topic.course_link().map(|u| u.as_str().to_owned()))
        .bind(topic.exercise_link().map(|u| u.as_str().to_owned()))
        .bind(topic.is_active())
        .bind(flashcards_to_json(topic.flashcards())?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn delete_topic(&self, id: TopicId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM topics WHERE id = ?1")
            .bind(id_i64("topic_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
