use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use study_core::StudyDate;
use study_core::model::{
    ExamId, Flashcard, Profile, Subject, SubjectId, SubjectName, Topic, TopicId, UserId,
};
use study_core::scheduler::Stage;
use url::Url;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn topic_id_from_i64(v: i64) -> Result<TopicId, StorageError> {
    Ok(TopicId::new(i64_to_u64("topic_id", v)?))
}

pub(crate) fn exam_id_from_i64(v: i64) -> Result<ExamId, StorageError> {
    Ok(ExamId::new(i64_to_u64("exam_id", v)?))
}

pub(crate) fn subject_id_from_i64(v: i64) -> Result<SubjectId, StorageError> {
    Ok(SubjectId::new(i64_to_u64("subject_id", v)?))
}

/// Dates are stored as `YYYY-MM-DD` text.
pub(crate) fn date_to_text(date: StudyDate) -> String {
    date.to_string()
}

pub(crate) fn date_from_row(row: &SqliteRow, column: &str) -> Result<StudyDate, StorageError> {
    row.try_get::<String, _>(column)
        .map_err(ser)?
        .parse()
        .map_err(ser)
}

fn link_from_row(row: &SqliteRow, column: &str) -> Result<Option<Url>, StorageError> {
    row.try_get::<Option<String>, _>(column)
        .map_err(ser)?
        .map(|raw| Url::parse(&raw).map_err(ser))
        .transpose()
}

pub(crate) fn flashcards_to_json(cards: &[Flashcard]) -> Result<String, StorageError> {
    serde_json::to_string(cards).map_err(ser)
}

pub(crate) fn map_topic_row(row: &SqliteRow) -> Result<Topic, StorageError> {
    let stage = Stage::try_from(row.try_get::<i64, _>("stage").map_err(ser)?).map_err(ser)?;
    let flashcards: Vec<Flashcard> =
        serde_json::from_str(&row.try_get::<String, _>("flashcards").map_err(ser)?).map_err(ser)?;

    Topic::from_persisted(
        topic_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("subject").map_err(ser)?,
        stage,
        date_from_row(row, "next_review")?,
        link_from_row(row, "course_link")?,
        link_from_row(row, "exercise_link")?,
        row.try_get::<bool, _>("is_active").map_err(ser)?,
        flashcards,
    )
    .map_err(ser)
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<Profile, StorageError> {
    let user: sqlx::types::Uuid = row.try_get("user_id").map_err(ser)?;
    Profile::from_persisted(
        UserId::new(user),
        row.try_get::<i64, _>("streak").map_err(ser)?,
        row.try_get("last_visit").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_subject_row(row: &SqliteRow) -> Result<Subject, StorageError> {
    let name = SubjectName::new(row.try_get::<String, _>("name").map_err(ser)?).map_err(ser)?;
    Ok(Subject::new(
        subject_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        name,
    ))
}
