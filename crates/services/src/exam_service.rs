use std::sync::Arc;

use study_core::{
    Clock,
    model::{Exam, ExamDraft, ExamId, Topic},
    urgency::{self, ExamPartition},
};
use storage::repository::{ExamRepository, StorageError, TopicRepository};

use crate::error::ExamServiceError;

/// Exam planning: creation, countdowns and the topics each exam covers.
#[derive(Clone)]
pub struct ExamService {
    clock: Clock,
    exams: Arc<dyn ExamRepository>,
    topics: Arc<dyn TopicRepository>,
}

impl ExamService {
    #[must_use]
    pub fn new(
        clock: Clock,
        exams: Arc<dyn ExamRepository>,
        topics: Arc<dyn TopicRepository>,
    ) -> Self {
        Self {
            clock,
            exams,
            topics,
        }
    }

    /// # Errors
    ///
    /// Returns `ExamServiceError::Exam` for a blank title,
    /// `ExamServiceError::UnknownTopic` if a listed topic does not exist, or
    /// `ExamServiceError::Storage` if persistence fails.
    pub async fn create_exam(&self, draft: ExamDraft) -> Result<Exam, ExamServiceError> {
        let new = draft.validate()?;
        for topic_id in &new.topic_ids {
            if self.topics.get_topic(*topic_id).await?.is_none() {
                return Err(ExamServiceError::UnknownTopic(*topic_id));
            }
        }
        let exam = self.exams.insert_new_exam(new).await?;
        tracing::debug!(exam = %exam.id(), date = %exam.date(), "exam created");
        Ok(exam)
    }

    /// Exams split into upcoming and past, with days left for each.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` if exams cannot be loaded.
    pub async fn list_exams(&self) -> Result<ExamPartition, ExamServiceError> {
        let exams = self.exams.list_exams().await?;
        Ok(urgency::partition_exams(exams, self.clock.today()))
    }

    /// Topics an exam covers, in the exam's order. Ids of deleted topics are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::NotFound` if the exam does not exist, or
    /// `ExamServiceError::Storage`.
    pub async fn exam_topics(&self, id: ExamId) -> Result<Vec<Topic>, ExamServiceError> {
        let exam = self
            .exams
            .get_exam(id)
            .await?
            .ok_or(ExamServiceError::NotFound(id))?;

        let mut topics = Vec::with_capacity(exam.topic_ids().len());
        for topic_id in exam.topic_ids() {
            match self.topics.get_topic(*topic_id).await? {
                Some(topic) => topics.push(topic),
                None => tracing::debug!(exam = %id, topic = %topic_id, "skipping dangling topic"),
            }
        }
        Ok(topics)
    }

    /// # Errors
    ///
    /// Returns `ExamServiceError::NotFound` if the exam does not exist, or
    /// `ExamServiceError::Storage`.
    pub async fn delete_exam(&self, id: ExamId) -> Result<(), ExamServiceError> {
        match self.exams.delete_exam(id).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound) => Err(ExamServiceError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }
}
