use std::sync::Arc;

use study_core::{
    Clock,
    agenda::{self, AgendaDay},
    library::LibraryFilter,
    model::{FlashcardId, Topic, TopicDraft, TopicEdit, TopicId},
};
use storage::repository::{ExamRepository, StorageError, TopicFilter, TopicRepository};

use crate::error::TopicServiceError;

/// Result of deleting a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletedTopic {
    pub id: TopicId,
    /// Exams that listed the topic and no longer do.
    pub exams_updated: u64,
}

/// Topic lifecycle: creation, edits, flashcards, deletion and the read views
/// (due list, agenda, library).
#[derive(Clone)]
pub struct TopicService {
    clock: Clock,
    topics: Arc<dyn TopicRepository>,
    exams: Arc<dyn ExamRepository>,
}

impl TopicService {
    #[must_use]
    pub fn new(
        clock: Clock,
        topics: Arc<dyn TopicRepository>,
        exams: Arc<dyn ExamRepository>,
    ) -> Self {
        Self {
            clock,
            topics,
            exams,
        }
    }

    /// Validate and store a new topic.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::Topic` for validation failures.
    /// Returns `TopicServiceError::Storage` if persistence fails.
    pub async fn create_topic(&self, draft: TopicDraft) -> Result<Topic, TopicServiceError> {
        let new_topic = draft.validate(self.clock.today())?;
        let topic = self.topics.insert_new_topic(new_topic).await?;
        tracing::debug!(topic = %topic.id(), active = topic.is_active(), "topic created");
        Ok(topic)
    }

    /// # Errors
    ///
    /// Returns `TopicServiceError::NotFound` if the topic does not exist.
    pub async fn get_topic(&self, id: TopicId) -> Result<Topic, TopicServiceError> {
        self.topics
            .get_topic(id)
            .await?
            .ok_or(TopicServiceError::NotFound(id))
    }

    /// Apply a partial edit. Scheduling fields are never touched.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::NotFound`, `TopicServiceError::Topic` for
    /// invalid fields, or `TopicServiceError::Storage`.
    pub async fn edit_topic(&self, id: TopicId, edit: TopicEdit) -> Result<Topic, TopicServiceError> {
        let mut topic = self.get_topic(id).await?;
        topic.apply_edit(edit)?;
        self.topics.upsert_topic(&topic).await?;
        Ok(topic)
    }

    /// # Errors
    ///
    /// Returns `TopicServiceError::NotFound` or `TopicServiceError::Storage`.
    pub async fn set_active(&self, id: TopicId, active: bool) -> Result<Topic, TopicServiceError> {
        let mut topic = self.get_topic(id).await?;
        topic.set_active(active);
        self.topics.upsert_topic(&topic).await?;
        Ok(topic)
    }

    /// Move a topic between the revision list and the library.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::NotFound` or `TopicServiceError::Storage`.
    pub async fn toggle_active(&self, id: TopicId) -> Result<Topic, TopicServiceError> {
        let topic = self.get_topic(id).await?;
        self.set_active(id, !topic.is_active()).await
    }

    /// Delete a topic and remove it from every exam that lists it.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::NotFound` if the topic does not exist.
    /// Returns `TopicServiceError::Storage` if either write fails.
    pub async fn delete_topic(&self, id: TopicId) -> Result<DeletedTopic, TopicServiceError> {
        self.get_topic(id).await?;
        // exams never reference a deleted topic
        let exams_updated = self.exams.detach_topic(id).await?;
        match self.topics.delete_topic(id).await {
            Ok(()) => {}
            Err(StorageError::NotFound) => return Err(TopicServiceError::NotFound(id)),
            Err(err) => return Err(err.into()),
        }
        tracing::debug!(topic = %id, exams_updated, "topic deleted");
        Ok(DeletedTopic { id, exams_updated })
    }

    /// Append a flashcard to a topic.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::Flashcard` for a blank question or answer,
    /// `TopicServiceError::NotFound`, or `TopicServiceError::Storage`.
    pub async fn add_flashcard(
        &self,
        id: TopicId,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<(Topic, FlashcardId), TopicServiceError> {
        let mut topic = self.get_topic(id).await?;
        let card = topic.add_flashcard(question, answer)?;
        self.topics.upsert_topic(&topic).await?;
        Ok((topic, card))
    }

    /// # Errors
    ///
    /// Returns `TopicServiceError::FlashcardNotFound` if the topic has no such
    /// card, `TopicServiceError::NotFound`, or `TopicServiceError::Storage`.
    pub async fn remove_flashcard(
        &self,
        id: TopicId,
        card: FlashcardId,
    ) -> Result<Topic, TopicServiceError> {
        let mut topic = self.get_topic(id).await?;
        topic
            .remove_flashcard(card)
            .ok_or(TopicServiceError::FlashcardNotFound { topic: id, card })?;
        self.topics.upsert_topic(&topic).await?;
        Ok(topic)
    }

    /// Active topics, soonest review first.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::Storage` if topics cannot be loaded.
    pub async fn active_topics(&self) -> Result<Vec<Topic>, TopicServiceError> {
        let mut topics = self.topics.list_topics(TopicFilter::active()).await?;
        topics.sort_by_key(|t| (t.next_review(), t.id()));
        Ok(topics)
    }

    /// Active topics due today or earlier, most overdue first.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::Storage` if topics cannot be loaded.
    pub async fn due_topics(&self) -> Result<Vec<Topic>, TopicServiceError> {
        let topics = self.active_topics().await?;
        let today = self.clock.today();
        Ok(agenda::due_topics(&topics, today)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Active topics grouped by review day.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::Storage` if topics cannot be loaded.
    pub async fn agenda(&self) -> Result<Vec<AgendaDay>, TopicServiceError> {
        let topics = self.active_topics().await?;
        Ok(agenda::build_agenda(topics, self.clock.today()))
    }

    /// Every topic matching the library filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::Storage` if topics cannot be loaded.
    pub async fn library(&self, filter: &LibraryFilter) -> Result<Vec<Topic>, TopicServiceError> {
        let topics = self.topics.list_topics(TopicFilter::all()).await?;
        Ok(filter.apply(&topics).into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use study_core::agenda::DayStatus;
    use study_core::library::SubjectFilter;
    use study_core::model::ExamDraft;
    use study_core::time::fixed_now;

    fn service(repo: &InMemoryRepository) -> TopicService {
        let repo = Arc::new(repo.clone());
        TopicService::new(Clock::fixed(fixed_now()), repo.clone(), repo)
    }

    #[tokio::test]
    async fn active_and_library_topics_get_different_first_reviews() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);

        let active = service.create_topic(TopicDraft::active("Optique")).await.unwrap();
        let shelved = service.create_topic(TopicDraft::library("Ondes")).await.unwrap();
        assert_eq!(active.next_review().to_string(), "2024-01-02");
        assert_eq!(shelved.next_review().to_string(), "2024-01-01");

        let due = service.due_topics().await.unwrap();
        assert!(due.is_empty(), "library topics stay out of the revision list");

        service.toggle_active(shelved.id()).await.unwrap();
        let due: Vec<TopicId> = service.due_topics().await.unwrap().iter().map(Topic::id).collect();
        assert_eq!(due, vec![shelved.id()]);
    }

    #[tokio::test]
    async fn deleting_a_topic_detaches_it_from_exams() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let a = service.create_topic(TopicDraft::active("A")).await.unwrap();
        let b = service.create_topic(TopicDraft::active("B")).await.unwrap();

        let exam = ExamDraft::new("Partiel", "2024-01-10".parse().unwrap(), vec![a.id(), b.id()]);
        let exam = repo.insert_new_exam(exam.validate().unwrap()).await.unwrap();

        let deleted = service.delete_topic(a.id()).await.unwrap();
        assert_eq!(deleted.exams_updated, 1);
        let exam = repo.get_exam(exam.id()).await.unwrap().unwrap();
        assert_eq!(exam.topic_ids(), &[b.id()]);

        assert!(matches!(
            service.delete_topic(a.id()).await,
            Err(TopicServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn flashcards_are_added_and_removed() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let topic = service.create_topic(TopicDraft::active("Chimie orga")).await.unwrap();

        let (_, first) = service.add_flashcard(topic.id(), "Q1", "A1").await.unwrap();
        let (_, second) = service.add_flashcard(topic.id(), "Q2", "A2").await.unwrap();
        let topic = service.remove_flashcard(topic.id(), first).await.unwrap();
        assert_eq!(topic.flashcards().len(), 1);
        assert_eq!(topic.flashcards()[0].id(), second);

        assert!(matches!(
            service.remove_flashcard(topic.id(), first).await,
            Err(TopicServiceError::FlashcardNotFound { .. })
        ));
        assert!(matches!(
            service.add_flashcard(topic.id(), " ", "A").await,
            Err(TopicServiceError::Flashcard(_))
        ));
    }

    #[tokio::test]
    async fn edits_keep_the_schedule() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let topic = service.create_topic(TopicDraft::active("Probabilités")).await.unwrap();

        let edited = service
            .edit_topic(
                topic.id(),
                TopicEdit {
                    subject: Some(Some("Maths".into())),
                    exercise_link: Some(Some("https://example.org/td3.pdf".into())),
                    ..TopicEdit::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.subject(), Some("Maths"));
        assert_eq!(edited.next_review(), topic.next_review());
        assert_eq!(edited.stage(), topic.stage());
    }

    #[tokio::test]
    async fn library_filters_by_subject_and_search() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        service
            .create_topic(TopicDraft::library("Intégrales").with_subject("Maths"))
            .await
            .unwrap();
        service.create_topic(TopicDraft::active("Dérivées")).await.unwrap();
        service
            .create_topic(TopicDraft::library("Intégrales de surface").with_subject("Physique"))
            .await
            .unwrap();

        let all = service.library(&LibraryFilter::default()).await.unwrap();
        let titles: Vec<&str> = all.iter().map(Topic::title).collect();
        assert_eq!(titles, vec!["Intégrales de surface", "Dérivées", "Intégrales"]);

        let filter = LibraryFilter::new(SubjectFilter::parse("Autre"), "");
        let other = service.library(&filter).await.unwrap();
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].title(), "Dérivées");

        let filter = LibraryFilter::new(SubjectFilter::All, "intégrales");
        assert_eq!(service.library(&filter).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn agenda_groups_active_topics() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        service.create_topic(TopicDraft::active("A")).await.unwrap();
        service.create_topic(TopicDraft::active("B")).await.unwrap();
        service.create_topic(TopicDraft::library("C")).await.unwrap();

        let agenda = service.agenda().await.unwrap();
        assert_eq!(agenda.len(), 1);
        assert_eq!(agenda[0].status, DayStatus::Upcoming);
        assert_eq!(agenda[0].topics.len(), 2);
    }
}
