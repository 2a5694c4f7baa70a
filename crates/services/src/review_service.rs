use std::sync::Arc;

use study_core::{
    Clock, StudyDate,
    model::{Topic, TopicId},
    scheduler::{Difficulty, Schedule, Scheduler, Stage},
    session::StudySession,
};
use storage::repository::{StorageError, TopicRepository};

use crate::error::ReviewServiceError;

//
// ─── RECEIPT ───────────────────────────────────────────────────────────────────
//

/// Outcome of writing a reviewed topic back to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistStatus {
    Saved,
    /// The write failed; the reviewed topic is still held by the receipt.
    Failed(StorageError),
}

/// Result of a review: the topic with the new schedule already applied, what
/// it looked like before, and whether storage accepted the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewReceipt {
    pub topic: Topic,
    pub difficulty: Difficulty,
    pub schedule: Schedule,
    pub previous_stage: Stage,
    pub previous_next_review: StudyDate,
    pub persist: PersistStatus,
}

impl ReviewReceipt {
    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.persist == PersistStatus::Saved
    }

    /// The topic as it was before the review.
    #[must_use]
    pub fn rollback(self) -> Topic {
        let mut topic = self.topic;
        topic.restore_schedule(self.previous_stage, self.previous_next_review);
        topic
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Applies easy/hard reviews to topics and persists the new schedule.
///
/// The schedule is applied to the in-memory topic first. A failed write does
/// not undo it: the receipt carries the failure so the caller can `retry` or
/// `rollback`.
#[derive(Clone)]
pub struct ReviewService {
    clock: Clock,
    scheduler: Scheduler,
    topics: Arc<dyn TopicRepository>,
}

impl ReviewService {
    #[must_use]
    pub fn new(clock: Clock, topics: Arc<dyn TopicRepository>) -> Self {
        Self {
            clock,
            scheduler: Scheduler::new(),
            topics,
        }
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Calendar day reviews are scheduled from.
    #[must_use]
    pub fn today(&self) -> StudyDate {
        self.clock.today()
    }

    /// Apply a review to an in-memory topic without persisting it.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Scheduler` if the next review day cannot be computed.
    pub fn apply_review(
        &self,
        topic: &mut Topic,
        difficulty: Difficulty,
    ) -> Result<Schedule, ReviewServiceError> {
        let schedule = topic.plan_review(&self.scheduler, difficulty, self.today())?;
        topic.apply_schedule(&schedule);
        Ok(schedule)
    }

    /// Review a topic and write it back.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Scheduler` if scheduling fails. Storage
    /// failures are reported through [`ReviewReceipt::persist`].
    pub async fn review_topic(
        &self,
        mut topic: Topic,
        difficulty: Difficulty,
    ) -> Result<ReviewReceipt, ReviewServiceError> {
        let previous_stage = topic.stage();
        let previous_next_review = topic.next_review();
        let schedule = self.apply_review(&mut topic, difficulty)?;
        Ok(self
            .persist(topic, difficulty, schedule, previous_stage, previous_next_review)
            .await)
    }

    /// Load a topic by id, review it and write it back.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::TopicNotFound` if the topic is missing,
    /// `ReviewServiceError::Storage` if it cannot be loaded, and
    /// `ReviewServiceError::Scheduler` if scheduling fails.
    pub async fn review_topic_by_id(
        &self,
        id: TopicId,
        difficulty: Difficulty,
    ) -> Result<ReviewReceipt, ReviewServiceError> {
        let topic = self
            .topics
            .get_topic(id)
            .await?
            .ok_or(ReviewServiceError::TopicNotFound(id))?;
        self.review_topic(topic, difficulty).await
    }

    /// Close a study session with the reported difficulty.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Session` if scheduling fails.
    pub async fn finish_session(
        &self,
        session: StudySession,
        difficulty: Difficulty,
    ) -> Result<ReviewReceipt, ReviewServiceError> {
        let previous_stage = session.topic().stage();
        let previous_next_review = session.topic().next_review();
        let finished = session.finish(difficulty, self.today(), &self.scheduler)?;
        Ok(self
            .persist(
                finished.topic,
                difficulty,
                finished.schedule,
                previous_stage,
                previous_next_review,
            )
            .await)
    }

    /// Write the already-reviewed topic of a failed receipt again.
    ///
    /// The schedule is not recomputed.
    pub async fn retry(&self, receipt: &mut ReviewReceipt) {
        receipt.persist = self.write(&receipt.topic).await;
    }

    async fn persist(
        &self,
        topic: Topic,
        difficulty: Difficulty,
        schedule: Schedule,
        previous_stage: Stage,
        previous_next_review: StudyDate,
    ) -> ReviewReceipt {
        tracing::debug!(
            topic = %topic.id(),
            %difficulty,
            from_stage = %previous_stage,
            to_stage = %schedule.stage,
            next_review = %schedule.next_review,
            "review scheduled"
        );
        let persist = self.write(&topic).await;
        ReviewReceipt {
            topic,
            difficulty,
            schedule,
            previous_stage,
            previous_next_review,
            persist,
        }
    }

    async fn write(&self, topic: &Topic) -> PersistStatus {
        match self.topics.upsert_topic(topic).await {
            Ok(()) => PersistStatus::Saved,
            Err(error) => {
                tracing::warn!(topic = %topic.id(), %error, "failed to persist review");
                PersistStatus::Failed(error)
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::TopicDraft;
    use study_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> ReviewService {
        ReviewService::new(Clock::fixed(fixed_now()), Arc::new(repo.clone()))
    }

    async fn stored_topic(repo: &InMemoryRepository) -> Topic {
        let draft = TopicDraft::active("Suites numériques")
            .validate(Clock::fixed(fixed_now()).today())
            .unwrap();
        repo.insert_new_topic(draft).await.unwrap()
    }

    #[tokio::test]
    async fn easy_review_advances_and_saves() {
        let repo = InMemoryRepository::new();
        let topic = stored_topic(&repo).await;
        let service = service(&repo);

        let receipt = service.review_topic_by_id(topic.id(), Difficulty::Easy).await.unwrap();
        assert!(receipt.is_saved());
        assert_eq!(receipt.previous_stage, Stage::INITIAL);
        assert_eq!(receipt.topic.stage(), Stage::new(1));
        assert_eq!(receipt.topic.next_review().to_string(), "2024-01-03");

        let stored = repo.get_topic(topic.id()).await.unwrap().unwrap();
        assert_eq!(stored, receipt.topic);
    }

    #[tokio::test]
    async fn hard_review_resets_to_tomorrow() {
        let repo = InMemoryRepository::new();
        let mut topic = stored_topic(&repo).await;
        topic.restore_schedule(Stage::new(4), "2024-01-01".parse().unwrap());
        let service = service(&repo);

        let receipt = service.review_topic(topic, Difficulty::Hard).await.unwrap();
        assert_eq!(receipt.topic.stage(), Stage::INITIAL);
        assert_eq!(receipt.topic.next_review().to_string(), "2024-01-02");
        assert_eq!(receipt.schedule.offset_days, 1);
    }

    #[tokio::test]
    async fn missing_topic_is_reported() {
        let repo = InMemoryRepository::new();
        let err = service(&repo)
            .review_topic_by_id(TopicId::new(42), Difficulty::Easy)
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewServiceError::TopicNotFound(id) if id == TopicId::new(42)));
    }

    #[tokio::test]
    async fn rollback_restores_previous_schedule() {
        let repo = InMemoryRepository::new();
        let topic = stored_topic(&repo).await;
        let receipt = service(&repo)
            .review_topic(topic.clone(), Difficulty::Easy)
            .await
            .unwrap();
        assert_eq!(receipt.rollback(), topic);
    }

    #[tokio::test]
    async fn finishing_a_session_persists_the_review() {
        let repo = InMemoryRepository::new();
        let mut topic = stored_topic(&repo).await;
        topic.add_flashcard("Suite géométrique ?", "u(n+1) = q u(n)").unwrap();
        let service = service(&repo);

        let mut session = StudySession::start(topic.clone());
        session.show_cards().unwrap();
        session.flip();
        let receipt = service.finish_session(session, Difficulty::Easy).await.unwrap();

        assert!(receipt.is_saved());
        let stored = repo.get_topic(topic.id()).await.unwrap().unwrap();
        assert_eq!(stored.stage(), Stage::new(1));
        assert_eq!(stored.flashcards().len(), 1);
    }
}
