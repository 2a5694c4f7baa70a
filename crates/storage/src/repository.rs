use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use study_core::model::{
    Exam, ExamId, NewExam, NewTopic, Profile, Subject, SubjectId, SubjectName, Topic, TopicId,
    UserId,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Which topics `list_topics` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicFilter {
    /// `Some(true)` for the revision list, `Some(false)` for shelved library
    /// topics, `None` for everything.
    pub active: Option<bool>,
}

impl TopicFilter {
    #[must_use]
    pub fn all() -> Self {
        Self { active: None }
    }

    #[must_use]
    pub fn active() -> Self {
        Self { active: Some(true) }
    }

    #[must_use]
    pub fn matches(&self, topic: &Topic) -> bool {
        self.active.is_none_or(|active| topic.is_active() == active)
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Source of the signed-in user.
#[async_trait]
pub trait AuthSession: Send + Sync {
    /// `None` when nobody is signed in.
    async fn current_user(&self) -> Option<UserId>;
}

#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// List topics matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if topics cannot be read or decoded.
    async fn list_topics(&self, filter: TopicFilter) -> Result<Vec<Topic>, StorageError>;

    /// Fetch a topic by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError>;

    /// Insert a validated topic and return it with its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the topic cannot be stored.
    async fn insert_new_topic(&self, topic: NewTopic) -> Result<Topic, StorageError>;

    /// Persist or update a topic, flashcards included.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the topic cannot be stored.
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError>;

    /// Delete a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic does not exist.
    async fn delete_topic(&self, id: TopicId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// List every exam, by date then ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if exams cannot be read or decoded.
    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn insert_new_exam(&self, exam: NewExam) -> Result<Exam, StorageError>;

    /// Persist or update an exam and its topic list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the exam does not exist.
    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError>;

    /// Remove a topic from every exam that lists it. Returns how many exams changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exams cannot be updated.
    async fn detach_topic(&self, topic: TopicId) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// User-defined subjects, by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if subjects cannot be read or decoded.
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a subject with that name exists.
    async fn insert_subject(&self, name: &SubjectName) -> Result<Subject, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no user subject has that name.
    async fn delete_subject(&self, name: &SubjectName) -> Result<(), StorageError>;
}

//
// ─── AUTH ──────────────────────────────────────────────────────────────────────
//

/// Auth session fixed at construction, e.g. from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSession {
    user: Option<UserId>,
}

impl StaticSession {
    #[must_use]
    pub fn signed_in(user: UserId) -> Self {
        Self { user: Some(user) }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl AuthSession for StaticSession {
    async fn current_user(&self) -> Option<UserId> {
        self.user
    }
}

//
// ─── IN MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    topics: Arc<Mutex<HashMap<TopicId, Topic>>>,
    exams: Arc<Mutex<HashMap<ExamId, Exam>>>,
    profiles: Arc<Mutex<HashMap<UserId, Profile>>>,
    subjects: Arc<Mutex<HashMap<SubjectId, Subject>>>,
    topic_seq: Arc<AtomicU64>,
    exam_seq: Arc<AtomicU64>,
    subject_seq: Arc<AtomicU64>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

/// Next id from a never-decreasing sequence, so ids of deleted rows are not
/// handed out again. Upserted ids raise the sequence too. Call with the map locked.
fn next_id<K: Copy>(
    seq: &AtomicU64,
    keys: impl Iterator<Item = K>,
    value: impl Fn(K) -> u64,
) -> u64 {
    let highest = keys.map(value).max().unwrap_or(0);
    let next = seq.load(Ordering::SeqCst).max(highest).saturating_add(1);
    seq.store(next, Ordering::SeqCst);
    next
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TopicRepository for InMemoryRepository {
    async fn list_topics(&self, filter: TopicFilter) -> Result<Vec<Topic>, StorageError> {
        let guard = lock(&self.topics)?;
        let mut topics: Vec<Topic> = guard.values().filter(|t| filter.matches(t)).cloned().collect();
        topics.sort_by_key(|t| std::cmp::Reverse(t.id()));
        Ok(topics)
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError> {
        let guard = lock(&self.topics)?;
        Ok(guard.get(&id).cloned())
    }

    async fn insert_new_topic(&self, topic: NewTopic) -> Result<Topic, StorageError> {
        let mut guard = lock(&self.topics)?;
        let id = TopicId::new(next_id(&self.topic_seq, guard.keys().copied(), |id| id.value()));
        let topic = topic.assign_id(id);
        guard.insert(id, topic.clone());
        Ok(topic)
    }

    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        let mut guard = lock(&self.topics)?;
        guard.insert(topic.id(), topic.clone());
        Ok(())
    }

    async fn delete_topic(&self, id: TopicId) -> Result<(), StorageError> {
        let mut guard = lock(&self.topics)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError> {
        let guard = lock(&self.profiles)?;
        Ok(guard.get(&user).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let mut guard = lock(&self.profiles)?;
        guard.insert(profile.user_id(), profile.clone());
        Ok(())
    }
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError> {
        let guard = lock(&self.exams)?;
        let mut exams: Vec<Exam> = guard.values().cloned().collect();
        exams.sort_by_key(|e| (e.date(), e.id()));
        Ok(exams)
    }

    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError> {
        let guard = lock(&self.exams)?;
        Ok(guard.get(&id).cloned())
    }

    async fn insert_new_exam(&self, exam: NewExam) -> Result<Exam, StorageError> {
        let mut guard = lock(&self.exams)?;
        let id = ExamId::new(next_id(&self.exam_seq, guard.keys().copied(), |id| id.value()));
        let exam = exam.assign_id(id);
        guard.insert(id, exam.clone());
        Ok(exam)
    }

    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let mut guard = lock(&self.exams)?;
        guard.insert(exam.id(), exam.clone());
        Ok(())
    }

    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError> {
        let mut guard = lock(&self.exams)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }

    async fn detach_topic(&self, topic: TopicId) -> Result<u64, StorageError> {
        let mut guard = lock(&self.exams)?;
        let changed = guard
            .values_mut()
            .map(|exam| exam.detach_topic(topic))
            .filter(|changed| *changed)
            .count();
        Ok(changed as u64)
    }
}

#[async_trait]
impl SubjectRepository for InMemoryRepository {
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        let guard = lock(&self.subjects)?;
        let mut subjects: Vec<Subject> = guard.values().cloned().collect();
        subjects.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(subjects)
    }

    async fn insert_subject(&self, name: &SubjectName) -> Result<Subject, StorageError> {
        let mut guard = lock(&self.subjects)?;
        if guard.values().any(|s| s.name() == name) {
            return Err(StorageError::Conflict);
        }
        let id = SubjectId::new(next_id(&self.subject_seq, guard.keys().copied(), |id| id.value()));
        let subject = Subject::new(id, name.clone());
        guard.insert(id, subject.clone());
        Ok(subject)
    }

    async fn delete_subject(&self, name: &SubjectName) -> Result<(), StorageError> {
        let mut guard = lock(&self.subjects)?;
        let id = guard
            .values()
            .find(|s| s.name() == name)
            .map(Subject::id)
            .ok_or(StorageError::NotFound)?;
        guard.remove(&id);
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub topics: Arc<dyn TopicRepository>,
    pub exams: Arc<dyn ExamRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub subjects: Arc<dyn SubjectRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let topics: Arc<dyn TopicRepository> = Arc::new(repo.clone());
        let exams: Arc<dyn ExamRepository> = Arc::new(repo.clone());
        let profiles: Arc<dyn ProfileRepository> = Arc::new(repo.clone());
        let subjects: Arc<dyn SubjectRepository> = Arc::new(repo);
        Self {
            topics,
            exams,
            profiles,
            subjects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{ExamDraft, TopicDraft};
    use study_core::scheduler::{Schedule, Stage};
    use study_core::time::fixed_now;
    use study_core::StudyDate;

    fn today() -> StudyDate {
        "2024-01-01".parse().unwrap()
    }

    #[tokio::test]
    async fn round_trips_topic_with_schedule_and_cards() {
        let repo = InMemoryRepository::new();
        let mut topic = repo
            .insert_new_topic(TopicDraft::active("Optique").validate(today()).unwrap())
            .await
            .unwrap();
        assert_eq!(topic.id(), TopicId::new(1));

        topic.add_flashcard("Loi de Snell ?", "n1 sin i = n2 sin r").unwrap();
        topic.apply_schedule(&Schedule {
            stage: Stage::new(2),
            next_review: "2024-01-15".parse().unwrap(),
            offset_days: 14,
        });
        repo.upsert_topic(&topic).await.unwrap();

        let fetched = repo.get_topic(topic.id()).await.unwrap().unwrap();
        assert_eq!(fetched, topic);
    }

    #[tokio::test]
    async fn list_filters_by_active_flag_newest_first() {
        let repo = InMemoryRepository::new();
        for (title, active) in [("A", true), ("B", false), ("C", true)] {
            let draft = if active {
                TopicDraft::active(title)
            } else {
                TopicDraft::library(title)
            };
            repo.insert_new_topic(draft.validate(today()).unwrap())
                .await
                .unwrap();
        }

        let active = repo.list_topics(TopicFilter::active()).await.unwrap();
        assert!(active.iter().all(Topic::is_active));
        assert_eq!(active.len(), 2);

        let all = repo.list_topics(TopicFilter::all()).await.unwrap();
        let titles: Vec<&str> = all.iter().map(Topic::title).collect();
        assert_eq!(titles, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn deleting_missing_topic_is_not_found() {
        let repo = InMemoryRepository::new();
        assert_eq!(
            repo.delete_topic(TopicId::new(9)).await,
            Err(StorageError::NotFound)
        );
    }

    #[tokio::test]
    async fn deleted_ids_are_not_handed_out_again() {
        let repo = InMemoryRepository::new();
        for title in ["A", "B"] {
            repo.insert_new_topic(TopicDraft::active(title).validate(today()).unwrap())
                .await
                .unwrap();
        }
        repo.delete_topic(TopicId::new(2)).await.unwrap();

        let fresh = repo
            .insert_new_topic(TopicDraft::active("C").validate(today()).unwrap())
            .await
            .unwrap();
        assert_eq!(fresh.id(), TopicId::new(3));

        let date = "2024-02-01".parse().unwrap();
        let exam = repo
            .insert_new_exam(ExamDraft::new("Partiel", date, vec![]).validate().unwrap())
            .await
            .unwrap();
        repo.delete_exam(exam.id()).await.unwrap();
        let next = repo
            .insert_new_exam(ExamDraft::new("Oral", date, vec![]).validate().unwrap())
            .await
            .unwrap();
        assert_eq!(next.id(), ExamId::new(2));
    }

    #[tokio::test]
    async fn detach_topic_touches_only_exams_listing_it() {
        let repo = InMemoryRepository::new();
        let date = "2024-02-01".parse().unwrap();
        let a = ExamDraft::new("Partiel", date, vec![TopicId::new(1), TopicId::new(2)]);
        let b = ExamDraft::new("Oral", date, vec![TopicId::new(3)]);
        let a = repo.insert_new_exam(a.validate().unwrap()).await.unwrap();
        repo.insert_new_exam(b.validate().unwrap()).await.unwrap();

        assert_eq!(repo.detach_topic(TopicId::new(1)).await.unwrap(), 1);
        let a = repo.get_exam(a.id()).await.unwrap().unwrap();
        assert_eq!(a.topic_ids(), &[TopicId::new(2)]);
    }

    #[tokio::test]
    async fn subject_names_are_unique() {
        let repo = InMemoryRepository::new();
        let name = SubjectName::new("MHO").unwrap();
        repo.insert_subject(&name).await.unwrap();
        assert_eq!(repo.insert_subject(&name).await, Err(StorageError::Conflict));

        repo.delete_subject(&name).await.unwrap();
        assert!(repo.list_subjects().await.unwrap().is_empty());
        assert_eq!(repo.delete_subject(&name).await, Err(StorageError::NotFound));
    }

    #[tokio::test]
    async fn profile_upsert_replaces() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        assert!(repo.get_profile(user).await.unwrap().is_none());

        let profile = Profile::first_visit(user, fixed_now());
        repo.upsert_profile(&profile).await.unwrap();
        let stored = Profile::from_persisted(user, 4, fixed_now()).unwrap();
        repo.upsert_profile(&stored).await.unwrap();
        assert_eq!(repo.get_profile(user).await.unwrap().unwrap().streak(), 4);
    }

    #[tokio::test]
    async fn static_session_reports_configured_user() {
        let user = UserId::random();
        assert_eq!(StaticSession::signed_in(user).current_user().await, Some(user));
        assert_eq!(StaticSession::anonymous().current_user().await, None);
    }
}
