use std::sync::Arc;

use study_core::scheduler::Scheduler;
use storage::repository::{AuthSession, Storage};

use crate::Clock;
use crate::error::AppServicesError;
use crate::exam_service::ExamService;
use crate::review_service::ReviewService;
use crate::streak_service::StreakService;
use crate::subject_service::SubjectService;
use crate::topic_service::TopicService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    topics: Arc<TopicService>,
    reviews: Arc<ReviewService>,
    streaks: Arc<StreakService>,
    exams: Arc<ExamService>,
    subjects: Arc<SubjectService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        scheduler: Scheduler,
        auth: Arc<dyn AuthSession>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, scheduler, auth))
    }

    /// Build services over an existing storage aggregate.
    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        scheduler: Scheduler,
        auth: Arc<dyn AuthSession>,
    ) -> Self {
        let topics = Arc::new(TopicService::new(
            clock,
            Arc::clone(&storage.topics),
            Arc::clone(&storage.exams),
        ));
        let reviews = Arc::new(
            ReviewService::new(clock, Arc::clone(&storage.topics)).with_scheduler(scheduler),
        );
        let streaks = Arc::new(StreakService::new(
            clock,
            auth,
            Arc::clone(&storage.profiles),
        ));
        let exams = Arc::new(ExamService::new(
            clock,
            Arc::clone(&storage.exams),
            Arc::clone(&storage.topics),
        ));
        let subjects = Arc::new(SubjectService::new(Arc::clone(&storage.subjects)));

        Self {
            topics,
            reviews,
            streaks,
            exams,
            subjects,
        }
    }

    #[must_use]
    pub fn topics(&self) -> Arc<TopicService> {
        Arc::clone(&self.topics)
    }

    #[must_use]
    pub fn reviews(&self) -> Arc<ReviewService> {
        Arc::clone(&self.reviews)
    }

    #[must_use]
    pub fn streaks(&self) -> Arc<StreakService> {
        Arc::clone(&self.streaks)
    }

    #[must_use]
    pub fn exams(&self) -> Arc<ExamService> {
        Arc::clone(&self.exams)
    }

    #[must_use]
    pub fn subjects(&self) -> Arc<SubjectService> {
        Arc::clone(&self.subjects)
    }
}
