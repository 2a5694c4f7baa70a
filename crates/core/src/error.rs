use thiserror::Error;

use crate::date::DateError;
use crate::model::{ExamError, FlashcardError, ParseIdError, ProfileError, SubjectError, TopicError};
use crate::scheduler::SchedulerError;
use crate::session::SessionError;

/// Any error raised by the core crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Date(#[from] DateError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Flashcard(#[from] FlashcardError),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
