use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::date::{DateError, StudyDate};
use crate::model::flashcard::{Flashcard, FlashcardError};
use crate::model::ids::{FlashcardId, TopicId};
use crate::scheduler::{Difficulty, Schedule, Scheduler, SchedulerError, Stage};
use crate::urgency;

/// Subject shown for topics that never got one.
pub const FALLBACK_SUBJECT: &str = "Autre";

/// Topics added from the revision screen come back tomorrow.
pub const ACTIVE_TOPIC_OFFSET_DAYS: u32 = 1;

/// Topics added to the library are due immediately.
pub const LIBRARY_TOPIC_OFFSET_DAYS: u32 = 0;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic title cannot be empty")]
    EmptyTitle,

    #[error("invalid {field} link: {raw}")]
    InvalidLink { field: &'static str, raw: String },

    #[error(transparent)]
    Flashcard(#[from] FlashcardError),

    #[error(transparent)]
    Date(#[from] DateError),
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated input for a new topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDraft {
    pub title: String,
    pub subject: Option<String>,
    pub course_link: Option<String>,
    pub exercise_link: Option<String>,
    pub is_active: bool,
}

impl TopicDraft {
    /// Draft for the revision screen: active, first review tomorrow.
    #[must_use]
    pub fn active(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subject: None,
            course_link: None,
            exercise_link: None,
            is_active: true,
        }
    }

    /// Draft for the library: inactive, due today.
    #[must_use]
    pub fn library(title: impl Into<String>) -> Self {
        Self {
            is_active: false,
            ..Self::active(title)
        }
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn with_course_link(mut self, link: impl Into<String>) -> Self {
        self.course_link = Some(link.into());
        self
    }

    #[must_use]
    pub fn with_exercise_link(mut self, link: impl Into<String>) -> Self {
        self.exercise_link = Some(link.into());
        self
    }

    /// Validate the draft and compute its first review day.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyTitle` for a blank title and
    /// `TopicError::InvalidLink` for a link that is not a URL.
    pub fn validate(self, today: StudyDate) -> Result<NewTopic, TopicError> {
        let title = normalize_title(&self.title)?;
        let course_link = parse_link("course", self.course_link)?;
        let exercise_link = parse_link("exercise", self.exercise_link)?;
        let offset = if self.is_active {
            ACTIVE_TOPIC_OFFSET_DAYS
        } else {
            LIBRARY_TOPIC_OFFSET_DAYS
        };

        Ok(NewTopic {
            title,
            subject: normalize_optional(self.subject),
            course_link,
            exercise_link,
            is_active: self.is_active,
            next_review: today.add_days(offset)?,
        })
    }
}

/// Validated topic waiting for a storage-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopic {
    pub title: String,
    pub subject: Option<String>,
    pub course_link: Option<Url>,
    pub exercise_link: Option<Url>,
    pub is_active: bool,
    pub next_review: StudyDate,
}

impl NewTopic {
    #[must_use]
    pub fn assign_id(self, id: TopicId) -> Topic {
        Topic {
            id,
            title: self.title,
            subject: self.subject,
            stage: Stage::INITIAL,
            next_review: self.next_review,
            course_link: self.course_link,
            exercise_link: self.exercise_link,
            is_active: self.is_active,
            flashcards: Vec::new(),
        }
    }
}

//
// ─── EDITS ─────────────────────────────────────────────────────────────────────
//

/// Partial update of a topic's editable fields. `None` leaves a field untouched;
/// `Some(None)` clears an optional one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicEdit {
    pub title: Option<String>,
    pub subject: Option<Option<String>>,
    pub course_link: Option<Option<String>>,
    pub exercise_link: Option<Option<String>>,
    pub is_active: Option<bool>,
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// A course tracked for spaced review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TopicRecord")]
pub struct Topic {
    id: TopicId,
    title: String,
    subject: Option<String>,
    stage: Stage,
    next_review: StudyDate,
    course_link: Option<Url>,
    exercise_link: Option<Url>,
    is_active: bool,
    flashcards: Vec<Flashcard>,
}

/// Serialized shape of a topic; deserialization goes through `from_persisted`.
#[derive(Deserialize)]
struct TopicRecord {
    id: TopicId,
    title: String,
    subject: Option<String>,
    stage: Stage,
    next_review: StudyDate,
    course_link: Option<Url>,
    exercise_link: Option<Url>,
    is_active: bool,
    #[serde(default)]
    flashcards: Vec<Flashcard>,
}

impl TryFrom<TopicRecord> for Topic {
    type Error = TopicError;

    fn try_from(record: TopicRecord) -> Result<Self, Self::Error> {
        Topic::from_persisted(
            record.id,
            record.title,
            record.subject,
            record.stage,
            record.next_review,
            record.course_link,
            record.exercise_link,
            record.is_active,
            record.flashcards,
        )
    }
}

impl Topic {
    /// Rehydrate a topic from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyTitle` if the stored title is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: TopicId,
        title: String,
        subject: Option<String>,
        stage: Stage,
        next_review: StudyDate,
        course_link: Option<Url>,
        exercise_link: Option<Url>,
        is_active: bool,
        flashcards: Vec<Flashcard>,
    ) -> Result<Self, TopicError> {
        if title.trim().is_empty() {
            return Err(TopicError::EmptyTitle);
        }
        Ok(Self {
            id,
            title,
            subject,
            stage,
            next_review,
            course_link,
            exercise_link,
            is_active,
            flashcards,
        })
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Subject used for display and filtering.
    #[must_use]
    pub fn display_subject(&self) -> &str {
        self.subject().unwrap_or(FALLBACK_SUBJECT)
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn next_review(&self) -> StudyDate {
        self.next_review
    }

    #[must_use]
    pub fn course_link(&self) -> Option<&Url> {
        self.course_link.as_ref()
    }

    #[must_use]
    pub fn exercise_link(&self) -> Option<&Url> {
        self.exercise_link.as_ref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn flashcards(&self) -> &[Flashcard] {
        &self.flashcards
    }

    #[must_use]
    pub fn is_due(&self, today: StudyDate) -> bool {
        urgency::is_due(self.next_review, today)
    }

    /// Compute the schedule for a review without touching the topic.
    ///
    /// # Errors
    ///
    /// Propagates `SchedulerError` from the scheduler.
    pub fn plan_review(
        &self,
        scheduler: &Scheduler,
        difficulty: Difficulty,
        today: StudyDate,
    ) -> Result<Schedule, SchedulerError> {
        scheduler.schedule(self.stage, difficulty, today)
    }

    pub fn apply_schedule(&mut self, schedule: &Schedule) {
        self.stage = schedule.stage;
        self.next_review = schedule.next_review;
    }

    /// Restore the scheduling fields captured before a review.
    pub fn restore_schedule(&mut self, stage: Stage, next_review: StudyDate) {
        self.stage = stage;
        self.next_review = next_review;
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Apply a partial edit. Nothing changes if any field fails validation.
    ///
    /// # Errors
    ///
    /// Returns `TopicError` for a blank title or an unparsable link.
    pub fn apply_edit(&mut self, edit: TopicEdit) -> Result<(), TopicError> {
        let title = edit.title.as_deref().map(normalize_title).transpose()?;
        let course_link = edit
            .course_link
            .map(|raw| parse_link("course", raw))
            .transpose()?;
        let exercise_link = edit
            .exercise_link
            .map(|raw| parse_link("exercise", raw))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(subject) = edit.subject {
            self.subject = normalize_optional(subject);
        }
        if let Some(link) = course_link {
            self.course_link = link;
        }
        if let Some(link) = exercise_link {
            self.exercise_link = link;
        }
        if let Some(active) = edit.is_active {
            self.is_active = active;
        }
        Ok(())
    }

    /// Append a flashcard and return its id (one past the highest existing id).
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError` if either side is blank.
    pub fn add_flashcard(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<FlashcardId, FlashcardError> {
        let next = self
            .flashcards
            .iter()
            .map(|c| c.id().value())
            .max()
            .map_or(1, |max| max.saturating_add(1));
        let card = Flashcard::new(FlashcardId::new(next), question, answer)?;
        let id = card.id();
        self.flashcards.push(card);
        Ok(id)
    }

    /// Remove a flashcard, keeping the order of the others.
    pub fn remove_flashcard(&mut self, id: FlashcardId) -> Option<Flashcard> {
        let index = self.flashcards.iter().position(|c| c.id() == id)?;
        Some(self.flashcards.remove(index))
    }
}

//
// ─── HELPERS ───────────────────────────────────────────────────────────────────
//

fn normalize_title(raw: &str) -> Result<String, TopicError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TopicError::EmptyTitle);
    }
    Ok(trimmed.to_owned())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn parse_link(field: &'static str, raw: Option<String>) -> Result<Option<Url>, TopicError> {
    let Some(raw) = normalize_optional(raw) else {
        return Ok(None);
    };
    Url::parse(&raw)
        .map(Some)
        .map_err(|_| TopicError::InvalidLink { field, raw })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
