use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::date::StudyDate;
use crate::model::{Flashcard, Topic};
use crate::scheduler::{Difficulty, Schedule, Scheduler, SchedulerError};

/// Length of one study session countdown.
pub const SESSION_LENGTH_SECS: u32 = 20 * 60;

/// Remaining time under which the countdown is shown as running out.
pub const LOW_TIME_SECS: u32 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("topic has no flashcards")]
    NoFlashcards,

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionView {
    /// Course and exercise links.
    #[default]
    Docs,
    Cards,
}

/// Pausable countdown. Starts paused at the full session length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining_secs: u32,
    running_since: Option<DateTime<Utc>>,
}

impl Countdown {
    #[must_use]
    pub fn new(total_secs: u32) -> Self {
        Self {
            remaining_secs: total_secs,
            running_since: None,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    #[must_use]
    pub fn time_left(&self, now: DateTime<Utc>) -> u32 {
        match self.running_since {
            None => self.remaining_secs,
            Some(since) => {
                let elapsed = u32::try_from((now - since).num_seconds().max(0)).unwrap_or(u32::MAX);
                self.remaining_secs.saturating_sub(elapsed)
            }
        }
    }

    /// Start if paused, pause if running. A finished countdown stays at zero.
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        match self.running_since {
            Some(_) => {
                self.remaining_secs = self.time_left(now);
                self.running_since = None;
            }
            None if self.remaining_secs > 0 => self.running_since = Some(now),
            None => {}
        }
    }

    #[must_use]
    pub fn is_finished(&self, now: DateTime<Utc>) -> bool {
        self.time_left(now) == 0
    }
}

/// `m:ss` rendering of a countdown, e.g. `19:05`.
#[must_use]
pub fn format_countdown(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// A review session over a single topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySession {
    topic: Topic,
    countdown: Countdown,
    view: SessionView,
    card_index: usize,
    flipped: bool,
}

/// Topic after the session closed, with the schedule that was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedSession {
    pub topic: Topic,
    pub difficulty: Difficulty,
    pub schedule: Schedule,
}

impl StudySession {
    #[must_use]
    pub fn start(topic: Topic) -> Self {
        Self {
            topic,
            countdown: Countdown::new(SESSION_LENGTH_SECS),
            view: SessionView::Docs,
            card_index: 0,
            flipped: false,
        }
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        self.view
    }

    #[must_use]
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn toggle_timer(&mut self, now: DateTime<Utc>) {
        self.countdown.toggle(now);
    }

    #[must_use]
    pub fn time_left(&self, now: DateTime<Utc>) -> u32 {
        self.countdown.time_left(now)
    }

    pub fn show_docs(&mut self) {
        self.view = SessionView::Docs;
    }

    /// Switch to the flashcard view.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoFlashcards` when the topic has no cards; the
    /// view stays on the docs.
    pub fn show_cards(&mut self) -> Result<(), SessionError> {
        if self.topic.flashcards().is_empty() {
            return Err(SessionError::NoFlashcards);
        }
        self.view = SessionView::Cards;
        Ok(())
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&Flashcard> {
        self.topic.flashcards().get(self.card_index)
    }

    /// One-based position and total, for a `Carte n / m` label.
    #[must_use]
    pub fn card_position(&self) -> Option<(usize, usize)> {
        self.current_card()
            .map(|_| (self.card_index + 1, self.topic.flashcards().len()))
    }

    #[must_use]
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// Text currently shown on the card: question, or answer once flipped.
    #[must_use]
    pub fn card_face(&self) -> Option<&str> {
        self.current_card().map(|card| {
            if self.flipped {
                card.answer()
            } else {
                card.question()
            }
        })
    }

    pub fn flip(&mut self) {
        if self.current_card().is_some() {
            self.flipped = !self.flipped;
        }
    }

    /// Move to the next card, wrapping after the last one. The new card shows
    /// its question.
    pub fn next_card(&mut self) {
        let count = self.topic.flashcards().len();
        if count == 0 {
            return;
        }
        self.flipped = false;
        self.card_index = (self.card_index + 1) % count;
    }

    /// Close the session with the reported difficulty and apply the schedule.
    ///
    /// # Errors
    ///
    /// Propagates `SchedulerError` if the next review day cannot be computed.
    pub fn finish(
        self,
        difficulty: Difficulty,
        today: StudyDate,
        scheduler: &Scheduler,
    ) -> Result<FinishedSession, SessionError> {
        let mut topic = self.topic;
        let schedule = topic.plan_review(scheduler, difficulty, today)?;
        topic.apply_schedule(&schedule);
        Ok(FinishedSession {
            topic,
            difficulty,
            schedule,
        })
    }
}
