use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::date::{DateError, StudyDate};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error("stage must be a non-negative integer, got {provided}")]
    InvalidStage { provided: i64 },

    #[error("unknown difficulty {0:?}, expected \"easy\" or \"hard\"")]
    UnknownDifficulty(String),

    #[error("interval table must list at least one offset and every offset must be > 0")]
    InvalidIntervals,

    #[error(transparent)]
    Date(#[from] DateError),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Outcome reported at the end of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Reviewed comfortably; the topic moves up one stage.
    Easy,
    /// Struggled; the topic goes back to stage 0 and returns tomorrow.
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(SchedulerError::UnknownDifficulty(s.to_owned())),
        }
    }
}

//
// ─── STAGE ─────────────────────────────────────────────────────────────────────
//

/// Repetition stage of a topic. Starts at 0 and only grows on easy reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stage(u32);

impl Stage {
    pub const INITIAL: Stage = Stage(0);

    #[must_use]
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    /// Next stage after an easy review. Saturates rather than wrapping.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl TryFrom<i64> for Stage {
    type Error = SchedulerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Stage)
            .map_err(|_| SchedulerError::InvalidStage { provided: value })
    }
}

impl From<Stage> for i64 {
    fn from(stage: Stage) -> Self {
        i64::from(stage.0)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── INTERVAL TABLE ────────────────────────────────────────────────────────────
//

/// Days added after a hard review.
pub const HARD_OFFSET_DAYS: u32 = 1;

/// Offsets used after easy reviews: 2, 7, 14 then 30 days.
pub const CANONICAL_INTERVALS: [u32; 4] = [2, 7, 14, 30];

/// Easy-review offsets indexed by stage, clamped to the last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTable(Vec<u32>);

impl IntervalTable {
    #[must_use]
    pub fn canonical() -> Self {
        Self(CANONICAL_INTERVALS.to_vec())
    }

    /// Build a custom table.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidIntervals` if the table is empty or holds a zero.
    pub fn new(offsets: Vec<u32>) -> Result<Self, SchedulerError> {
        if offsets.is_empty() || offsets.contains(&0) {
            return Err(SchedulerError::InvalidIntervals);
        }
        Ok(Self(offsets))
    }

    #[must_use]
    pub fn offsets(&self) -> &[u32] {
        &self.0
    }

    /// Offset for an easy review at `stage`; stages past the end reuse the last tier.
    #[must_use]
    pub fn offset_for(&self, stage: Stage) -> u32 {
        let last = self.0.len() - 1;
        let index = usize::try_from(stage.value()).map_or(last, |i| i.min(last));
        self.0[index]
    }
}

impl Default for IntervalTable {
    fn default() -> Self {
        Self::canonical()
    }
}

impl FromStr for IntervalTable {
    type Err = SchedulerError;

    /// Parses a comma-separated list such as `2,7,14,30`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let offsets = s
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| SchedulerError::InvalidIntervals)?;
        Self::new(offsets)
    }
}

impl fmt::Display for IntervalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

//
// ─── SCHEDULE ──────────────────────────────────────────────────────────────────
//

/// Result of scheduling a review: the new stage and the next due day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub stage: Stage,
    pub next_review: StudyDate,
    pub offset_days: u32,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Fixed-table review scheduler.
///
/// A hard review resets the topic to stage 0 and brings it back tomorrow.
/// An easy review advances one stage and pushes the topic out by the table
/// offset for its *current* stage.
///
/// # Examples
///
/// ```
/// # use study_core::scheduler::{Difficulty, Scheduler, Stage};
/// # use study_core::date::StudyDate;
/// let today: StudyDate = "2024-01-01".parse()?;
/// let scheduler = Scheduler::new();
///
/// let easy = scheduler.schedule(Stage::new(1), Difficulty::Easy, today)?;
/// assert_eq!(easy.stage, Stage::new(2));
/// assert_eq!(easy.next_review.to_string(), "2024-01-08");
///
/// let hard = scheduler.schedule(Stage::new(5), Difficulty::Hard, today)?;
/// assert_eq!(hard.stage, Stage::INITIAL);
/// assert_eq!(hard.next_review.to_string(), "2024-01-02");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scheduler {
    table: IntervalTable,
}

impl Scheduler {
    /// Scheduler over the canonical 2/7/14/30 table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_table(IntervalTable::canonical())
    }

    #[must_use]
    pub fn with_table(table: IntervalTable) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn table(&self) -> &IntervalTable {
        &self.table
    }

    /// Compute the next stage and review day.
    ///
    /// Pure: calling it again with the same pre-review stage yields the same result.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Date` if the next review day overflows the calendar.
    pub fn schedule(
        &self,
        stage: Stage,
        difficulty: Difficulty,
        today: StudyDate,
    ) -> Result<Schedule, SchedulerError> {
        let (stage, offset_days) = match difficulty {
            Difficulty::Hard => (Stage::INITIAL, HARD_OFFSET_DAYS),
            Difficulty::Easy => (stage.next(), self.table.offset_for(stage)),
        };

        Ok(Schedule {
            stage,
            next_review: today.add_days(offset_days)?,
            offset_days,
        })
    }
}

/// Schedule with the canonical table.
///
/// # Errors
///
/// Returns `SchedulerError::Date` if the next review day overflows the calendar.
pub fn schedule(
    stage: Stage,
    difficulty: Difficulty,
    today: StudyDate,
) -> Result<Schedule, SchedulerError> {
    Scheduler::new().schedule(stage, difficulty, today)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
