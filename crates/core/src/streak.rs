//! Daily visit streak.
//!
//! One `(streak, last_visit)` pair per user, advanced at most once per calendar
//! day. The tracker only decides the next state; persisting it is up to the
//! caller, and only when [`StreakUpdate::needs_write`] says so.

use crate::date::StudyDate;

/// Streak value assigned on a first visit or after a missed day.
pub const STREAK_START: u32 = 1;

/// Persisted streak state, reduced to calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakState {
    pub streak: u32,
    pub last_visit: StudyDate,
}

/// How a visit changed the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakTransition {
    /// No previous state; the streak starts at 1.
    Started,
    /// Already counted today.
    Unchanged,
    /// Visited on the following day.
    Extended,
    /// A day or more was skipped.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub streak: u32,
    pub last_visit: StudyDate,
    pub transition: StreakTransition,
}

impl StreakUpdate {
    /// False when the visit falls on an already-counted day.
    #[must_use]
    pub fn needs_write(&self) -> bool {
        self.transition != StreakTransition::Unchanged
    }
}

/// Advance the streak for a visit on `today`.
///
/// The day difference is taken as an absolute value, so a stored visit that is
/// one day ahead of `today` also extends the streak.
///
/// # Examples
///
/// ```
/// # use study_core::streak::{advance_streak, StreakState, StreakTransition};
/// let state = StreakState { streak: 5, last_visit: "2024-01-01".parse()? };
///
/// let next = advance_streak(Some(&state), "2024-01-02".parse()?);
/// assert_eq!(next.streak, 6);
/// assert_eq!(next.transition, StreakTransition::Extended);
///
/// let gap = advance_streak(Some(&state), "2024-01-05".parse()?);
/// assert_eq!(gap.streak, 1);
/// # Ok::<(), study_core::date::DateError>(())
/// ```
#[must_use]
pub fn advance_streak(previous: Option<&StreakState>, today: StudyDate) -> StreakUpdate {
    let Some(state) = previous else {
        return StreakUpdate {
            streak: STREAK_START,
            last_visit: today,
            transition: StreakTransition::Started,
        };
    };

    match state.last_visit.days_until(today).abs() {
        0 => StreakUpdate {
            streak: state.streak,
            last_visit: state.last_visit,
            transition: StreakTransition::Unchanged,
        },
        1 => StreakUpdate {
            streak: state.streak.saturating_add(1),
            last_visit: today,
            transition: StreakTransition::Extended,
        },
        _ => StreakUpdate {
            streak: STREAK_START,
            last_visit: today,
            transition: StreakTransition::Reset,
        },
    }
}
