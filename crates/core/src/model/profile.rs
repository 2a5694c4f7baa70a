use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::date::StudyDate;
use crate::model::ids::UserId;
use crate::streak::{STREAK_START, StreakState, StreakUpdate};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("streak must be at least 1, got {provided}")]
    InvalidStreak { provided: i64 },
}

/// Per-user streak record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    user_id: UserId,
    streak: u32,
    last_visit: DateTime<Utc>,
}

impl Profile {
    /// Profile created on the very first visit.
    #[must_use]
    pub fn first_visit(user_id: UserId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            streak: STREAK_START,
            last_visit: at,
        }
    }

    /// Rehydrate a profile from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidStreak` if the stored streak is below 1.
    pub fn from_persisted(
        user_id: UserId,
        streak: i64,
        last_visit: DateTime<Utc>,
    ) -> Result<Self, ProfileError> {
        let streak = u32::try_from(streak)
            .ok()
            .filter(|s| *s >= STREAK_START)
            .ok_or(ProfileError::InvalidStreak { provided: streak })?;
        Ok(Self {
            user_id,
            streak,
            last_visit,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn last_visit(&self) -> DateTime<Utc> {
        self.last_visit
    }

    /// State seen by the streak tracker: last visit reduced to its calendar day.
    #[must_use]
    pub fn streak_state(&self) -> StreakState {
        StreakState {
            streak: self.streak,
            last_visit: StudyDate::from_datetime(self.last_visit),
        }
    }

    /// Record a counted visit. Unchanged updates leave the profile alone.
    pub fn record_visit(&mut self, update: &StreakUpdate, at: DateTime<Utc>) {
        if update.needs_write() {
            self.streak = update.streak;
            self.last_visit = at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streak::advance_streak;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn persisted_streak_must_be_positive() {
        let user = UserId::random();
        assert!(Profile::from_persisted(user, 0, fixed_now()).is_err());
        assert!(Profile::from_persisted(user, -3, fixed_now()).is_err());
        assert_eq!(Profile::from_persisted(user, 4, fixed_now()).unwrap().streak(), 4);
    }

    #[test]
    fn streak_state_truncates_time_of_day() {
        let profile = Profile::first_visit(UserId::random(), fixed_now());
        assert_eq!(profile.streak_state().last_visit.to_string(), "2024-01-01");
    }

    #[test]
    fn late_evening_then_early_morning_is_consecutive() {
        let evening = fixed_now() + Duration::hours(14); // 23:30
        let morning = evening + Duration::hours(1); // 00:30 next day
        let mut profile = Profile::first_visit(UserId::random(), evening);

        let update = advance_streak(Some(&profile.streak_state()), StudyDate::from_datetime(morning));
        profile.record_visit(&update, morning);
        assert_eq!(profile.streak(), 2);
        assert_eq!(profile.last_visit(), morning);
    }

    #[test]
    fn same_day_visit_keeps_original_timestamp() {
        let mut profile = Profile::first_visit(UserId::random(), fixed_now());
        let later = fixed_now() + Duration::hours(2);
        let update = advance_streak(Some(&profile.streak_state()), StudyDate::from_datetime(later));
        profile.record_visit(&update, later);
        assert_eq!(profile.last_visit(), fixed_now());
        assert_eq!(profile.streak(), 1);
    }
}
