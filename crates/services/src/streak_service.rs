use std::sync::Arc;

use study_core::{
    Clock,
    model::Profile,
    streak::{StreakTransition, advance_streak},
};
use storage::repository::{AuthSession, ProfileRepository};

use crate::error::StreakServiceError;

/// Streak after a check, and how the check changed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakCheck {
    pub profile: Profile,
    pub transition: StreakTransition,
}

impl StreakCheck {
    #[must_use]
    pub fn streak(&self) -> u32 {
        self.profile.streak()
    }
}

/// Daily visit streak of the signed-in user.
#[derive(Clone)]
pub struct StreakService {
    clock: Clock,
    auth: Arc<dyn AuthSession>,
    profiles: Arc<dyn ProfileRepository>,
}

impl StreakService {
    #[must_use]
    pub fn new(
        clock: Clock,
        auth: Arc<dyn AuthSession>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self {
            clock,
            auth,
            profiles,
        }
    }

    /// Count today's visit. Creates the profile on the first visit and writes
    /// at most once per calendar day.
    ///
    /// # Errors
    ///
    /// Returns `StreakServiceError::NotSignedIn` without a user,
    /// `StreakServiceError::Storage` if the profile cannot be read or written.
    pub async fn check_streak(&self) -> Result<StreakCheck, StreakServiceError> {
        let user = self
            .auth
            .current_user()
            .await
            .ok_or(StreakServiceError::NotSignedIn)?;
        let now = self.clock.now();
        let today = self.clock.today();

        let existing = self.profiles.get_profile(user).await?;
        let update = advance_streak(existing.as_ref().map(Profile::streak_state).as_ref(), today);

        let profile = match existing {
            Some(mut profile) => {
                profile.record_visit(&update, now);
                profile
            }
            None => Profile::first_visit(user, now),
        };

        if update.needs_write() {
            self.profiles.upsert_profile(&profile).await?;
            tracing::info!(
                %user,
                streak = profile.streak(),
                transition = ?update.transition,
                "streak updated"
            );
        }

        Ok(StreakCheck {
            profile,
            transition: update.transition,
        })
    }

    /// Current streak without counting a visit. `None` before the first visit.
    ///
    /// # Errors
    ///
    /// Returns `StreakServiceError::NotSignedIn` without a user, or
    /// `StreakServiceError::Storage`.
    pub async fn current_streak(&self) -> Result<Option<Profile>, StreakServiceError> {
        let user = self
            .auth
            .current_user()
            .await
            .ok_or(StreakServiceError::NotSignedIn)?;
        Ok(self.profiles.get_profile(user).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storage::repository::{InMemoryRepository, StaticSession};
    use study_core::model::UserId;
    use study_core::time::fixed_now;

    fn service(clock: Clock, auth: StaticSession, repo: &InMemoryRepository) -> StreakService {
        StreakService::new(clock, Arc::new(auth), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn first_check_creates_profile() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let check = service(Clock::fixed(fixed_now()), StaticSession::signed_in(user), &repo)
            .check_streak()
            .await
            .unwrap();
        assert_eq!(check.streak(), 1);
        assert_eq!(check.transition, StreakTransition::Started);
        assert!(repo.get_profile(user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn streak_follows_calendar_days() {
        let repo = InMemoryRepository::new();
        let auth = StaticSession::signed_in(UserId::random());
        let mut clock = Clock::fixed(fixed_now());

        service(clock, auth, &repo).check_streak().await.unwrap();

        clock.advance(Duration::hours(3));
        let same_day = service(clock, auth, &repo).check_streak().await.unwrap();
        assert_eq!(same_day.transition, StreakTransition::Unchanged);
        assert_eq!(same_day.profile.last_visit(), fixed_now());

        clock.advance(Duration::days(1));
        let next_day = service(clock, auth, &repo).check_streak().await.unwrap();
        assert_eq!(next_day.streak(), 2);

        clock.advance(Duration::days(3));
        let after_gap = service(clock, auth, &repo).check_streak().await.unwrap();
        assert_eq!(after_gap.streak(), 1);
        assert_eq!(after_gap.transition, StreakTransition::Reset);
    }

    #[tokio::test]
    async fn anonymous_session_is_rejected() {
        let repo = InMemoryRepository::new();
        let err = service(Clock::fixed(fixed_now()), StaticSession::anonymous(), &repo)
            .check_streak()
            .await
            .unwrap_err();
        assert!(matches!(err, StreakServiceError::NotSignedIn));
    }
}
