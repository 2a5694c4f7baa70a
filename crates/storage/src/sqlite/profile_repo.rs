use study_core::model::{Profile, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_profile_row};
use crate::repository::{ProfileRepository, StorageError};

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query("SELECT user_id, streak, last_visit FROM profiles WHERE user_id = ?1")
            .bind(*user.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, streak, last_visit)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                streak = excluded.streak,
                last_visit = excluded.last_visit
            ",
        )
        .bind(*profile.user_id().as_uuid())
        .bind(i64::from(profile.streak()))
        .bind(profile.last_visit())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
