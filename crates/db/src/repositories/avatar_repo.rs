//! Repository for the `teacher_avatars` table.

use std::time::Duration;

use myteacher_core::generation::AvatarGenerationStatus;
use myteacher_core::profile::{CharacterProfile, Theme};
use myteacher_core::types::DbId;
use sqlx::PgPool;

use crate::models::avatar::{CreateTeacherAvatar, TeacherAvatar};

/// Column list for `teacher_avatars` queries.
const COLUMNS: &str = "id, user_id, sex, hair_style, hair_color, eye_color, clothing, accessory, \
                       body_type, tone, enthusiasm, formality, humor, is_chibi, is_transparent, \
                       draw_model_version, seed, generation_status, generation_claimed_at, \
                       last_generated_at, created_at, updated_at";

/// Provides avatar lookups and generation status writes.
pub struct AvatarRepo;

impl AvatarRepo {
    /// Insert a new avatar in the `pending` state.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTeacherAvatar,
    ) -> Result<TeacherAvatar, sqlx::Error> {
        let query = format!(
            "INSERT INTO teacher_avatars \
                 (user_id, sex, hair_style, hair_color, eye_color, clothing, accessory, body_type, \
                  tone, enthusiasm, formality, humor, is_chibi, is_transparent, \
                  draw_model_version, seed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TeacherAvatar>(&query)
            .bind(input.user_id)
            .bind(&input.sex)
            .bind(&input.hair_style)
            .bind(&input.hair_color)
            .bind(&input.eye_color)
            .bind(&input.clothing)
            .bind(input.accessory.as_deref())
            .bind(&input.body_type)
            .bind(&input.tone)
            .bind(&input.enthusiasm)
            .bind(&input.formality)
            .bind(&input.humor)
            .bind(input.is_chibi)
            .bind(input.is_transparent)
            .bind(input.draw_model_version.as_deref())
            .bind(input.seed)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TeacherAvatar>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM teacher_avatars WHERE id = $1");
        sqlx::query_as::<_, TeacherAvatar>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Theme of the avatar's owner. Missing or unknown values read as adult.
    pub async fn owner_theme(pool: &PgPool, avatar_id: DbId) -> Result<Theme, sqlx::Error> {
        let theme: Option<String> = sqlx::query_scalar(
            "SELECT u.theme FROM users u \
             JOIN teacher_avatars a ON a.user_id = u.id \
             WHERE a.id = $1",
        )
        .bind(avatar_id)
        .fetch_optional(pool)
        .await?;
        Ok(theme.as_deref().map(Theme::from_str).unwrap_or_default())
    }

    /// Load an avatar together with the generation profile built from it.
    pub async fn load_profile(
        pool: &PgPool,
        avatar_id: DbId,
    ) -> Result<Option<(TeacherAvatar, CharacterProfile)>, sqlx::Error> {
        let Some(avatar) = Self::find_by_id(pool, avatar_id).await? else {
            return Ok(None);
        };
        let theme = Self::owner_theme(pool, avatar_id).await?;
        let profile = avatar.to_profile(theme);
        Ok(Some((avatar, profile)))
    }

    /// Atomically claim the oldest claimable pending avatar.
    ///
    /// An avatar is claimable when it has no claim or its claim is older
    /// than `lease` (the claiming worker died before starting the run).
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// pick the same avatar. The status itself is left to the run.
    pub async fn claim_next_pending(
        pool: &PgPool,
        lease: Duration,
    ) -> Result<Option<TeacherAvatar>, sqlx::Error> {
        let query = format!(
            "UPDATE teacher_avatars \
             SET generation_claimed_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM teacher_avatars \
                 WHERE generation_status = $1 \
                   AND (generation_claimed_at IS NULL \
                        OR generation_claimed_at < NOW() - make_interval(secs => $2)) \
                 ORDER BY updated_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TeacherAvatar>(&query)
            .bind(AvatarGenerationStatus::Pending.as_str())
            .bind(lease.as_secs_f64())
            .fetch_optional(pool)
            .await
    }

    /// Drop the claim of an avatar whose run never started.
    ///
    /// Only `pending` rows are released; returns whether a claim was dropped.
    pub async fn release_claim(pool: &PgPool, avatar_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE teacher_avatars \
             SET generation_claimed_at = NULL \
             WHERE id = $1 AND generation_status = $2 AND generation_claimed_at IS NOT NULL",
        )
        .bind(avatar_id)
        .bind(AvatarGenerationStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Refresh the claim timestamp of a run in progress.
    pub async fn renew_claim(pool: &PgPool, avatar_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE teacher_avatars \
             SET generation_claimed_at = NOW() \
             WHERE id = $1 AND generation_claimed_at IS NOT NULL",
        )
        .bind(avatar_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark `generating` avatars whose claim outlived `lease` as `failed`.
    ///
    /// Returns the ids that were failed.
    pub async fn fail_stale_runs(pool: &PgPool, lease: Duration) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE teacher_avatars \
             SET generation_status = $1, generation_claimed_at = NULL, updated_at = NOW() \
             WHERE generation_status = $2 \
               AND (generation_claimed_at IS NULL \
                    OR generation_claimed_at < NOW() - make_interval(secs => $3)) \
             RETURNING id",
        )
        .bind(AvatarGenerationStatus::Failed.as_str())
        .bind(AvatarGenerationStatus::Generating.as_str())
        .bind(lease.as_secs_f64())
        .fetch_all(pool)
        .await
    }

    /// Write the generation status if the current status may move to it.
    ///
    /// `Completed` also stamps `last_generated_at`; `Pending` releases the
    /// claim so the dispatcher can pick the avatar up again. Returns
    /// `false` when the avatar is missing or the transition is not allowed.
    pub async fn set_status(
        pool: &PgPool,
        avatar_id: DbId,
        status: AvatarGenerationStatus,
    ) -> Result<bool, sqlx::Error> {
        let extra = match status {
            AvatarGenerationStatus::Completed => ", last_generated_at = NOW()",
            AvatarGenerationStatus::Pending => ", generation_claimed_at = NULL",
            _ => "",
        };
        let query = format!(
            "UPDATE teacher_avatars \
             SET generation_status = $2, updated_at = NOW(){extra} \
             WHERE id = $1 AND generation_status = ANY($3)"
        );
        let result = sqlx::query(&query)
            .bind(avatar_id)
            .bind(status.as_str())
            .bind(predecessor_names(status))
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Queue a new run for a finished avatar.
    ///
    /// A `generating` avatar whose claim outlived `lease` is failed first so
    /// it can be queued again. Returns `false` when the avatar is missing,
    /// already pending, or a live run is in flight.
    pub async fn request_regeneration(
        pool: &PgPool,
        avatar_id: DbId,
        lease: Duration,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE teacher_avatars \
             SET generation_status = $2, generation_claimed_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND generation_status = $3 \
               AND (generation_claimed_at IS NULL \
                    OR generation_claimed_at < NOW() - make_interval(secs => $4))",
        )
        .bind(avatar_id)
        .bind(AvatarGenerationStatus::Failed.as_str())
        .bind(AvatarGenerationStatus::Generating.as_str())
        .bind(lease.as_secs_f64())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE teacher_avatars \
             SET generation_status = $2, generation_claimed_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND generation_status = ANY($3)",
        )
        .bind(avatar_id)
        .bind(AvatarGenerationStatus::Pending.as_str())
        .bind(predecessor_names(AvatarGenerationStatus::Pending))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

fn predecessor_names(status: AvatarGenerationStatus) -> Vec<&'static str> {
    status.predecessors().iter().map(|s| s.as_str()).collect()
}
