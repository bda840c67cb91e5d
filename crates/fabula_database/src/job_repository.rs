//! Postgres-backed generation job audit log.

use crate::{DatabaseResult, GenerationJobRow, NewGenerationJobRow, PgPool};
use diesel::prelude::*;
use fabula_core::{ActualCost, CreditKind, GenerationKind, JobSpec, JobStatus};
use fabula_error::{DatabaseError, DatabaseErrorKind, FabulaResult};
use fabula_interface::{GenerationJobRepository, JobRecord};

/// Postgres implementation of [`GenerationJobRepository`].
#[derive(Clone)]
pub struct PostgresGenerationJobRepository {
    pool: PgPool,
}

impl PostgresGenerationJobRepository {
    /// Create a repository over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> DatabaseResult<crate::PooledPg> {
        self.pool
            .get()
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())))
    }
}

fn record_from_row(row: GenerationJobRow) -> DatabaseResult<JobRecord> {
    let kind: GenerationKind = row.kind.parse().map_err(|_| {
        DatabaseError::new(DatabaseErrorKind::Serialization(format!(
            "unknown generation kind '{}'",
            row.kind
        )))
    })?;
    let status: JobStatus = row.status.parse().map_err(|_| {
        DatabaseError::new(DatabaseErrorKind::Serialization(format!(
            "unknown job status '{}'",
            row.status
        )))
    })?;
    Ok(JobRecord {
        task_id: row.task_id,
        user_id: row.user_id,
        story_id: row.story_id,
        kind,
        status,
        predicted_cost: row.predicted_cost,
        actual_cost: row.actual_cost,
        input_tokens: row.input_tokens,
        output_tokens: row.output_tokens,
        model: row.model,
        error: row.error,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl GenerationJobRepository for PostgresGenerationJobRepository {
    fn insert_pending(&self, spec: &JobSpec) -> FabulaResult<()> {
        use crate::schema::generation_jobs::dsl as gj;

        let mut conn = self.conn()?;
        let row = NewGenerationJobRow {
            task_id: spec.task_id().clone(),
            user_id: *spec.user_id(),
            story_id: *spec.story_id(),
            kind: spec.kind().to_string(),
            status: JobStatus::Pending.to_string(),
            predicted_cost: *spec.predicted_cost(),
        };
        diesel::insert_into(gj::generation_jobs)
            .values(&row)
            .execute(&mut conn)
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    fn settle_success(
        &self,
        task_id: &str,
        user_id: i32,
        credit_kind: CreditKind,
        actual: &ActualCost,
    ) -> FabulaResult<()> {
        use crate::schema::generation_jobs::dsl as gj;
        use crate::schema::users::dsl as u;

        let mut conn = self.conn()?;
        let cost = *actual.total_actual_credit_cost();

        // Debit and status flip commit together or not at all. Only a
        // pending row settles: the queue delivers at least once, and a
        // redelivered job must not debit the user a second time.
        let settled = conn.transaction::<_, DatabaseError, _>(|conn| {
            let updated = diesel::update(
                gj::generation_jobs
                    .find(task_id)
                    .filter(gj::status.eq(JobStatus::Pending.to_string())),
            )
            .set((
                gj::status.eq(JobStatus::Succeeded.to_string()),
                gj::actual_cost.eq(Some(cost)),
                gj::input_tokens.eq(Some(*actual.input_tokens())),
                gj::output_tokens.eq(Some(*actual.output_tokens())),
                gj::model.eq(Some(actual.model().clone())),
                gj::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;
            if updated == 0 {
                let known: i64 = gj::generation_jobs.find(task_id).count().get_result(conn)?;
                if known == 0 {
                    return Err(DatabaseError::new(DatabaseErrorKind::NotFound));
                }
                return Ok(false);
            }

            let debited = match credit_kind {
                CreditKind::Text => diesel::update(u::users.find(user_id))
                    .set(u::text_credits.eq(u::text_credits - cost))
                    .execute(conn)?,
                CreditKind::Image => diesel::update(u::users.find(user_id))
                    .set(u::image_credits.eq(u::image_credits - cost))
                    .execute(conn)?,
                CreditKind::Audio => diesel::update(u::users.find(user_id))
                    .set(u::audio_credits.eq(u::audio_credits - cost))
                    .execute(conn)?,
            };
            if debited == 0 {
                return Err(DatabaseError::new(DatabaseErrorKind::NotFound));
            }
            Ok(true)
        })?;

        if settled {
            tracing::debug!(task_id, cost, "job settled");
        } else {
            tracing::debug!(task_id, "job already terminal, duplicate settle skipped");
        }
        Ok(())
    }

    fn mark_failed(&self, task_id: &str, message: &str) -> FabulaResult<()> {
        use crate::schema::generation_jobs::dsl as gj;

        let mut conn = self.conn()?;
        let updated = diesel::update(
            gj::generation_jobs
                .find(task_id)
                .filter(gj::status.eq(JobStatus::Pending.to_string())),
        )
        .set((
            gj::status.eq(JobStatus::Failed.to_string()),
            gj::error.eq(Some(message)),
            gj::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut conn)
        .map_err(DatabaseError::from)?;
        if updated == 0 {
            // Terminal rows keep their outcome; only a missing row is an error.
            let known: i64 = gj::generation_jobs
                .find(task_id)
                .count()
                .get_result(&mut conn)
                .map_err(DatabaseError::from)?;
            if known == 0 {
                return Err(DatabaseError::new(DatabaseErrorKind::NotFound).into());
            }
        }
        Ok(())
    }

    fn latest_for_user(&self, user_id: i32) -> FabulaResult<Option<JobRecord>> {
        use crate::schema::generation_jobs::dsl as gj;

        let mut conn = self.conn()?;
        let row: Option<GenerationJobRow> = gj::generation_jobs
            .filter(gj::user_id.eq(user_id))
            .order(gj::created_at.desc())
            .first(&mut conn)
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(row.map(record_from_row).transpose()?)
    }

    fn by_task_id(&self, task_id: &str) -> FabulaResult<Option<JobRecord>> {
        use crate::schema::generation_jobs::dsl as gj;

        let mut conn = self.conn()?;
        let row: Option<GenerationJobRow> = gj::generation_jobs
            .find(task_id)
            .first(&mut conn)
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(row.map(record_from_row).transpose()?)
    }

    fn jobs_for_user(&self, user_id: i32, limit: i64) -> FabulaResult<Vec<JobRecord>> {
        use crate::schema::generation_jobs::dsl as gj;

        let mut conn = self.conn()?;
        let rows: Vec<GenerationJobRow> = gj::generation_jobs
            .filter(gj::user_id.eq(user_id))
            .order(gj::created_at.desc())
            .limit(limit)
            .load(&mut conn)
            .map_err(DatabaseError::from)?;
        rows.into_iter()
            .map(|r| record_from_row(r).map_err(Into::into))
            .collect()
    }
}
