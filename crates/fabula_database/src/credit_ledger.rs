//! Postgres-backed credit balances.

use crate::{DatabaseResult, PgPool};
use diesel::prelude::*;
use fabula_core::CreditKind;
use fabula_error::{DatabaseError, DatabaseErrorKind, FabulaResult};
use fabula_interface::CreditLedger;

/// Postgres implementation of [`CreditLedger`].
///
/// Balances live on the users table, one column per credit pool.
#[derive(Clone)]
pub struct PostgresCreditLedger {
    pool: PgPool,
}

impl PostgresCreditLedger {
    /// Create a ledger over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> DatabaseResult<crate::PooledPg> {
        self.pool
            .get()
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())))
    }
}

impl CreditLedger for PostgresCreditLedger {
    fn available(&self, user_id: i32, kind: CreditKind) -> FabulaResult<i64> {
        use crate::schema::users::dsl as u;

        let mut conn = self.conn()?;
        let balance = match kind {
            CreditKind::Text => u::users
                .find(user_id)
                .select(u::text_credits)
                .first::<i64>(&mut conn),
            CreditKind::Image => u::users
                .find(user_id)
                .select(u::image_credits)
                .first::<i64>(&mut conn),
            CreditKind::Audio => u::users
                .find(user_id)
                .select(u::audio_credits)
                .first::<i64>(&mut conn),
        }
        .map_err(DatabaseError::from)?;
        Ok(balance)
    }

    fn can_afford(&self, user_id: i32, kind: CreditKind, amount: i64) -> FabulaResult<bool> {
        Ok(self.available(user_id, kind)? >= amount)
    }

    fn credit(&self, user_id: i32, kind: CreditKind, amount: i64) -> FabulaResult<i64> {
        use crate::schema::users::dsl as u;

        let mut conn = self.conn()?;
        let balance = match kind {
            CreditKind::Text => diesel::update(u::users.find(user_id))
                .set(u::text_credits.eq(u::text_credits + amount))
                .returning(u::text_credits)
                .get_result::<i64>(&mut conn),
            CreditKind::Image => diesel::update(u::users.find(user_id))
                .set(u::image_credits.eq(u::image_credits + amount))
                .returning(u::image_credits)
                .get_result::<i64>(&mut conn),
            CreditKind::Audio => diesel::update(u::users.find(user_id))
                .set(u::audio_credits.eq(u::audio_credits + amount))
                .returning(u::audio_credits)
                .get_result::<i64>(&mut conn),
        }
        .map_err(DatabaseError::from)?;
        Ok(balance)
    }
}
