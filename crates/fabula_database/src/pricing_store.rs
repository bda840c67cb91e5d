//! Postgres-backed pricing configuration and credit modifiers.

use crate::{CreditModifierRow, DatabaseResult, NewCreditModifierRow, PgPool, PricingConfigRow};
use diesel::prelude::*;
use fabula_core::{CreditModifiers, FALLBACK_MODIFIER, GenerationKind, PricingConfig, TierPricing};
use fabula_error::{
    DatabaseError, DatabaseErrorKind, EstimatorError, EstimatorErrorKind, FabulaResult,
};
use fabula_interface::PricingStore;

/// Metadata prompts carry the full story context, so the input margin is
/// tuned far above the default multiplier.
const META_INPUT_MODIFIER: f64 = 50.0;

fn default_modifier_rows() -> Vec<NewCreditModifierRow> {
    GenerationKind::modifier_actions()
        .into_iter()
        .map(|action| NewCreditModifierRow {
            action: action.to_string(),
            modifier: if action == "meta_input" {
                META_INPUT_MODIFIER
            } else {
                FALLBACK_MODIFIER
            },
        })
        .collect()
}

/// Postgres implementation of [`PricingStore`].
///
/// Reads are not cached: the dispatcher and worker each take a fresh read
/// per operation so admin price changes apply without a restart.
#[derive(Clone)]
pub struct PostgresPricingStore {
    pool: PgPool,
}

impl PostgresPricingStore {
    /// Create a store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> DatabaseResult<crate::PooledPg> {
        self.pool
            .get()
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())))
    }

    /// Seed the pricing tables on first boot.
    ///
    /// Inserts one modifier row per action name and a baseline pricing row
    /// when the respective tables are empty, so a fresh deployment prices
    /// work without manual setup. Existing rows are never touched.
    pub fn seed_defaults(&self) -> FabulaResult<()> {
        use crate::schema::credit_modifiers::dsl as cm;
        use crate::schema::pricing_configs::dsl as pc;

        let mut conn = self.conn()?;

        let modifier_count: i64 = cm::credit_modifiers
            .count()
            .get_result(&mut conn)
            .map_err(DatabaseError::from)?;
        if modifier_count == 0 {
            let seeded = diesel::insert_into(cm::credit_modifiers)
                .values(default_modifier_rows())
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .map_err(DatabaseError::from)?;
            tracing::info!(seeded, "seeded default credit modifiers");
        }

        let pricing_count: i64 = pc::pricing_configs
            .count()
            .get_result(&mut conn)
            .map_err(DatabaseError::from)?;
        if pricing_count == 0 {
            // gpt-4o-mini and o1-mini list prices, 40 credits per image.
            diesel::insert_into(pc::pricing_configs)
                .values((
                    pc::standard_cost_per_credit.eq(0.000999),
                    pc::standard_cost_per_1m_input.eq(0.150),
                    pc::standard_cost_per_1m_output.eq(0.600),
                    pc::premium_cost_per_credit.eq(0.000999),
                    pc::premium_cost_per_1m_input.eq(1.100),
                    pc::premium_cost_per_1m_output.eq(4.400),
                    pc::price_per_image.eq(40.0),
                    pc::updated_at.eq(diesel::dsl::now),
                ))
                .execute(&mut conn)
                .map_err(DatabaseError::from)?;
            tracing::info!("seeded baseline pricing configuration");
        }

        Ok(())
    }
}

impl PricingStore for PostgresPricingStore {
    fn pricing(&self) -> FabulaResult<PricingConfig> {
        use crate::schema::pricing_configs::dsl as pc;

        let mut conn = self.conn()?;
        let row: Option<PricingConfigRow> = pc::pricing_configs
            .order(pc::updated_at.desc())
            .first(&mut conn)
            .optional()
            .map_err(DatabaseError::from)?;
        let row = row.ok_or_else(|| {
            EstimatorError::new(EstimatorErrorKind::MissingPricing(
                "no pricing configuration row".to_string(),
            ))
        })?;

        Ok(PricingConfig::new(
            TierPricing::new(
                row.standard_cost_per_credit,
                row.standard_cost_per_1m_input,
                row.standard_cost_per_1m_output,
            ),
            TierPricing::new(
                row.premium_cost_per_credit,
                row.premium_cost_per_1m_input,
                row.premium_cost_per_1m_output,
            ),
            row.price_per_image,
        ))
    }

    fn modifiers(&self) -> FabulaResult<CreditModifiers> {
        use crate::schema::credit_modifiers::dsl as cm;

        let mut conn = self.conn()?;
        let rows: Vec<CreditModifierRow> = cm::credit_modifiers
            .load(&mut conn)
            .map_err(DatabaseError::from)?;
        Ok(CreditModifiers::from_pairs(
            rows.into_iter().map(|r| (r.action, r.modifier)),
        ))
    }
}
