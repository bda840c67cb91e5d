//! Credit cost estimation and reconciliation.
//!
//! Both directions of every text generation are priced the same way:
//! convert the tier's dollar prices into tokens-per-credit, divide the
//! token count through it, round, then apply the per-action modifier.
//! Prediction uses a fixed output-token heuristic; reconciliation reruns
//! the arithmetic with the measured output count.

use fabula_core::{
    ActualCost, CreditModifiers, GenerationKind, ModelTier, PredictedCost, PricingConfig,
    TierPricing, count_tokens,
};
use fabula_error::{EstimatorError, EstimatorErrorKind, FabulaResult};

/// Prices generation work in credits.
///
/// Built fresh per operation from the active [`PricingConfig`] and
/// [`CreditModifiers`], so a price change applies to the next estimate.
#[derive(Debug, Clone)]
pub struct CostEstimator {
    pricing: PricingConfig,
    modifiers: CreditModifiers,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl CostEstimator {
    /// Create an estimator over the given pricing and modifiers.
    pub fn new(pricing: PricingConfig, modifiers: CreditModifiers) -> Self {
        Self { pricing, modifiers }
    }

    /// Tokens one credit buys at the given per-million dollar price,
    /// rounded to two decimals.
    fn tokens_per_credit(&self, tier: &TierPricing, cost_per_1m: f64, field: &str) -> FabulaResult<f64> {
        if *tier.cost_per_credit() <= 0.0 {
            return Err(EstimatorError::new(EstimatorErrorKind::InvalidPricing {
                field: "cost_per_credit".to_string(),
                value: *tier.cost_per_credit(),
            })
            .into());
        }
        if cost_per_1m <= 0.0 {
            return Err(EstimatorError::new(EstimatorErrorKind::InvalidPricing {
                field: field.to_string(),
                value: cost_per_1m,
            })
            .into());
        }
        Ok(round2((tier.cost_per_credit() * 1_000_000.0) / cost_per_1m))
    }

    fn tier_for(&self, kind: GenerationKind) -> FabulaResult<(ModelTier, &TierPricing)> {
        let tier = kind.tier().ok_or_else(|| {
            EstimatorError::new(EstimatorErrorKind::MissingPricing(format!(
                "no model tier for kind '{kind}'"
            )))
        })?;
        Ok((tier, self.pricing.tier(tier)))
    }

    /// Predict the credit cost of a text generation before it runs.
    ///
    /// The prompt is tokenized exactly; the output side uses the kind's
    /// fixed heuristic. Both directions carry a minimum base cost of one
    /// credit so no generation is predicted free.
    #[tracing::instrument(skip(self, prompt), fields(kind = %kind))]
    pub fn predict(
        &self,
        kind: GenerationKind,
        prompt: &str,
        model: &str,
        chapter_count: i64,
    ) -> FabulaResult<PredictedCost> {
        let (_, tier) = self.tier_for(kind)?;
        let input_tokens = count_tokens(prompt, model)?;
        let output_tokens = kind.predicted_output_tokens(chapter_count).ok_or_else(|| {
            EstimatorError::new(EstimatorErrorKind::MissingPricing(format!(
                "no output heuristic for kind '{kind}'"
            )))
        })?;

        let in_tpc = self.tokens_per_credit(tier, *tier.cost_per_1m_input(), "cost_per_1m_input")?;
        let out_tpc =
            self.tokens_per_credit(tier, *tier.cost_per_1m_output(), "cost_per_1m_output")?;

        let base_in = ((input_tokens as f64 / in_tpc).round() as i64).max(1);
        let base_out = ((output_tokens as f64 / out_tpc).round() as i64).max(1);
        let mod_in = (base_in as f64 * self.modifiers.get(kind.input_action())).round() as i64;
        let mod_out = (base_out as f64 * self.modifiers.get(kind.output_action())).round() as i64;

        let predicted = PredictedCost::new(
            input_tokens,
            output_tokens,
            in_tpc,
            out_tpc,
            base_in,
            mod_in,
            base_out,
            mod_out,
        );
        tracing::debug!(
            total = predicted.total_predicted_credit_cost(),
            input_tokens,
            output_tokens,
            "predicted generation cost"
        );
        Ok(predicted)
    }

    /// Reconcile the real credit cost of a finished text generation.
    ///
    /// Same arithmetic as prediction with the measured output count, and
    /// without the minimum-one floor: the user pays for what the model
    /// actually produced.
    #[tracing::instrument(skip(self, output_text), fields(kind = %kind))]
    pub fn reconcile(
        &self,
        kind: GenerationKind,
        input_tokens: i64,
        output_text: &str,
        model: &str,
    ) -> FabulaResult<ActualCost> {
        let (_, tier) = self.tier_for(kind)?;
        let output_tokens = count_tokens(output_text, model)?;

        let in_tpc = self.tokens_per_credit(tier, *tier.cost_per_1m_input(), "cost_per_1m_input")?;
        let out_tpc =
            self.tokens_per_credit(tier, *tier.cost_per_1m_output(), "cost_per_1m_output")?;

        let base_in = (input_tokens as f64 / in_tpc).round() as i64;
        let base_out = (output_tokens as f64 / out_tpc).round() as i64;
        let mod_in = (base_in as f64 * self.modifiers.get(kind.input_action())).round() as i64;
        let mod_out = (base_out as f64 * self.modifiers.get(kind.output_action())).round() as i64;

        let actual = ActualCost::new(
            input_tokens,
            output_tokens,
            model.to_string(),
            in_tpc,
            out_tpc,
            base_in,
            mod_in,
            base_out,
            mod_out,
        );
        tracing::debug!(
            total = actual.total_actual_credit_cost(),
            output_tokens,
            "reconciled generation cost"
        );
        Ok(actual)
    }

    /// Credit cost of one generated image.
    ///
    /// Image generation has no token dimension: the configured per-image
    /// credit price times the `image` modifier, rounded to whole credits.
    pub fn image_cost(&self) -> FabulaResult<i64> {
        let price = *self.pricing.price_per_image();
        if price <= 0.0 {
            return Err(EstimatorError::new(EstimatorErrorKind::InvalidPricing {
                field: "price_per_image".to_string(),
                value: price,
            })
            .into());
        }
        Ok((price * self.modifiers.get("image")).round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::TierPricing;

    fn pricing() -> PricingConfig {
        PricingConfig::new(
            TierPricing::new(0.000999, 0.150, 0.600),
            TierPricing::new(0.000999, 1.100, 4.400),
            40.0,
        )
    }

    fn modifiers() -> CreditModifiers {
        CreditModifiers::from_pairs([
            ("meta_input".to_string(), 50.0),
            ("meta_output".to_string(), 1.0),
            ("image".to_string(), 2.0),
        ])
    }

    #[test]
    fn test_metadata_prediction_arithmetic() {
        let estimator = CostEstimator::new(pricing(), modifiers());
        // ~10k tokens of prompt text
        let prompt = "lorem ".repeat(10_000);
        let input_tokens = count_tokens(&prompt, "gpt-4o-mini").unwrap();
        let predicted = estimator
            .predict(GenerationKind::Metadata, &prompt, "gpt-4o-mini", 5)
            .unwrap();

        // tokens_per_credit = round2(0.000999 * 1e6 / 0.150) = 6660.0
        assert_eq!(*predicted.input_tokens_per_credit(), 6660.0);
        let expected_base = ((input_tokens as f64 / 6660.0).round() as i64).max(1);
        assert_eq!(*predicted.base_credit_cost_input(), expected_base);
        assert_eq!(
            *predicted.modified_credit_cost_input(),
            (expected_base as f64 * 50.0).round() as i64
        );
        assert_eq!(
            *predicted.total_predicted_credit_cost(),
            predicted.modified_credit_cost_input() + predicted.modified_credit_cost_output()
        );
    }

    #[test]
    fn test_prediction_floors_at_one_credit() {
        let estimator = CostEstimator::new(pricing(), modifiers());
        let predicted = estimator
            .predict(GenerationKind::Metadata, "hi", "gpt-4o-mini", 1)
            .unwrap();
        assert_eq!(*predicted.base_credit_cost_input(), 1);
        assert_eq!(*predicted.base_credit_cost_output(), 1);
    }

    #[test]
    fn test_reconcile_has_no_floor() {
        let estimator = CostEstimator::new(pricing(), modifiers());
        let actual = estimator
            .reconcile(GenerationKind::Metadata, 3, "ok", "gpt-4o-mini")
            .unwrap();
        // Tiny counts round down to zero base cost.
        assert_eq!(*actual.base_credit_cost_input(), 0);
        assert_eq!(*actual.base_credit_cost_output(), 0);
        assert_eq!(*actual.total_actual_credit_cost(), 0);
    }

    #[test]
    fn test_missing_modifier_uses_fallback() {
        let estimator = CostEstimator::new(pricing(), CreditModifiers::new());
        let predicted = estimator
            .predict(GenerationKind::StoryArcs, "a premise", "o1-mini", 1)
            .unwrap();
        // base 1 each direction, fallback modifier 2.0
        assert_eq!(*predicted.modified_credit_cost_input(), 2);
        assert_eq!(*predicted.modified_credit_cost_output(), 2);
    }

    #[test]
    fn test_summaries_prediction_scales_with_chapters() {
        let estimator = CostEstimator::new(pricing(), modifiers());
        let small = estimator
            .predict(GenerationKind::ChapterSummaries, "premise", "o1-mini", 2)
            .unwrap();
        let large = estimator
            .predict(GenerationKind::ChapterSummaries, "premise", "o1-mini", 40)
            .unwrap();
        assert!(large.predicted_output_tokens() > small.predicted_output_tokens());
        assert!(large.total_predicted_credit_cost() >= small.total_predicted_credit_cost());
    }

    #[test]
    fn test_image_cost_is_price_times_modifier() {
        let estimator = CostEstimator::new(pricing(), modifiers());
        // 40 credits per image, modifier 2.0
        assert_eq!(estimator.image_cost().unwrap(), 80);

        // The per-image price is already a credit figure; no exchange-rate
        // conversion is involved.
        let marked_up = CreditModifiers::from_pairs([("image".to_string(), 3.5)]);
        let estimator = CostEstimator::new(pricing(), marked_up);
        assert_eq!(estimator.image_cost().unwrap(), 140);
    }

    #[test]
    fn test_image_cost_without_modifier_row_uses_fallback() {
        let estimator = CostEstimator::new(pricing(), CreditModifiers::new());
        // fallback modifier 2.0
        assert_eq!(estimator.image_cost().unwrap(), 80);
    }

    #[test]
    fn test_non_positive_image_price_rejected() {
        let bad = PricingConfig::new(
            TierPricing::new(0.000999, 0.150, 0.600),
            TierPricing::new(0.000999, 1.100, 4.400),
            0.0,
        );
        assert!(CostEstimator::new(bad, modifiers()).image_cost().is_err());
    }

    #[test]
    fn test_invalid_pricing_rejected() {
        let bad = PricingConfig::new(
            TierPricing::new(0.0, 0.150, 0.600),
            TierPricing::new(0.000999, 1.100, 4.400),
            40.0,
        );
        let estimator = CostEstimator::new(bad, modifiers());
        assert!(
            estimator
                .predict(GenerationKind::Metadata, "hi", "gpt-4o-mini", 1)
                .is_err()
        );
    }
}
