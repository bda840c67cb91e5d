//! Pricing configuration and credit modifiers.

use crate::ModelTier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Modifier applied when no credit-modifier row exists for an action.
///
/// A deliberate safety net against misconfiguration: a missing modifier
/// must never crash estimation or hand out free generation.
pub const FALLBACK_MODIFIER: f64 = 2.0;

/// Dollar pricing for one model tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct TierPricing {
    /// Dollar price of one credit
    cost_per_credit: f64,
    /// Dollar cost per million input tokens
    cost_per_1m_input: f64,
    /// Dollar cost per million output tokens
    cost_per_1m_output: f64,
}

impl TierPricing {
    /// Create tier pricing from dollar figures.
    pub fn new(cost_per_credit: f64, cost_per_1m_input: f64, cost_per_1m_output: f64) -> Self {
        Self {
            cost_per_credit,
            cost_per_1m_input,
            cost_per_1m_output,
        }
    }
}

/// Global pricing configuration: per-tier token prices plus the flat
/// dollar price of one generated image.
///
/// Read-mostly and admin-mutable. The estimator cannot function without
/// it; absence is a fatal configuration error at the lookup site.
///
/// # Examples
///
/// ```
/// use fabula_core::{ModelTier, PricingConfig, TierPricing};
///
/// let pricing = PricingConfig::new(
///     TierPricing::new(0.000999, 0.150, 0.600),
///     TierPricing::new(0.000999, 1.100, 4.400),
///     0.040,
/// );
/// assert_eq!(pricing.tier(ModelTier::Standard).cost_per_1m_input(), &0.150);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct PricingConfig {
    /// Standard tier pricing
    standard: TierPricing,
    /// Premium tier pricing
    premium: TierPricing,
    /// Credit price per generated image
    price_per_image: f64,
}

impl PricingConfig {
    /// Create a pricing configuration.
    pub fn new(standard: TierPricing, premium: TierPricing, price_per_image: f64) -> Self {
        Self {
            standard,
            premium,
            price_per_image,
        }
    }

    /// Pricing for the given tier.
    pub fn tier(&self, tier: ModelTier) -> &TierPricing {
        match tier {
            ModelTier::Standard => &self.standard,
            ModelTier::Premium => &self.premium,
        }
    }
}

/// Per-action credit multipliers, keyed by action name
/// (`meta_input`, `chapter_output`, `image`, ...).
///
/// Allows margin per action independent of the underlying model price.
/// Lookup never fails: a missing action falls back to
/// [`FALLBACK_MODIFIER`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditModifiers {
    modifiers: HashMap<String, f64>,
}

impl CreditModifiers {
    /// Create an empty modifier set (every lookup falls back).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an iterator of `(action, modifier)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        Self {
            modifiers: pairs.into_iter().collect(),
        }
    }

    /// Set the modifier for an action.
    pub fn set(&mut self, action: impl Into<String>, modifier: f64) {
        self.modifiers.insert(action.into(), modifier);
    }

    /// Look up the modifier for an action, falling back to
    /// [`FALLBACK_MODIFIER`] when absent.
    pub fn get(&self, action: &str) -> f64 {
        self.modifiers
            .get(action)
            .copied()
            .unwrap_or(FALLBACK_MODIFIER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_modifier_falls_back() {
        let modifiers = CreditModifiers::new();
        assert_eq!(modifiers.get("meta_input"), FALLBACK_MODIFIER);
    }

    #[test]
    fn test_configured_modifier_wins() {
        let mut modifiers = CreditModifiers::new();
        modifiers.set("meta_input", 50.0);
        assert_eq!(modifiers.get("meta_input"), 50.0);
        assert_eq!(modifiers.get("meta_output"), FALLBACK_MODIFIER);
    }
}
