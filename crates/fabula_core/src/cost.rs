//! Cost breakdown types produced by the estimator.

use serde::{Deserialize, Serialize};

/// Predicted credit cost of a not-yet-executed generation.
///
/// Output tokens are a fixed per-kind heuristic; the same arithmetic is
/// reused for reconciliation with measured output (see [`ActualCost`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct PredictedCost {
    /// Exact input token count of the rendered prompt
    input_tokens: i64,
    /// Heuristic output token count for this kind
    predicted_output_tokens: i64,
    /// Input tokens one credit buys (rounded to 2 decimals)
    input_tokens_per_credit: f64,
    /// Output tokens one credit buys (rounded to 2 decimals)
    output_tokens_per_credit: f64,
    /// Unmodified input credit cost (minimum 1)
    base_credit_cost_input: i64,
    /// Input cost after the action modifier
    modified_credit_cost_input: i64,
    /// Unmodified output credit cost (minimum 1)
    base_credit_cost_output: i64,
    /// Output cost after the action modifier
    modified_credit_cost_output: i64,
    /// Sum of the modified input and output costs
    total_predicted_credit_cost: i64,
}

impl PredictedCost {
    /// Assemble a prediction from its computed parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input_tokens: i64,
        predicted_output_tokens: i64,
        input_tokens_per_credit: f64,
        output_tokens_per_credit: f64,
        base_credit_cost_input: i64,
        modified_credit_cost_input: i64,
        base_credit_cost_output: i64,
        modified_credit_cost_output: i64,
    ) -> Self {
        Self {
            input_tokens,
            predicted_output_tokens,
            input_tokens_per_credit,
            output_tokens_per_credit,
            base_credit_cost_input,
            modified_credit_cost_input,
            base_credit_cost_output,
            modified_credit_cost_output,
            total_predicted_credit_cost: modified_credit_cost_input + modified_credit_cost_output,
        }
    }
}

/// Reconciled credit cost of a completed generation, computed from the
/// measured output token count. The user is billed for what happened,
/// not what was forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ActualCost {
    /// Input token count (same figure the prediction used)
    input_tokens: i64,
    /// Measured output token count
    output_tokens: i64,
    /// Model the generation ran on
    model: String,
    /// Input tokens one credit buys (rounded to 2 decimals)
    input_tokens_per_credit: f64,
    /// Output tokens one credit buys (rounded to 2 decimals)
    output_tokens_per_credit: f64,
    /// Unmodified input credit cost (no minimum floor)
    base_credit_cost_input: i64,
    /// Input cost after the action modifier
    modified_credit_cost_input: i64,
    /// Unmodified output credit cost (no minimum floor)
    base_credit_cost_output: i64,
    /// Output cost after the action modifier
    modified_credit_cost_output: i64,
    /// Sum of the modified input and output costs
    total_actual_credit_cost: i64,
}

impl ActualCost {
    /// Assemble a reconciliation from its computed parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input_tokens: i64,
        output_tokens: i64,
        model: String,
        input_tokens_per_credit: f64,
        output_tokens_per_credit: f64,
        base_credit_cost_input: i64,
        modified_credit_cost_input: i64,
        base_credit_cost_output: i64,
        modified_credit_cost_output: i64,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            model,
            input_tokens_per_credit,
            output_tokens_per_credit,
            base_credit_cost_input,
            modified_credit_cost_input,
            base_credit_cost_output,
            modified_credit_cost_output,
            total_actual_credit_cost: modified_credit_cost_input + modified_credit_cost_output,
        }
    }

    /// Flat-priced settlement with no token dimension. Image generation
    /// settles at exactly the predicted cost.
    pub fn flat(credit_cost: i64, model: impl Into<String>) -> Self {
        Self {
            input_tokens: 0,
            output_tokens: 0,
            model: model.into(),
            input_tokens_per_credit: 0.0,
            output_tokens_per_credit: 0.0,
            base_credit_cost_input: credit_cost,
            modified_credit_cost_input: credit_cost,
            base_credit_cost_output: 0,
            modified_credit_cost_output: 0,
            total_actual_credit_cost: credit_cost,
        }
    }
}
