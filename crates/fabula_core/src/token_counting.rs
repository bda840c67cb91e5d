//! Exact token counting for prompt and output text.

use fabula_error::{EstimatorError, EstimatorErrorKind, FabulaResult};
use tiktoken_rs::CoreBPE;

/// Count the tokens in `text` under the tokenizer for `model`.
///
/// Unknown model names fall back to the `cl100k_base` encoding rather than
/// failing, so a newly configured model never blocks cost estimation. The
/// fallback count is approximate for such models, which reconciliation
/// tolerates.
pub fn count_tokens(text: &str, model: &str) -> FabulaResult<i64> {
    let bpe = tokenizer_for(model)?;
    Ok(bpe.encode_with_special_tokens(text).len() as i64)
}

fn tokenizer_for(model: &str) -> FabulaResult<CoreBPE> {
    match tiktoken_rs::get_bpe_from_model(model) {
        Ok(bpe) => Ok(bpe),
        Err(_) => tiktoken_rs::cl100k_base().map_err(|e| {
            EstimatorError::new(EstimatorErrorKind::Tokenizer {
                model: model.to_string(),
                message: e.to_string(),
            })
            .into()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_nonzero_for_known_model() {
        let count = count_tokens("Hello, world!", "gpt-4").unwrap();
        assert!(count > 0);
    }

    #[test]
    fn test_unknown_model_falls_back() {
        let exotic = count_tokens("Hello, world!", "totally-unknown-model").unwrap();
        let base = count_tokens("Hello, world!", "gpt-4").unwrap();
        assert_eq!(exotic, base);
    }

    #[test]
    fn test_empty_text_counts_zero() {
        assert_eq!(count_tokens("", "gpt-4").unwrap(), 0);
    }
}
