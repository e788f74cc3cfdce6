// flora-inference 🚀 AGPL-3.0 License

//! Post-processing for the classification output.

use ndarray::Array1;

use crate::error::{ClassifyError, Result};
use crate::results::Probs;

/// Turn the raw model output into a probability distribution.
///
/// NaN entries are zeroed. When the output is not already normalized
/// (sum differs from 1.0), a numerically stable softmax is applied, so both
/// logit-emitting and softmax-emitting exports produce probabilities in
/// [0, 1].
///
/// # Errors
///
/// Returns an error when the model produced an empty output tensor.
pub fn normalize_probs(output: &[f32]) -> Result<Probs> {
    if output.is_empty() {
        return Err(ClassifyError::PostProcessingError(
            "Model produced an empty output tensor".to_string(),
        ));
    }

    let mut probs_vec: Vec<f32> = output
        .iter()
        .map(|&v| if v.is_nan() { 0.0 } else { v })
        .collect();

    // Check if softmax is already applied (sum ≈ 1.0)
    let sum: f32 = probs_vec.iter().sum();
    if (sum - 1.0).abs() > 0.1 {
        let max_val = probs_vec.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp_vals: Vec<f32> = probs_vec.iter().map(|&v| (v - max_val).exp()).collect();
        let exp_sum: f32 = exp_vals.iter().sum();
        if exp_sum > 0.0 {
            probs_vec = exp_vals.iter().map(|&v| v / exp_sum).collect();
        }
    }

    Ok(Probs::new(Array1::from_vec(probs_vec)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_applied_to_logits() {
        let probs = normalize_probs(&[2.0, 1.0, 0.1]).unwrap();
        let sum: f32 = probs.data.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs.data.iter().all(|&p| (0.0..=1.0).contains(&p)));
        // Ordering of the raw scores is preserved
        assert_eq!(probs.top1(), 0);
    }

    #[test]
    fn test_already_normalized_output_untouched() {
        let probs = normalize_probs(&[0.7, 0.2, 0.1]).unwrap();
        assert!((probs.data[0] - 0.7).abs() < 1e-6);
        assert!((probs.data[2] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_log_probabilities_become_distribution() {
        // Log-softmax output sums to a large negative number
        let raw = [(0.8f32).ln(), (0.15f32).ln(), (0.05f32).ln()];
        let probs = normalize_probs(&raw).unwrap();
        let sum: f32 = probs.data.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(probs.top1(), 0);
    }

    #[test]
    fn test_nan_values_zeroed() {
        let probs = normalize_probs(&[f32::NAN, 0.9, 0.1]).unwrap();
        assert!(probs.data.iter().all(|p| !p.is_nan()));
        assert_eq!(probs.top1(), 1);
    }

    #[test]
    fn test_empty_output_is_error() {
        assert!(normalize_probs(&[]).is_err());
    }
}
