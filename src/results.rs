// flora-inference 🚀 AGPL-3.0 License

//! Result types for the classification pipeline.

use ndarray::Array1;

use crate::checkpoint::CheckpointMetadata;
use crate::error::{ClassifyError, Result};
use crate::labels::CategoryNames;

/// Timing information for inference operations (in milliseconds).
#[derive(Debug, Clone, Default)]
pub struct Speed {
    /// Time spent on preprocessing.
    pub preprocess: Option<f64>,
    /// Time spent on the forward pass.
    pub inference: Option<f64>,
    /// Time spent on postprocessing.
    pub postprocess: Option<f64>,
}

impl Speed {
    /// Create a new Speed instance with all timings.
    #[must_use]
    pub const fn new(preprocess: f64, inference: f64, postprocess: f64) -> Self {
        Self {
            preprocess: Some(preprocess),
            inference: Some(inference),
            postprocess: Some(postprocess),
        }
    }

    /// Total pipeline time in milliseconds.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.preprocess.unwrap_or(0.0)
            + self.inference.unwrap_or(0.0)
            + self.postprocess.unwrap_or(0.0)
    }
}

/// Classification probabilities.
///
/// Stores class probabilities with convenience methods for top predictions.
#[derive(Debug, Clone)]
pub struct Probs {
    /// Raw probability data with shape (`num_classes`,).
    pub data: Array1<f32>,
}

impl Probs {
    /// Create a new Probs instance.
    #[must_use]
    pub const fn new(data: Array1<f32>) -> Self {
        Self { data }
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the distribution is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the index of the top-1 class.
    #[must_use]
    pub fn top1(&self) -> usize {
        self.data
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map_or(0, |(i, _)| i)
    }

    /// Get the indices of the top-k classes, sorted by probability descending.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.data.len()).collect();
        indices.sort_by(|&a, &b| {
            self.data[b]
                .partial_cmp(&self.data[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        indices.truncate(k);
        indices
    }

    /// Get the confidence of the top-1 class.
    #[must_use]
    pub fn top1conf(&self) -> f32 {
        self.data[self.top1()]
    }

    /// Get the confidences of the top-k classes.
    #[must_use]
    pub fn topk_conf(&self, k: usize) -> Vec<f32> {
        self.top_k(k).iter().map(|&i| self.data[i]).collect()
    }
}

/// One ranked entry of the prediction report.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedClass {
    /// Probability of this class, in [0, 1].
    pub probability: f32,
    /// Class label as recorded by the training pipeline.
    pub label: String,
    /// Human-readable display name from the category-names file.
    pub name: String,
}

/// Outcome of a single forward pass.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Path to the source image.
    pub path: String,
    /// Original image shape (height, width).
    pub orig_shape: (u32, u32),
    /// Probability distribution over the model's output classes.
    pub probs: Probs,
    /// Per-stage timing information.
    pub speed: Speed,
}

impl Prediction {
    /// Create a new prediction.
    #[must_use]
    pub const fn new(path: String, orig_shape: (u32, u32), probs: Probs, speed: Speed) -> Self {
        Self {
            path,
            orig_shape,
            probs,
            speed,
        }
    }

    /// Produce the top-`k` `(probability, label, name)` entries, ordered by
    /// probability descending.
    ///
    /// # Errors
    ///
    /// Returns a config error when `k` is zero or exceeds the bundle's class
    /// count, and a lookup error when an output index has no class label or a
    /// label has no display name.
    pub fn rank(
        &self,
        k: usize,
        metadata: &CheckpointMetadata,
        names: &CategoryNames,
    ) -> Result<Vec<RankedClass>> {
        if k == 0 {
            return Err(ClassifyError::ConfigError(
                "top-K must be a positive integer".to_string(),
            ));
        }
        if k > metadata.num_classes() || k > self.probs.len() {
            return Err(ClassifyError::ConfigError(format!(
                "top-K ({k}) exceeds the number of classes ({})",
                metadata.num_classes().min(self.probs.len())
            )));
        }

        let idx_to_class = metadata.idx_to_class();

        self.probs
            .top_k(k)
            .into_iter()
            .map(|idx| {
                let label = idx_to_class.get(&idx).ok_or_else(|| {
                    ClassifyError::PostProcessingError(format!(
                        "Output index {idx} has no class label in the bundle metadata"
                    ))
                })?;
                let name = names.get(label).ok_or_else(|| {
                    ClassifyError::LabelMapError(format!(
                        "Class '{label}' is missing from the category-names file"
                    ))
                })?;
                Ok(RankedClass {
                    probability: self.probs.data[idx],
                    label: label.clone(),
                    name: name.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_metadata() -> CheckpointMetadata {
        CheckpointMetadata::from_yaml_str(
            "arch: vgg16\nclass_to_idx: {'1': 0, '10': 1, '21': 2, '3': 3}",
        )
        .unwrap()
    }

    fn sample_names() -> CategoryNames {
        let mut map = HashMap::new();
        map.insert("1".to_string(), "pink primrose".to_string());
        map.insert("10".to_string(), "globe thistle".to_string());
        map.insert("21".to_string(), "fire lily".to_string());
        map.insert("3".to_string(), "canterbury bells".to_string());
        CategoryNames::new(map)
    }

    fn sample_prediction() -> Prediction {
        let probs = Probs::new(Array1::from_vec(vec![0.1, 0.6, 0.25, 0.05]));
        Prediction::new("test.jpg".to_string(), (500, 375), probs, Speed::default())
    }

    #[test]
    fn test_top_k_ordering() {
        let probs = Probs::new(Array1::from_vec(vec![0.1, 0.6, 0.25, 0.05]));
        assert_eq!(probs.top_k(3), vec![1, 2, 0]);
        assert_eq!(probs.top1(), 1);
        assert!((probs.top1conf() - 0.6).abs() < f32::EPSILON);
        assert_eq!(probs.topk_conf(2), vec![0.6, 0.25]);
    }

    #[test]
    fn test_rank_produces_sorted_tuples() {
        let ranked = sample_prediction()
            .rank(3, &sample_metadata(), &sample_names())
            .unwrap();

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].label, "10");
        assert_eq!(ranked[0].name, "globe thistle");
        assert!((ranked[0].probability - 0.6).abs() < f32::EPSILON);
        assert!(ranked.windows(2).all(|w| w[0].probability >= w[1].probability));
    }

    #[test]
    fn test_rank_rejects_zero_k() {
        let result = sample_prediction().rank(0, &sample_metadata(), &sample_names());
        assert!(matches!(result, Err(ClassifyError::ConfigError(_))));
    }

    #[test]
    fn test_rank_rejects_k_beyond_class_count() {
        let result = sample_prediction().rank(5, &sample_metadata(), &sample_names());
        assert!(matches!(result, Err(ClassifyError::ConfigError(_))));
    }

    #[test]
    fn test_rank_fails_on_missing_display_name() {
        let mut map = HashMap::new();
        map.insert("1".to_string(), "pink primrose".to_string());
        let names = CategoryNames::new(map);

        let result = sample_prediction().rank(2, &sample_metadata(), &names);
        assert!(matches!(result, Err(ClassifyError::LabelMapError(_))));
    }

    #[test]
    fn test_rank_fails_on_missing_class_label() {
        // Metadata only covers two of the four output indices
        let metadata =
            CheckpointMetadata::from_yaml_str("class_to_idx: {'1': 0, '10': 1}").unwrap();
        let result = sample_prediction().rank(2, &metadata, &sample_names());
        // k = num_classes = 2, but index 2 ranks ahead of index 0
        assert!(matches!(
            result,
            Err(ClassifyError::PostProcessingError(_))
        ));
    }

    #[test]
    fn test_speed_total() {
        let speed = Speed::new(10.0, 40.0, 0.5);
        assert!((speed.total() - 50.5).abs() < f64::EPSILON);
    }
}
