// flora-inference 🚀 AGPL-3.0 License

//! Model bundle metadata parsing.
//!
//! A bundle is an ONNX graph exported from an external training pipeline.
//! The training metadata the original checkpoint recorded (architecture
//! reference, class-label to training-index mapping, epoch count) travels in
//! the model's custom metadata properties, either as individual keys or as a
//! single YAML-formatted value.

use std::collections::HashMap;

use crate::error::{ClassifyError, Result};

/// Training metadata extracted from a classification model bundle.
#[derive(Debug, Clone)]
pub struct CheckpointMetadata {
    /// Bundle description (e.g., "vgg16 transfer-learning classifier").
    pub description: String,
    /// Architecture reference the classifier head was attached to.
    pub arch: String,
    /// Task the bundle was exported for. Must be `classify` when present.
    pub task: String,
    /// Number of epochs the classifier was trained for.
    pub epochs: usize,
    /// Input image size as (height, width).
    pub imgsz: (usize, usize),
    /// Number of input channels (3 for RGB).
    pub channels: usize,
    /// Class label to training output index mapping.
    pub class_to_idx: HashMap<String, usize>,
}

impl CheckpointMetadata {
    /// Parse metadata from the model's custom metadata properties.
    ///
    /// # Arguments
    ///
    /// * `metadata_map` - The custom metadata read from the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata is missing or malformed.
    pub fn from_onnx_metadata(metadata_map: &HashMap<String, String>) -> Result<Self> {
        let yaml_str = metadata_map
            .get("metadata")
            .or_else(|| metadata_map.get("checkpoint"))
            .or_else(|| {
                // If no standard key, check if all metadata is in one value
                metadata_map.values().find(|v| v.contains("class_to_idx:"))
            })
            .ok_or_else(|| {
                ClassifyError::MetadataError(
                    "No training metadata found in model bundle".to_string(),
                )
            })?;

        Self::from_yaml_str(yaml_str)
    }

    /// Parse metadata from a YAML-formatted string.
    ///
    /// # Errors
    ///
    /// Returns an error if a field value is malformed.
    pub fn from_yaml_str(yaml_str: &str) -> Result<Self> {
        let mut metadata = Self::default();

        for line in yaml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim();
                let value = value.trim().trim_matches('\'').trim_matches('"');

                match key {
                    "description" => metadata.description = value.to_string(),
                    "arch" => metadata.arch = value.to_string(),
                    "task" => metadata.task = value.to_string(),
                    "epochs" => {
                        metadata.epochs = value.parse().map_err(|_| {
                            ClassifyError::MetadataError(format!("Invalid epochs value: {value}"))
                        })?;
                    }
                    "channels" => {
                        metadata.channels = value.parse().map_err(|_| {
                            ClassifyError::MetadataError(format!(
                                "Invalid channels value: {value}"
                            ))
                        })?;
                    }
                    "class_to_idx" => {
                        // Inline Python dict form: class_to_idx: {'1': 0, '10': 1}
                        let raw = line
                            .split_once(':')
                            .map(|(_, v)| v.trim())
                            .unwrap_or_default();
                        if let Some(stripped) = raw.strip_prefix('{') {
                            if let Some(dict_str) = stripped.strip_suffix('}') {
                                metadata.class_to_idx = Self::parse_python_dict(dict_str)?;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        // imgsz can be a list like [224, 224]
        if let Some(imgsz_line) = yaml_str.lines().find(|l| l.contains("imgsz:")) {
            metadata.imgsz = Self::parse_imgsz(imgsz_line);
        }

        // Fall back to YAML block format for the class mapping
        if metadata.class_to_idx.is_empty() {
            metadata.class_to_idx = Self::parse_class_block(yaml_str)?;
        }

        if metadata.class_to_idx.is_empty() {
            return Err(ClassifyError::MetadataError(
                "Model bundle metadata has no class_to_idx mapping".to_string(),
            ));
        }

        Ok(metadata)
    }

    /// Parse the imgsz field, which can be `imgsz: [224, 224]` or `imgsz: 224`.
    fn parse_imgsz(imgsz_line: &str) -> (usize, usize) {
        if let Some(bracket_start) = imgsz_line.find('[') {
            if let Some(bracket_end) = imgsz_line.find(']') {
                let values: Vec<usize> = imgsz_line[bracket_start + 1..bracket_end]
                    .split(',')
                    .filter_map(|s| s.trim().parse().ok())
                    .collect();
                if values.len() >= 2 {
                    return (values[0], values[1]);
                }
            }
        }

        if let Some((_, value)) = imgsz_line.split_once(':') {
            if let Ok(side) = value.trim().parse::<usize>() {
                return (side, side);
            }
        }

        (224, 224)
    }

    /// Parse a YAML block of `'<label>': <index>` entries under `class_to_idx:`.
    fn parse_class_block(yaml_str: &str) -> Result<HashMap<String, usize>> {
        let mut mapping = HashMap::new();
        let mut in_block = false;
        let mut block_indent = 0;

        for line in yaml_str.lines() {
            let trimmed = line.trim();

            if trimmed.starts_with("class_to_idx:") {
                in_block = true;
                block_indent = line.len() - line.trim_start().len();
                continue;
            }

            if in_block {
                let current_indent = line.len() - line.trim_start().len();

                if !trimmed.is_empty() && !trimmed.starts_with('#') && current_indent <= block_indent
                {
                    break;
                }

                if let Some((key, value)) = trimmed.split_once(':') {
                    let label = key.trim().trim_matches('\'').trim_matches('"');
                    let idx = value.trim().parse::<usize>().map_err(|_| {
                        ClassifyError::MetadataError(format!(
                            "Invalid training index for class '{label}': {}",
                            value.trim()
                        ))
                    })?;
                    mapping.insert(label.to_string(), idx);
                }
            }
        }

        Ok(mapping)
    }

    /// Parse a Python dict string like `'1': 0, '10': 1`.
    fn parse_python_dict(dict_str: &str) -> Result<HashMap<String, usize>> {
        let mut mapping = HashMap::new();

        for entry in dict_str.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            if let Some((key, value)) = entry.split_once(':') {
                let label = key.trim().trim_matches('\'').trim_matches('"');
                let idx = value.trim().parse::<usize>().map_err(|_| {
                    ClassifyError::MetadataError(format!(
                        "Invalid training index for class '{label}': {}",
                        value.trim()
                    ))
                })?;
                mapping.insert(label.to_string(), idx);
            }
        }

        Ok(mapping)
    }

    /// Invert `class_to_idx` into a training-index to class-label table.
    #[must_use]
    pub fn idx_to_class(&self) -> HashMap<usize, String> {
        self.class_to_idx
            .iter()
            .map(|(label, &idx)| (idx, label.clone()))
            .collect()
    }

    /// Number of classes in this bundle.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.class_to_idx.len()
    }

    /// Reject bundles exported for anything other than classification.
    ///
    /// # Errors
    ///
    /// Returns a metadata error when `task` names another task.
    pub fn ensure_classify(&self) -> Result<()> {
        if self.task.is_empty() || self.task == "classify" {
            Ok(())
        } else {
            Err(ClassifyError::MetadataError(format!(
                "Model bundle was exported for task '{}', expected 'classify'",
                self.task
            )))
        }
    }
}

impl Default for CheckpointMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            arch: String::new(),
            task: "classify".to_string(),
            epochs: 0,
            imgsz: (224, 224),
            channels: 3,
            class_to_idx: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_METADATA: &str = r"
description: vgg16 transfer-learning classifier
arch: vgg16
task: classify
epochs: 8
imgsz:
- 224
- 224
channels: 3
class_to_idx:
  '1': 0
  '10': 1
  '100': 2
  '101': 3
";

    #[test]
    fn test_parse_metadata() {
        let metadata = CheckpointMetadata::from_yaml_str(SAMPLE_METADATA).unwrap();

        assert_eq!(metadata.arch, "vgg16");
        assert_eq!(metadata.task, "classify");
        assert_eq!(metadata.epochs, 8);
        assert_eq!(metadata.imgsz, (224, 224));
        assert_eq!(metadata.channels, 3);
        assert_eq!(metadata.num_classes(), 4);
        assert_eq!(metadata.class_to_idx.get("10"), Some(&1));
        assert!(metadata.ensure_classify().is_ok());
    }

    #[test]
    fn test_idx_to_class_inversion() {
        let metadata = CheckpointMetadata::from_yaml_str(SAMPLE_METADATA).unwrap();
        let inverse = metadata.idx_to_class();
        assert_eq!(inverse.get(&0).map(String::as_str), Some("1"));
        assert_eq!(inverse.get(&2).map(String::as_str), Some("100"));
    }

    #[test]
    fn test_parse_python_dict_mapping() {
        let yaml = "arch: densenet121\nepochs: 5\nclass_to_idx: {'1': 0, '10': 1, '2': 2}";
        let metadata = CheckpointMetadata::from_yaml_str(yaml).unwrap();
        assert_eq!(metadata.num_classes(), 3);
        assert_eq!(metadata.class_to_idx.get("2"), Some(&2));
    }

    #[test]
    fn test_parse_inline_imgsz() {
        let yaml = "imgsz: [224, 224]\nclass_to_idx: {'1': 0}";
        let metadata = CheckpointMetadata::from_yaml_str(yaml).unwrap();
        assert_eq!(metadata.imgsz, (224, 224));
    }

    #[test]
    fn test_missing_class_mapping_is_error() {
        let result = CheckpointMetadata::from_yaml_str("arch: vgg16\nepochs: 3");
        assert!(matches!(result, Err(ClassifyError::MetadataError(_))));
    }

    #[test]
    fn test_non_classify_task_rejected() {
        let yaml = "task: detect\nclass_to_idx: {'1': 0}";
        let metadata = CheckpointMetadata::from_yaml_str(yaml).unwrap();
        assert!(metadata.ensure_classify().is_err());
    }

    #[test]
    fn test_from_onnx_metadata_combined_key() {
        let mut map = HashMap::new();
        map.insert(
            "metadata".to_string(),
            "arch: vgg16\nclass_to_idx: {'1': 0}".to_string(),
        );
        let metadata = CheckpointMetadata::from_onnx_metadata(&map).unwrap();
        assert_eq!(metadata.arch, "vgg16");
    }

    #[test]
    fn test_from_onnx_metadata_missing() {
        let map = HashMap::new();
        assert!(CheckpointMetadata::from_onnx_metadata(&map).is_err());
    }
}
