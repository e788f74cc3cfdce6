// flora-inference 🚀 AGPL-3.0 License

//! Model bundle loading and the forward pass.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use image::DynamicImage;
use ort::session::Session;
use ort::value::TensorRef;

#[cfg(feature = "coreml")]
use ort::execution_providers::CoreMLExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;

use crate::checkpoint::CheckpointMetadata;
use crate::device::Device;
use crate::error::{ClassifyError, Result};
use crate::inference::InferenceConfig;
use crate::postprocessing::normalize_probs;
use crate::preprocessing::preprocess_image;
use crate::results::{Prediction, Speed};

/// Image classifier backed by an ONNX Runtime session.
///
/// # Example
///
/// ```no_run
/// use flora_inference::ClassifierModel;
///
/// let mut model = ClassifierModel::load("checkpoint.onnx").unwrap();
/// let prediction = model.predict("image.jpg").unwrap();
/// println!("top-1 confidence {:.3}", prediction.probs.top1conf());
/// ```
pub struct ClassifierModel {
    /// ONNX Runtime session.
    session: Session,
    /// Training metadata carried by the bundle.
    metadata: CheckpointMetadata,
    /// Input tensor name.
    input_name: String,
    /// Output tensor names.
    output_names: Vec<String>,
    /// Whether model has been warmed up.
    warmed_up: bool,
}

impl ClassifierModel {
    /// Load a classification bundle with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle file doesn't exist or can't be loaded.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_config(path, InferenceConfig::default())
    }

    /// Load a classification bundle with a custom configuration.
    ///
    /// The session is created with graph optimizations enabled and the
    /// execution provider matching the configured device. The bundle's
    /// training metadata (architecture, `class_to_idx`, epochs) is extracted
    /// from the model's custom metadata properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle file doesn't exist, the session can't
    /// be created, the requested device isn't available in this build, or
    /// the metadata is missing or malformed.
    pub fn load_with_config<P: AsRef<Path>>(path: P, config: InferenceConfig) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ClassifyError::ModelLoadError(format!(
                "Model bundle not found: {}",
                path.display()
            )));
        }

        #[allow(unused_mut)]
        let mut builder = Session::builder().map_err(|e| {
            ClassifyError::ModelLoadError(format!("Failed to create session builder: {e}"))
        })?;

        match config.device.unwrap_or(Device::Cpu) {
            Device::Cpu => {}
            Device::Cuda(device_id) => {
                #[cfg(feature = "cuda")]
                {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    let provider = CUDAExecutionProvider::default()
                        .with_device_id(device_id as i32)
                        .build()
                        .error_on_failure();
                    builder = builder.with_execution_providers([provider]).map_err(|e| {
                        ClassifyError::ModelLoadError(format!("Failed to register CUDA EP: {e}"))
                    })?;
                }
                #[cfg(not(feature = "cuda"))]
                {
                    let _ = device_id;
                    return Err(ClassifyError::FeatureNotEnabled(
                        "CUDA device requested but this build has no 'cuda' feature; \
                         rerun with --accelerator no or rebuild with --features cuda"
                            .to_string(),
                    ));
                }
            }
            Device::CoreMl => {
                #[cfg(feature = "coreml")]
                {
                    let provider = CoreMLExecutionProvider::default()
                        .build()
                        .error_on_failure();
                    builder = builder.with_execution_providers([provider]).map_err(|e| {
                        ClassifyError::ModelLoadError(format!("Failed to register CoreML EP: {e}"))
                    })?;
                }
                #[cfg(not(feature = "coreml"))]
                {
                    return Err(ClassifyError::FeatureNotEnabled(
                        "CoreML requested but this build has no 'coreml' feature".to_string(),
                    ));
                }
            }
        }

        let session = builder
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| {
                ClassifyError::ModelLoadError(format!("Failed to set optimization level: {e}"))
            })?
            .with_intra_threads(config.num_threads)
            .map_err(|e| {
                ClassifyError::ModelLoadError(format!("Failed to set intra-thread count: {e}"))
            })?
            .commit_from_file(path)
            .map_err(|e| ClassifyError::ModelLoadError(format!("Failed to load model: {e}")))?;

        let metadata = Self::extract_metadata(&session)?;
        metadata.ensure_classify()?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "input".to_string());

        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();

        Ok(Self {
            session,
            metadata,
            input_name,
            output_names,
            warmed_up: false,
        })
    }

    /// Warm up the model by running one dummy forward pass.
    ///
    /// Pre-allocates memory and settles the execution graph; called lazily
    /// before the first real prediction.
    ///
    /// # Errors
    ///
    /// Returns an error if the dummy forward pass fails.
    pub fn warmup(&mut self) -> Result<()> {
        if self.warmed_up {
            return Ok(());
        }

        let (height, width) = self.metadata.imgsz;
        let dummy_input = ndarray::Array4::<f32>::zeros((1, self.metadata.channels, height, width));
        let _ = self.run_inference(&dummy_input)?;

        self.warmed_up = true;
        Ok(())
    }

    /// Extract the training metadata from the session's custom properties.
    fn extract_metadata(session: &Session) -> Result<CheckpointMetadata> {
        let model_metadata = session.metadata().map_err(|e| {
            ClassifyError::ModelLoadError(format!("Failed to get model metadata: {e}"))
        })?;

        // The exporter stores metadata either under individual keys or as a
        // single YAML value.
        let keys = [
            "description",
            "arch",
            "task",
            "epochs",
            "imgsz",
            "channels",
            "class_to_idx",
        ];

        let mut metadata_map: HashMap<String, String> = HashMap::new();
        for key in &keys {
            if let Some(value) = model_metadata.custom(key) {
                metadata_map.insert((*key).to_string(), value);
            }
        }

        if !metadata_map.is_empty() {
            let mut yaml_parts = Vec::new();
            for (key, value) in &metadata_map {
                yaml_parts.push(format!("{key}: {value}"));
            }
            let mut combined_map = HashMap::new();
            combined_map.insert("metadata".to_string(), yaml_parts.join("\n"));
            return CheckpointMetadata::from_onnx_metadata(&combined_map);
        }

        for key in &["metadata", "checkpoint"] {
            if let Some(value) = model_metadata.custom(key) {
                metadata_map.insert((*key).to_string(), value);
            }
        }

        CheckpointMetadata::from_onnx_metadata(&metadata_map)
    }

    /// Run the full pipeline on an image file.
    ///
    /// # Errors
    ///
    /// Returns an error if the image can't be loaded or the forward pass
    /// fails.
    pub fn predict<P: AsRef<Path>>(&mut self, path: P) -> Result<Prediction> {
        let path = path.as_ref();

        let img = image::open(path).map_err(|e| {
            ClassifyError::ImageError(format!("Failed to load image {}: {e}", path.display()))
        })?;

        self.predict_image(&img, path.to_string_lossy().to_string())
    }

    /// Run the full pipeline on a decoded image.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or the forward pass fails.
    pub fn predict_image(&mut self, image: &DynamicImage, path: String) -> Result<Prediction> {
        if !self.warmed_up {
            self.warmup()?;
        }

        let start_preprocess = Instant::now();
        let preprocessed = preprocess_image(image)?;
        let preprocess_time = start_preprocess.elapsed().as_secs_f64() * 1000.0;

        let start_inference = Instant::now();
        let output = self.run_inference(&preprocessed.tensor)?;
        let inference_time = start_inference.elapsed().as_secs_f64() * 1000.0;

        let start_postprocess = Instant::now();
        let probs = normalize_probs(&output)?;
        let postprocess_time = start_postprocess.elapsed().as_secs_f64() * 1000.0;

        let speed = Speed::new(preprocess_time, inference_time, postprocess_time);

        Ok(Prediction::new(path, preprocessed.orig_shape, probs, speed))
    }

    /// Run the ONNX forward pass and return the flattened output tensor.
    fn run_inference(&mut self, input: &ndarray::Array4<f32>) -> Result<Vec<f32>> {
        let input_contiguous = input.as_standard_layout();

        let input_tensor = TensorRef::from_array_view(&input_contiguous).map_err(|e| {
            ClassifyError::InferenceError(format!("Failed to create input tensor: {e}"))
        })?;

        let inputs = ort::inputs![&self.input_name => input_tensor];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| ClassifyError::InferenceError(format!("Forward pass failed: {e}")))?;

        let output_name = self.output_names.first().ok_or_else(|| {
            ClassifyError::InferenceError("Model has no output tensors".to_string())
        })?;
        let output = outputs.get(output_name.as_str()).ok_or_else(|| {
            ClassifyError::InferenceError(format!("Output '{output_name}' not found"))
        })?;

        let (_shape, data) = output.try_extract_tensor::<f32>().map_err(|e| {
            ClassifyError::InferenceError(format!("Failed to extract output: {e}"))
        })?;

        Ok(data.to_vec())
    }

    /// Get the bundle's training metadata.
    #[must_use]
    pub const fn metadata(&self) -> &CheckpointMetadata {
        &self.metadata
    }

    /// Get the number of classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.metadata.num_classes()
    }

    /// Get the architecture reference recorded in the bundle.
    #[must_use]
    pub fn arch(&self) -> &str {
        &self.metadata.arch
    }

    /// Get the model's input size as (height, width).
    #[must_use]
    pub const fn imgsz(&self) -> (usize, usize) {
        self.metadata.imgsz
    }
}

impl std::fmt::Debug for ClassifierModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierModel")
            .field("arch", &self.metadata.arch)
            .field("num_classes", &self.metadata.num_classes())
            .field("imgsz", &self.metadata.imgsz)
            .field("epochs", &self.metadata.epochs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found() {
        let result = ClassifierModel::load("nonexistent.onnx");
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ClassifyError::ModelLoadError(_)
        ));
    }
}
