// flora-inference 🚀 AGPL-3.0 License

#![allow(clippy::multiple_crate_versions)]

//! # flora-inference
//!
//! Top-K image classification for pretrained flower-classifier bundles,
//! backed by ONNX Runtime.
//!
//! Given an image and a model bundle exported from an external training
//! pipeline, this crate preprocesses the image (resize, center crop,
//! ImageNet normalization), runs a single forward pass, and reports the
//! K most probable classes with their display names.
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use flora_inference::{CategoryNames, ClassifierModel};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let names = CategoryNames::load("cat_to_name.json")?;
//!     let mut model = ClassifierModel::load("checkpoint.onnx")?;
//!
//!     let prediction = model.predict("image.jpg")?;
//!     for entry in prediction.rank(5, model.metadata(), &names)? {
//!         println!("{:40} {:.2}%", entry.name, entry.probability * 100.0);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Top-5 predictions with default settings
//! flora-inference flowers/test/1/image_06743.jpg checkpoint.onnx
//!
//! # Top-3, explicit names file, CPU only
//! flora-inference image.jpg checkpoint.onnx --top-k 3 \
//!     --category-names names.json --accelerator no
//! ```
//!
//! **CLI Options:**
//!
//! | Argument | Description | Default |
//! |----------|-------------|---------|
//! | `IMAGE` | Path to input image | required |
//! | `CHECKPOINT` | Path to model bundle | required |
//! | `--top-k` | Number of ranked predictions | `5` |
//! | `--category-names` | JSON label → name map | `./cat_to_name.json` |
//! | `--accelerator` | Accelerated device (yes/no) | `yes` |
//! | `--device` | Explicit device, overrides `--accelerator` | |
//! | `--verbose` | Per-stage output and timings | `true` |
//!
//! ## Hardware Acceleration
//!
//! Execution providers are gated behind Cargo features:
//!
//! ```bash
//! # NVIDIA CUDA
//! cargo build --release --features cuda
//!
//! # Apple CoreML
//! cargo build --release --features coreml
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`model`] | [`ClassifierModel`] for loading bundles and running the forward pass |
//! | [`checkpoint`] | [`CheckpointMetadata`] training metadata parsing |
//! | [`preprocessing`] | Resize / center-crop / normalize transform |
//! | [`postprocessing`] | Probability normalization |
//! | [`results`] | [`Prediction`], [`Probs`], [`RankedClass`], [`Speed`] |
//! | [`labels`] | [`CategoryNames`] JSON label → name table |
//! | [`device`] | [`Device`] selection |
//! | [`error`] | [`ClassifyError`], [`Result`] |

// Modules
pub mod checkpoint;
pub mod cli;
pub mod device;
pub mod error;
pub mod inference;
pub mod labels;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;
pub mod results;

// Re-export main types for convenience
pub use checkpoint::CheckpointMetadata;
pub use device::Device;
pub use error::{ClassifyError, Result};
pub use inference::InferenceConfig;
pub use labels::CategoryNames;
pub use model::ClassifierModel;
pub use results::{Prediction, Probs, RankedClass, Speed};

// Re-export preprocessing utilities
pub use preprocessing::{preprocess_image, PreprocessResult};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "flora-inference");
    }
}
