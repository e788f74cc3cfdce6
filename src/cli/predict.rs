// flora-inference 🚀 AGPL-3.0 License

use std::process;

use crate::cli::args::Cli;
use crate::device::Device;
use crate::error::Result;
use crate::labels::CategoryNames;
use crate::model::ClassifierModel;
use crate::{error, verbose, warn, InferenceConfig, VERSION};

/// Run the classification pipeline for the parsed CLI arguments.
///
/// Any failure is printed as an error line and terminates the process with
/// exit code 1.
pub fn run_prediction(args: &Cli) {
    crate::cli::logging::set_verbose(args.verbose);

    if let Err(e) = predict(args) {
        error!("{e}");
        process::exit(1);
    }
}

fn predict(args: &Cli) -> Result<()> {
    let device = resolve_device(args)?;

    // Both input paths are checked before any model work happens.
    if !args.image.exists() {
        return Err(crate::error::ClassifyError::ImageError(format!(
            "Image not found: {}",
            args.image.display()
        )));
    }

    let names = CategoryNames::load(&args.category_names)?;

    let config = InferenceConfig::new().with_device(device);
    let mut model = ClassifierModel::load_with_config(&args.checkpoint, config)?;

    verbose!("flora-inference {VERSION} ({device})");
    verbose!("loaded model successfully");
    verbose!(
        "{} summary: {} classes, trained {} epochs, imgsz=({}, {})",
        model.arch(),
        model.num_classes(),
        model.metadata().epochs,
        model.imgsz().0,
        model.imgsz().1
    );
    verbose!("");

    let prediction = model.predict(&args.image)?;

    if prediction.probs.len() != model.num_classes() {
        warn!(
            "Model produced {} outputs but the bundle maps {} classes",
            prediction.probs.len(),
            model.num_classes()
        );
    }

    let ranked = prediction.rank(args.top_k, model.metadata(), &names)?;

    verbose!(
        "image {}: {}x{}, {:.1}ms",
        prediction.path,
        prediction.orig_shape.0,
        prediction.orig_shape.1,
        prediction.speed.inference.unwrap_or(0.0)
    );

    for (rank, entry) in ranked.iter().enumerate() {
        println!(
            "{:2}. {:40} {:6.2}%  (class {})",
            rank + 1,
            entry.name,
            f64::from(entry.probability) * 100.0,
            entry.label
        );
    }

    verbose!("");
    verbose!(
        "Speed: {:.1}ms preprocess, {:.1}ms inference, {:.1}ms postprocess",
        prediction.speed.preprocess.unwrap_or(0.0),
        prediction.speed.inference.unwrap_or(0.0),
        prediction.speed.postprocess.unwrap_or(0.0)
    );

    Ok(())
}

/// Resolve the compute device from the CLI arguments.
///
/// An explicit `--device` string wins over the `--accelerator` preference.
fn resolve_device(args: &Cli) -> Result<Device> {
    match &args.device {
        Some(s) => s
            .parse::<Device>()
            .map_err(crate::error::ClassifyError::ConfigError),
        None => Device::from_accelerator(&args.accelerator),
    }
}
