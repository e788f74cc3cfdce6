// flora-inference 🚀 AGPL-3.0 License

use std::path::PathBuf;

use clap::Parser;

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = r"Examples:
    flora-inference flowers/test/1/image_06743.jpg checkpoint.onnx
    flora-inference image.jpg checkpoint.onnx --top-k 3
    flora-inference image.jpg checkpoint.onnx --category-names names.json
    flora-inference image.jpg checkpoint.onnx --accelerator no
    flora-inference image.jpg checkpoint.onnx --device cuda:1")]
pub struct Cli {
    /// Path to the input image
    pub image: PathBuf,

    /// Path to the trained model bundle
    pub checkpoint: PathBuf,

    /// Number of ranked predictions to report
    #[arg(long, default_value_t = 5)]
    pub top_k: usize,

    /// JSON file mapping class labels to display names
    #[arg(long, default_value = "./cat_to_name.json")]
    pub category_names: PathBuf,

    /// Use an accelerated compute device (yes/no)
    #[arg(long, default_value = "yes", value_parser = ["yes", "no"])]
    pub accelerator: String,

    /// Explicit device (cpu, cuda, cuda:N, coreml); overrides --accelerator
    #[arg(long)]
    pub device: Option<String>,

    /// Show per-stage output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}
