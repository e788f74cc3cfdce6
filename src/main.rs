// flora-inference 🚀 AGPL-3.0 License

use clap::Parser;

use flora_inference::cli::args::Cli;
use flora_inference::cli::predict::run_prediction;

fn main() {
    let args = Cli::parse();
    run_prediction(&args);
}
