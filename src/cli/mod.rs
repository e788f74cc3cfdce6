// flora-inference 🚀 AGPL-3.0 License

//! Command-line interface.
//!
//! Argument parsing, console output helpers, and the prediction entry point.

// Modules
/// CLI arguments.
pub mod args;

/// Console output helpers.
pub mod logging;

/// Prediction entry point.
pub mod predict;
