//! CLI utilities for deepspeaker.
//!
//! Named configuration contexts (checkpoint, threshold, segmentation) and
//! YAML/JSON result output.

pub mod config;
pub mod output;

pub use config::{Config, Context};
pub use output::{Output, OutputFormat, print_verbose};
