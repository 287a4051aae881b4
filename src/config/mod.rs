pub mod settings;

pub use settings::{Config, OutputConfig, OUTPUT_FORMATS};
