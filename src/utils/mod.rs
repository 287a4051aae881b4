pub mod error;

pub use error::TracerError;
