pub mod decoder;
pub mod traits;
pub mod tracer;

pub use decoder::{unpack, Field, FieldKind, FieldSpec, FieldValue, FIELD_MAP};
pub use traits::{DeviceData, StatusReader};
pub use tracer::{query_status, QueryState, StatusQuery, TracerClient, TracerStatus};
