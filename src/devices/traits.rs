use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

use super::tracer::TracerStatus;
use crate::utils::error::TracerError;

/// Anything that can produce one status snapshot per call.
#[async_trait]
pub trait StatusReader: Send + Sync {
    fn device_type(&self) -> &str;
    fn port_name(&self) -> &str;

    async fn read_status(&self) -> Result<TracerStatus, TracerError>;
}

pub trait DeviceData: Send + Sync {
    fn timestamp(&self) -> DateTime<Utc>;

    fn to_json(&self) -> Value;
    fn get_parameter(&self, name: &str) -> Option<String>;
    fn get_all_parameters(&self) -> Vec<(String, String)>;
    fn get_parameters_as_floats(&self) -> HashMap<String, f32>;
}
