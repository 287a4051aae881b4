use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use super::decoder::{decode_field, Field, FieldValue, FIELD_MAP};
use super::traits::{DeviceData, StatusReader};
use crate::modbus::{
    open_serial, ModbusClient, ModbusClientTrait, ResponseBuffer, SerialSettings, Transport,
    STATUS_FRAMES,
};
use crate::utils::error::TracerError;

/// Status read from a Tracer charge controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracerStatus {
    #[serde(rename = "pvv")]
    pub array_voltage: f32, // Solar panel voltage (V)
    #[serde(rename = "pvc")]
    pub array_current: f32, // Solar panel current (A)
    #[serde(rename = "pvp")]
    pub array_power: f32, // Solar panel power (W)
    #[serde(rename = "bv")]
    pub battery_voltage: f32,
    #[serde(rename = "bc")]
    pub battery_current: f32, // Negative while discharging
    #[serde(rename = "bsoc")]
    pub battery_soc: u8, // State of charge (%)
    #[serde(rename = "btemp")]
    pub battery_temp: f32,
    #[serde(rename = "bmaxv")]
    pub battery_max_voltage: f32,
    #[serde(rename = "bminv")]
    pub battery_min_voltage: f32,
    #[serde(rename = "devtemp")]
    pub device_temp: f32,
    #[serde(rename = "lv")]
    pub load_voltage: f32,
    #[serde(rename = "lc")]
    pub load_current: f32,
    #[serde(rename = "lp")]
    pub load_power: f32,
    pub load: bool,
    #[serde(rename = "ecd")]
    pub energy_consumed_daily: f32, // kWh
    #[serde(rename = "ecm")]
    pub energy_consumed_monthly: f32,
    #[serde(rename = "eca")]
    pub energy_consumed_annual: f32,
    #[serde(rename = "ect")]
    pub energy_consumed_total: f32,
    #[serde(rename = "egd")]
    pub energy_generated_daily: f32,
    #[serde(rename = "egm")]
    pub energy_generated_monthly: f32,
    #[serde(rename = "ega")]
    pub energy_generated_annual: f32,
    #[serde(rename = "egt")]
    pub energy_generated_total: f32,
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
}

impl TracerStatus {
    /// Decodes every mapped field of a fully assembled buffer.
    pub fn from_buffer(buffer: &ResponseBuffer, timestamp: DateTime<Utc>) -> Self {
        let mut status = Self::empty(timestamp);
        for spec in FIELD_MAP.iter() {
            status.set(spec.field, decode_field(buffer, spec));
        }
        status
    }

    fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            array_voltage: 0.0,
            array_current: 0.0,
            array_power: 0.0,
            battery_voltage: 0.0,
            battery_current: 0.0,
            battery_soc: 0,
            battery_temp: 0.0,
            battery_max_voltage: 0.0,
            battery_min_voltage: 0.0,
            device_temp: 0.0,
            load_voltage: 0.0,
            load_current: 0.0,
            load_power: 0.0,
            load: false,
            energy_consumed_daily: 0.0,
            energy_consumed_monthly: 0.0,
            energy_consumed_annual: 0.0,
            energy_consumed_total: 0.0,
            energy_generated_daily: 0.0,
            energy_generated_monthly: 0.0,
            energy_generated_annual: 0.0,
            energy_generated_total: 0.0,
            timestamp,
        }
    }

    fn set(&mut self, field: Field, value: FieldValue) {
        match (field, value) {
            (Field::Load, FieldValue::Flag(on)) => self.load = on,
            (Field::BatterySoc, FieldValue::Raw(soc)) => self.battery_soc = soc,
            (field, FieldValue::Value(v)) => {
                if let Some(slot) = self.measurement_mut(field) {
                    *slot = v;
                }
            }
            (field, value) => debug!("Ignoring {:?} for field {:?}", value, field),
        }
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Load => FieldValue::Flag(self.load),
            Field::BatterySoc => FieldValue::Raw(self.battery_soc),
            Field::ArrayVoltage => FieldValue::Value(self.array_voltage),
            Field::ArrayCurrent => FieldValue::Value(self.array_current),
            Field::ArrayPower => FieldValue::Value(self.array_power),
            Field::BatteryVoltage => FieldValue::Value(self.battery_voltage),
            Field::LoadVoltage => FieldValue::Value(self.load_voltage),
            Field::LoadCurrent => FieldValue::Value(self.load_current),
            Field::LoadPower => FieldValue::Value(self.load_power),
            Field::BatteryTemp => FieldValue::Value(self.battery_temp),
            Field::DeviceTemp => FieldValue::Value(self.device_temp),
            Field::BatteryCurrent => FieldValue::Value(self.battery_current),
            Field::BatteryMaxVoltage => FieldValue::Value(self.battery_max_voltage),
            Field::BatteryMinVoltage => FieldValue::Value(self.battery_min_voltage),
            Field::EnergyConsumedDaily => FieldValue::Value(self.energy_consumed_daily),
            Field::EnergyConsumedMonthly => FieldValue::Value(self.energy_consumed_monthly),
            Field::EnergyConsumedAnnual => FieldValue::Value(self.energy_consumed_annual),
            Field::EnergyConsumedTotal => FieldValue::Value(self.energy_consumed_total),
            Field::EnergyGeneratedDaily => FieldValue::Value(self.energy_generated_daily),
            Field::EnergyGeneratedMonthly => FieldValue::Value(self.energy_generated_monthly),
            Field::EnergyGeneratedAnnual => FieldValue::Value(self.energy_generated_annual),
            Field::EnergyGeneratedTotal => FieldValue::Value(self.energy_generated_total),
        }
    }

    fn measurement_mut(&mut self, field: Field) -> Option<&mut f32> {
        let slot = match field {
            Field::ArrayVoltage => &mut self.array_voltage,
            Field::ArrayCurrent => &mut self.array_current,
            Field::ArrayPower => &mut self.array_power,
            Field::BatteryVoltage => &mut self.battery_voltage,
            Field::LoadVoltage => &mut self.load_voltage,
            Field::LoadCurrent => &mut self.load_current,
            Field::LoadPower => &mut self.load_power,
            Field::BatteryTemp => &mut self.battery_temp,
            Field::DeviceTemp => &mut self.device_temp,
            Field::BatteryCurrent => &mut self.battery_current,
            Field::BatteryMaxVoltage => &mut self.battery_max_voltage,
            Field::BatteryMinVoltage => &mut self.battery_min_voltage,
            Field::EnergyConsumedDaily => &mut self.energy_consumed_daily,
            Field::EnergyConsumedMonthly => &mut self.energy_consumed_monthly,
            Field::EnergyConsumedAnnual => &mut self.energy_consumed_annual,
            Field::EnergyConsumedTotal => &mut self.energy_consumed_total,
            Field::EnergyGeneratedDaily => &mut self.energy_generated_daily,
            Field::EnergyGeneratedMonthly => &mut self.energy_generated_monthly,
            Field::EnergyGeneratedAnnual => &mut self.energy_generated_annual,
            Field::EnergyGeneratedTotal => &mut self.energy_generated_total,
            Field::Load | Field::BatterySoc => return None,
        };
        Some(slot)
    }
}

fn unit(field: Field) -> &'static str {
    match field {
        Field::Load => "",
        Field::BatterySoc => "%",
        Field::ArrayVoltage
        | Field::BatteryVoltage
        | Field::LoadVoltage
        | Field::BatteryMaxVoltage
        | Field::BatteryMinVoltage => "V",
        Field::ArrayCurrent | Field::LoadCurrent | Field::BatteryCurrent => "A",
        Field::ArrayPower | Field::LoadPower => "W",
        Field::BatteryTemp | Field::DeviceTemp => "°C",
        _ => "kWh",
    }
}

fn format_value(value: FieldValue) -> String {
    match value {
        FieldValue::Flag(on) => on.to_string(),
        FieldValue::Raw(raw) => raw.to_string(),
        FieldValue::Value(v) => format!("{:.2}", v),
    }
}

impl fmt::Display for TracerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for spec in FIELD_MAP.iter() {
            let value = format_value(self.get(spec.field));
            match spec.field {
                Field::BatterySoc => writeln!(f, "{}: {}%", spec.name, value)?,
                _ => writeln!(f, "{}: {}", spec.name, value)?,
            }
        }
        Ok(())
    }
}

impl DeviceData for TracerStatus {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn get_parameter(&self, name: &str) -> Option<String> {
        let spec = FIELD_MAP.iter().find(|s| s.name.eq_ignore_ascii_case(name))?;
        let value = format_value(self.get(spec.field));
        match unit(spec.field) {
            "" => Some(value),
            "%" => Some(format!("{}%", value)),
            suffix => Some(format!("{} {}", value, suffix)),
        }
    }

    fn get_all_parameters(&self) -> Vec<(String, String)> {
        FIELD_MAP
            .iter()
            .map(|spec| (spec.name.to_string(), format_value(self.get(spec.field))))
            .collect()
    }

    fn get_parameters_as_floats(&self) -> HashMap<String, f32> {
        FIELD_MAP
            .iter()
            .map(|spec| {
                let v = match self.get(spec.field) {
                    FieldValue::Flag(on) => if on { 1.0 } else { 0.0 },
                    FieldValue::Raw(raw) => raw as f32,
                    FieldValue::Value(v) => v,
                };
                (spec.name.to_string(), v)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    NotStarted,
    Sending(usize),
    Awaiting(usize),
    Placed(usize),
    Decoding,
    Complete,
    Failed,
}

/// One status query: five strictly sequential exchanges, then decoding.
///
/// Owns its response buffer; a failure at any step ends the query with no snapshot.
#[derive(Debug)]
pub struct StatusQuery {
    buffer: ResponseBuffer,
    state: QueryState,
}

impl StatusQuery {
    pub fn new() -> Self {
        Self {
            buffer: ResponseBuffer::new(),
            state: QueryState::NotStarted,
        }
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn buffer(&self) -> &ResponseBuffer {
        &self.buffer
    }

    fn enter(&mut self, next: QueryState) {
        debug!("Query {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub async fn run(&mut self, client: &dyn ModbusClientTrait) -> Result<TracerStatus, TracerError> {
        debug_assert_eq!(self.state, QueryState::NotStarted, "status query already ran");

        if let Err(e) = self.collect(client).await {
            self.enter(QueryState::Failed);
            return Err(e);
        }

        self.enter(QueryState::Decoding);
        let status = TracerStatus::from_buffer(&self.buffer, Utc::now());
        self.enter(QueryState::Complete);
        Ok(status)
    }

    async fn collect(&mut self, client: &dyn ModbusClientTrait) -> Result<(), TracerError> {
        for (i, frame) in STATUS_FRAMES.iter().enumerate() {
            let step = i + 1;
            self.enter(QueryState::Sending(step));
            let reply = client
                .exchange(step, frame, &mut || self.enter(QueryState::Awaiting(step)))
                .await?;

            self.buffer.place(frame, &reply);
            self.enter(QueryState::Placed(step));
        }
        Ok(())
    }
}

impl Default for StatusQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one status query over `transport`, which is closed before returning on every path.
pub async fn query_status<T: Transport>(transport: T, timeout: Duration) -> Result<TracerStatus, TracerError> {
    let client = ModbusClient::new(transport, timeout);
    let mut query = StatusQuery::new();
    let result = query.run(&client).await;
    client.release().await;
    result
}

/// Reads status over a serial port, opening it for each query.
#[derive(Debug, Clone)]
pub struct TracerClient {
    settings: SerialSettings,
}

impl TracerClient {
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl StatusReader for TracerClient {
    fn device_type(&self) -> &str {
        "Tracer"
    }

    fn port_name(&self) -> &str {
        &self.settings.port_name
    }

    async fn read_status(&self) -> Result<TracerStatus, TracerError> {
        let port = open_serial(&self.settings)?;
        let result = query_status(port, self.settings.timeout).await;
        info!("🔌 Released port {}", self.settings.port_name);
        result
    }
}
