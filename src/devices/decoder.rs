//! Fixed-offset field decoding for the assembled Tracer response buffer.
//!
//! All multi-byte fields are big-endian. Scaled fields carry two decimals
//! (raw / 100). Battery current is the only signed field.

use crate::modbus::ResponseBuffer;

pub const SCALE_DIVISOR: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Load,
    ArrayVoltage,
    ArrayCurrent,
    ArrayPower,
    BatteryVoltage,
    LoadVoltage,
    LoadCurrent,
    LoadPower,
    BatteryTemp,
    DeviceTemp,
    BatterySoc,
    BatteryCurrent,
    BatteryMaxVoltage,
    BatteryMinVoltage,
    EnergyConsumedDaily,
    EnergyConsumedMonthly,
    EnergyConsumedAnnual,
    EnergyConsumedTotal,
    EnergyGeneratedDaily,
    EnergyGeneratedMonthly,
    EnergyGeneratedAnnual,
    EnergyGeneratedTotal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single byte, on only when it equals 1.
    Flag,
    /// Single byte taken as-is.
    Raw,
    /// Unsigned, divided by 100.
    Scaled,
    /// 16-bit two's complement, divided by 100.
    SignedScaled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub name: &'static str,
    pub offset: usize,
    pub len: usize,
    pub kind: FieldKind,
}

const fn spec(field: Field, name: &'static str, offset: usize, len: usize, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        field,
        name,
        offset,
        len,
        kind,
    }
}

use FieldKind::{Flag, Raw, Scaled, SignedScaled};

pub static FIELD_MAP: [FieldSpec; 22] = [
    spec(Field::Load, "Load", 8, 1, Flag),
    spec(Field::ArrayVoltage, "ArrayVoltage", 24, 2, Scaled),
    spec(Field::ArrayCurrent, "ArrayCurrent", 26, 2, Scaled),
    spec(Field::ArrayPower, "ArrayPower", 28, 2, Scaled),
    spec(Field::BatteryVoltage, "BatteryVoltage", 32, 2, Scaled),
    spec(Field::LoadVoltage, "LoadVoltage", 40, 2, Scaled),
    spec(Field::LoadCurrent, "LoadCurrent", 42, 2, Scaled),
    spec(Field::LoadPower, "LoadPower", 44, 2, Scaled),
    spec(Field::BatteryTemp, "BatteryTemp", 56, 2, Scaled),
    spec(Field::DeviceTemp, "DeviceTemp", 58, 2, Scaled),
    spec(Field::BatterySoc, "BatterySOC", 65, 1, Raw),
    spec(Field::BatteryCurrent, "BatteryCurrent", 73, 2, SignedScaled),
    spec(Field::BatteryMaxVoltage, "BatteryMaxVoltage", 82, 2, Scaled),
    spec(Field::BatteryMinVoltage, "BatteryMinVoltage", 84, 2, Scaled),
    spec(Field::EnergyConsumedDaily, "EnergyConsumedDaily", 86, 2, Scaled),
    spec(Field::EnergyConsumedMonthly, "EnergyConsumedMonthly", 88, 4, Scaled),
    spec(Field::EnergyConsumedAnnual, "EnergyConsumedAnnual", 92, 4, Scaled),
    spec(Field::EnergyConsumedTotal, "EnergyConsumedTotal", 96, 4, Scaled),
    spec(Field::EnergyGeneratedDaily, "EnergyGeneratedDaily", 100, 4, Scaled),
    spec(Field::EnergyGeneratedMonthly, "EnergyGeneratedMonthly", 104, 4, Scaled),
    spec(Field::EnergyGeneratedAnnual, "EnergyGeneratedAnnual", 108, 4, Scaled),
    spec(Field::EnergyGeneratedTotal, "EnergyGeneratedTotal", 112, 4, Scaled),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Flag(bool),
    Raw(u8),
    Value(f32),
}

/// Big-endian unsigned integer of up to four bytes; the first byte is most significant.
pub fn unpack_raw(bytes: &[u8]) -> u32 {
    debug_assert!(bytes.len() <= 4, "field wider than 32 bits");
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

pub fn unpack(bytes: &[u8]) -> f32 {
    unpack_raw(bytes) as f32
}

/// Reinterprets a 16-bit register value as two's complement.
pub fn sign_correct_16(raw: u32) -> i32 {
    if raw >= 0x8000 {
        raw as i32 - 0x1_0000
    } else {
        raw as i32
    }
}

pub fn scale(raw: f32) -> f32 {
    raw / SCALE_DIVISOR
}

pub fn decode_field(buffer: &ResponseBuffer, spec: &FieldSpec) -> FieldValue {
    let bytes = buffer.slice(spec.offset, spec.len);
    match spec.kind {
        FieldKind::Flag => FieldValue::Flag(bytes[0] == 1),
        FieldKind::Raw => FieldValue::Raw(bytes[0]),
        FieldKind::Scaled => FieldValue::Value(scale(unpack(bytes))),
        FieldKind::SignedScaled => FieldValue::Value(scale(sign_correct_16(unpack_raw(bytes)) as f32)),
    }
}
