//! Interpreting ATA SMART attributes
//!
//! A drive reports SMART attributes only by number. What each number
//! means (and in what units) is a matter of convention, which varies
//! between vendors; see [`crate::database`].
use crate::ata::{SmartDataEntry, SmartThresholdEntry};
use serde::Serialize;
use std::collections::BTreeMap;

/// Unit hint for an attribute's value
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Unit {
    #[default]
    Unknown = 0,
    Celsius = 10,
    Milliseconds = 20,
    Hours = 21,
    Count = 30,
}

/// Transformation from the reported value to a meaningful one
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Processor {
    #[default]
    Identity,
    /// Used by attributes (such as airflow temperature) which count
    /// down from 100
    HundredMinusValue,
}

impl Processor {
    pub fn apply(self, v: u8) -> i32 {
        match self {
            Self::Identity => i32::from(v),
            Self::HundredMinusValue => 100 - i32::from(v),
        }
    }
}

/// One SMART attribute: its meaning, and (once read from a device)
/// its values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartAttribute {
    pub name: &'static str,
    pub id: u8,
    pub flags: u16,
    pub unit: Unit,
    pub processor: Processor,
    pub current_value: Option<u8>,
    pub worst_value: Option<u8>,
    pub threshold: Option<u8>,
    /// Vendor-specific raw bytes, as a 48-bit integer
    pub raw_value: Option<u64>,
}

impl SmartAttribute {
    pub const fn new(id: u8, name: &'static str, unit: Unit) -> Self {
        Self {
            name,
            id,
            flags: 0,
            unit,
            processor: Processor::Identity,
            current_value: None,
            worst_value: None,
            threshold: None,
            raw_value: None,
        }
    }

    pub const fn with_processor(mut self, processor: Processor) -> Self {
        self.processor = processor;
        self
    }

    /// Placeholder for an attribute missing from the database
    pub const fn unknown(id: u8) -> Self {
        Self::new(id, "UNKNOWN", Unit::Unknown)
    }

    pub fn processed_value(&self) -> Option<i32> {
        self.current_value.map(|v| self.processor.apply(v))
    }

    pub fn processed_worst_value(&self) -> Option<i32> {
        self.worst_value.map(|v| self.processor.apply(v))
    }

    /// Pre-failure/advisory bit
    pub fn is_prefailure(&self) -> bool {
        (self.flags & 1) != 0
    }

    /// Whether the value has fallen to (or below) the threshold
    ///
    /// Threshold zero means "never fails".
    pub fn is_failing(&self) -> bool {
        match (self.current_value, self.threshold) {
            (Some(v), Some(t)) => t != 0 && v <= t,
            _ => false,
        }
    }
}

/// Combine a drive's attribute values with their meanings
///
/// Both lists are read up to the first id-zero entry. Any attribute
/// not in `table` is reported as "UNKNOWN".
pub fn interpret(
    entries: &[SmartDataEntry],
    thresholds: &[SmartThresholdEntry],
    table: &BTreeMap<u8, SmartAttribute>,
) -> BTreeMap<u8, SmartAttribute> {
    let thresholds: BTreeMap<u8, u8> = thresholds
        .iter()
        .take_while(|t| t.id != 0)
        .map(|t| (t.id, t.threshold))
        .collect();

    let mut result = BTreeMap::new();
    for e in entries.iter().take_while(|e| e.id != 0) {
        let mut a = match table.get(&e.id) {
            Some(a) => a.clone(),
            None => {
                log::debug!("attribute {:#04x} not in database", e.id);
                SmartAttribute::unknown(e.id)
            }
        };
        a.flags = e.flags();
        a.current_value = Some(e.current);
        a.worst_value = Some(e.worst);
        a.threshold = thresholds.get(&e.id).copied();
        a.raw_value = Some(e.raw_value());
        if result.insert(e.id, a).is_some() {
            log::warn!("attribute {:#04x} reported twice", e.id);
        }
    }
    result
}

#[cfg(test)]
#[path = "tests/attribute.rs"]
mod tests;
