//! Drive quirk database
//!
//! SMART specifies how to *fetch* attribute values, not what they
//! mean. The database maps attribute ids to names, units, and value
//! transformations: a general-purpose "Default" entry, then
//! vendor/model-specific entries which override it id-by-id.
//!
//! Entries are selected by matching their filters against a device's
//! filter tokens, such as `["type:ata", "model:Samsung SSD 860 EVO 1TB"]`.
use crate::attribute::{Processor, SmartAttribute, Unit};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// One condition on a device's filter tokens
#[derive(Debug, Clone)]
pub enum Filter {
    /// The token must be present
    Exact(String),
    /// At least one token must match (at its start)
    Pattern { source: String, regex: Regex },
}

impl Filter {
    pub fn exact(token: &str) -> Self {
        Self::Exact(token.to_string())
    }

    /// A pattern filter; anchored at the start of the token, but not
    /// at the end
    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern {
            source: source.to_string(),
            regex: Regex::new(&format!("^(?:{source})"))?,
        })
    }

    pub fn matches<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        match self {
            Self::Exact(s) => tokens.iter().any(|t| t.as_ref() == s),
            Self::Pattern { regex, .. } => {
                tokens.iter().any(|t| regex.is_match(t.as_ref()))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(s) => s,
            Self::Pattern { source, .. } => source,
        }
    }
}

/// A set of attribute definitions, and the drives they apply to
#[derive(Debug, Clone)]
pub struct DriveEntry {
    pub name: String,
    pub filters: Vec<Filter>,
    pub smart_attributes: BTreeMap<u8, SmartAttribute>,
    /// Maintainer notes
    pub notes: Vec<String>,
}

impl DriveEntry {
    pub fn new(name: &str, filters: Vec<Filter>) -> Self {
        Self {
            name: name.to_string(),
            filters,
            smart_attributes: BTreeMap::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_attributes(
        mut self,
        attributes: impl IntoIterator<Item = SmartAttribute>,
    ) -> Self {
        self.smart_attributes
            .extend(attributes.into_iter().map(|a| (a.id, a)));
        self
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.notes.push(note.to_string());
        self
    }

    /// Whether every one of this entry's filters matches
    pub fn matches<S: AsRef<str>>(&self, tokens: &[S]) -> bool {
        self.filters.iter().all(|f| f.matches(tokens))
    }
}

/// Exported form of an attribute definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeView {
    pub id: u8,
    pub name: &'static str,
    pub unit: Unit,
}

/// Exported form of a [`DriveEntry`], for external tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriveEntryView {
    pub name: String,
    pub filters: Vec<String>,
    pub smart_attributes: Vec<AttributeView>,
}

/// An ordered list of drive entries
///
/// Order matters: when several entries match, later ones override
/// earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Database {
    entries: Vec<DriveEntry>,
}

impl Database {
    pub fn new(entries: Vec<DriveEntry>) -> Self {
        Self { entries }
    }

    /// The built-in database, built on first use
    pub fn builtin() -> &'static Database {
        static DATABASE: OnceLock<Database> = OnceLock::new();
        DATABASE.get_or_init(|| Database::new(builtin_entries()))
    }

    pub fn entries(&self) -> &[DriveEntry] {
        &self.entries
    }

    /// Matching entries, in declaration order
    pub fn matching_entries<S: AsRef<str>>(
        &self,
        tokens: &[S],
    ) -> Vec<&DriveEntry> {
        self.entries.iter().filter(|e| e.matches(tokens)).collect()
    }

    /// Merge the attributes of all matching entries; the last entry to
    /// define an id wins
    pub fn effective_table<S: AsRef<str>>(
        &self,
        tokens: &[S],
    ) -> BTreeMap<u8, SmartAttribute> {
        let mut table = BTreeMap::new();
        for e in self.matching_entries(tokens) {
            table.extend(
                e.smart_attributes.iter().map(|(id, a)| (*id, a.clone())),
            );
        }
        table
    }

    pub fn export(&self) -> Vec<DriveEntryView> {
        self.entries
            .iter()
            .map(|e| DriveEntryView {
                name: e.name.clone(),
                filters: e.filters.iter().map(|f| f.as_str().to_string()).collect(),
                smart_attributes: e
                    .smart_attributes
                    .values()
                    .map(|a| AttributeView {
                        id: a.id,
                        name: a.name,
                        unit: a.unit,
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.export())
    }
}

/// Matching entries from the built-in database
pub fn get_matching_entries<S: AsRef<str>>(
    tokens: &[S],
) -> Vec<&'static DriveEntry> {
    Database::builtin().matching_entries(tokens)
}

/// Effective attribute table from the built-in database
pub fn get_effective_table<S: AsRef<str>>(
    tokens: &[S],
) -> BTreeMap<u8, SmartAttribute> {
    Database::builtin().effective_table(tokens)
}

use Unit::{Celsius, Count, Hours, Milliseconds, Unknown};

const DEFAULT_ATTRIBUTES: &[SmartAttribute] = &[
    SmartAttribute::new(0x01, "READ_ERROR_RATE", Unknown),
    SmartAttribute::new(0x02, "THROUGHPUT_PERFORMANCE", Unknown),
    SmartAttribute::new(0x03, "SPIN_UP_TIME", Milliseconds),
    SmartAttribute::new(0x04, "START_STOP_COUNT", Count),
    SmartAttribute::new(0x05, "REALLOCATED_SECTORS_COUNT", Count),
    SmartAttribute::new(0x06, "READ_CHANNEL_MARGIN", Unknown),
    SmartAttribute::new(0x07, "SEEK_ERROR_RATE", Unknown),
    SmartAttribute::new(0x08, "SEEK_TIME_PERFORMANCE", Unknown),
    SmartAttribute::new(0x09, "POWER_ON_HOURS", Hours),
    SmartAttribute::new(0x0A, "SPIN_RETRY_COUNT", Count),
    SmartAttribute::new(0x0B, "RECALIBRATION_RETRIES", Count),
    SmartAttribute::new(0x0C, "POWER_CYCLE_COUNT", Count),
    SmartAttribute::new(0x0D, "SOFT_READ_ERROR_RATE", Count),
    SmartAttribute::new(0x16, "CURRENT_HELIUM_LEVEL", Unknown),
    SmartAttribute::new(0xAA, "AVAILABLE_RESERVED_SPACE", Unknown),
    SmartAttribute::new(0xAB, "SSD_PROGRAM_FAIL_COUNT", Count),
    SmartAttribute::new(0xAC, "SSD_ERASE_FAIL_COUNT", Count),
    SmartAttribute::new(0xAD, "SSD_WEAR_LEVELING_COUNT", Count),
    SmartAttribute::new(0xAE, "POWER_LOSS_COUNT", Count),
    SmartAttribute::new(0xB0, "ERASE_FAIL_COUNT", Count),
    SmartAttribute::new(0xB1, "WEAR_RANGE_DELTA", Unknown),
    SmartAttribute::new(0xB2, "USED_RESERVED_BLOCK_COUNT", Count),
    SmartAttribute::new(0xB3, "USED_RESERVED_BLOCK_COUNT_TOTAL", Count),
    SmartAttribute::new(0xB4, "UNUSED_RESERVED_BLOCK_COUNT_TOTAL", Count),
    SmartAttribute::new(0xB5, "PROGRAM_FAIL_COUNT_TOTAL", Count),
    SmartAttribute::new(0xB6, "ERASE_FAIL_COUNT", Count),
    SmartAttribute::new(0xB7, "RUNTIME_BAD_BLOCK", Count),
    SmartAttribute::new(0xB8, "PARITY_ERROR_COUNT", Count),
    SmartAttribute::new(0xB9, "HEAD_STABILITY", Unknown),
    SmartAttribute::new(0xBA, "INDUCED_OP_VIBRATION_DETECTION", Unknown),
    SmartAttribute::new(0xBB, "REPORTED_UNCORRECTABLE_ERRORS", Count),
    SmartAttribute::new(0xBC, "COMMANDS_TIMED_OUT", Count),
    SmartAttribute::new(0xBD, "HIGH_FLY_WRITES", Count),
    SmartAttribute::new(0xBE, "TEMPERATURE_DIFFERENCE", Celsius)
        .with_processor(Processor::HundredMinusValue),
    SmartAttribute::new(0xBF, "GSENSE_ERROR_RATE", Count),
    SmartAttribute::new(0xC0, "UNSAFE_SHUTDOWN_COUNT", Count),
    SmartAttribute::new(0xC1, "LOAD_CYCLE_COUNT", Count),
    SmartAttribute::new(0xC2, "TEMPERATURE_ABSOLUTE", Celsius),
    SmartAttribute::new(0xC3, "HARDWARE_ECC_RECOVERED", Unknown),
    SmartAttribute::new(0xC4, "REALLOCATION_EVENT_COUNT", Count),
    SmartAttribute::new(0xC5, "CURRENT_PENDING_SECTOR_COUNT", Count),
    SmartAttribute::new(0xC6, "UNCORRECTABLE_SECTOR_COUNT", Count),
    SmartAttribute::new(0xC7, "ULTRA_DMA_CRC_ERROR_COUNT", Count),
    SmartAttribute::new(0xC8, "WRITE_ERROR_RATE", Count),
    SmartAttribute::new(0xC9, "SOFT_READ_ERROR_RATE", Count),
    SmartAttribute::new(0xCA, "DATA_ADDRESS_MARKS", Count),
    SmartAttribute::new(0xCB, "RUN_OUT_CANCEL", Count),
    SmartAttribute::new(0xCC, "SOFT_ECC_CORRECTION", Count),
    SmartAttribute::new(0xCD, "THERMAL_ASPERITY_RATE", Count),
    SmartAttribute::new(0xCE, "FLYING_HEIGHT", Unknown),
    SmartAttribute::new(0xCF, "SPIN_HEIGHT_CURRENT", Unknown),
    SmartAttribute::new(0xD0, "SPIN_BUZZ", Count),
    SmartAttribute::new(0xD1, "OFFLINE_SEEK_PERFORMANCE", Unknown),
    SmartAttribute::new(0xD2, "VIBRATION_DURING_WRITE", Unknown),
    SmartAttribute::new(0xD3, "VIBRATION_DURING_WRITE", Unknown),
    SmartAttribute::new(0xD4, "SHOCK_DURING_WRITE", Unknown),
    SmartAttribute::new(0xDC, "DISK_SHIFT", Unknown),
    SmartAttribute::new(0xDD, "GSENSE_ERROR_RATE", Count),
    SmartAttribute::new(0xDE, "LOADED_HOURS", Hours),
    SmartAttribute::new(0xDF, "LOAD_UNLOAD_RETRY_COUNT", Count),
    SmartAttribute::new(0xE0, "LOAD_FRICTION", Unknown),
    SmartAttribute::new(0xE1, "LOAD_UNLOAD_CYCLE_COUNT", Count),
    SmartAttribute::new(0xE2, "LOAD_IN_TIME", Unknown),
    SmartAttribute::new(0xE3, "TORQUE_AMPLIFICATION_COUNT", Count),
    SmartAttribute::new(0xE4, "POWER_OFF_RETRACT_CYCLE", Count),
    SmartAttribute::new(0xE6, "THRASHING", Unknown),
    SmartAttribute::new(0xE7, "LIFE_LEFT", Unknown),
    SmartAttribute::new(0xE8, "ENDURANCE_REMAINING", Unknown),
    SmartAttribute::new(0xE9, "MEDIA_WEAROUT_INDICATOR", Unknown),
    SmartAttribute::new(0xF0, "HEAD_FLYING_HOURS", Hours),
    SmartAttribute::new(0xF1, "TOTAL_LBAS_WRITTEN", Count),
    SmartAttribute::new(0xF2, "TOTAL_LBAS_READ", Count),
    SmartAttribute::new(0xF3, "TOTAL_LBAS_WRITTEN_EX", Unknown),
    SmartAttribute::new(0xF4, "TOTAL_LBAS_READ_EX", Unknown),
    SmartAttribute::new(0xF9, "NAND_WRITES", Unknown),
    SmartAttribute::new(0xFA, "READ_ERROR_RETRY_RATE", Count),
    SmartAttribute::new(0xFB, "MINIMUM_SPARES_REMAINING", Unknown),
    SmartAttribute::new(0xFC, "NEWLY_ADDED_BAD_FLASH_BLOCK", Unknown),
    SmartAttribute::new(0xFE, "FREE_FALL_EVENTS", Count),
];

fn default_entry() -> DriveEntry {
    DriveEntry::new("Default", vec![Filter::exact("type:ata")])
        .with_attributes(DEFAULT_ATTRIBUTES.iter().cloned())
        .with_note(
            "The default SMART attributes are based off relatively common \
             attributes across manufacturers. The attributes are not \
             guaranteed to be accurate for all drives.",
        )
}

fn samsung_ssds() -> Result<DriveEntry, regex::Error> {
    Ok(DriveEntry::new(
        "Samsung SSDs",
        vec![
            Filter::exact("type:ata"),
            Filter::pattern(r"model:Samsung SSD 8[56]0 EVO [12]TB")?,
        ],
    )
    .with_attributes([SmartAttribute::new(0xEB, "POR_RECOVERY_COUNT", Count)])
    .with_note("Tested against Samsung SSD 850 EVO 2TB")
    .with_note("Tested against Samsung SSD 860 EVO 1TB"))
}

type EntryFn = fn() -> Result<DriveEntry, regex::Error>;

fn builtin_entries() -> Vec<DriveEntry> {
    const VENDOR_ENTRIES: &[(&str, EntryFn)] =
        &[("Samsung SSDs", samsung_ssds)];

    let mut entries = vec![default_entry()];
    for (name, f) in VENDOR_ENTRIES {
        match f() {
            Ok(e) => entries.push(e),
            Err(e) => log::error!("database entry {name} not usable: {e}"),
        }
    }
    entries
}

#[cfg(test)]
#[path = "tests/database.rs"]
mod tests;
