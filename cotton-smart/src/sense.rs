//! Decoding SCSI sense data
//!
//! After an ATA PASS-THROUGH with CK_COND set, or after any failing
//! SCSI command, the transport hands back a sense buffer. Its first
//! byte says which of two layouts follows: fixed format (SPC-4
//! s4.5.3) or descriptor format (SPC-4 s4.5.2).
use core::fmt;

/// Size of sense buffer handed to transports
pub const SENSE_LENGTH: usize = 32;

/// Sense key values
/// SPC-4 table 48
pub mod sense_key {
    pub const NO_SENSE: u8 = 0x0;
    pub const RECOVERED_ERROR: u8 = 0x1;
    pub const NOT_READY: u8 = 0x2;
    pub const MEDIUM_ERROR: u8 = 0x3;
    pub const HARDWARE_ERROR: u8 = 0x4;
    pub const ILLEGAL_REQUEST: u8 = 0x5;
    pub const UNIT_ATTENTION: u8 = 0x6;
    pub const DATA_PROTECT: u8 = 0x7;
    pub const BLANK_CHECK: u8 = 0x8;
    pub const VENDOR_SPECIFIC: u8 = 0x9;
    pub const COPY_ABORTED: u8 = 0xA;
    pub const ABORTED_COMMAND: u8 = 0xB;
    pub const EQUAL: u8 = 0xC;
    pub const VOLUME_OVERFLOW: u8 = 0xD;
    pub const MISCOMPARE: u8 = 0xE;
    pub const COMPLETED: u8 = 0xF;
}

/// Human-readable name for a sense key
pub fn sense_key_name(key: u8) -> &'static str {
    match key {
        0x0 => "No Sense",
        0x1 => "Recovered Error",
        0x2 => "Not Ready",
        0x3 => "Medium Error",
        0x4 => "Hardware Error",
        0x5 => "Illegal Request",
        0x6 => "Unit Attention",
        0x7 => "Data Protect",
        0x9 => "Firmware Error",
        0xB => "Aborted Command",
        0xC => "Equal",
        0xD => "Volume Overflow",
        0xE => "Miscompare",
        0xF => "Completed",
        _ => "Unknown Sense Error",
    }
}

/// Keys which report on a command that nonetheless succeeded
///
/// COMPLETED is how SAT reports the ATA registers returned by a
/// CK_COND command.
fn is_advisory(key: u8) -> bool {
    matches!(
        key,
        sense_key::NO_SENSE | sense_key::RECOVERED_ERROR | sense_key::COMPLETED
    )
}

/// Fixed-format sense data
/// SPC-4 s4.5.3
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct FixedFormatSense {
    /// Response code in bits 0-6, VALID in bit 7
    pub response_code: u8,
    pub segment: u8,
    /// Sense key in bits 0-3; ILI, EOM, FILEMARK in bits 5-7
    pub flags: u8,
    pub information_be: [u8; 4],
    pub additional_length: u8,
    pub command_specific_be: [u8; 4],
    pub additional_sense_code: u8,
    pub additional_sense_code_qualifier: u8,
    pub fru_code: u8,
    pub sense_key_specific: [u8; 3],
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for FixedFormatSense {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for FixedFormatSense {}

impl FixedFormatSense {
    pub fn valid(&self) -> bool {
        (self.response_code & 0x80) != 0
    }

    pub fn sense_key(&self) -> u8 {
        self.flags & 0xF
    }

    /// Incorrect length indicator
    pub fn ili(&self) -> bool {
        (self.flags & 0x20) != 0
    }

    pub fn eom(&self) -> bool {
        (self.flags & 0x40) != 0
    }

    pub fn filemark(&self) -> bool {
        (self.flags & 0x80) != 0
    }

    pub fn information(&self) -> u32 {
        u32::from_be_bytes(self.information_be)
    }

    pub fn command_specific(&self) -> u32 {
        u32::from_be_bytes(self.command_specific_be)
    }
}

/// Descriptor-format sense data, with room for the descriptors that
/// fit in [`SENSE_LENGTH`]
/// SPC-4 s4.5.2
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct DescriptorFormatSense {
    pub response_code: u8,
    /// Sense key in bits 0-3
    pub sense_key: u8,
    pub additional_sense_code: u8,
    pub additional_sense_code_qualifier: u8,
    pub reserved: [u8; 3],
    pub additional_length: u8,
    pub descriptors: [u8; 24],
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for DescriptorFormatSense {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for DescriptorFormatSense {}

/// ATA registers returned by a CK_COND passthrough command
/// SAT-5 s12.2.5 (ATA Status Return sense data descriptor)
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AtaStatusReturn {
    pub extend: bool,
    pub error: u8,
    pub count: u16,
    pub lba: u64,
    pub device: u8,
    pub status: u8,
}

impl AtaStatusReturn {
    /// ATA status register ERR bit
    pub fn is_error(&self) -> bool {
        (self.status & 1) != 0
    }
}

impl DescriptorFormatSense {
    pub fn sense_key(&self) -> u8 {
        self.sense_key & 0xF
    }

    /// The descriptors actually present
    pub fn descriptor_bytes(&self) -> &[u8] {
        let len = (self.additional_length as usize).min(self.descriptors.len());
        &self.descriptors[..len]
    }

    pub fn ata_status_return(&self) -> Option<AtaStatusReturn> {
        let mut d = self.descriptor_bytes();
        while d.len() >= 2 {
            let len = 2 + d[1] as usize;
            if d[0] == 0x09 && d[1] == 0x0C && d.len() >= 14 {
                return Some(AtaStatusReturn {
                    extend: (d[2] & 1) != 0,
                    error: d[3],
                    count: u16::from_be_bytes([d[4], d[5]]),
                    lba: u64::from_le_bytes([
                        d[7], d[9], d[11], d[6], d[8], d[10], 0, 0,
                    ]),
                    device: d[12],
                    status: d[13],
                });
            }
            if len > d.len() {
                break;
            }
            d = &d[len..];
        }
        None
    }
}

/// Decoded sense data of either format
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Sense {
    Fixed(FixedFormatSense),
    Descriptor(DescriptorFormatSense),
}

impl Sense {
    pub fn sense_key(&self) -> u8 {
        match self {
            Self::Fixed(s) => s.sense_key(),
            Self::Descriptor(s) => s.sense_key(),
        }
    }

    pub fn asc(&self) -> u8 {
        match self {
            Self::Fixed(s) => s.additional_sense_code,
            Self::Descriptor(s) => s.additional_sense_code,
        }
    }

    pub fn ascq(&self) -> u8 {
        match self {
            Self::Fixed(s) => s.additional_sense_code_qualifier,
            Self::Descriptor(s) => s.additional_sense_code_qualifier,
        }
    }

    /// The ATA registers, when a SAT layer returned them
    pub fn ata_status_return(&self) -> Option<AtaStatusReturn> {
        match self {
            Self::Fixed(_) => None,
            Self::Descriptor(s) => s.ata_status_return(),
        }
    }
}

/// What we know about failing sense data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenseDetail {
    Decoded(Sense),
    /// Response code not recognised; the raw bytes
    Unrecognized(Vec<u8>),
}

/// A device reported an error condition in its sense data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenseError {
    /// Zero when the sense format was unrecognized
    pub sense_key: u8,
    pub detail: SenseDetail,
}

impl SenseError {
    /// Narrow the error down using the sense key, ASC, and ASCQ
    ///
    /// Seagate SCSI commands reference s2.4.1.5, 2.4.1.6
    pub fn classify(&self) -> Option<ScsiError> {
        let SenseDetail::Decoded(s) = &self.detail else {
            return None;
        };
        let (key, asc, ascq) = (s.sense_key(), s.asc(), s.ascq());

        const ERRORS3: &[(u8, u8, u8, ScsiError)] = &[
            (2, 4, 1, ScsiError::BecomingReady),
            (2, 4, 2, ScsiError::StartUnitRequired),
            (2, 4, 3, ScsiError::ManualInterventionRequired),
            (2, 4, 4, ScsiError::FormatInProgress),
            (2, 4, 9, ScsiError::SelfTestInProgress),
            (2, 4, 0x22, ScsiError::PowerCycleRequired),
            (3, 0x0C, 0x00, ScsiError::WriteError),
            (3, 0x0C, 0x02, ScsiError::WriteReallocationFailed),
            (3, 0x11, 0x00, ScsiError::UnrecoveredReadError),
            (3, 0x11, 0x01, ScsiError::ReadRetriesExhausted),
            (3, 0x11, 0x02, ScsiError::ReadErrorTooLong),
            (3, 0x11, 0x04, ScsiError::ReadReallocationFailed),
            (3, 0x14, 0x00, ScsiError::LogicalBlockNotFound),
            (3, 0x14, 0x01, ScsiError::RecordNotFound),
            (4, 0x0B, 0x01, ScsiError::Overheat),
            (4, 0x0B, 0x02, ScsiError::EnclosureDegraded),
            (5, 0x26, 0x00, ScsiError::InvalidFieldInParameterList),
            (5, 0x26, 0x01, ScsiError::ParameterNotSupported),
            (5, 0x26, 0x02, ScsiError::ParameterValueInvalid),
            (4, 0x3E, 0x03, ScsiError::LogicalUnitSelfTestFailed),
            (4, 0x42, 0x00, ScsiError::SelfTestFailed),
        ];
        const ERRORS2: &[(u8, u8, ScsiError)] = &[
            (3, 0x14, ScsiError::PositioningError),
            (5, 0x1A, ScsiError::ParameterListLengthError),
            (0xE, 0x1D, ScsiError::MiscompareDuringVerify),
            (5, 0x20, ScsiError::InvalidCommandOperationCode),
            (5, 0x21, ScsiError::LogicalBlockAddressOutOfRange),
            (5, 0x24, ScsiError::InvalidFieldInCDB),
            (5, 0x25, ScsiError::LogicalUnitNotSupported),
        ];
        const ERRORS1: &[(u8, ScsiError)] = &[
            (2, ScsiError::NotReady),
            (3, ScsiError::MediumError),
            (4, ScsiError::HardwareError),
            (5, ScsiError::IllegalRequest),
            (6, ScsiError::UnitAttention),
            (7, ScsiError::DataProtect),
            (8, ScsiError::BlankCheck),
            (9, ScsiError::VendorSpecific),
            (10, ScsiError::CopyAborted),
            (11, ScsiError::Aborted),
            (13, ScsiError::VolumeOverflow),
            (14, ScsiError::Miscompare),
        ];

        for i in ERRORS3 {
            if key == i.0 && asc == i.1 && ascq == i.2 {
                return Some(i.3);
            }
        }
        for i in ERRORS2 {
            if key == i.0 && asc == i.1 {
                return Some(i.2);
            }
        }
        for i in ERRORS1 {
            if key == i.0 {
                return Some(i.1);
            }
        }
        None
    }
}

impl fmt::Display for SenseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            SenseDetail::Decoded(s) => write!(
                f,
                "{} (sense key {:#x}, ASC {:#04x}, ASCQ {:#04x})",
                sense_key_name(self.sense_key),
                self.sense_key,
                s.asc(),
                s.ascq()
            ),
            SenseDetail::Unrecognized(b) => write!(
                f,
                "unrecognized sense data format {:#04x}",
                b.first().copied().unwrap_or_default()
            ),
        }
    }
}

impl std::error::Error for SenseError {}

/// Errors which can be returned over SCSI protocol from the SCSI device
///
/// See Seagate SCSI commands reference s2.4.1.5, 2.4.1.6
///
/// Many of these errors are obscure and/or catastrophic -- hopefully you
/// will never see `ScsiError::Overheat` -- but some are reasonable and
/// common.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum ScsiError {
    BecomingReady,
    StartUnitRequired,
    ManualInterventionRequired,
    FormatInProgress,
    SelfTestInProgress,
    PowerCycleRequired,
    Overheat,
    EnclosureDegraded,
    WriteError,
    WriteReallocationFailed,
    UnrecoveredReadError,
    ReadRetriesExhausted,
    ReadErrorTooLong,
    ReadReallocationFailed,
    LogicalBlockNotFound,
    RecordNotFound,
    InvalidFieldInParameterList,
    ParameterNotSupported,
    ParameterValueInvalid,
    LogicalUnitSelfTestFailed,
    SelfTestFailed,

    PositioningError,
    ParameterListLengthError,
    MiscompareDuringVerify,
    /// The device does not implement this command
    InvalidCommandOperationCode,
    LogicalBlockAddressOutOfRange,
    /// Something is incorrect in the command block itself; typically
    /// a bridge that doesn't understand ATA PASS-THROUGH
    InvalidFieldInCDB,
    LogicalUnitNotSupported,

    NotReady,
    MediumError,
    HardwareError,
    IllegalRequest,
    UnitAttention,
    DataProtect,
    BlankCheck,
    VendorSpecific,
    CopyAborted,
    Aborted,
    VolumeOverflow,
    Miscompare,
}

fn decode_padded<T: bytemuck::Pod>(bytes: &[u8]) -> T {
    let mut t = T::zeroed();
    let dest = bytemuck::bytes_of_mut(&mut t);
    let n = dest.len().min(bytes.len());
    dest[..n].copy_from_slice(&bytes[..n]);
    t
}

/// Classify a sense buffer
///
/// Returns `Ok(None)` if there is no sense data, `Ok(Some(_))` if
/// the sense is advisory only, and an error otherwise. Sense data is
/// allowed to be truncated (devices report only as much as they
/// have), so missing trailing bytes read as zero.
pub fn parse_sense(bytes: &[u8]) -> Result<Option<Sense>, SenseError> {
    let Some(code) = bytes.first().map(|b| b & 0x7F) else {
        return Ok(None);
    };
    let sense = match code {
        0x00 => return Ok(None),
        0x70 | 0x71 => Sense::Fixed(decode_padded(bytes)),
        0x72 | 0x73 => Sense::Descriptor(decode_padded(bytes)),
        _ => {
            return Err(SenseError {
                sense_key: 0,
                detail: SenseDetail::Unrecognized(bytes.to_vec()),
            })
        }
    };
    let key = sense.sense_key();
    if is_advisory(key) {
        Ok(Some(sense))
    } else {
        Err(SenseError {
            sense_key: key,
            detail: SenseDetail::Decoded(sense),
        })
    }
}

#[cfg(test)]
#[path = "tests/sense.rs"]
pub(crate) mod tests;
