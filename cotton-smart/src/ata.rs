//! ATA commands tunnelled over SCSI
//!
//! The ATA PASS-THROUGH commands (SAT-5 s12.2) carry an ATA
//! taskfile inside a SCSI command block, which lets an ordinary SCSI
//! driver stack (SG_IO, USB mass-storage bridges) talk to a SATA
//! drive.
use crate::wire;

/// ATA PASS-THROUGH (16) operation code
pub const ATA_PASS_THROUGH_16: u8 = 0x85;
/// ATA PASS-THROUGH (12) operation code
pub const ATA_PASS_THROUGH_12: u8 = 0xA1;

/// ATA command codes (ACS-3 s7)
pub mod command {
    /// IDENTIFY DEVICE
    pub const IDENTIFY: u8 = 0xEC;
    /// IDENTIFY PACKET DEVICE, for ATAPI devices
    pub const IDENTIFY_PACKET: u8 = 0xA1;
    /// SMART feature set; the subcommand goes in the features register
    pub const SMART: u8 = 0xB0;
}

/// SMART subcommands, sent in the features register (ACS-3 s7.44)
///
/// Only the two read commands are ever issued by this crate.
pub mod smart_feature {
    pub const READ_DATA: u8 = 0xD0;
    pub const READ_THRESHOLDS: u8 = 0xD1;
    pub const ENABLE_DISABLE_AUTOSAVE: u8 = 0xD2;
    pub const EXECUTE_OFFLINE_IMMEDIATE: u8 = 0xD4;
    pub const READ_LOG: u8 = 0xD5;
    pub const WRITE_LOG: u8 = 0xD6;
    pub const ENABLE_OPERATIONS: u8 = 0xD8;
    pub const DISABLE_OPERATIONS: u8 = 0xD9;
    pub const RETURN_STATUS: u8 = 0xDA;
}

/// LBA value which must accompany every SMART command (LBA mid 0x4F,
/// LBA high 0xC2)
pub const SMART_LBA_SIGNATURE: u64 = 0xC2_4F00;

/// Value of a byte field that doesn't correspond to any enum variant
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InvalidValue(pub u8);

impl core::fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "invalid field value {:#x}", self.0)
    }
}

impl std::error::Error for InvalidValue {}

/// The PROTOCOL field of an ATA PASS-THROUGH command
/// SAT-5 table 171
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum AtaProtocol {
    HardReset = 0,
    Srst = 1,
    NonData = 3,
    PioDataIn = 4,
    PioDataOut = 5,
    Dma = 6,
    DmaQueued = 7,
    DeviceDiagnostic = 8,
    DeviceReset = 9,
    UdmaIn = 10,
    UdmaOut = 11,
    Fpdma = 12,
    ReturnResponseInformation = 15,
}

impl TryFrom<u8> for AtaProtocol {
    type Error = InvalidValue;

    fn try_from(v: u8) -> Result<Self, InvalidValue> {
        Ok(match v {
            0 => Self::HardReset,
            1 => Self::Srst,
            3 => Self::NonData,
            4 => Self::PioDataIn,
            5 => Self::PioDataOut,
            6 => Self::Dma,
            7 => Self::DmaQueued,
            8 => Self::DeviceDiagnostic,
            9 => Self::DeviceReset,
            10 => Self::UdmaIn,
            11 => Self::UdmaOut,
            12 => Self::Fpdma,
            15 => Self::ReturnResponseInformation,
            _ => return Err(InvalidValue(v)),
        })
    }
}

/// Where the transfer length is found (T_LENGTH field)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum TransferLength {
    NoData = 0,
    InFeature = 1,
    InSectorCount = 2,
    InStpsiu = 3,
}

/// How long to wait before checking ATA status (OFF_LINE field)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum OffLine {
    Zero = 0,
    TwoSeconds = 1,
    SixSeconds = 2,
    FourteenSeconds = 3,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum TransferDirection {
    ToDevice = 0,
    FromDevice = 1,
}

impl TryFrom<u8> for TransferLength {
    type Error = InvalidValue;

    fn try_from(v: u8) -> Result<Self, InvalidValue> {
        Ok(match v {
            0 => Self::NoData,
            1 => Self::InFeature,
            2 => Self::InSectorCount,
            3 => Self::InStpsiu,
            _ => return Err(InvalidValue(v)),
        })
    }
}

impl TryFrom<u8> for OffLine {
    type Error = InvalidValue;

    fn try_from(v: u8) -> Result<Self, InvalidValue> {
        Ok(match v {
            0 => Self::Zero,
            1 => Self::TwoSeconds,
            2 => Self::SixSeconds,
            3 => Self::FourteenSeconds,
            _ => return Err(InvalidValue(v)),
        })
    }
}

impl TryFrom<u8> for TransferDirection {
    type Error = InvalidValue;

    fn try_from(v: u8) -> Result<Self, InvalidValue> {
        match v {
            0 => Ok(Self::ToDevice),
            1 => Ok(Self::FromDevice),
            _ => Err(InvalidValue(v)),
        }
    }
}

/// Byte 2 of an ATA PASS-THROUGH command
///
/// | bits | field |
/// | --- | --- |
/// | 0-1 | T_LENGTH |
/// | 2 | BYT_BLOK (1 = length counted in blocks) |
/// | 3 | T_DIR (1 = device to host) |
/// | 4 | reserved (T_TYPE in SAT-3 onwards, left zero) |
/// | 5 | CK_COND |
/// | 6-7 | OFF_LINE |
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CommandFlags(u8);

impl CommandFlags {
    pub const fn new(
        t_length: TransferLength,
        blocks: bool,
        t_dir: TransferDirection,
        ck_cond: bool,
        off_line: OffLine,
    ) -> Self {
        Self(
            (t_length as u8)
                | ((blocks as u8) << 2)
                | ((t_dir as u8) << 3)
                | ((ck_cond as u8) << 5)
                | ((off_line as u8) << 6),
        )
    }

    /// Flags for a PIO read of whole sectors, returning the ATA
    /// registers as sense data
    pub const fn pio_in() -> Self {
        Self::new(
            TransferLength::InSectorCount,
            true,
            TransferDirection::FromDevice,
            true,
            OffLine::Zero,
        )
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn t_length(self) -> TransferLength {
        match self.0 & 3 {
            0 => TransferLength::NoData,
            1 => TransferLength::InFeature,
            2 => TransferLength::InSectorCount,
            _ => TransferLength::InStpsiu,
        }
    }

    pub fn blocks(self) -> bool {
        (self.0 & 4) != 0
    }

    pub fn t_dir(self) -> TransferDirection {
        if (self.0 & 8) != 0 {
            TransferDirection::FromDevice
        } else {
            TransferDirection::ToDevice
        }
    }

    pub fn ck_cond(self) -> bool {
        (self.0 & 0x20) != 0
    }

    pub fn off_line(self) -> OffLine {
        match self.0 >> 6 {
            0 => OffLine::Zero,
            1 => OffLine::TwoSeconds,
            2 => OffLine::SixSeconds,
            _ => OffLine::FourteenSeconds,
        }
    }
}

/// ATA PASS-THROUGH (16)
/// SAT-5 s12.2.3
///
/// The 48-bit LBA is split into three byte pairs, each pair holding
/// the "previous" (high) byte first, as the 48-bit ATA taskfile does.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct Command16 {
    pub operation_code: u8,
    /// Protocol in bits 1-4, EXTEND in bit 0
    pub protocol: u8,
    pub flags: u8,
    pub features_be: [u8; 2],
    pub sector_count_be: [u8; 2],
    pub lba_high_low: u8,
    pub lba_low: u8,
    pub lba_high_mid: u8,
    pub lba_mid: u8,
    pub lba_high_high: u8,
    pub lba_high: u8,
    pub device: u8,
    pub command: u8,
    pub control: u8,
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for Command16 {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for Command16 {}

impl Command16 {
    pub fn new(
        protocol: AtaProtocol,
        flags: CommandFlags,
        command: u8,
    ) -> Self {
        assert!(core::mem::size_of::<Self>() == 16);
        Self {
            operation_code: ATA_PASS_THROUGH_16,
            protocol: (protocol as u8) << 1,
            flags: flags.bits(),
            features_be: [0; 2],
            sector_count_be: [0; 2],
            lba_high_low: 0,
            lba_low: 0,
            lba_high_mid: 0,
            lba_mid: 0,
            lba_high_high: 0,
            lba_high: 0,
            device: 0,
            command,
            control: 0,
        }
    }

    pub fn protocol(&self) -> Result<AtaProtocol, InvalidValue> {
        AtaProtocol::try_from((self.protocol >> 1) & 0xF)
    }

    pub fn extend(&self) -> bool {
        (self.protocol & 1) != 0
    }

    pub fn set_extend(&mut self, extend: bool) {
        self.protocol = (self.protocol & !1) | extend as u8;
    }

    pub fn command_flags(&self) -> CommandFlags {
        CommandFlags::from_bits(self.flags)
    }

    pub fn features(&self) -> u16 {
        u16::from_be_bytes(self.features_be)
    }

    pub fn set_features(&mut self, features: u16) {
        self.features_be = features.to_be_bytes();
    }

    pub fn sector_count(&self) -> u16 {
        u16::from_be_bytes(self.sector_count_be)
    }

    pub fn set_sector_count(&mut self, count: u16) {
        self.sector_count_be = count.to_be_bytes();
    }

    /// Store a 48-bit LBA
    ///
    /// Panics if `lba` doesn't fit in 48 bits.
    pub fn set_lba(&mut self, lba: u64) {
        assert!(lba < (1 << 48), "LBA {lba:#x} wider than 48 bits");
        let b = lba.to_le_bytes();
        self.lba_low = b[0];
        self.lba_mid = b[1];
        self.lba_high = b[2];
        self.lba_high_low = b[3];
        self.lba_high_mid = b[4];
        self.lba_high_high = b[5];
    }

    pub fn lba(&self) -> u64 {
        u64::from_le_bytes([
            self.lba_low,
            self.lba_mid,
            self.lba_high,
            self.lba_high_low,
            self.lba_high_mid,
            self.lba_high_high,
            0,
            0,
        ])
    }
}

/// ATA PASS-THROUGH (12)
/// SAT-5 s12.2.2
///
/// Only 28-bit commands fit: there is no room for the "previous"
/// taskfile bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct Command12 {
    pub operation_code: u8,
    pub protocol: u8,
    pub flags: u8,
    pub features: u8,
    pub sector_count: u8,
    pub lba_low: u8,
    pub lba_mid: u8,
    pub lba_high: u8,
    pub device: u8,
    pub command: u8,
    pub reserved: u8,
    pub control: u8,
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for Command12 {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for Command12 {}

impl Command12 {
    pub fn new(
        protocol: AtaProtocol,
        flags: CommandFlags,
        command: u8,
    ) -> Self {
        assert!(core::mem::size_of::<Self>() == 12);
        Self {
            operation_code: ATA_PASS_THROUGH_12,
            protocol: (protocol as u8) << 1,
            flags: flags.bits(),
            features: 0,
            sector_count: 0,
            lba_low: 0,
            lba_mid: 0,
            lba_high: 0,
            device: 0,
            command,
            reserved: 0,
            control: 0,
        }
    }

    pub fn protocol(&self) -> Result<AtaProtocol, InvalidValue> {
        AtaProtocol::try_from((self.protocol >> 1) & 0xF)
    }

    /// Store a 24-bit LBA; panics if it doesn't fit
    pub fn set_lba(&mut self, lba: u32) {
        assert!(lba < (1 << 24), "LBA {lba:#x} wider than 24 bits");
        let b = lba.to_le_bytes();
        self.lba_low = b[0];
        self.lba_mid = b[1];
        self.lba_high = b[2];
    }

    pub fn lba(&self) -> u32 {
        u32::from_le_bytes([self.lba_low, self.lba_mid, self.lba_high, 0])
    }

    /// The 12-byte form of a 16-byte command, if it has no 48-bit
    /// content
    ///
    /// Some USB bridges only implement the 12-byte command.
    pub fn from_command16(c: &Command16) -> Option<Self> {
        if c.extend()
            || c.features_be[0] != 0
            || c.sector_count_be[0] != 0
            || c.lba_high_low != 0
            || c.lba_high_mid != 0
            || c.lba_high_high != 0
        {
            return None;
        }
        Some(Self {
            operation_code: ATA_PASS_THROUGH_12,
            protocol: c.protocol,
            flags: c.flags,
            features: c.features_be[1],
            sector_count: c.sector_count_be[1],
            lba_low: c.lba_low,
            lba_mid: c.lba_mid,
            lba_high: c.lba_high,
            device: c.device,
            command: c.command,
            reserved: 0,
            control: c.control,
        })
    }
}

/// IDENTIFY DEVICE (or IDENTIFY PACKET DEVICE), reading one sector
pub fn build_identify(atapi: bool) -> Command16 {
    let mut c = Command16::new(
        AtaProtocol::PioDataIn,
        CommandFlags::pio_in(),
        if atapi {
            command::IDENTIFY_PACKET
        } else {
            command::IDENTIFY
        },
    );
    c.set_sector_count(1);
    c
}

fn build_smart(feature: u8) -> Command16 {
    let mut c = Command16::new(
        AtaProtocol::PioDataIn,
        CommandFlags::pio_in(),
        command::SMART,
    );
    c.set_features(feature.into());
    c.set_sector_count(1);
    c.set_lba(SMART_LBA_SIGNATURE);
    c
}

/// SMART READ DATA
pub fn build_smart_read_data() -> Command16 {
    build_smart(smart_feature::READ_DATA)
}

/// SMART READ THRESHOLDS
///
/// Obsolete since ATA-8, but still implemented by nearly every drive,
/// and the only way to get threshold values.
pub fn build_smart_read_thresholds() -> Command16 {
    build_smart(smart_feature::READ_THRESHOLDS)
}

/// IDENTIFY DEVICE data
/// ACS-3 s7.12.7
///
/// Only the identification strings are broken out; the other 230
/// words are available raw.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct IdentifyResponse {
    pub general_configuration_le: [u8; 2],
    pub obsolete: [u8; 18],
    pub serial_number: [u8; 20],
    pub retired: [u8; 6],
    pub firmware_revision: [u8; 8],
    pub model_number: [u8; 40],
    pub rest: [u8; 418],
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for IdentifyResponse {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for IdentifyResponse {}

impl IdentifyResponse {
    pub const SIZE: usize = 512;

    fn general_configuration(&self) -> u16 {
        u16::from_le_bytes(self.general_configuration_le)
    }

    /// Word 0 bit 15: an ATAPI (packet) device
    pub fn is_atapi(&self) -> bool {
        (self.general_configuration() & 0x8000) != 0
    }

    pub fn is_removable(&self) -> bool {
        (self.general_configuration() & 0x80) != 0
    }

    pub fn is_fixed(&self) -> bool {
        (self.general_configuration() & 0x40) != 0
    }

    /// Word 0 bit 2: only the first few words are valid
    pub fn is_incomplete(&self) -> bool {
        (self.general_configuration() & 4) != 0
    }

    pub fn model(&self) -> String {
        wire::decode_ata_string(&self.model_number)
    }

    pub fn serial(&self) -> String {
        wire::decode_ata_string(&self.serial_number)
    }

    pub fn firmware(&self) -> String {
        wire::decode_ata_string(&self.firmware_revision)
    }
}

/// One attribute in the SMART READ DATA response
///
/// The layout of this is not in any standard, but is universal in
/// practice.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(C)]
pub struct SmartDataEntry {
    pub id: u8,
    pub flags_le: [u8; 2],
    pub current: u8,
    pub worst: u8,
    pub raw: [u8; 6],
    pub reserved: u8,
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for SmartDataEntry {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for SmartDataEntry {}

impl SmartDataEntry {
    pub fn flags(&self) -> u16 {
        u16::from_le_bytes(self.flags_le)
    }

    /// The six vendor-specific bytes as a little-endian integer
    ///
    /// What this means, if anything, varies from vendor to vendor.
    pub fn raw_value(&self) -> u64 {
        let mut b = [0u8; 8];
        b[..6].copy_from_slice(&self.raw);
        u64::from_le_bytes(b)
    }
}

/// SMART READ DATA response
/// ACS-3 s7.44.3.4 (vendor-specific attribute area per common use)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct SmartDataResponse {
    pub version_le: [u8; 2],
    pub attributes: [SmartDataEntry; 30],
    pub offline_data_collection_status: u8,
    pub self_test_execution_status: u8,
    pub offline_collection_time_le: [u8; 2],
    pub vendor_specific_1: u8,
    pub offline_data_collection_capability: u8,
    pub smart_capability_le: [u8; 2],
    pub error_logging_capability: u8,
    pub vendor_specific_2: u8,
    /// Minutes
    pub short_self_test_time: u8,
    /// Minutes; 0xFF means see `extended_self_test_time_wide_le`
    pub extended_self_test_time: u8,
    pub conveyance_self_test_time: u8,
    pub extended_self_test_time_wide_le: [u8; 2],
    pub reserved: [u8; 9],
    pub vendor_specific_3: [u8; 125],
    pub checksum: u8,
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for SmartDataResponse {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for SmartDataResponse {}

impl SmartDataResponse {
    pub const SIZE: usize = 512;

    /// Attributes up to, but not including, the first with id 0
    pub fn entries(&self) -> impl Iterator<Item = &SmartDataEntry> {
        self.attributes.iter().take_while(|e| e.id != 0)
    }

    pub fn extended_self_test_minutes(&self) -> u16 {
        if self.extended_self_test_time == 0xFF {
            u16::from_le_bytes(self.extended_self_test_time_wide_le)
        } else {
            self.extended_self_test_time.into()
        }
    }

    /// Whether all 512 bytes sum to zero, as the checksum requires
    ///
    /// Not every drive bothers to fill in the checksum, so this is
    /// advisory.
    pub fn checksum_valid(&self) -> bool {
        checksum_valid(wire::encode(self))
    }
}

/// One entry in the SMART READ THRESHOLDS response
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(C)]
pub struct SmartThresholdEntry {
    pub id: u8,
    pub threshold: u8,
    pub reserved: [u8; 10],
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for SmartThresholdEntry {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for SmartThresholdEntry {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct SmartThresholdResponse {
    pub revision_le: [u8; 2],
    pub thresholds: [SmartThresholdEntry; 30],
    pub reserved: [u8; 149],
    pub checksum: u8,
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for SmartThresholdResponse {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for SmartThresholdResponse {}

impl SmartThresholdResponse {
    pub const SIZE: usize = 512;

    pub fn entries(&self) -> impl Iterator<Item = &SmartThresholdEntry> {
        self.thresholds.iter().take_while(|e| e.id != 0)
    }

    pub fn checksum_valid(&self) -> bool {
        checksum_valid(wire::encode(self))
    }
}

fn checksum_valid(bytes: &[u8]) -> bool {
    bytes.iter().fold(0u8, |a, b| a.wrapping_add(*b)) == 0
}

#[cfg(test)]
#[path = "tests/ata.rs"]
pub(crate) mod tests;
