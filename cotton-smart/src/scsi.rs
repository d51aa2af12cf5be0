use crate::wire;

/// INQUIRY operation code
pub const INQUIRY: u8 = 0x12;

/// Linux `SG_IO` ioctl request number
pub const SG_IO: u32 = 0x2285;
/// Windows `IOCTL_SCSI_PASS_THROUGH_DIRECT`
pub const IOCTL_SCSI_PASS_THROUGH_DIRECT: u32 = 0x4D014;

/// SCSI status byte values, shifted right by one as in Linux's
/// `masked_status`
/// SAM-5 s5.3.1
pub mod status {
    pub const GOOD: u8 = 0x00;
    /// Sense data is available
    pub const CHECK_CONDITION: u8 = 0x01;
    pub const CONDITION_MET: u8 = 0x02;
    pub const BUSY: u8 = 0x04;
    pub const INTERMEDIATE: u8 = 0x08;
    pub const INTERMEDIATE_CONDITION_MET: u8 = 0x0A;
    pub const RESERVATION_CONFLICT: u8 = 0x0C;
}

/// INQUIRY
/// Seagate SCSI Commands Reference Manual s3.6
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct InquiryCommand {
    pub operation_code: u8,
    pub evpd: u8,
    pub page_code: u8,
    pub allocation_length_be: [u8; 2],
    pub control: u8,
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for InquiryCommand {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for InquiryCommand {}

impl InquiryCommand {
    pub fn new(len: u16) -> Self {
        assert!(core::mem::size_of::<Self>() == 6);
        Self {
            operation_code: INQUIRY,
            evpd: 0,
            page_code: 0,
            allocation_length_be: len.to_be_bytes(),
            control: 0,
        }
    }

    pub fn allocation_length(&self) -> u16 {
        u16::from_be_bytes(self.allocation_length_be)
    }
}

/// Standard INQUIRY, asking for the whole 96-byte response
pub fn build_inquiry() -> InquiryCommand {
    InquiryCommand::new(InquiryResponse::SIZE as u16)
}

/// Standard INQUIRY data
/// Seagate SCSI Commands Reference Manual s3.6.2
///
/// Only the leading 36 bytes are compulsory; devices may truncate the
/// rest.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct InquiryResponse {
    pub peripheral: u8,
    pub removable: u8,
    pub version: u8,
    pub data_format: u8,
    pub additional_length: u8,
    pub flags: [u8; 3],
    pub vendor_id: [u8; 8],
    pub product_id: [u8; 16],
    pub product_revision: [u8; 4],
    pub vendor_specific: [u8; 20],
    pub flags2: u8,
    pub reserved1: u8,
    pub version_descriptors: [u8; 16],
    pub reserved2: [u8; 22],
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for InquiryResponse {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for InquiryResponse {}

impl InquiryResponse {
    pub const SIZE: usize = 96;
    /// The part every device must return
    pub const MANDATORY_SIZE: usize = 36;

    pub fn peripheral_type(&self) -> PeripheralType {
        PeripheralType::from(self.peripheral)
    }

    pub fn peripheral_qualifier(&self) -> u8 {
        self.peripheral >> 5
    }

    pub fn is_removable(&self) -> bool {
        (self.removable & 0x80) != 0
    }

    pub fn response_data_format(&self) -> u8 {
        self.data_format & 0xF
    }

    pub fn vendor(&self) -> String {
        wire::decode_string(&self.vendor_id)
    }

    pub fn product(&self) -> String {
        wire::decode_string(&self.product_id)
    }

    pub fn revision(&self) -> String {
        wire::decode_string(&self.product_revision)
    }

    /// Bytes 36-55: many ATA bridges and optical drives put a serial
    /// number here
    pub fn vendor_serial(&self) -> String {
        wire::decode_string(&self.vendor_specific)
    }

    /// Version descriptors, omitting unused (zero) slots
    pub fn version_descriptors(&self) -> Vec<u16> {
        self.version_descriptors
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .filter(|v| *v != 0)
            .collect()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum PeripheralType {
    Disk = 0,
    Sequential = 1,
    Printer = 2,
    Processor = 3,
    WriteOnce = 4,
    Optical = 5,
    Scanner = 6,
    OpticalMemory = 7,
    Changer = 8,
    Communications = 9,
    Obsolete10 = 0xa,
    Obsolete11 = 0xb,
    StorageArray = 0xc,
    EnclosureServices = 0xd,
    SimplifiedDirect = 0xe,
    OpticalCardReader = 0xf,
    BridgeController = 0x10,
    ObjectStorage = 0x11,
    Automation = 0x12,
    Reserved13 = 0x13,
    Reserved14 = 0x14,
    Reserved15 = 0x15,
    Reserved16 = 0x16,
    Reserved17 = 0x17,
    Reserved18 = 0x18,
    Reserved19 = 0x19,
    Reserved1A = 0x1A,
    Reserved1B = 0x1B,
    Reserved1C = 0x1C,
    Reserved1D = 0x1D,
    WellKnownUnit = 0x1E,
    Other = 0x1F,
}

impl From<u8> for PeripheralType {
    /// Decodes the low five bits of INQUIRY byte 0
    fn from(b: u8) -> Self {
        // SAFETY: every 5-bit value is a declared discriminant
        unsafe { core::mem::transmute::<u8, PeripheralType>(b & 0x1F) }
    }
}

#[cfg(test)]
#[path = "tests/scsi.rs"]
pub(crate) mod tests;
