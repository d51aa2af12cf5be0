//! NVMe admin commands
//!
//! NVMe controllers don't speak SCSI at all; instead the OS offers an
//! ioctl which submits an admin command directly. The command frame
//! is the Linux `struct nvme_admin_cmd`, which is in host byte order;
//! the data returned by the controller is little-endian.
use crate::wire::{self, Counter128};
use bitflags::bitflags;
use core::fmt;

/// Linux `NVME_IOCTL_ADMIN_CMD`: `_IOWR('N', 0x41, struct nvme_admin_cmd)`
pub const NVME_IOCTL_ADMIN_CMD: u32 = 0xC048_4E41;

/// Admin command opcodes (NVMe base spec 2.0 s5)
pub mod opcode {
    pub const GET_LOG_PAGE: u8 = 0x02;
    pub const IDENTIFY: u8 = 0x06;
}

/// Log page identifiers
pub mod log_page {
    pub const ERROR_INFORMATION: u8 = 0x01;
    pub const SMART: u8 = 0x02;
    pub const FIRMWARE_SLOT: u8 = 0x03;
}

/// Every namespace, as opposed to a specific one
pub const NSID_ALL: u32 = 0xFFFF_FFFF;

/// CNS value for IDENTIFY: the controller data structure
const CNS_CONTROLLER: u32 = 1;

/// Linux `struct nvme_admin_cmd`
///
/// `addr` and `data_len` describe the data buffer, and are filled in
/// by the transport.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[repr(C)]
pub struct NvmeAdminCommand {
    pub opcode: u8,
    pub flags: u8,
    pub rsvd1: u16,
    pub nsid: u32,
    pub cdw2: u32,
    pub cdw3: u32,
    pub metadata: u64,
    pub addr: u64,
    pub metadata_len: u32,
    pub data_len: u32,
    pub cdw10: u32,
    pub cdw11: u32,
    pub cdw12: u32,
    pub cdw13: u32,
    pub cdw14: u32,
    pub cdw15: u32,
    pub timeout_ms: u32,
    pub result: u32,
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for NvmeAdminCommand {}
// SAFETY: no padding (u64 fields fall on 8-byte boundaries, total is
// a multiple of 8), no disallowed bit patterns
unsafe impl bytemuck::Pod for NvmeAdminCommand {}

/// IDENTIFY CONTROLLER
pub fn build_identify() -> NvmeAdminCommand {
    assert!(core::mem::size_of::<NvmeAdminCommand>() == 72);
    NvmeAdminCommand {
        opcode: opcode::IDENTIFY,
        cdw10: CNS_CONTROLLER,
        data_len: IdentifyController::SIZE as u32,
        ..Default::default()
    }
}

/// GET LOG PAGE, for all namespaces
///
/// `byte_size` must be a non-zero multiple of four: the command
/// counts dwords.
pub fn build_get_log_page(log_page_id: u8, byte_size: u32) -> NvmeAdminCommand {
    assert!(
        byte_size >= 4 && byte_size % 4 == 0 && byte_size / 4 <= 0x1_0000,
        "bad log page size {byte_size}"
    );
    NvmeAdminCommand {
        opcode: opcode::GET_LOG_PAGE,
        nsid: NSID_ALL,
        cdw10: u32::from(log_page_id) | ((byte_size / 4 - 1) << 16),
        data_len: byte_size,
        ..Default::default()
    }
}

/// Identify Controller data structure
/// NVMe base spec 2.0 figure 275
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct IdentifyController {
    pub vid_le: [u8; 2],
    pub ssvid_le: [u8; 2],
    pub serial_number: [u8; 20],
    pub model_number: [u8; 40],
    pub firmware_revision: [u8; 8],
    pub rest: [u8; 4024],
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for IdentifyController {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for IdentifyController {}

impl IdentifyController {
    pub const SIZE: usize = 4096;

    /// PCI vendor ID
    pub fn vendor_id(&self) -> u16 {
        u16::from_le_bytes(self.vid_le)
    }

    pub fn subsystem_vendor_id(&self) -> u16 {
        u16::from_le_bytes(self.ssvid_le)
    }

    // Unlike ATA, NVMe strings are in natural order

    pub fn model(&self) -> String {
        wire::decode_string(&self.model_number)
    }

    pub fn serial(&self) -> String {
        wire::decode_string(&self.serial_number)
    }

    pub fn firmware(&self) -> String {
        wire::decode_string(&self.firmware_revision)
    }
}

bitflags! {
    /// SMART / Health log critical warning byte
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct CriticalWarning: u8 {
        const AVAILABLE_SPARE = 0x01;
        const TEMPERATURE = 0x02;
        const DEGRADED = 0x04;
        const READ_ONLY = 0x08;
        const VOLATILE_MEMORY_BACKUP = 0x10;
        const PERSISTENT_MEMORY_REGION = 0x20;
    }
}

/// SMART / Health Information log page
/// NVMe base spec 2.0 figure 207
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct SmartLog {
    pub critical_warning: u8,
    pub composite_temperature_le: [u8; 2],
    pub available_spare: u8,
    pub available_spare_threshold: u8,
    pub percentage_used: u8,
    pub endurance_group_critical_warning: u8,
    pub reserved1: [u8; 25],
    pub data_units_read: [u8; 16],
    pub data_units_written: [u8; 16],
    pub host_read_commands: [u8; 16],
    pub host_write_commands: [u8; 16],
    pub controller_busy_time: [u8; 16],
    pub power_cycles: [u8; 16],
    pub power_on_hours: [u8; 16],
    pub unsafe_shutdowns: [u8; 16],
    pub media_errors: [u8; 16],
    pub error_log_entries: [u8; 16],
    pub warning_temperature_time_le: [u8; 4],
    pub critical_temperature_time_le: [u8; 4],
    pub temperature_sensors_le: [[u8; 2]; 8],
    pub thermal_transition_counts_le: [[u8; 4]; 2],
    pub thermal_total_times_le: [[u8; 4]; 2],
    pub reserved2: [u8; 280],
}

// SAFETY: all fields zeroable
unsafe impl bytemuck::Zeroable for SmartLog {}
// SAFETY: no padding, no disallowed bit patterns
unsafe impl bytemuck::Pod for SmartLog {}

fn kelvin_to_celsius(k: u16) -> f64 {
    f64::from(k) - 273.15
}

impl SmartLog {
    pub const SIZE: usize = 512;

    pub fn critical_warning(&self) -> CriticalWarning {
        CriticalWarning::from_bits_retain(self.critical_warning)
    }

    pub fn temperature_kelvin(&self) -> u16 {
        u16::from_le_bytes(self.composite_temperature_le)
    }

    pub fn temperature_celsius(&self) -> f64 {
        kelvin_to_celsius(self.temperature_kelvin())
    }

    /// Each of the eight temperature sensors, in Celsius, if present
    pub fn sensor_temperatures(&self) -> [Option<f64>; 8] {
        self.temperature_sensors_le.map(|t| {
            let k = u16::from_le_bytes(t);
            (k != 0).then(|| kelvin_to_celsius(k))
        })
    }

    /// In units of 1000 512-byte sectors
    pub fn data_units_read(&self) -> Counter128 {
        Counter128::from_le_bytes(self.data_units_read)
    }

    pub fn data_units_written(&self) -> Counter128 {
        Counter128::from_le_bytes(self.data_units_written)
    }

    pub fn bytes_read(&self) -> u128 {
        self.data_units_read().value().saturating_mul(512_000)
    }

    pub fn bytes_written(&self) -> u128 {
        self.data_units_written().value().saturating_mul(512_000)
    }

    pub fn host_read_commands(&self) -> Counter128 {
        Counter128::from_le_bytes(self.host_read_commands)
    }

    pub fn host_write_commands(&self) -> Counter128 {
        Counter128::from_le_bytes(self.host_write_commands)
    }

    /// Minutes
    pub fn controller_busy_time(&self) -> Counter128 {
        Counter128::from_le_bytes(self.controller_busy_time)
    }

    pub fn power_cycles(&self) -> Counter128 {
        Counter128::from_le_bytes(self.power_cycles)
    }

    pub fn power_on_hours(&self) -> Counter128 {
        Counter128::from_le_bytes(self.power_on_hours)
    }

    pub fn unsafe_shutdowns(&self) -> Counter128 {
        Counter128::from_le_bytes(self.unsafe_shutdowns)
    }

    pub fn media_errors(&self) -> Counter128 {
        Counter128::from_le_bytes(self.media_errors)
    }

    pub fn error_log_entries(&self) -> Counter128 {
        Counter128::from_le_bytes(self.error_log_entries)
    }

    /// Minutes spent above the warning temperature threshold
    pub fn warning_temperature_time(&self) -> u32 {
        u32::from_le_bytes(self.warning_temperature_time_le)
    }

    pub fn critical_temperature_time(&self) -> u32 {
        u32::from_le_bytes(self.critical_temperature_time_le)
    }
}

/// Status field of an NVMe completion queue entry (bits 1-15 of
/// DW3 upper half, as returned by the Linux ioctl)
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct NvmeStatus {
    pub status_code: u8,
    pub status_code_type: u8,
    pub command_retry_delay: u8,
    pub more: bool,
    pub do_not_retry: bool,
}

impl NvmeStatus {
    pub fn from_le_bytes(b: [u8; 2]) -> Self {
        let v = u16::from_le_bytes(b);
        Self {
            status_code: (v & 0xFF) as u8,
            status_code_type: ((v >> 8) & 7) as u8,
            command_retry_delay: ((v >> 11) & 3) as u8,
            more: (v & (1 << 13)) != 0,
            do_not_retry: (v & (1 << 14)) != 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 0 && self.status_code_type == 0
    }

    pub fn message(&self) -> Option<&'static str> {
        status_message(self.status_code_type, self.status_code)
    }
}

/// An NVMe admin command completed with an error status
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NvmeStatusError(pub NvmeStatus);

impl NvmeStatusError {
    pub fn status_code(&self) -> u8 {
        self.0.status_code
    }

    pub fn status_code_type(&self) -> u8 {
        self.0.status_code_type
    }
}

impl fmt::Display for NvmeStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NVMe status type {:#x} code {:#04x}",
            self.0.status_code_type, self.0.status_code
        )?;
        if let Some(m) = self.0.message() {
            write!(f, ": {m}")?;
        }
        Ok(())
    }
}

impl std::error::Error for NvmeStatusError {}

/// Check a completion status
pub fn parse_nvme_status(b: [u8; 2]) -> Result<NvmeStatus, NvmeStatusError> {
    let s = NvmeStatus::from_le_bytes(b);
    if s.is_success() {
        Ok(s)
    } else {
        Err(NvmeStatusError(s))
    }
}

/// Descriptions of status values, keyed by (type, code)
/// NVMe base spec 2.0 s3.3.3.2
const STATUS_MESSAGES: &[(u8, u8, &str)] = &[
    (0, 0x00, "Successful Completion"),
    (0, 0x01, "Invalid Command Opcode"),
    (0, 0x02, "Invalid Field in Command"),
    (0, 0x03, "Command ID Conflict"),
    (0, 0x04, "Data Transfer Error"),
    (0, 0x05, "Commands Aborted due to Power Loss Notification"),
    (0, 0x06, "Internal Error"),
    (0, 0x07, "Command Abort Requested"),
    (0, 0x08, "Command Aborted due to SQ Deletion"),
    (0, 0x09, "Command Aborted due to Failed Fused Command"),
    (0, 0x0A, "Command Aborted due to Missing Fused Command"),
    (0, 0x0B, "Invalid Namespace or Format"),
    (0, 0x0C, "Command Sequence Error"),
    (0, 0x0D, "Invalid SGL Segment Descriptor"),
    (0, 0x0E, "Invalid Number of SGL Descriptors"),
    (0, 0x0F, "Data SGL Length Invalid"),
    (0, 0x10, "Metadata SGL Length Invalid"),
    (0, 0x11, "SGL Descriptor Type Invalid"),
    (0, 0x12, "Invalid Use of Controller Memory Buffer"),
    (0, 0x13, "PRP Offset Invalid"),
    (0, 0x14, "Atomic Write Unit Exceeded"),
    (0, 0x15, "Operation Denied"),
    (0, 0x16, "SGL Offset Invalid"),
    (0, 0x18, "Host Identifier Inconsistent Format"),
    (0, 0x19, "Keep Alive Timer Expired"),
    (0, 0x1A, "Keep Alive Timeout Invalid"),
    (0, 0x1B, "Command Aborted due to Preempt and Abort"),
    (0, 0x1C, "Sanitize Failed"),
    (0, 0x1D, "Sanitize In Progress"),
    (0, 0x1E, "SGL Data Block Granularity Invalid"),
    (0, 0x1F, "Command Not Supported for Queue in CMB"),
    (0, 0x20, "Namespace is Write Protected"),
    (0, 0x21, "Command Interrupted"),
    (0, 0x22, "Transient Transport Error"),
    (0, 0x80, "LBA Out of Range"),
    (0, 0x81, "Capacity Exceeded"),
    (0, 0x82, "Namespace Not Ready"),
    (0, 0x83, "Reservation Conflict"),
    (0, 0x84, "Format In Progress"),
    (1, 0x00, "Completion Queue Invalid"),
    (1, 0x01, "Invalid Queue Identifier"),
    (1, 0x02, "Invalid Queue Size"),
    (1, 0x03, "Abort Command Limit Exceeded"),
    (1, 0x05, "Asynchronous Event Request Limit Exceeded"),
    (1, 0x06, "Invalid Firmware Slot"),
    (1, 0x07, "Invalid Firmware Image"),
    (1, 0x08, "Invalid Interrupt Vector"),
    (1, 0x09, "Invalid Log Page"),
    (1, 0x0A, "Invalid Format"),
    (1, 0x0B, "Firmware Activation Requires Conventional Reset"),
    (1, 0x0C, "Invalid Queue Deletion"),
    (1, 0x0D, "Feature Identifier Not Saveable"),
    (1, 0x0E, "Feature Not Changeable"),
    (1, 0x0F, "Feature Not Namespace Specific"),
    (1, 0x10, "Firmware Activation Requires NVM Subsystem Reset"),
    (1, 0x11, "Firmware Activation Requires Controller Level Reset"),
    (1, 0x12, "Firmware Activation Requires Maximum Time Violation"),
    (1, 0x13, "Firmware Activation Prohibited"),
    (1, 0x14, "Overlapping Range"),
    (1, 0x15, "Namespace Insufficient Capacity"),
    (1, 0x16, "Namespace Identifier Unavailable"),
    (1, 0x18, "Namespace Already Attached"),
    (1, 0x19, "Namespace Is Private"),
    (1, 0x1A, "Namespace Not Attached"),
    (1, 0x1B, "Thin Provisioning Not Supported"),
    (1, 0x1C, "Controller List Invalid"),
    (1, 0x1D, "Device Self-test In Progress"),
    (1, 0x1E, "Boot Partition Write Prohibited"),
    (1, 0x1F, "Invalid Controller Identifier"),
    (1, 0x20, "Invalid Secondary Controller State"),
    (1, 0x21, "Invalid Number of Controller Resources"),
    (1, 0x22, "Invalid Resource Identifier"),
    (1, 0x23, "Sanitize Prohibited While Persistent Memory Region is Enabled"),
    (1, 0x24, "ANA Group Identifier Invalid"),
    (1, 0x25, "ANA Attach Failed"),
    (1, 0x80, "Conflicting Attributes"),
    (1, 0x81, "Invalid Protection Information"),
    (1, 0x82, "Attempted Write to Read Only Range"),
    (2, 0x80, "Write Fault"),
    (2, 0x81, "Unrecovered Read Error"),
    (2, 0x82, "End-to-end Guard Check Error"),
    (2, 0x83, "End-to-end Application Tag Check Error"),
    (2, 0x84, "End-to-end Reference Tag Check Error"),
    (2, 0x85, "Compare Failure"),
    (2, 0x86, "Access Denied"),
    (2, 0x87, "Deallocated or Unwritten Logical Block"),
    (3, 0x00, "Internal Path Error"),
    (3, 0x01, "Asymmetric Access Persistent Loss"),
    (3, 0x02, "Asymmetric Access Inaccessible"),
    (3, 0x03, "Asymmetric Access Transition"),
    (3, 0x60, "Controller Pathing Error"),
    (3, 0x70, "Host Pathing Error"),
    (3, 0x71, "Command Aborted By Host"),
];

pub fn status_message(sct: u8, sc: u8) -> Option<&'static str> {
    STATUS_MESSAGES
        .iter()
        .find(|(t, c, _)| *t == sct && *c == sc)
        .map(|(_, _, m)| *m)
}

#[cfg(test)]
#[path = "tests/nvme.rs"]
pub(crate) mod tests;
