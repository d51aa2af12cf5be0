//! Identification and S.M.A.R.T. health queries for storage devices
//!
//! SATA disks are reached through the SCSI layer using ATA
//! PASS-THROUGH, ATAPI drives and plain SCSI disks by INQUIRY, and
//! NVMe controllers through admin commands. Each command and response
//! is a fixed-layout structure (see [`ata`], [`scsi`], [`nvme`]), and
//! the transport which carries them is a trait, so everything except
//! the [`linux`] module is platform-independent and testable without
//! hardware.
//!
//! SMART attributes are reported by a drive only by number. The
//! [`database`] module maps those numbers to names and units, with
//! per-model overrides.
//!
//! ```no_run
//! # #[cfg(target_os = "linux")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use cotton_smart::Device;
//!
//! let mut d = cotton_smart::linux::open("/dev/sda")?;
//! println!("{:?} at {:?}C", d.model()?, d.temperature()?);
//! # Ok(())
//! # }
//! # #[cfg(not(target_os = "linux"))]
//! # fn main() {}
//! ```

pub mod wire;
pub use wire::{Counter128, MalformedResponse};
pub mod ata;
pub mod scsi;
pub use scsi::PeripheralType;
pub mod sense;
pub use sense::{ScsiError, SenseError};
pub mod nvme;
pub use nvme::{NvmeStatus, NvmeStatusError};
pub mod attribute;
pub use attribute::{Processor, SmartAttribute, Unit};
pub mod database;
pub use database::{Database, DriveEntry, Filter};
pub mod transport;
pub use transport::{DataPhase, Error, NvmeTransport, ScsiTransport};
pub mod scsi_device;
pub use scsi_device::ScsiDevice;
pub mod nvme_device;
pub use nvme_device::NvmeDevice;
pub mod device;
pub use device::{Device, DeviceHandle, DeviceKind, Identity, SmartTable};

#[cfg(target_os = "linux")]
pub mod linux;
