//! Linux transports: SG_IO for SCSI (and SATA via SAT), and the NVMe
//! admin-command ioctl
use crate::device::DeviceHandle;
use crate::nvme::NvmeAdminCommand;
use crate::scsi;
use crate::transport::{DataPhase, NvmeTransport, ScsiTransport};
use libc::{c_int, c_uchar, c_uint, c_ushort, c_void};
use nix::errno::Errno;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

const SG_DXFER_NONE: c_int = -1;
const SG_DXFER_TO_DEV: c_int = -2;
const SG_DXFER_FROM_DEV: c_int = -3;

const DID_OK: c_ushort = 0x00;
const DID_TIME_OUT: c_ushort = 0x03;
const DRIVER_TIMEOUT: c_ushort = 0x06;
const DRIVER_SENSE: c_ushort = 0x08;

/// `struct sg_io_hdr` from `<scsi/sg.h>`
#[repr(C)]
#[derive(Debug)]
pub struct SgIoHeader {
    pub interface_id: c_int,
    pub dxfer_direction: c_int,
    pub cmd_len: c_uchar,
    pub mx_sb_len: c_uchar,
    pub iovec_count: c_ushort,
    pub dxfer_len: c_uint,
    pub dxferp: *mut c_void,
    pub cmdp: *const c_uchar,
    pub sbp: *mut c_uchar,
    pub timeout: c_uint,
    pub flags: c_uint,
    pub pack_id: c_int,
    pub usr_ptr: *mut c_void,
    pub status: c_uchar,
    pub masked_status: c_uchar,
    pub msg_status: c_uchar,
    pub sb_len_wr: c_uchar,
    pub host_status: c_ushort,
    pub driver_status: c_ushort,
    pub resid: c_int,
    pub duration: c_uint,
    pub info: c_uint,
}

nix::ioctl_readwrite_bad!(sg_io, scsi::SG_IO, SgIoHeader);
nix::ioctl_readwrite!(nvme_admin_cmd, b'N', 0x41, NvmeAdminCommand);

fn open_device(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

/// SCSI commands via the SG_IO ioctl on a block or sg device
#[derive(Debug)]
pub struct SgIoTransport {
    file: File,
    timeout_ms: u32,
}

impl SgIoTransport {
    pub const DEFAULT_TIMEOUT_MS: u32 = 3000;

    pub fn new(file: File) -> Self {
        Self {
            file,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn open(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(open_device(path)?))
    }

    /// Per-command timeout; `u32::MAX` means none
    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}

impl ScsiTransport for SgIoTransport {
    type Error = Errno;

    fn command(
        &mut self,
        cmd: &[u8],
        data: DataPhase,
        sense: &mut [u8],
    ) -> Result<usize, Errno> {
        let (dxfer_direction, dxferp, len) = match data {
            DataPhase::In(d) => {
                (SG_DXFER_FROM_DEV, d.as_mut_ptr() as *mut c_void, d.len())
            }
            DataPhase::Out(d) => {
                (SG_DXFER_TO_DEV, d.as_ptr() as *mut c_void, d.len())
            }
            DataPhase::None => (SG_DXFER_NONE, core::ptr::null_mut(), 0),
        };

        let mut hdr = SgIoHeader {
            interface_id: c_int::from(b'S'),
            dxfer_direction,
            cmd_len: u8::try_from(cmd.len()).map_err(|_| Errno::EINVAL)?,
            mx_sb_len: u8::try_from(sense.len()).unwrap_or(u8::MAX),
            iovec_count: 0,
            dxfer_len: c_uint::try_from(len).map_err(|_| Errno::EINVAL)?,
            dxferp,
            cmdp: cmd.as_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: self.timeout_ms,
            flags: 0,
            pack_id: 0,
            usr_ptr: core::ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        };

        // SAFETY: every pointer in hdr refers to a live buffer of the
        // stated length, which outlives the (synchronous) ioctl
        unsafe { sg_io(self.file.as_raw_fd(), &mut hdr) }?;

        completed_length(&hdr, len)
    }
}

/// Bytes transferred by a completed SG_IO, or the error it really
/// reported
///
/// The ioctl itself succeeds even when the command never reached the
/// device, so a timeout or a dropped connection shows up only in the
/// host and driver status fields. A CHECK CONDITION is fine as long
/// as sense data came back with it; the caller parses that.
fn completed_length(hdr: &SgIoHeader, len: usize) -> Result<usize, Errno> {
    // Upper nibble holds the obsolete "suggest" bits
    let driver = hdr.driver_status & 0x0F;
    let failed = hdr.host_status != DID_OK
        || (driver != 0 && driver != DRIVER_SENSE)
        || (hdr.masked_status == scsi::status::CHECK_CONDITION
            && hdr.sb_len_wr == 0);
    if failed {
        log::debug!(
            "SG_IO status {:#04x} host {:#x} driver {:#x} sense {}",
            hdr.status,
            hdr.host_status,
            hdr.driver_status,
            hdr.sb_len_wr
        );
        return Err(
            if hdr.host_status == DID_TIME_OUT || driver == DRIVER_TIMEOUT {
                Errno::ETIMEDOUT
            } else {
                Errno::EIO
            },
        );
    }

    match hdr.masked_status {
        scsi::status::BUSY | scsi::status::RESERVATION_CONFLICT => {
            Err(Errno::EBUSY)
        }
        _ => {
            let resid = usize::try_from(hdr.resid).unwrap_or(0);
            Ok(len.saturating_sub(resid))
        }
    }
}

/// NVMe admin commands via `NVME_IOCTL_ADMIN_CMD` on a controller or
/// namespace device
#[derive(Debug)]
pub struct NvmeIoctlTransport {
    file: File,
}

impl NvmeIoctlTransport {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    pub fn open(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(open_device(path)?))
    }
}

impl NvmeTransport for NvmeIoctlTransport {
    type Error = Errno;

    fn admin_command(
        &mut self,
        cmd: &mut NvmeAdminCommand,
        data: &mut [u8],
    ) -> Result<u16, Errno> {
        cmd.addr = data.as_mut_ptr() as u64;
        cmd.data_len = u32::try_from(data.len()).map_err(|_| Errno::EINVAL)?;

        // SAFETY: cmd.addr points to data, which is data_len bytes
        // long and outlives the ioctl
        let r = unsafe { nvme_admin_cmd(self.file.as_raw_fd(), cmd) }?;

        // A positive return is the completion's status field
        Ok((r & 0xFFFF) as u16)
    }
}

/// A drive on this platform
pub type LinuxDevice = DeviceHandle<SgIoTransport, NvmeIoctlTransport>;

/// Open a device node, choosing SG_IO or NVMe by its name
pub fn open(path: impl AsRef<Path>) -> std::io::Result<LinuxDevice> {
    DeviceHandle::open_with(
        path.as_ref(),
        SgIoTransport::open,
        NvmeIoctlTransport::open,
    )
}
