use crate::nvme::{NvmeAdminCommand, NvmeStatusError};
use crate::sense::SenseError;
use crate::wire::MalformedResponse;
use core::fmt;

/// The data phase of a SCSI transaction: in, out, or none
#[derive(Debug, PartialEq, Eq)]
pub enum DataPhase<'a> {
    /// The command involves data transfer from device to host
    In(&'a mut [u8]),
    /// The command involves data transfer from host to device
    Out(&'a [u8]),
    /// The command does not involve data transfer
    None,
}

/// An abstract SCSI communications channel to a single device
///
/// On Linux this is SG_IO on a block device (see
/// [`crate::linux::SgIoTransport`]); tests use a mock.
pub trait ScsiTransport {
    /// The type of errors which can arise from the transport itself:
    /// for instance, errno values from an ioctl.
    type Error: PartialEq + Eq;

    /// Execute one SCSI command
    ///
    /// The command is a byte slice containing the raw command block
    /// (for instance, a 16-byte ATA PASS-THROUGH). Any sense data the
    /// device returns is written to `sense`, which the caller has
    /// zeroed; interpreting it is up to the caller.
    ///
    /// Returns the number of bytes actually transferred in the data
    /// phase.
    fn command(
        &mut self,
        cmd: &[u8],
        data: DataPhase,
        sense: &mut [u8],
    ) -> Result<usize, Self::Error>;
}

/// An abstract channel for NVMe admin commands to one controller
pub trait NvmeTransport {
    type Error: PartialEq + Eq;

    /// Submit one admin command, with `data` as its data buffer
    ///
    /// Returns the status field of the completion (zero on success).
    fn admin_command(
        &mut self,
        cmd: &mut NvmeAdminCommand,
        data: &mut [u8],
    ) -> Result<u16, Self::Error>;
}

/// Errors which can arise while querying a device
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error<T> {
    /// The device returned less data than the response structure needs
    MalformedResponse(MalformedResponse),

    /// The device reported an error in its sense data
    Sense(SenseError),

    /// An NVMe command completed with an error status
    NvmeStatus(NvmeStatusError),

    /// The transport itself (as opposed to the device) reported an error.
    Transport(T),
}

impl<T> From<MalformedResponse> for Error<T> {
    fn from(e: MalformedResponse) -> Self {
        Self::MalformedResponse(e)
    }
}

impl<T> From<SenseError> for Error<T> {
    fn from(e: SenseError) -> Self {
        Self::Sense(e)
    }
}

impl<T> From<NvmeStatusError> for Error<T> {
    fn from(e: NvmeStatusError) -> Self {
        Self::NvmeStatus(e)
    }
}

impl<T: fmt::Debug> fmt::Display for Error<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedResponse(e) => fmt::Display::fmt(e, f),
            Self::Sense(e) => write!(f, "device error: {e}"),
            Self::NvmeStatus(e) => fmt::Display::fmt(e, f),
            Self::Transport(e) => write!(f, "transport error: {e:?}"),
        }
    }
}

impl<T: fmt::Debug + std::error::Error + 'static> std::error::Error
    for Error<T>
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedResponse(e) => Some(e),
            Self::Sense(e) => Some(e),
            Self::NvmeStatus(e) => Some(e),
            Self::Transport(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sense::{parse_sense, SenseDetail};
    use std::error::Error as _;

    #[derive(Debug, PartialEq, Eq)]
    struct Injected;

    impl fmt::Display for Injected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("injected")
        }
    }

    impl std::error::Error for Injected {}

    #[test]
    fn display_transport_error() {
        let e = Error::Transport(Injected);
        assert_eq!(format!("{e}"), "transport error: Injected");
        assert_eq!(format!("{}", e.source().unwrap()), "injected");
    }

    #[test]
    fn debug_transport_error() {
        let e = Error::Transport(Injected);
        assert_eq!(format!("{e:?}"), "Transport(Injected)");
    }

    #[test]
    fn display_malformed() {
        let e = Error::<Injected>::from(MalformedResponse {
            expected: 512,
            actual: 0,
        });
        assert_eq!(
            format!("{e}"),
            "malformed response: expected 512 bytes, got 0"
        );
        assert!(e.source().is_some());
    }

    #[test]
    fn display_sense() {
        let e: Error<Injected> =
            parse_sense(&[0x72, 0x04, 0x44, 0x00]).unwrap_err().into();
        assert_eq!(
            format!("{e}"),
            "device error: Hardware Error (sense key 0x4, ASC 0x44, ASCQ 0x00)"
        );
        let Error::Sense(s) = &e else {
            panic!("wrong variant {e:?}");
        };
        assert!(matches!(s.detail, SenseDetail::Decoded(_)));
    }

    #[test]
    fn display_nvme() {
        let e: Error<Injected> = crate::nvme::parse_nvme_status([0x02, 0x00])
            .unwrap_err()
            .into();
        assert_eq!(
            format!("{e}"),
            "NVMe status type 0x0 code 0x02: Invalid Field in Command"
        );
    }
}
