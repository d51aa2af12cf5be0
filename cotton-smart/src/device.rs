use crate::attribute::SmartAttribute;
use crate::nvme::SmartLog;
use crate::nvme_device::NvmeDevice;
use crate::scsi_device::ScsiDevice;
use crate::transport::{Error, NvmeTransport, ScsiTransport};
use std::collections::BTreeMap;
use std::path::Path;

/// Identification strings common to every kind of drive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub model: String,
    pub serial: String,
    pub firmware: String,
}

/// Health data, in whichever form the drive offers it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmartTable {
    /// Interpreted ATA SMART attributes, by id
    Ata(BTreeMap<u8, SmartAttribute>),
    /// The NVMe SMART / Health Information log page
    Nvme(Box<SmartLog>),
}

/// Queries which every supported drive answers
pub trait Device {
    type Error;

    fn identify(&mut self) -> Result<Identity, Self::Error>;
    fn model(&mut self) -> Result<Option<String>, Self::Error>;
    fn serial(&mut self) -> Result<Option<String>, Self::Error>;

    /// Temperature in Celsius, if the drive reports one
    fn temperature(&mut self) -> Result<Option<f64>, Self::Error>;

    fn smart_table(&mut self) -> Result<SmartTable, Self::Error>;

    /// Tokens for matching against the quirk database, such as
    /// `["type:ata", "model:Samsung SSD 860 EVO 1TB"]`
    fn filter_tokens(&mut self) -> Result<Vec<String>, Self::Error>;
}

impl<T: ScsiTransport> Device for ScsiDevice<T> {
    type Error = Error<T::Error>;

    fn identify(&mut self) -> Result<Identity, Self::Error> {
        let r = ScsiDevice::identify(self)?;
        Ok(Identity {
            model: r.model(),
            serial: r.serial(),
            firmware: r.firmware(),
        })
    }

    fn model(&mut self) -> Result<Option<String>, Self::Error> {
        ScsiDevice::model(self)
    }

    fn serial(&mut self) -> Result<Option<String>, Self::Error> {
        ScsiDevice::serial(self)
    }

    fn temperature(&mut self) -> Result<Option<f64>, Self::Error> {
        ScsiDevice::temperature(self)
    }

    fn smart_table(&mut self) -> Result<SmartTable, Self::Error> {
        ScsiDevice::smart_table(self).map(SmartTable::Ata)
    }

    fn filter_tokens(&mut self) -> Result<Vec<String>, Self::Error> {
        ScsiDevice::filter_tokens(self)
    }
}

impl<T: NvmeTransport> Device for NvmeDevice<T> {
    type Error = Error<T::Error>;

    fn identify(&mut self) -> Result<Identity, Self::Error> {
        let r = self.identify_controller()?;
        Ok(Identity {
            model: r.model(),
            serial: r.serial(),
            firmware: r.firmware(),
        })
    }

    fn model(&mut self) -> Result<Option<String>, Self::Error> {
        NvmeDevice::model(self)
    }

    fn serial(&mut self) -> Result<Option<String>, Self::Error> {
        NvmeDevice::serial(self)
    }

    fn temperature(&mut self) -> Result<Option<f64>, Self::Error> {
        NvmeDevice::temperature(self)
    }

    fn smart_table(&mut self) -> Result<SmartTable, Self::Error> {
        Ok(SmartTable::Nvme(Box::new(self.smart_log()?)))
    }

    fn filter_tokens(&mut self) -> Result<Vec<String>, Self::Error> {
        NvmeDevice::filter_tokens(self)
    }
}

/// Which protocol a device node speaks
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeviceKind {
    /// SCSI, or ATA behind a SCSI translation layer
    Ata,
    Nvme,
}

impl DeviceKind {
    /// Guess from the device node's name: `/dev/nvme0` or
    /// `/dev/nvme0n1` is NVMe, anything else goes through SCSI
    pub fn probe(path: &Path) -> Self {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(n) if n.starts_with("nvme") => Self::Nvme,
            _ => Self::Ata,
        }
    }
}

/// A drive of either kind
///
/// Both transports must share an error type, as they do on any one
/// platform.
pub enum DeviceHandle<S: ScsiTransport, N: NvmeTransport> {
    Ata(ScsiDevice<S>),
    Nvme(NvmeDevice<N>),
}

impl<S: ScsiTransport, N: NvmeTransport> DeviceHandle<S, N> {
    /// Open `path` with whichever transport its name calls for
    pub fn open_with<E>(
        path: &Path,
        open_scsi: impl FnOnce(&Path) -> Result<S, E>,
        open_nvme: impl FnOnce(&Path) -> Result<N, E>,
    ) -> Result<Self, E> {
        Ok(match DeviceKind::probe(path) {
            DeviceKind::Ata => Self::Ata(ScsiDevice::new(open_scsi(path)?)),
            DeviceKind::Nvme => Self::Nvme(NvmeDevice::new(open_nvme(path)?)),
        })
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Ata(_) => DeviceKind::Ata,
            Self::Nvme(_) => DeviceKind::Nvme,
        }
    }
}

impl<S, N> Device for DeviceHandle<S, N>
where
    S: ScsiTransport,
    N: NvmeTransport<Error = S::Error>,
{
    type Error = Error<S::Error>;

    fn identify(&mut self) -> Result<Identity, Self::Error> {
        match self {
            Self::Ata(d) => Device::identify(d),
            Self::Nvme(d) => Device::identify(d),
        }
    }

    fn model(&mut self) -> Result<Option<String>, Self::Error> {
        match self {
            Self::Ata(d) => d.model(),
            Self::Nvme(d) => d.model(),
        }
    }

    fn serial(&mut self) -> Result<Option<String>, Self::Error> {
        match self {
            Self::Ata(d) => d.serial(),
            Self::Nvme(d) => d.serial(),
        }
    }

    fn temperature(&mut self) -> Result<Option<f64>, Self::Error> {
        match self {
            Self::Ata(d) => d.temperature(),
            Self::Nvme(d) => d.temperature(),
        }
    }

    fn smart_table(&mut self) -> Result<SmartTable, Self::Error> {
        match self {
            Self::Ata(d) => Device::smart_table(d),
            Self::Nvme(d) => Device::smart_table(d),
        }
    }

    fn filter_tokens(&mut self) -> Result<Vec<String>, Self::Error> {
        match self {
            Self::Ata(d) => d.filter_tokens(),
            Self::Nvme(d) => d.filter_tokens(),
        }
    }
}

#[cfg(test)]
#[path = "tests/device.rs"]
mod tests;
