use crate::ata::{
    self, IdentifyResponse, SmartDataResponse, SmartThresholdResponse,
};
use crate::attribute::{self, SmartAttribute};
use crate::database::Database;
use crate::scsi::{self, InquiryResponse, PeripheralType};
use crate::sense::{parse_sense, SENSE_LENGTH};
use crate::transport::{DataPhase, Error, ScsiTransport};
use crate::wire::{self, MalformedResponse};
use std::collections::BTreeMap;

/// A SCSI-addressed device: a SATA disk behind SG_IO or a USB bridge,
/// or an ATAPI optical drive
///
/// ATA commands are tunnelled using ATA PASS-THROUGH (16).
pub struct ScsiDevice<T: ScsiTransport> {
    transport: T,
    atapi_fallback: bool,
}

impl<T: ScsiTransport> ScsiDevice<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            atapi_fallback: true,
        }
    }

    /// Whether to retry a rejected IDENTIFY DEVICE as IDENTIFY PACKET
    /// DEVICE (default true)
    pub fn set_atapi_fallback(&mut self, enabled: bool) {
        self.atapi_fallback = enabled;
    }

    /// Issue a command with a data-in phase
    ///
    /// Fatal sense data takes precedence over a short transfer; a
    /// transfer of fewer than `min_len` bytes is malformed. Bytes the
    /// device didn't send read as zero.
    pub fn command_response<C: bytemuck::Pod, R: bytemuck::Pod>(
        &mut self,
        cmd: C,
        min_len: usize,
    ) -> Result<R, Error<T::Error>> {
        let mut r = R::zeroed();
        let mut sense = [0u8; SENSE_LENGTH];
        let sz = self
            .transport
            .command(
                wire::encode(&cmd),
                DataPhase::In(bytemuck::bytes_of_mut(&mut r)),
                &mut sense,
            )
            .map_err(Error::Transport)?;
        if let Some(s) = parse_sense(&sense)? {
            log::debug!(
                "command {:#04x}: sense key {:#x} ASC {:#04x} ASCQ {:#04x}",
                wire::encode(&cmd).first().copied().unwrap_or_default(),
                s.sense_key(),
                s.asc(),
                s.ascq()
            );
        }
        if sz < min_len {
            return Err(MalformedResponse {
                expected: min_len,
                actual: sz,
            }
            .into());
        }
        Ok(r)
    }

    /// Standard INQUIRY
    ///
    /// Devices need only return the first 36 bytes; any more that
    /// they don't return read as zero.
    pub fn inquiry(&mut self) -> Result<InquiryResponse, Error<T::Error>> {
        self.command_response(
            scsi::build_inquiry(),
            InquiryResponse::MANDATORY_SIZE,
        )
    }

    pub fn device_type(&mut self) -> Result<PeripheralType, Error<T::Error>> {
        Ok(self.inquiry()?.peripheral_type())
    }

    /// IDENTIFY DEVICE, falling back to IDENTIFY PACKET DEVICE
    pub fn identify(&mut self) -> Result<IdentifyResponse, Error<T::Error>> {
        match self
            .command_response(ata::build_identify(false), IdentifyResponse::SIZE)
        {
            Err(Error::Sense(e)) if self.atapi_fallback => {
                log::debug!("IDENTIFY DEVICE failed ({e}), trying ATAPI");
                self.command_response(
                    ata::build_identify(true),
                    IdentifyResponse::SIZE,
                )
            }
            r => r,
        }
    }

    pub fn smart_read_data(
        &mut self,
    ) -> Result<SmartDataResponse, Error<T::Error>> {
        self.command_response(
            ata::build_smart_read_data(),
            SmartDataResponse::SIZE,
        )
    }

    pub fn smart_read_thresholds(
        &mut self,
    ) -> Result<SmartThresholdResponse, Error<T::Error>> {
        self.command_response(
            ata::build_smart_read_thresholds(),
            SmartThresholdResponse::SIZE,
        )
    }

    /// IDENTIFY, or `None` if the device rejects it
    fn identify_if_ata(
        &mut self,
    ) -> Result<Option<IdentifyResponse>, Error<T::Error>> {
        match self.identify() {
            Ok(r) => Ok(Some(r)),
            Err(Error::Sense(e)) => {
                log::debug!("no IDENTIFY data ({e}), using INQUIRY");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Model name, from IDENTIFY or else INQUIRY product
    /// identification
    pub fn model(&mut self) -> Result<Option<String>, Error<T::Error>> {
        let mut model = self
            .identify_if_ata()?
            .map(|r| r.model())
            .unwrap_or_default();
        if model.is_empty() {
            model = self.inquiry()?.product();
        }
        Ok((!model.is_empty()).then_some(model))
    }

    /// Serial number, from IDENTIFY or else the INQUIRY
    /// vendor-specific area
    pub fn serial(&mut self) -> Result<Option<String>, Error<T::Error>> {
        let mut serial = self
            .identify_if_ata()?
            .map(|r| r.serial())
            .unwrap_or_default();
        if serial.is_empty() {
            serial = self.inquiry()?.vendor_serial();
        }
        Ok((!serial.is_empty()).then_some(serial))
    }

    pub fn filter_tokens(&mut self) -> Result<Vec<String>, Error<T::Error>> {
        let model = self.model()?.unwrap_or_default();
        Ok(vec!["type:ata".to_string(), format!("model:{model}")])
    }

    /// Attributes interpreted using the built-in database
    pub fn smart_table(
        &mut self,
    ) -> Result<BTreeMap<u8, SmartAttribute>, Error<T::Error>> {
        self.smart_table_with(Database::builtin())
    }

    pub fn smart_table_with(
        &mut self,
        database: &Database,
    ) -> Result<BTreeMap<u8, SmartAttribute>, Error<T::Error>> {
        let tokens = self.filter_tokens()?;
        let table = database.effective_table(&tokens);
        let thresholds = self.smart_read_thresholds()?;
        let data = self.smart_read_data()?;
        Ok(attribute::interpret(
            &data.attributes,
            &thresholds.thresholds,
            &table,
        ))
    }

    /// Temperature in Celsius from attribute 0xBE, or else 0xC2
    pub fn temperature(&mut self) -> Result<Option<f64>, Error<T::Error>> {
        let table = self.smart_table()?;
        Ok([0xBE, 0xC2]
            .iter()
            .find_map(|id| table.get(id).and_then(|a| a.processed_value()))
            .map(f64::from))
    }
}

#[cfg(test)]
#[path = "tests/scsi_device.rs"]
pub(crate) mod tests;
