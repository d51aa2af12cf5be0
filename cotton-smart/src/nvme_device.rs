use crate::nvme::{self, log_page, IdentifyController, SmartLog};
use crate::transport::{Error, NvmeTransport};

/// An NVMe controller, addressed through its admin queue
pub struct NvmeDevice<T: NvmeTransport> {
    transport: T,
}

impl<T: NvmeTransport> NvmeDevice<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Issue an admin command whose data is one `R`
    fn admin<R: bytemuck::Pod>(
        &mut self,
        mut cmd: nvme::NvmeAdminCommand,
    ) -> Result<R, Error<T::Error>> {
        let mut r = R::zeroed();
        let status = self
            .transport
            .admin_command(&mut cmd, bytemuck::bytes_of_mut(&mut r))
            .map_err(Error::Transport)?;
        nvme::parse_nvme_status(status.to_le_bytes())?;
        Ok(r)
    }

    pub fn identify_controller(
        &mut self,
    ) -> Result<IdentifyController, Error<T::Error>> {
        self.admin(nvme::build_identify())
    }

    /// Read a whole log page, sized to fit `R`
    pub fn get_log_page<R: bytemuck::Pod>(
        &mut self,
        log_page_id: u8,
    ) -> Result<R, Error<T::Error>> {
        let size = core::mem::size_of::<R>() as u32;
        self.admin(nvme::build_get_log_page(log_page_id, size))
    }

    /// SMART / Health Information (log page 2)
    pub fn smart_log(&mut self) -> Result<SmartLog, Error<T::Error>> {
        self.get_log_page(log_page::SMART)
    }

    pub fn model(&mut self) -> Result<Option<String>, Error<T::Error>> {
        let model = self.identify_controller()?.model();
        Ok((!model.is_empty()).then_some(model))
    }

    pub fn serial(&mut self) -> Result<Option<String>, Error<T::Error>> {
        let serial = self.identify_controller()?.serial();
        Ok((!serial.is_empty()).then_some(serial))
    }

    pub fn filter_tokens(&mut self) -> Result<Vec<String>, Error<T::Error>> {
        let model = self.model()?.unwrap_or_default();
        Ok(vec!["type:nvme".to_string(), format!("model:{model}")])
    }

    /// Composite temperature in Celsius
    pub fn temperature(&mut self) -> Result<Option<f64>, Error<T::Error>> {
        Ok(Some(self.smart_log()?.temperature_celsius()))
    }
}

#[cfg(test)]
#[path = "tests/nvme_device.rs"]
pub(crate) mod tests;
