use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::defs::{self, CONFIG_VERSION_OFFSET, FIRMWARE_VERSION_OFFSET};
use crate::reg::SIGNATURE;
use crate::{Error, It7260, Resolution};

impl<I, E, D> It7260<I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Run the identify command and check the `ITE72` signature.
  ///
  /// A wrong signature is reported as [`Error::IdentificationMismatch`]
  /// carrying what the controller answered.
  pub async fn identify(&mut self) -> Result<Identity, Error<E>> {
    self.tx_cmd(&defs::identify()).await?;
    let mut buf = [0u8; 6];
    self.read_response(&mut buf).await?;
    let identity = Identity::from_response(buf);
    if !identity.matches_signature() {
      return Err(Error::IdentificationMismatch(identity));
    }
    Ok(identity)
  }

  /// Read the firmware and configuration versions stored in flash.
  pub async fn version(&mut self) -> Result<Version, Error<E>> {
    let firmware = self.read_version_at(FIRMWARE_VERSION_OFFSET).await?;
    let config = self.read_version_at(CONFIG_VERSION_OFFSET).await?;
    Ok(Version { firmware, config })
  }

  /// Query the 2D resolution of the sensor.
  pub async fn resolution(&mut self) -> Result<Resolution, Error<E>> {
    self.tx_cmd(&defs::get_resolution()).await?;
    let mut buf = [0u8; 6];
    self.read_response(&mut buf).await?;
    Ok(Resolution::new(u16::from_le_bytes([buf[2], buf[3]]), u16::from_le_bytes([buf[4], buf[5]])))
  }

  async fn read_version_at(&mut self, offset: u16) -> Result<[u8; 4], Error<E>> {
    self.set_start_offset(offset).await?;
    self.tx_cmd(&defs::read_flash()).await?;
    let mut version = [0u8; 4];
    self.read_response(&mut version).await?;
    Ok(version)
  }
}

/// Answer to the identify command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Identity {
  /// First response byte, echoed by the firmware.
  pub status: u8,
  pub signature: [u8; 5],
}

impl Identity {
  const fn from_response(buf: [u8; 6]) -> Self {
    Self { status: buf[0], signature: [buf[1], buf[2], buf[3], buf[4], buf[5]] }
  }

  pub fn matches_signature(&self) -> bool {
    &self.signature == SIGNATURE
  }
}

/// Firmware and configuration versions, four bytes each (major first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
  pub firmware: [u8; 4],
  pub config: [u8; 4],
}
