use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::defs::{self, CALIBRATION_MS, REINIT_SETTLE_MS};
use crate::{Error, It7260, PowerMode};

mod info;

pub use info::*;

impl<I, E, D> It7260<I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Select full power or sleep.
  pub async fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), Error<E>> {
    self.tx_cmd_rx_status(&defs::set_power_mode(mode)).await
  }

  /// Wake the controller into full-power scanning.
  pub async fn power_up(&mut self) -> Result<(), Error<E>> {
    self.set_power_mode(PowerMode::Full).await
  }

  /// Put the controller to sleep.
  pub async fn power_down(&mut self) -> Result<(), Error<E>> {
    self.set_power_mode(PowerMode::Sleep).await
  }

  /// Ask the controller to pull its interrupt line low while a report is
  /// pending.
  pub async fn enable_interrupts(&mut self) -> Result<(), Error<E>> {
    self.tx_cmd_rx_status(&defs::set_interrupts(true)).await?;
    self.session.interrupts_enabled = true;
    Ok(())
  }

  /// Keep the interrupt line quiet; reports must be polled.
  pub async fn disable_interrupts(&mut self) -> Result<(), Error<E>> {
    self.tx_cmd_rx_status(&defs::set_interrupts(false)).await?;
    self.session.interrupts_enabled = false;
    Ok(())
  }

  /// Recalibrate the capacitive sensor. Blocks for about a second.
  ///
  /// Not available in upgrade mode, where it succeeds without touching the bus.
  pub async fn calibrate(&mut self) -> Result<(), Error<E>> {
    if self.session.mode.is_upgrade() {
      warn!("IT7260: no calibration available in upgrade mode");
      return Ok(());
    }
    self.wait_for_idle().await?;
    self.write_command(&defs::calibrate()).await?;
    self.delay.delay_ms(CALIBRATION_MS).await;
    self.wait_for_idle().await?;
    let mut response = [0u8; 6];
    self.read_response(&mut response).await
  }

  /// Restart the controller firmware and check its status pair.
  pub async fn reinitialize_firmware(&mut self) -> Result<(), Error<E>> {
    self.wait_for_idle().await?;
    self.write_command(&defs::reinit()).await?;
    self.delay.delay_ms(REINIT_SETTLE_MS).await;
    self.wait_for_idle().await?;
    self.read_status_pair().await
  }
}
