use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::defs::{self, FLASH_FLUSH_INTERVAL, UPGRADE_ENTER, UPGRADE_EXIT};
use crate::{Error, It7260, Mode};

/// Flash is programmed and read back four bytes at a time.
const CHUNK: usize = 4;

/// A block of flash contents at a fixed offset.
///
/// Only whole 4-byte chunks are transferred; a trailing remainder shorter
/// than that is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRegion<'a> {
  pub offset: u16,
  pub data: &'a [u8],
}

impl<'a> FlashRegion<'a> {
  pub const fn new(offset: u16, data: &'a [u8]) -> Self {
    Self { offset, data }
  }

  /// Region ending exactly at the top of a flash of `flash_size` bytes.
  /// `None` when the data does not fit.
  pub fn at_top(flash_size: u32, data: &'a [u8]) -> Option<Self> {
    let start = flash_size.checked_sub(u32::try_from(data.len()).ok()?)?;
    Some(Self::new(u16::try_from(start).ok()?, data))
  }

  /// Number of bytes actually transferred.
  pub const fn aligned_len(&self) -> usize {
    self.data.len() & !(CHUNK - 1)
  }

  fn fits(&self, flash_size: u32) -> bool {
    self.offset as u32 + self.data.len() as u32 <= flash_size
  }
}

impl<I, E, D> It7260<I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Switch the controller into firmware upgrade mode. Touch reporting
  /// stops until [`Self::exit_upgrade_mode`].
  pub async fn enter_upgrade_mode(&mut self) -> Result<(), Error<E>> {
    self.tx_cmd_rx_status(&defs::upgrade_mode(UPGRADE_ENTER)).await?;
    self.session.mode = Mode::Upgrade;
    info!("IT7260: entered upgrade mode");
    Ok(())
  }

  /// Leave upgrade mode and return to normal operation.
  pub async fn exit_upgrade_mode(&mut self) -> Result<(), Error<E>> {
    self.tx_cmd_rx_status(&defs::upgrade_mode(UPGRADE_EXIT)).await?;
    self.session.mode = Mode::Normal;
    info!("IT7260: left upgrade mode");
    Ok(())
  }

  /// Set the flash address used by the next read or write.
  pub async fn set_start_offset(&mut self, offset: u16) -> Result<(), Error<E>> {
    self.tx_cmd_rx_status(&defs::set_start_offset(offset)).await
  }

  /// Program `region` chunk by chunk, flushing the controller's write
  /// buffer after every 128 bytes.
  pub async fn write_flash(&mut self, region: FlashRegion<'_>) -> Result<(), Error<E>> {
    if !region.fits(self.config.flash_size) {
      return Err(Error::BufferOverflow);
    }
    self.set_start_offset(region.offset).await?;

    let mut pending = 0;
    for chunk in region.data.chunks_exact(CHUNK) {
      let chunk = [chunk[0], chunk[1], chunk[2], chunk[3]];
      self.tx_cmd_rx_status(&defs::write_flash(chunk)).await?;
      pending += CHUNK;
      if pending >= FLASH_FLUSH_INTERVAL {
        pending = 0;
        self.write_command(&defs::flush_flash()).await?;
      }
    }
    trace!("IT7260: wrote {} bytes at {}", region.aligned_len(), region.offset);
    Ok(())
  }

  /// Read flash starting at `offset` into `buf`. A trailing part of `buf`
  /// shorter than four bytes is left untouched.
  pub async fn read_flash(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Error<E>> {
    if !FlashRegion::new(offset, buf).fits(self.config.flash_size) {
      return Err(Error::BufferOverflow);
    }
    self.start_flash_read(offset).await?;
    for chunk in buf.chunks_exact_mut(CHUNK) {
      self.read_response(chunk).await?;
    }
    Ok(())
  }

  /// Compare flash against `region`, failing at the first differing byte.
  pub async fn verify_flash(&mut self, region: FlashRegion<'_>) -> Result<(), Error<E>> {
    if !region.fits(self.config.flash_size) {
      return Err(Error::BufferOverflow);
    }
    self.start_flash_read(region.offset).await?;

    for (n, expected) in region.data.chunks_exact(CHUNK).enumerate() {
      let mut actual = [0u8; CHUNK];
      self.read_response(&mut actual).await?;
      if let Some(i) = actual.iter().zip(expected).position(|(a, e)| a != e) {
        let offset = region.offset as u32 + (n * CHUNK + i) as u32;
        warn!("IT7260: flash verify failed at {}", offset);
        return Err(Error::VerifyMismatch { offset });
      }
    }
    Ok(())
  }

  /// Program and verify new firmware and/or configuration, then restart the
  /// firmware.
  ///
  /// Firmware goes to the bottom of flash and configuration to the top;
  /// either may be empty. The first failure aborts the sequence and nothing
  /// is rolled back. If the firmware does not come back the session ends
  /// up in [`Mode::ReinitFailed`].
  pub async fn upgrade(&mut self, firmware: &[u8], config: &[u8]) -> Result<(), Error<E>> {
    let flash_size = self.config.flash_size;
    let fw = Some(FlashRegion::new(0, firmware)).filter(|r| !r.data.is_empty());
    let cfg = if config.is_empty() {
      None
    } else {
      Some(FlashRegion::at_top(flash_size, config).ok_or(Error::BufferOverflow)?)
    };
    if fw.is_some_and(|r| !r.fits(flash_size)) {
      return Err(Error::BufferOverflow);
    }

    info!("IT7260: upgrading firmware ({} bytes) and config ({} bytes)", firmware.len(), config.len());
    self.enter_upgrade_mode().await?;
    for region in [fw, cfg].into_iter().flatten() {
      self.write_flash(region).await?;
    }
    for region in [fw, cfg].into_iter().flatten() {
      self.verify_flash(region).await?;
    }
    self.exit_upgrade_mode().await?;

    if let Err(e) = self.reinitialize_firmware().await {
      error!("IT7260: firmware did not restart after upgrade: {}", e.as_str());
      self.session.mode = Mode::ReinitFailed;
      return Err(e);
    }
    info!("IT7260: upgrade complete");
    Ok(())
  }

  async fn start_flash_read(&mut self, offset: u16) -> Result<(), Error<E>> {
    self.set_start_offset(offset).await?;
    self.tx_cmd(&defs::read_flash()).await
  }
}

#[cfg(test)]
mod tests {
  use super::FlashRegion;
  use crate::testing::{block_on, driver, driver_with};
  use crate::{Config, Error, Mode};

  fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
  }

  #[test]
  fn region_alignment_and_placement() {
    let data = [0u8; 10];
    assert_eq!(FlashRegion::new(0, &data).aligned_len(), 8);
    assert_eq!(FlashRegion::at_top(32_768, &data).map(|r| r.offset), Some(32_758));
    assert_eq!(FlashRegion::at_top(8, &data), None);
  }

  #[test]
  fn write_then_read_back() {
    let mut dev = driver();
    let data = pattern(16);
    block_on(dev.write_flash(FlashRegion::new(0x100, &data))).unwrap();
    let mut back = [0u8; 16];
    block_on(dev.read_flash(0x100, &mut back)).unwrap();
    assert_eq!(&back[..], &data[..]);
  }

  #[test]
  fn write_sends_program_commands_and_drops_remainder() {
    let mut dev = driver();
    block_on(dev.write_flash(FlashRegion::new(0, &[1, 2, 3, 4, 5, 6]))).unwrap();
    assert_eq!(
      dev.i2c.commands(),
      vec![vec![0x61, 0x00, 0x00, 0x00], vec![0xF0, 0x00, 1, 2, 3, 4]]
    );
    assert_eq!(&dev.i2c.flash[..6], &[1, 2, 3, 4, 0xFF, 0xFF]);
  }

  #[test]
  fn write_flushes_every_128_bytes() {
    let mut dev = driver();
    let data = pattern(300);
    block_on(dev.write_flash(FlashRegion::new(0, &data))).unwrap();
    assert_eq!(dev.i2c.flushes, 2);
    assert_eq!(dev.i2c.commands_with(0xF0).len(), 75);

    // flush follows the 32nd program command directly
    let cmds = dev.i2c.commands();
    assert_eq!(cmds[33], vec![0xF1]);
  }

  #[test]
  fn verify_reports_first_differing_byte() {
    let mut dev = driver();
    let data = pattern(64);
    block_on(dev.write_flash(FlashRegion::new(0x40, &data))).unwrap();
    block_on(dev.verify_flash(FlashRegion::new(0x40, &data))).unwrap();

    dev.i2c.corrupt_at = Some(0x40 + 37);
    assert!(matches!(
      block_on(dev.verify_flash(FlashRegion::new(0x40, &data))),
      Err(Error::VerifyMismatch { offset: 0x65 })
    ));
  }

  #[test]
  fn regions_beyond_flash_are_rejected() {
    let mut dev = driver();
    let data = [0u8; 8];
    assert!(matches!(block_on(dev.write_flash(FlashRegion::new(32_764, &data))), Err(Error::BufferOverflow)));
    assert!(dev.i2c.ops.is_empty());
  }

  #[test]
  fn upgrade_places_config_at_top_and_restarts() {
    let mut dev = driver();
    let firmware = pattern(256);
    let config = pattern(40);
    block_on(dev.upgrade(&firmware, &config)).unwrap();

    assert_eq!(&dev.i2c.flash[..256], &firmware[..]);
    assert_eq!(&dev.i2c.flash[32_728..], &config[..]);
    assert_eq!(dev.session().mode(), Mode::Normal);

    let cmds = dev.i2c.commands();
    assert_eq!(cmds.first(), Some(&vec![0x60, 0x00, b'I', b'T', b'7', b'2']));
    assert_eq!(cmds[cmds.len() - 2], vec![0x60, 0x80, b'I', b'T', b'7', b'2']);
    assert_eq!(cmds.last(), Some(&vec![0x6F]));
    assert!(cmds.contains(&vec![0x61, 0x00, 0xD8, 0x7F]));
  }

  #[test]
  fn upgrade_with_empty_config_skips_it() {
    let mut dev = driver();
    block_on(dev.upgrade(&pattern(8), &[])).unwrap();
    assert_eq!(dev.i2c.commands_with(0x61), vec![vec![0x61, 0x00, 0x00, 0x00], vec![0x61, 0x00, 0x00, 0x00]]);
  }

  #[test]
  fn firmware_only_upgrade_on_full_offset_space() {
    let mut dev = driver_with(Config::new().with_flash_size(0x1_0000));
    block_on(dev.upgrade(&pattern(8), &[])).unwrap();
    assert_eq!(&dev.i2c.flash[..8], &pattern(8)[..]);
    assert_eq!(dev.session().mode(), Mode::Normal);
    assert_eq!(dev.i2c.commands().last(), Some(&vec![0x6F]));
  }

  #[test]
  fn config_at_top_of_full_offset_space() {
    let region = FlashRegion::at_top(0x1_0000, &[0u8; 8]).expect("fits");
    assert_eq!(region.offset, 0xFFF8);
    assert_eq!(FlashRegion::at_top(0x1_0000, &[]), None);
  }

  #[test]
  fn upgrade_aborts_on_verify_mismatch() {
    let mut dev = driver();
    dev.i2c.corrupt_at = Some(5);
    assert!(matches!(block_on(dev.upgrade(&pattern(16), &[])), Err(Error::VerifyMismatch { offset: 5 })));
    assert_eq!(dev.session().mode(), Mode::Upgrade);
    assert!(dev.i2c.commands_with(0x6F).is_empty());
    assert!(dev.i2c.commands_with(0x60).len() == 1);
  }

  #[test]
  fn upgrade_aborts_when_write_is_rejected() {
    let mut dev = driver();
    dev.i2c.reply(0xF0, &[0x01, 0x00]);
    assert!(matches!(block_on(dev.upgrade(&pattern(16), &[])), Err(Error::Protocol([0x01, 0x00]))));
    assert_eq!(dev.i2c.commands_with(0xF0).len(), 1);
  }

  #[test]
  fn failed_restart_marks_session() {
    let mut dev = driver();
    dev.i2c.reply(0x6F, &[0xFF, 0xFF]);
    assert!(matches!(block_on(dev.upgrade(&pattern(8), &pattern(8))), Err(Error::Protocol(_))));
    assert_eq!(dev.session().mode(), Mode::ReinitFailed);
    assert!(!dev.session().delivers_points());
  }
}
