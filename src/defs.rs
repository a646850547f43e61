/******************************************************************************
 * ITE IT7260 - Command set                                                   *
 * ========================================================================== *
 * Commands are written to the command buffer in a single transfer. The      *
 * first byte is the opcode, the rest is a fixed-length payload.             *
*******************************************************************************/

/// Command opcodes understood by the controller.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
  /// Identify cap sensor.
  Identify = 0x00,
  /// Query cap sensor information (sub-command selects the field).
  GetSensorInfo = 0x01,
  /// Set cap sensor information (sub-command selects the field).
  SetSensorInfo = 0x02,
  /// Select the power mode.
  SetPowerMode = 0x04,
  /// Calibrate the capacitive sensor.
  Calibrate = 0x13,
  /// Enter or exit firmware upgrade mode, depending on the marker byte.
  UpgradeMode = 0x60,
  /// Set the flash start offset for subsequent reads and writes.
  SetStartOffset = 0x61,
  /// Read flash starting at the programmed offset.
  ReadFlash = 0x63,
  /// Reinitialize the firmware.
  Reinit = 0x6F,
  /// Program four bytes at the current offset.
  WriteFlash = 0xF0,
  /// Commit the flash write buffer.
  FlushFlash = 0xF1,
}

impl From<Opcode> for u8 {
  #[inline]
  fn from(op: Opcode) -> Self {
    op as u8
  }
}

/// Sub-command of [`Opcode::GetSensorInfo`] returning the 2D resolution.
pub(crate) const SENSOR_INFO_RESOLUTION: u8 = 0x02;
/// Sub-command of [`Opcode::SetSensorInfo`] controlling interrupt notification.
pub(crate) const SENSOR_INFO_INTERRUPT: u8 = 0x04;

/// Marker byte selecting upgrade mode entry.
pub(crate) const UPGRADE_ENTER: u8 = 0x00;
/// Marker byte selecting upgrade mode exit.
pub(crate) const UPGRADE_EXIT: u8 = 0x80;
/// Magic appended to the upgrade mode commands.
pub(crate) const UPGRADE_MAGIC: &[u8; 4] = b"IT72";

/// Number of flash bytes read per response chunk.
pub(crate) const FLASH_READ_CHUNK: u8 = 0x04;
/// Number of programmed bytes after which the write buffer is flushed.
pub(crate) const FLASH_FLUSH_INTERVAL: usize = 128;

/// Flash offset of the firmware version.
pub(crate) const FIRMWARE_VERSION_OFFSET: u16 = 8;
/// Flash offset of the configuration version.
pub(crate) const CONFIG_VERSION_OFFSET: u16 = 32_760;

/// Time the firmware needs after a reinitialize command.
pub(crate) const REINIT_SETTLE_MS: u32 = 200;
/// Time the sensor needs to complete a calibration.
pub(crate) const CALIBRATION_MS: u32 = 900;

/// Power mode selected with [`Opcode::SetPowerMode`].
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
  /// Full power, sensing active.
  Full = 0x00,
  /// Sleep, sensing stopped.
  Sleep = 0x02,
}

pub(crate) const fn identify() -> [u8; 1] {
  [Opcode::Identify as u8]
}

pub(crate) const fn get_resolution() -> [u8; 3] {
  [Opcode::GetSensorInfo as u8, SENSOR_INFO_RESOLUTION, 0x00]
}

pub(crate) const fn set_power_mode(mode: PowerMode) -> [u8; 3] {
  [Opcode::SetPowerMode as u8, 0x00, mode as u8]
}

/// Enable or disable the interrupt line (low level trigger).
pub(crate) const fn set_interrupts(enable: bool) -> [u8; 4] {
  [Opcode::SetSensorInfo as u8, SENSOR_INFO_INTERRUPT, enable as u8, 0x00]
}

/// Calibration sub-command 0 with auto-tune disabled and a zero threshold.
pub(crate) const fn calibrate() -> [u8; 6] {
  [Opcode::Calibrate as u8, 0x00, 0x00, 0x00, 0x00, 0x00]
}

pub(crate) const fn upgrade_mode(marker: u8) -> [u8; 6] {
  let m = UPGRADE_MAGIC;
  [Opcode::UpgradeMode as u8, marker, m[0], m[1], m[2], m[3]]
}

pub(crate) const fn set_start_offset(offset: u16) -> [u8; 4] {
  let o = offset.to_le_bytes();
  [Opcode::SetStartOffset as u8, 0x00, o[0], o[1]]
}

pub(crate) const fn read_flash() -> [u8; 2] {
  [Opcode::ReadFlash as u8, FLASH_READ_CHUNK]
}

pub(crate) const fn write_flash(chunk: [u8; 4]) -> [u8; 6] {
  [Opcode::WriteFlash as u8, 0x00, chunk[0], chunk[1], chunk[2], chunk[3]]
}

pub(crate) const fn flush_flash() -> [u8; 1] {
  [Opcode::FlushFlash as u8]
}

pub(crate) const fn reinit() -> [u8; 1] {
  [Opcode::Reinit as u8]
}
