use crate::{reg, Proximity, Resolution};

/// Largest flash a 16-bit start offset can cover.
pub const MAX_FLASH_SIZE: u32 = 0x1_0000;

/// How the host learns about new point reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptMode {
  /// The controller pulls its interrupt line low when a report is ready.
  Event,
  /// The host polls the query buffer on a timer; the interrupt line stays quiet.
  Polling,
}

/// Driver configuration.
///
/// ```no_run
/// use it7260::{Config, InterruptMode, Resolution};
///
/// let config = Config::new()
///   .with_proximity_threshold(80)
///   .with_fallback_resolution(Resolution::new(800, 480))
///   .with_interrupt_mode(InterruptMode::Polling);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
  /// 7-bit I²C address of the controller.
  pub address: u8,
  /// Contact correlation distance.
  pub proximity: Proximity,
  /// Resolution assumed when the controller does not report one.
  pub fallback_resolution: Resolution,
  pub interrupt_mode: InterruptMode,
  /// Run a sensor calibration at the end of initialization.
  pub calibrate_on_init: bool,
  /// Flash size; the configuration block is stored at its top.
  pub flash_size: u32,
}

impl Config {
  /// Defaults for an IT7260 at its factory address.
  pub const fn new() -> Self {
    Self {
      address: reg::DEFAULT_I2C_ADDR,
      proximity: Proximity::new(50),
      fallback_resolution: Resolution::new(1024, 600),
      interrupt_mode: InterruptMode::Event,
      calibrate_on_init: true,
      flash_size: reg::FLASH_SIZE,
    }
  }

  /// Sets the 7-bit I²C address.
  pub const fn with_address(mut self, address: u8) -> Self {
    self.address = address;
    self
  }

  /// Values above [`crate::MAX_PROXIMITY_THRESHOLD`] are clamped.
  pub const fn with_proximity_threshold(mut self, threshold: u16) -> Self {
    self.proximity = Proximity::new(threshold);
    self
  }

  /// Sets the resolution used when the controller reports none.
  pub const fn with_fallback_resolution(mut self, resolution: Resolution) -> Self {
    self.fallback_resolution = resolution;
    self
  }

  /// Selects event-driven or polled report delivery.
  pub const fn with_interrupt_mode(mut self, mode: InterruptMode) -> Self {
    self.interrupt_mode = mode;
    self
  }

  /// Skips sensor calibration during initialization.
  pub const fn without_calibration(mut self) -> Self {
    self.calibrate_on_init = false;
    self
  }

  /// Flash size in bytes. Clamped to [`MAX_FLASH_SIZE`], the range a 16-bit
  /// flash offset can address.
  pub const fn with_flash_size(mut self, flash_size: u32) -> Self {
    self.flash_size = if flash_size > MAX_FLASH_SIZE { MAX_FLASH_SIZE } else { flash_size };
    self
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::new()
  }
}
