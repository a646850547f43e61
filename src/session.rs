/// Largest accepted proximity threshold.
pub const MAX_PROXIMITY_THRESHOLD: u16 = 1024;

/// Operating mode of the controller as tracked by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
  /// Touch sensing is active.
  Normal,
  /// Flash may be read, written and verified; touch sensing is suspended.
  Upgrade,
  /// The firmware did not come back after an upgrade. Only a new upgrade or
  /// a fresh initialization can recover the device.
  ReinitFailed,
}

impl Mode {
  pub const fn is_upgrade(self) -> bool {
    matches!(self, Mode::Upgrade)
  }

  pub const fn as_str(self) -> &'static str {
    match self {
      Mode::Normal => "normal",
      Mode::Upgrade => "upgrade",
      Mode::ReinitFailed => "reinit-failed",
    }
  }
}

/// Sensor resolution in device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Resolution {
  pub x: u16,
  pub y: u16,
}

impl Resolution {
  pub const fn new(x: u16, y: u16) -> Self {
    Self { x, y }
  }
}

/// Distance under which a new point is considered the same contact as an
/// already tracked one. Kept in linear and squared form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Proximity {
  linear: u16,
  squared: u32,
}

impl Proximity {
  /// Build a threshold, clamped to [`MAX_PROXIMITY_THRESHOLD`].
  pub const fn new(threshold: u16) -> Self {
    let linear = if threshold > MAX_PROXIMITY_THRESHOLD { MAX_PROXIMITY_THRESHOLD } else { threshold };
    Self { linear, squared: linear as u32 * linear as u32 }
  }

  pub const fn linear(&self) -> u16 {
    self.linear
  }

  pub const fn squared(&self) -> u32 {
    self.squared
  }
}

impl Default for Proximity {
  fn default() -> Self {
    Self::new(50)
  }
}

/// Per-device state shared between the command layer, the flash engine and
/// the tracker.
///
/// Only the driver mutates the session; callers get read access through
/// [`crate::It7260::session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChipSession {
  pub(crate) resolution: Resolution,
  pub(crate) proximity: Proximity,
  pub(crate) mode: Mode,
  pub(crate) interrupts_enabled: bool,
  pub(crate) initialized: bool,
}

impl ChipSession {
  pub(crate) const fn new(resolution: Resolution, proximity: Proximity) -> Self {
    Self { resolution, proximity, mode: Mode::Normal, interrupts_enabled: false, initialized: false }
  }

  pub const fn resolution(&self) -> Resolution {
    self.resolution
  }

  pub const fn proximity(&self) -> Proximity {
    self.proximity
  }

  pub const fn mode(&self) -> Mode {
    self.mode
  }

  /// Whether the controller was told to raise its interrupt line.
  pub const fn interrupts_enabled(&self) -> bool {
    self.interrupts_enabled
  }

  /// Whether the last initialization succeeded.
  pub const fn is_initialized(&self) -> bool {
    self.initialized
  }

  /// Point reports are only delivered once initialized and outside upgrade mode.
  pub const fn delivers_points(&self) -> bool {
    self.initialized && matches!(self.mode, Mode::Normal)
  }
}
