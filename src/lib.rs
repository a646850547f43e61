#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Async, `no_std` driver core for the ITE IT7260 capacitive touch
//! controller.
//!
//! The IT7260 talks through four fixed buffers (command, query, command
//! response, point information) and reports at most three fingers per scan,
//! with a well known habit of collapsing one axis when three fingers are
//! down. This crate turns that into:
//!
//! - A command/response protocol with bounded busy-waiting and status checks
//! - One typed method per controller command (identification, versions,
//!   resolution, power, interrupts, calibration, firmware reinitialization)
//! - A flash upgrade engine writing and verifying firmware and configuration
//! - A multi-touch tracker that keeps three stable tracking slots across scans
//! - Using `embedded-hal` / `embedded-hal-async` 1.0 traits so the driver works
//!   across MCU families
//!
//! Scheduling the poll cycle (interrupt line or timer), GPIO reset and power
//! sequencing are left to the caller.
//!
//! ```no_run
//! use embedded_hal_async::{delay::DelayNs, i2c::{I2c, SevenBitAddress}};
//! use it7260::{Config, It7260};
//!
//! async fn example<I2C, D, E>(i2c: I2C, delay: D) -> Result<(), it7260::Error<E>>
//! where
//!   I2C: I2c<SevenBitAddress, Error = E>,
//!   D: DelayNs,
//!   E: embedded_hal::i2c::Error,
//! {
//!   let mut touch = It7260::new(i2c, delay, Config::default());
//!   touch.initialize().await?;
//!
//!   loop {
//!     // Call on each interrupt or timer tick.
//!     if let Some(frame) = touch.poll().await? {
//!       for (id, contact) in frame.contacts() {
//!         let _ = (id, contact.x, contact.y, contact.pressure);
//!       }
//!     }
//!   }
//! }
//! ```

#[macro_use]
mod fmt;

mod config;
mod control;
mod defs;
mod event;
mod flash;
mod init;
mod protocol;
mod reg;
mod rw;
mod session;
mod touchpad;
mod tracker;

#[cfg(test)]
mod testing;

pub use config::*;
pub use control::*;
pub use defs::{Opcode, PowerMode};
pub use event::*;
pub use flash::*;
pub use reg::{QueryStatus, DEFAULT_I2C_ADDR, FLASH_SIZE, IDLE_POLL_LIMIT, POINT_REPORT_LEN, SIGNATURE};
pub use session::*;
pub use touchpad::*;
pub use tracker::*;

/// Errors that can occur while interacting with the controller.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
  /// I²C bus transaction failed with the underlying driver error.
  I2c(E),
  /// The controller stayed busy for the whole idle-wait budget. Carries the
  /// last bus error seen while polling, if any.
  BusyTimeout(Option<E>),
  /// The controller answered a command with a non-zero status pair.
  Protocol([u8; 2]),
  /// Flash contents differ from the expected data at `offset`.
  VerifyMismatch { offset: u32 },
  /// The identification response did not carry the `ITE72` signature.
  IdentificationMismatch(Identity),
  /// The firmware could not be reinitialized during bring-up.
  DeviceNotFound,
  /// The operation is not available while in firmware upgrade mode.
  UpgradeMode,
  /// A command or flash region does not fit the protocol limits.
  BufferOverflow,
}

impl<E> Error<E> {
  /// Short description usable in log lines without requiring `E` to be printable.
  pub const fn as_str(&self) -> &'static str {
    match self {
      Error::I2c(_) => "bus failure",
      Error::BusyTimeout(_) => "busy timeout",
      Error::Protocol(_) => "command rejected",
      Error::VerifyMismatch { .. } => "flash verify mismatch",
      Error::IdentificationMismatch(_) => "identification mismatch",
      Error::DeviceNotFound => "device not found",
      Error::UpgradeMode => "refused in upgrade mode",
      Error::BufferOverflow => "buffer overflow",
    }
  }
}

/// Driver handle for one IT7260 controller.
///
/// The driver owns the I²C peripheral and a delay provider, the
/// [`ChipSession`] and the [`Tracker`]. Create it with [`It7260::new`] and
/// bring the controller up with [`It7260::initialize`].
///
/// Every operation takes `&mut self`: the controller is a single command
/// channel and nothing here may run concurrently against the same device.
pub struct It7260<I, D> {
  i2c: I,
  delay: D,
  config: Config,
  session: ChipSession,
  tracker: Tracker,
  last: Snapshot,
}

impl<I, D> It7260<I, D> {
  /// Create a new driver instance. Nothing is sent to the controller until
  /// [`It7260::initialize`] is called.
  pub fn new(i2c: I, delay: D, config: Config) -> Self {
    Self {
      i2c,
      delay,
      session: ChipSession::new(config.fallback_resolution, config.proximity),
      config,
      tracker: Tracker::new(),
      last: Snapshot::empty(),
    }
  }

  /// Current session state (resolution, threshold, mode).
  pub fn session(&self) -> &ChipSession {
    &self.session
  }

  /// Configuration the driver was created with.
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Current tracking slots.
  pub fn tracker(&self) -> &Tracker {
    &self.tracker
  }

  /// Change the contact correlation distance. Clamped to
  /// [`MAX_PROXIMITY_THRESHOLD`].
  pub fn set_proximity_threshold(&mut self, threshold: u16) {
    self.session.proximity = Proximity::new(threshold);
    debug!("IT7260: proximity threshold {}", self.session.proximity.linear());
  }

  /// Release the bus and delay provider.
  pub fn release(self) -> (I, D) {
    (self.i2c, self.delay)
  }
}
