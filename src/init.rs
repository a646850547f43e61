use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::reg::QueryStatus;
use crate::{Error, InterruptMode, It7260, Mode, Resolution, Snapshot};

/// Number of 1 ms steps [`It7260::drain`] waits for the controller to go idle.
const DRAIN_STEPS: u32 = 1000;

/// Scratch length used when emptying the command response buffer.
const RESPONSE_DRAIN_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum InitState {
  Drain,
  Reinitialize,
  Identify,
  ReadVersion,
  ReadResolution,
  Calibrate,
  SetInterruptMode,
}

impl<I, E, D> It7260<I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Bring the controller up and start point delivery.
  ///
  /// Only a failed firmware restart is fatal ([`Error::DeviceNotFound`]).
  /// A controller that acknowledges but never leaves the busy state is
  /// assumed to sit in upgrade mode: initialization then completes with the
  /// fallback resolution and returns [`Mode::Upgrade`]. Every other failure
  /// along the way is logged and skipped.
  pub async fn initialize(&mut self) -> Result<Mode, Error<E>> {
    self.session.initialized = false;
    let mut state = InitState::Drain;

    loop {
      trace!("IT7260: init state {:?}", state);
      match state {
        InitState::Drain => {
          if let Err(e) = self.drain().await {
            warn!("IT7260: drain before init failed: {}", e.as_str());
          }
          state = InitState::Reinitialize;
        }

        InitState::Reinitialize => match self.reinitialize_firmware().await {
          Ok(()) => {
            self.session.mode = Mode::Normal;
            state = InitState::Identify;
          }
          Err(Error::BusyTimeout(None)) => {
            warn!("IT7260: restart acknowledged but never completed, assuming upgrade mode");
            self.session.resolution = self.config.fallback_resolution;
            self.session.mode = Mode::Upgrade;
            self.finish_init();
            return Ok(Mode::Upgrade);
          }
          Err(e) => {
            error!("IT7260: failed to restart firmware: {}", e.as_str());
            return Err(Error::DeviceNotFound);
          }
        },

        InitState::Identify => {
          match self.identify().await {
            Ok(id) => info!("IT7260: id [{}] {:?}", id.status, id.signature),
            Err(Error::IdentificationMismatch(id)) => {
              warn!("IT7260: signature not found, got [{}] {:?}", id.status, id.signature)
            }
            Err(e) => error!("IT7260: identify failed: {}", e.as_str()),
          }
          state = InitState::ReadVersion;
        }

        InitState::ReadVersion => {
          match self.version().await {
            Ok(v) => info!("IT7260: firmware {:?} config {:?}", v.firmware, v.config),
            Err(e) => error!("IT7260: version query failed: {}", e.as_str()),
          }
          state = InitState::ReadResolution;
        }

        InitState::ReadResolution => {
          let reported = match self.resolution().await {
            Ok(r) => r,
            Err(e) => {
              error!("IT7260: resolution query failed: {}", e.as_str());
              Resolution::new(0, 0)
            }
          };
          let fallback = self.config.fallback_resolution;
          self.session.resolution = Resolution::new(
            if reported.x == 0 { fallback.x } else { reported.x },
            if reported.y == 0 { fallback.y } else { reported.y },
          );
          info!("IT7260: resolution {}x{}", self.session.resolution.x, self.session.resolution.y);
          state = InitState::Calibrate;
        }

        InitState::Calibrate => {
          if self.config.calibrate_on_init {
            if let Err(e) = self.calibrate().await {
              warn!("IT7260: calibration failed: {}", e.as_str());
            }
          }
          state = InitState::SetInterruptMode;
        }

        InitState::SetInterruptMode => {
          let applied = match self.config.interrupt_mode {
            InterruptMode::Event => self.enable_interrupts().await,
            InterruptMode::Polling => self.disable_interrupts().await,
          };
          if let Err(e) = applied {
            warn!("IT7260: setting interrupt mode failed: {}", e.as_str());
          }
          self.finish_init();
          info!("IT7260: initialized");
          return Ok(Mode::Normal);
        }
      }
    }
  }

  /// Empty the query, point and response buffers until the controller
  /// reports idle, for at most about one second.
  pub async fn drain(&mut self) -> Result<(), Error<E>> {
    debug!("IT7260: draining buffers");
    let mut scratch = [0u8; RESPONSE_DRAIN_LEN];
    let mut status = self.read_query().await.unwrap_or(QueryStatus::assumed_busy());
    let _ = self.read_point_report().await;
    let _ = self.read_response(&mut scratch).await;

    let mut last_error = None;
    let mut steps = 0;
    while status.busy() {
      if steps == DRAIN_STEPS {
        warn!("IT7260: drain timed out");
        return Err(Error::BusyTimeout(last_error));
      }
      steps += 1;
      self.delay.delay_ms(1).await;
      status = match self.read_query().await {
        Ok(status) => {
          let _ = self.read_point_report().await;
          let _ = self.read_response(&mut scratch).await;
          status
        }
        Err(Error::I2c(e)) => {
          last_error = Some(e);
          QueryStatus::assumed_busy()
        }
        Err(e) => return Err(e),
      };
    }
    Ok(())
  }

  /// Device side of a system suspend: mask the interrupt line if it is in
  /// use and put the controller to sleep. Refused in upgrade mode.
  pub async fn suspend(&mut self) -> Result<(), Error<E>> {
    if self.session.mode.is_upgrade() {
      return Err(Error::UpgradeMode);
    }
    if self.config.interrupt_mode == InterruptMode::Event {
      if let Err(e) = self.disable_interrupts().await {
        warn!("IT7260: disabling interrupts failed: {}", e.as_str());
      }
    }
    self.power_down().await
  }

  /// Device side of a system resume: wake the controller, drop anything it
  /// queued while asleep and re-arm the interrupt line. Nothing happens in
  /// upgrade mode.
  pub async fn resume(&mut self) -> Result<(), Error<E>> {
    if self.session.mode.is_upgrade() {
      return Ok(());
    }
    self.power_up().await?;
    if let Err(e) = self.drain().await {
      warn!("IT7260: drain after resume failed: {}", e.as_str());
    }
    self.tracker.reset();
    self.last = Snapshot::empty();
    if self.config.interrupt_mode == InterruptMode::Event {
      self.enable_interrupts().await?;
    }
    Ok(())
  }

  fn finish_init(&mut self) {
    self.tracker.reset();
    self.last = Snapshot::empty();
    self.session.initialized = true;
  }
}
