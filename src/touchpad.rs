//! Touch frames built from successive tracker snapshots.
//!
//! [`It7260::poll`] runs one poll cycle and compares the resulting slots with
//! the previous ones, so callers get per-finger `Start`/`Move`/`End`
//! transitions keyed by tracking ID instead of diffing snapshots themselves.
//!
//! ```no_run
//! # use embedded_hal_async::{delay::DelayNs, i2c::{I2c, SevenBitAddress}};
//! # use it7260::{It7260, TouchPhase};
//! # async fn example<I2C, D, E>(touch: &mut It7260<I2C, D>) -> Result<(), it7260::Error<E>>
//! # where I2C: I2c<SevenBitAddress, Error = E>, D: DelayNs
//! # {
//! if let Some(frame) = touch.poll().await? {
//!   for change in frame.changes().iter() {
//!     match change.phase {
//!       TouchPhase::Start => { /* finger `change.id` went down */ }
//!       TouchPhase::Move => { /* moved to change.contact */ }
//!       TouchPhase::End => { /* lifted */ }
//!     }
//!   }
//!   if frame.is_session_end() {
//!     // every finger is up
//!   }
//! }
//! # Ok(())
//! # }
//! ```

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::tracker::{Contact, Snapshot, SLOT_COUNT};
use crate::{Error, It7260};

/// Indicates how a finger changed compared to the previous poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchPhase {
  /// A new finger contact appeared on the surface.
  Start,
  /// An existing finger moved or changed pressure.
  Move,
  /// A finger was lifted off the surface.
  End,
}

impl TouchPhase {
  /// Returns `true` if a finger went down in this slot.
  pub const fn is_start(self) -> bool {
    matches!(self, TouchPhase::Start)
  }

  /// Returns `true` if a tracked finger moved or changed pressure.
  pub const fn is_move(self) -> bool {
    matches!(self, TouchPhase::Move)
  }

  /// Returns `true` if the finger in this slot was lifted.
  pub const fn is_end(self) -> bool {
    matches!(self, TouchPhase::End)
  }

  /// Returns the phase name for logging.
  pub const fn as_str(self) -> &'static str {
    match self {
      TouchPhase::Start => "start",
      TouchPhase::Move => "move",
      TouchPhase::End => "end",
    }
  }
}

/// A single slot transition.
///
/// For `End` the contact is the last known position of the lifted finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Touch {
  /// Tracking ID (slot index).
  pub id: usize,
  pub phase: TouchPhase,
  pub contact: Contact,
}

impl Touch {
  pub const fn new(id: usize, phase: TouchPhase, contact: Contact) -> Self {
    Self { id, phase, contact }
  }
}

/// At most one transition per tracking slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Changes {
  slots: [Option<Touch>; SLOT_COUNT],
}

impl Changes {
  pub fn get(&self, id: usize) -> Option<Touch> {
    self.slots.get(id).copied().flatten()
  }

  pub fn iter(&self) -> impl Iterator<Item = Touch> + '_ {
    self.slots.iter().flatten().copied()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.iter().all(Option::is_none)
  }

  pub fn count(&self) -> usize {
    self.iter().count()
  }

  pub fn has_starts(&self) -> bool {
    self.iter().any(|t| t.phase.is_start())
  }

  pub fn has_ends(&self) -> bool {
    self.iter().any(|t| t.phase.is_end())
  }

  pub fn has_moves(&self) -> bool {
    self.iter().any(|t| t.phase.is_move())
  }

  pub fn with_phase(&self, phase: TouchPhase) -> impl Iterator<Item = Touch> + '_ {
    self.iter().filter(move |t| t.phase == phase)
  }
}

/// Result of one poll cycle that produced a point report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
  changes: Changes,
  snapshot: Snapshot,
}

impl Frame {
  /// Build a frame from the previous and the current slot state.
  pub fn between(previous: &Snapshot, current: Snapshot) -> Self {
    let mut changes = Changes::default();
    for (id, change) in changes.slots.iter_mut().enumerate() {
      *change = classify_transition(id, previous.contact(id), current.contact(id));
    }
    Self { changes, snapshot: current }
  }

  /// Transitions since the previous frame.
  pub const fn changes(&self) -> Changes {
    self.changes
  }

  /// All slots after this cycle.
  pub const fn snapshot(&self) -> Snapshot {
    self.snapshot
  }

  /// Currently tracked contacts with their tracking IDs.
  pub fn contacts(&self) -> impl Iterator<Item = (usize, Contact)> + '_ {
    self.snapshot.contacts()
  }

  /// No finger is down; the caller should report a release.
  pub fn is_released(&self) -> bool {
    self.snapshot.is_released()
  }

  /// The first finger of a touch session went down.
  pub fn is_session_start(&self) -> bool {
    self.changes.has_starts() && self.snapshot.count() == self.changes.with_phase(TouchPhase::Start).count()
  }

  /// The last finger of a touch session was lifted.
  pub fn is_session_end(&self) -> bool {
    self.changes.has_ends() && self.snapshot.is_released()
  }

  pub fn is_multi_touch(&self) -> bool {
    self.snapshot.count() > 1
  }
}

impl<I, E, D> It7260<I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Run one poll cycle: check for a fresh point report and feed it to the
  /// tracker.
  ///
  /// Returns `None` without touching the bus unless the controller is
  /// initialized and in normal mode. Also `None` when no report is pending or
  /// the report was a gesture.
  pub async fn read_points(&mut self) -> Result<Option<Snapshot>, Error<E>> {
    if !self.session.delivers_points() {
      return Ok(None);
    }
    let status = self.read_query().await?;
    if !status.point_available() {
      trace!("IT7260: no point information available");
      return Ok(None);
    }
    let raw = self.read_point_report().await?;
    Ok(self.tracker.process_cycle(&raw, self.session.proximity))
  }

  /// [`Self::read_points`], with transitions computed against the previous
  /// cycle.
  pub async fn poll(&mut self) -> Result<Option<Frame>, Error<E>> {
    let Some(snapshot) = self.read_points().await? else {
      return Ok(None);
    };
    let frame = Frame::between(&self.last, snapshot);
    self.last = snapshot;
    Ok(Some(frame))
  }
}

fn classify_transition(id: usize, previous: Option<Contact>, current: Option<Contact>) -> Option<Touch> {
  match (previous, current) {
    (None, None) => None,
    (None, Some(now)) => Some(Touch::new(id, TouchPhase::Start, now)),
    (Some(before), None) => Some(Touch::new(id, TouchPhase::End, before)),
    (Some(before), Some(now)) => {
      if before != now {
        Some(Touch::new(id, TouchPhase::Move, now))
      } else {
        None
      }
    }
  }
}
