//! Multi-touch tracking across scans.
//!
//! The IT7260 does not keep finger identities between reports, and with three
//! fingers down it frequently repeats one coordinate for all of them. The
//! [`Tracker`] correlates every report with the contacts it already knows,
//! keeping each finger in the same slot for as long as it stays within the
//! proximity threshold. The slot index is the tracking ID handed to callers.

use crate::event::{PointReport, RawPoint, MAX_POINTS};
use crate::reg::POINT_REPORT_LEN;
use crate::Proximity;

/// Number of tracking slots.
pub const SLOT_COUNT: usize = MAX_POINTS;

/// A tracked finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Contact {
  pub x: u16,
  pub y: u16,
  pub pressure: u8,
}

impl Contact {
  pub const fn new(x: u16, y: u16, pressure: u8) -> Self {
    Self { x, y, pressure }
  }
}

impl From<RawPoint> for Contact {
  fn from(p: RawPoint) -> Self {
    Self::new(p.x, p.y, p.pressure)
  }
}

/// State of all tracking slots after a scan.
///
/// Invalid slots keep their last contents but are never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Snapshot {
  slots: [Contact; SLOT_COUNT],
  valid: u8,
}

impl Snapshot {
  pub const fn empty() -> Self {
    Self { slots: [Contact::new(0, 0, 0); SLOT_COUNT], valid: 0 }
  }

  /// Contact tracked in slot `id`, if that slot is valid.
  pub fn contact(&self, id: usize) -> Option<Contact> {
    if self.is_valid(id) {
      self.slots.get(id).copied()
    } else {
      None
    }
  }

  /// Valid contacts with their tracking IDs, lowest ID first.
  pub fn contacts(&self) -> impl Iterator<Item = (usize, Contact)> + '_ {
    (0..SLOT_COUNT).filter_map(move |id| self.contact(id).map(|c| (id, c)))
  }

  pub fn count(&self) -> usize {
    self.valid.count_ones() as usize
  }

  /// No finger is tracked.
  pub fn is_released(&self) -> bool {
    self.valid == 0
  }

  pub fn is_valid(&self, id: usize) -> bool {
    id < SLOT_COUNT && self.valid & (1 << id) != 0
  }

  fn set_valid(&mut self, id: usize) {
    self.valid |= 1 << id;
  }

  fn invalidate_all(&mut self) {
    self.valid = 0;
  }

  /// First invalid slot, or slot 0 when all are taken.
  fn first_invalid(&self) -> usize {
    (0..SLOT_COUNT).find(|&id| !self.is_valid(id)).unwrap_or(0)
  }

  /// Valid slot strictly closer than `limit` (squared distance) to `(x, y)`.
  /// Ties go to the lowest index.
  fn closest(&self, x: u16, y: u16, limit: u32) -> Option<usize> {
    self.nearest(u64::from(limit), |c| {
      let dx = u64::from(c.x.abs_diff(x));
      let dy = u64::from(c.y.abs_diff(y));
      dx * dx + dy * dy
    })
  }

  fn closest_x(&self, x: u16, limit: u16) -> Option<usize> {
    self.nearest(u64::from(limit), |c| u64::from(c.x.abs_diff(x)))
  }

  fn closest_y(&self, y: u16, limit: u16) -> Option<usize> {
    self.nearest(u64::from(limit), |c| u64::from(c.y.abs_diff(y)))
  }

  fn nearest(&self, limit: u64, distance: impl Fn(&Contact) -> u64) -> Option<usize> {
    let mut best = limit;
    let mut found = None;
    for id in 0..SLOT_COUNT {
      if !self.is_valid(id) {
        continue;
      }
      let d = distance(&self.slots[id]);
      if d < best {
        best = d;
        found = Some(id);
      }
    }
    found
  }
}

/// Which coordinates of a matched slot a point may overwrite.
#[derive(Clone, Copy)]
enum Update {
  Both,
  XOnly,
  YOnly,
}

impl Update {
  fn apply(self, slot: &mut Contact, p: RawPoint) {
    match self {
      Update::Both => *slot = p.into(),
      Update::XOnly => {
        slot.x = p.x;
        slot.pressure = p.pressure;
      }
      Update::YOnly => {
        slot.y = p.y;
        slot.pressure = p.pressure;
      }
    }
  }
}

/// Correlates successive point reports into stable tracking slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tracker {
  state: Snapshot,
}

impl Tracker {
  pub const fn new() -> Self {
    Self { state: Snapshot::empty() }
  }

  /// Forget every tracked contact.
  pub fn reset(&mut self) {
    self.state = Snapshot::empty();
  }

  pub fn snapshot(&self) -> Snapshot {
    self.state
  }

  /// Decode a raw point report and correlate it with the tracked contacts.
  ///
  /// Gesture reports leave the slots untouched and yield `None`.
  pub fn process_cycle(&mut self, raw: &[u8; POINT_REPORT_LEN], proximity: Proximity) -> Option<Snapshot> {
    match PointReport::decode(raw) {
      PointReport::Gesture(code) => {
        trace!("IT7260: gesture report {} ignored", code);
        None
      }
      PointReport::Fingers(fingers) => Some(self.correlate(fingers.as_slice(), proximity)),
    }
  }

  /// Correlate up to three points, in report order, with the tracked slots.
  pub fn correlate(&mut self, points: &[RawPoint], proximity: Proximity) -> Snapshot {
    let squared = proximity.squared();
    match points {
      [] => self.state.invalidate_all(),
      [a] => {
        let matches = [self.state.closest(a.x, a.y, squared)];
        self.assign(points, &matches, Update::Both);
      }
      [a, b] => {
        let matches = [self.state.closest(a.x, a.y, squared), self.state.closest(b.x, b.y, squared)];
        self.assign(points, &matches, Update::Both);
      }
      [a, b, c, ..] => self.correlate_three([*a, *b, *c], proximity),
    }
    self.state
  }

  fn correlate_three(&mut self, p: [RawPoint; 3], proximity: Proximity) {
    let linear = proximity.linear();
    let squared = proximity.squared();

    if p[0].x == p[1].x && p[1].x == p[2].x {
      // X collapsed: only Y can be trusted per finger, X for one of them.
      let matches = p.map(|q| self.state.closest_y(q.y, linear));
      self.assign(&p, &matches, Update::YOnly);
      if let Some(id) = self.state.closest_x(p[0].x, linear) {
        Update::XOnly.apply(&mut self.state.slots[id], p[0]);
      }
    } else if p[0].y == p[1].y && p[1].y == p[2].y {
      let matches = p.map(|q| self.state.closest_x(q.x, linear));
      self.assign(&p, &matches, Update::XOnly);
      if let Some(id) = self.state.closest_y(p[0].y, linear) {
        Update::YOnly.apply(&mut self.state.slots[id], p[0]);
      }
    } else {
      let matches = p.map(|q| self.state.closest(q.x, q.y, squared));
      self.assign(&p, &matches, Update::Both);
    }
  }

  /// Keep only the matched slots, then update each matched slot or place the
  /// point in the first free one.
  fn assign(&mut self, points: &[RawPoint], matches: &[Option<usize>], update: Update) {
    self.state.invalidate_all();
    for id in matches.iter().flatten() {
      self.state.set_valid(*id);
    }
    for (point, found) in points.iter().zip(matches) {
      match *found {
        Some(id) => update.apply(&mut self.state.slots[id], *point),
        None => {
          let id = self.state.first_invalid();
          self.state.slots[id] = (*point).into();
          self.state.set_valid(id);
        }
      }
    }
  }
}
