use bitfield_struct::bitfield;

use crate::reg::POINT_REPORT_LEN;

mod point;

pub use point::*;

/// Most fingers a single report can carry.
pub const MAX_POINTS: usize = 3;

/// First byte of the point information buffer.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct ReportHeader {
  /// One bit per finger field carrying a contact.
  #[bits(3)]
  pub fingers: u8,
  __: bool,
  /// Non-zero when the report describes a gesture instead of fingers.
  #[bits(4)]
  pub gesture: u8,
}

/// Decoded point information buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PointReport {
  /// Gesture report. The controller's gesture codes are not interpreted.
  Gesture(u8),
  /// Finger positions in report order.
  Fingers(Fingers),
}

impl PointReport {
  pub fn decode(raw: &[u8; POINT_REPORT_LEN]) -> Self {
    let header = ReportHeader::from_bits(raw[0]);
    if header.gesture() != 0 {
      return PointReport::Gesture(header.gesture());
    }

    let mut fingers = Fingers::default();
    for field in 0..MAX_POINTS {
      if header.fingers() & (1 << field) != 0 {
        let offset = 2 + field * 4;
        fingers.push(RawPoint::from_field([raw[offset], raw[offset + 1], raw[offset + 2], raw[offset + 3]]));
      }
    }
    PointReport::Fingers(fingers)
  }
}

/// Up to [`MAX_POINTS`] raw points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fingers {
  points: [RawPoint; MAX_POINTS],
  len: u8,
}

impl Fingers {
  pub fn as_slice(&self) -> &[RawPoint] {
    &self.points[..self.len as usize]
  }

  pub fn len(&self) -> usize {
    self.len as usize
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  fn push(&mut self, point: RawPoint) {
    if let Some(slot) = self.points.get_mut(self.len as usize) {
      *slot = point;
      self.len += 1;
    }
  }
}
