/// One finger as reported by the controller, before correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawPoint {
  /// 12-bit device coordinate.
  pub x: u16,
  /// 12-bit device coordinate.
  pub y: u16,
  /// 0..=15
  pub pressure: u8,
}

impl RawPoint {
  pub const fn new(x: u16, y: u16, pressure: u8) -> Self {
    Self { x, y, pressure }
  }

  /// Decode one 4-byte finger field: X low byte, shared high nibbles
  /// (X in the low nibble, Y in the high one), Y low byte, pressure.
  pub(crate) const fn from_field(b: [u8; 4]) -> Self {
    Self {
      x: ((b[1] as u16 & 0x0F) << 8) | b[0] as u16,
      y: ((b[1] as u16 & 0xF0) << 4) | b[2] as u16,
      pressure: b[3] & 0x0F,
    }
  }
}
