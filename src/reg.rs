/******************************************************************************
 * ITE IT7260 - Buffer map                                                    *
 * ========================================================================== *
 * The controller exposes four fixed buffers selected by an 8-bit index.      *
 * Every access writes the index first, then reads or writes the payload.     *
*******************************************************************************/

use bitfield_struct::bitfield;

/// Default 7-bit I²C address of the IT7260.
pub const DEFAULT_I2C_ADDR: u8 = 0x46;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Buffer {
  /// Command buffer, write only.
  Command = 0x20,
  /// Query (status) buffer, 1 byte, read only.
  Query = 0x80,
  /// Command response buffer, read only.
  Response = 0xA0,
  /// Point information buffer, 14 bytes, read only.
  Point = 0xE0,
}

impl From<Buffer> for u8 {
  #[inline]
  fn from(b: Buffer) -> Self {
    b as u8
  }
}

/// Size of the point information buffer.
pub const POINT_REPORT_LEN: usize = 14;

/// Maximum number of status re-reads performed while waiting for the
/// controller to leave the busy state.
pub const IDLE_POLL_LIMIT: u32 = 50_000;

/// Signature returned in bytes 1..6 of the identification response.
pub const SIGNATURE: &[u8; 5] = b"ITE72";

/// Total flash size of the controller, in bytes.
pub const FLASH_SIZE: u32 = 32_768;

/// Contents of the query buffer.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct QueryStatus {
  /// A command is still being processed.
  pub busy: bool,
  /// The last command failed.
  pub error: bool,
  __: bool,
  /// The reported contact is a finger (rather than a pen).
  pub finger: bool,
  #[bits(3)]
  ___: u8,
  /// The point information buffer holds a fresh report.
  pub point_available: bool,
}

impl QueryStatus {
  /// Status assumed when the query buffer cannot be read.
  pub(crate) const fn assumed_busy() -> Self {
    Self::new().with_busy(true)
  }
}
