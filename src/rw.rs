use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::reg::{Buffer, QueryStatus, POINT_REPORT_LEN};
use crate::{Error, It7260};

/// Largest payload accepted by the command buffer in one transfer.
const MAX_COMMAND_LEN: usize = 31;

impl<I, E, D> It7260<I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Read the query buffer (busy, error and point-available bits).
  pub async fn read_query(&mut self) -> Result<QueryStatus, Error<E>> {
    let mut buf = [0u8; 1];
    self.read_buffer(Buffer::Query, &mut buf).await?;
    Ok(QueryStatus::from_bits(buf[0]))
  }

  /// Read `buf.len()` bytes from the command response buffer.
  pub async fn read_response(&mut self, buf: &mut [u8]) -> Result<(), Error<E>> {
    self.read_buffer(Buffer::Response, buf).await
  }

  /// Read the 14-byte point information buffer.
  pub async fn read_point_report(&mut self) -> Result<[u8; POINT_REPORT_LEN], Error<E>> {
    let mut buf = [0u8; POINT_REPORT_LEN];
    self.read_buffer(Buffer::Point, &mut buf).await?;
    Ok(buf)
  }

  /// Write a whole command into the command buffer in one transfer.
  pub async fn write_command(&mut self, cmd: &[u8]) -> Result<(), Error<E>> {
    let len = cmd.len();
    if len > MAX_COMMAND_LEN {
      return Err(Error::BufferOverflow);
    }
    let mut buf = [0u8; MAX_COMMAND_LEN + 1];
    buf[0] = Buffer::Command.into();
    buf[1..=len].copy_from_slice(cmd);
    self.i2c.write(self.config.address, &buf[..=len]).await.map_err(|e| {
      error!("IT7260: write command buffer failed: {:?}", cmd);
      Error::I2c(e)
    })
  }

  async fn read_buffer(&mut self, buffer: Buffer, buf: &mut [u8]) -> Result<(), Error<E>> {
    let index = [buffer.into()];
    self.i2c.write_read(self.config.address, &index, buf).await.map_err(Error::I2c)
  }
}
