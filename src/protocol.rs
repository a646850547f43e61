use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::reg::{QueryStatus, IDLE_POLL_LIMIT};
use crate::{Error, It7260};

/// Settle time after the very first status read fails.
const FIRST_FAILURE_SETTLE_MS: u32 = 10;

impl<I, E, D> It7260<I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Spin on the query buffer until the busy bit clears.
  ///
  /// A failed status read counts as busy. At most [`IDLE_POLL_LIMIT`] reads
  /// are made; past that the last bus error, if any, is returned inside
  /// [`Error::BusyTimeout`]. There is no delay between reads.
  pub async fn wait_for_idle(&mut self) -> Result<(), Error<E>> {
    let mut last_error = None;
    for attempt in 0..IDLE_POLL_LIMIT {
      let status = match self.read_query().await {
        Ok(status) => status,
        Err(Error::I2c(e)) => {
          if attempt == 0 {
            self.delay.delay_ms(FIRST_FAILURE_SETTLE_MS).await;
          }
          last_error = Some(e);
          QueryStatus::assumed_busy()
        }
        Err(e) => return Err(e),
      };
      if !status.busy() {
        return Ok(());
      }
    }
    warn!("IT7260: still busy after {} status reads", IDLE_POLL_LIMIT);
    Err(Error::BusyTimeout(last_error))
  }

  /// Wait, write the command, wait again.
  pub(crate) async fn tx_cmd(&mut self, cmd: &[u8]) -> Result<(), Error<E>> {
    self.wait_for_idle().await?;
    self.write_command(cmd).await?;
    self.wait_for_idle().await
  }

  /// [`Self::tx_cmd`] followed by the two-byte status pair, which must be zero.
  pub(crate) async fn tx_cmd_rx_status(&mut self, cmd: &[u8]) -> Result<(), Error<E>> {
    self.tx_cmd(cmd).await?;
    self.read_status_pair().await
  }

  pub(crate) async fn read_status_pair(&mut self) -> Result<(), Error<E>> {
    let mut status = [0u8; 2];
    self.read_response(&mut status).await?;
    if status[0] | status[1] != 0 {
      debug!("IT7260: command rejected with status {:?}", status);
      return Err(Error::Protocol(status));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use crate::testing::{block_on, driver, Op};
  use crate::{Error, IDLE_POLL_LIMIT};

  #[test]
  fn always_busy_times_out_after_exact_bound() {
    let mut dev = driver();
    dev.i2c.always_busy = true;
    assert!(matches!(block_on(dev.wait_for_idle()), Err(Error::BusyTimeout(None))));
    assert_eq!(dev.i2c.query_reads, IDLE_POLL_LIMIT);
  }

  #[test]
  fn idle_on_last_allowed_read_succeeds() {
    let mut dev = driver();
    dev.i2c.busy_reads = IDLE_POLL_LIMIT - 1;
    block_on(dev.wait_for_idle()).unwrap();
    assert_eq!(dev.i2c.query_reads, IDLE_POLL_LIMIT);
  }

  #[test]
  fn unreadable_status_counts_as_busy_and_keeps_last_error() {
    let mut dev = driver();
    dev.i2c.fail_reads = true;
    assert!(matches!(block_on(dev.wait_for_idle()), Err(Error::BusyTimeout(Some(_)))));
    assert_eq!(dev.delay.ms, vec![10]);
  }

  #[test]
  fn first_failed_read_settles_then_recovers() {
    let mut dev = driver();
    dev.i2c.failing_query_reads = 1;
    block_on(dev.wait_for_idle()).unwrap();
    assert_eq!(dev.i2c.query_reads, 2);
    assert_eq!(dev.delay.ms, vec![10]);
  }

  #[test]
  fn status_pair_must_be_zero() {
    let mut dev = driver();
    dev.i2c.reply(0x04, &[0x00, 0x01]);
    assert!(matches!(block_on(dev.tx_cmd_rx_status(&[0x04, 0x00, 0x02])), Err(Error::Protocol([0x00, 0x01]))));

    block_on(dev.tx_cmd_rx_status(&[0x04, 0x00, 0x00])).unwrap();
    assert_eq!(
      dev.i2c.ops,
      vec![Op::Write(vec![0x20, 0x04, 0x00, 0x02]), Op::Write(vec![0x20, 0x04, 0x00, 0x00])]
    );
  }

  #[test]
  fn command_is_not_written_while_busy_forever() {
    let mut dev = driver();
    dev.i2c.always_busy = true;
    assert!(matches!(block_on(dev.tx_cmd(&[0x00])), Err(Error::BusyTimeout(_))));
    assert!(dev.i2c.ops.is_empty());
  }
}
