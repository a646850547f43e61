//! Simulated IT7260 used by the unit tests.
//!
//! The fake decodes commands written to the command buffer, answers them in
//! the response buffer and models the flash array, so whole sequences
//! (initialization, upgrade, poll) can run against it.

use core::future::Future;
use core::pin::pin;
use core::task::{Context, Poll, Waker};
use std::collections::VecDeque;

use embedded_hal::i2c::ErrorKind;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

use crate::reg::{Buffer, FLASH_SIZE, POINT_REPORT_LEN};
use crate::{Config, It7260};

/// Drive a future to completion. Every future in this crate completes
/// without ever waiting on a waker when backed by the fakes below.
pub fn block_on<F: Future>(fut: F) -> F::Output {
  let mut fut = pin!(fut);
  let mut cx = Context::from_waker(Waker::noop());
  loop {
    if let Poll::Ready(out) = fut.as_mut().poll(&mut cx) {
      return out;
    }
  }
}

pub fn driver() -> It7260<FakeChip, FakeDelay> {
  driver_with(Config::default())
}

pub fn driver_with(config: Config) -> It7260<FakeChip, FakeDelay> {
  It7260::new(FakeChip::new(), FakeDelay::default(), config)
}

/// Write transfers seen on the bus, index byte included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
  Write(Vec<u8>),
}

pub struct FakeChip {
  /// Every successful write, in order.
  pub ops: Vec<Op>,
  pub query_reads: u32,
  pub response_reads: u32,
  pub point_reads: u32,
  /// Report busy on every status read.
  pub always_busy: bool,
  /// Report busy on the next `busy_reads` status reads.
  pub busy_reads: u32,
  /// Fail the next `failing_query_reads` status reads.
  pub failing_query_reads: u32,
  pub fail_reads: bool,
  pub fail_writes: bool,
  /// Fail writes of commands starting with this opcode.
  pub fail_opcode: Option<u8>,
  /// Reports served from the point buffer; the point-available bit is set
  /// while this is non-empty.
  pub points: VecDeque<[u8; POINT_REPORT_LEN]>,
  pub resolution: (u16, u16),
  pub flash: Vec<u8>,
  /// Flip the byte at this address when it is read back.
  pub corrupt_at: Option<usize>,
  pub flushes: u32,
  replies: Vec<(u8, Vec<u8>)>,
  response: Vec<u8>,
  cursor: usize,
  streaming: bool,
}

impl FakeChip {
  pub fn new() -> Self {
    Self {
      ops: Vec::new(),
      query_reads: 0,
      response_reads: 0,
      point_reads: 0,
      always_busy: false,
      busy_reads: 0,
      failing_query_reads: 0,
      fail_reads: false,
      fail_writes: false,
      fail_opcode: None,
      points: VecDeque::new(),
      resolution: (1280, 800),
      flash: vec![0xFF; FLASH_SIZE as usize],
      corrupt_at: None,
      flushes: 0,
      replies: Vec::new(),
      response: Vec::new(),
      cursor: 0,
      streaming: false,
    }
  }

  /// Answer the next command with `opcode` by `bytes` instead of the default.
  pub fn reply(&mut self, opcode: u8, bytes: &[u8]) {
    self.replies.push((opcode, bytes.to_vec()));
  }

  /// Commands written so far, without the buffer index.
  pub fn commands(&self) -> Vec<Vec<u8>> {
    self.ops.iter().map(|Op::Write(bytes)| bytes[1..].to_vec()).collect()
  }

  /// Commands written so far starting with `opcode`.
  pub fn commands_with(&self, opcode: u8) -> Vec<Vec<u8>> {
    self.commands().into_iter().filter(|c| c.first() == Some(&opcode)).collect()
  }

  fn status_byte(&mut self) -> u8 {
    let busy = if self.always_busy {
      true
    } else if self.busy_reads > 0 {
      self.busy_reads -= 1;
      true
    } else {
      false
    };
    let mut status = 0u8;
    if busy {
      status |= 0x01;
    }
    if !self.points.is_empty() {
      status |= 0x80;
    }
    status
  }

  fn serve_read(&mut self, index: u8, buf: &mut [u8]) -> Result<(), ErrorKind> {
    if self.fail_reads {
      return Err(ErrorKind::Other);
    }
    match index {
      i if i == u8::from(Buffer::Query) => {
        self.query_reads += 1;
        if self.failing_query_reads > 0 {
          self.failing_query_reads -= 1;
          return Err(ErrorKind::Other);
        }
        buf[0] = self.status_byte();
      }
      i if i == u8::from(Buffer::Response) => {
        self.response_reads += 1;
        if self.streaming {
          for b in buf.iter_mut() {
            let mut value = self.flash.get(self.cursor).copied().unwrap_or(0xFF);
            if self.corrupt_at == Some(self.cursor) {
              value ^= 0xFF;
            }
            *b = value;
            self.cursor += 1;
          }
        } else {
          buf.fill(0);
          let n = buf.len().min(self.response.len());
          buf[..n].copy_from_slice(&self.response[..n]);
        }
      }
      i if i == u8::from(Buffer::Point) => {
        self.point_reads += 1;
        let report = self.points.pop_front().unwrap_or([0; POINT_REPORT_LEN]);
        let n = buf.len().min(POINT_REPORT_LEN);
        buf[..n].copy_from_slice(&report[..n]);
      }
      other => panic!("read from unknown buffer {other:#04x}"),
    }
    Ok(())
  }

  fn serve_write(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
    assert_eq!(bytes[0], u8::from(Buffer::Command), "writes must target the command buffer");
    let cmd = &bytes[1..];
    if self.fail_writes || cmd.first().copied() == self.fail_opcode {
      return Err(ErrorKind::Other);
    }
    self.ops.push(Op::Write(bytes.to_vec()));

    let opcode = cmd[0];
    self.streaming = false;
    let mut response = match opcode {
      0x00 => vec![0x00, b'I', b'T', b'E', b'7', b'2'],
      0x01 => {
        let (x, y) = self.resolution;
        let (x, y) = (x.to_le_bytes(), y.to_le_bytes());
        vec![0x00, 0x00, x[0], x[1], y[0], y[1]]
      }
      0x61 => {
        self.cursor = u16::from_le_bytes([cmd[2], cmd[3]]) as usize;
        vec![0x00, 0x00]
      }
      0x63 => {
        self.streaming = true;
        Vec::new()
      }
      0xF0 => {
        for (i, b) in cmd[2..6].iter().enumerate() {
          if let Some(cell) = self.flash.get_mut(self.cursor + i) {
            *cell = *b;
          }
        }
        self.cursor += 4;
        vec![0x00, 0x00]
      }
      0xF1 => {
        self.flushes += 1;
        vec![0x00, 0x00]
      }
      _ => vec![0x00; 6],
    };
    if let Some(pos) = self.replies.iter().position(|(op, _)| *op == opcode) {
      response = self.replies.remove(pos).1;
    }
    self.response = response;
    Ok(())
  }
}

impl ErrorType for FakeChip {
  type Error = ErrorKind;
}

impl I2c for FakeChip {
  async fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
    assert_eq!(address, crate::DEFAULT_I2C_ADDR);
    match operations {
      [Operation::Write(index), Operation::Read(buf)] => self.serve_read(index[0], buf),
      [Operation::Write(bytes)] => self.serve_write(bytes),
      _ => panic!("unexpected transaction shape"),
    }
  }
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub struct FakeDelay {
  pub ms: Vec<u32>,
  pub ns: u64,
}

impl DelayNs for FakeDelay {
  async fn delay_ns(&mut self, ns: u32) {
    self.ns += u64::from(ns);
  }

  async fn delay_ms(&mut self, ms: u32) {
    self.ms.push(ms);
    self.ns += u64::from(ms) * 1_000_000;
  }
}
