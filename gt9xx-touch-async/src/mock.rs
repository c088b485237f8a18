//! Test-only simulation of a GT9xx module: a mock bus, reset and select
//! pins that share one device model, plus a minimal executor.
//!
//! The model reproduces the behaviors calibration depends on: the address
//! latched at the RESET rising edge follows the level on the select line
//! (pull-up high when floating), only the latched address acknowledges, and
//! register addresses are decoded with the module's own wire order, so a
//! read issued with the wrong order lands on an unmapped register and
//! returns bus junk. Every transaction is journaled for exactly-once assertions.

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use core::future::Future;
use core::pin::pin;
use core::task::{Context, Poll, Waker};

use embedded_hal_async::i2c::{
    ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress,
};

use crate::config::{
    RegisterOrder, POINT_LEN, REG_POINT1, REG_PRODUCT_ID, REG_RESOLUTION, REG_STATUS,
};
use crate::reset::AddressSelectPin;

/// Polls a future to completion on the spot. Everything the mocks return is
/// immediately ready, so a no-op waker suffices.
pub(crate) fn block_on<F: Future>(fut: F) -> F::Output {
    let mut fut = pin!(fut);
    let mut cx = Context::from_waker(Waker::noop());
    loop {
        if let Poll::Ready(output) = fut.as_mut().poll(&mut cx) {
            return output;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MockError(ErrorKind);

impl MockError {
    fn nack() -> Self {
        Self(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
    }
}

impl embedded_hal_async::i2c::Error for MockError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Probe { addr: u8, acked: bool },
    Read { addr: u8, reg: u16 },
    Write { addr: u8, reg: u16, value: u8 },
}

/// The simulated module.
pub(crate) struct Sim {
    /// Address latched when the select line samples low, if any.
    pub(crate) addr_when_low: Option<u8>,
    /// Address latched when the select line samples high, if any.
    pub(crate) addr_when_high: Option<u8>,
    /// Wire order this module decodes register addresses with.
    pub(crate) wire_order: RegisterOrder,
    /// Panel resolution reported by the resolution block.
    pub(crate) resolution: (u16, u16),
    pub(crate) product_id: [u8; 4],
    pub(crate) status: u8,
    pub(crate) point: [u8; POINT_LEN],
    /// Fail reads of the point block with a NACK.
    pub(crate) fail_point_reads: bool,

    pub(crate) select_driven: Option<bool>,
    pub(crate) latched: Option<bool>,
    rst_low: bool,

    pub(crate) log: Vec<Access>,
}

impl Sim {
    /// A well-behaved 800x480 module: 0x5D behind select-low, 0x14 behind
    /// select-high, MSB-first register addressing.
    pub(crate) fn default_module() -> Self {
        Self {
            addr_when_low: Some(0x5D),
            addr_when_high: Some(0x14),
            wire_order: RegisterOrder::MsbFirst,
            resolution: (800, 480),
            product_id: *b"911\0",
            status: 0,
            point: [0; POINT_LEN],
            fail_point_reads: false,
            select_driven: None,
            latched: None,
            rst_low: false,
            log: Vec::new(),
        }
    }

    /// A module (or empty socket) that never acknowledges anything.
    pub(crate) fn unresponsive() -> Self {
        Self {
            addr_when_low: None,
            addr_when_high: None,
            ..Self::default_module()
        }
    }

    /// Forces the latched select level without going through a reset.
    pub(crate) fn latch(&mut self, high: bool) {
        self.latched = Some(high);
    }

    pub(crate) fn status_write_count(&self) -> usize {
        self.log
            .iter()
            .filter(|access| matches!(access, Access::Write { reg, .. } if *reg == REG_STATUS))
            .count()
    }

    pub(crate) fn into_bus(self) -> (Rc<RefCell<Sim>>, MockBus) {
        let state = Rc::new(RefCell::new(self));
        let bus = MockBus {
            state: state.clone(),
        };
        (state, bus)
    }

    pub(crate) fn into_parts(self) -> (Rc<RefCell<Sim>>, MockBus, MockResetPin, MockSelectPin) {
        let (state, bus) = self.into_bus();
        let rst = MockResetPin {
            state: state.clone(),
        };
        let sel = MockSelectPin {
            state: state.clone(),
        };
        (state, bus, rst, sel)
    }

    fn active_address(&self) -> Option<u8> {
        self.latched.and_then(|high| {
            if high {
                self.addr_when_high
            } else {
                self.addr_when_low
            }
        })
    }

    fn decode_reg(&self, bytes: [u8; 2]) -> u16 {
        match self.wire_order {
            RegisterOrder::MsbFirst => u16::from_be_bytes(bytes),
            RegisterOrder::LsbFirst => u16::from_le_bytes(bytes),
        }
    }

    fn register_byte(&self, reg: u16) -> u8 {
        let (x_res, y_res) = self.resolution;
        match reg {
            r if (REG_PRODUCT_ID..REG_PRODUCT_ID + 4).contains(&r) => {
                self.product_id[(r - REG_PRODUCT_ID) as usize]
            }
            r if r == REG_RESOLUTION => 0x00,
            r if r == REG_RESOLUTION + 1 => x_res.to_le_bytes()[0],
            r if r == REG_RESOLUTION + 2 => x_res.to_le_bytes()[1],
            r if r == REG_RESOLUTION + 3 => y_res.to_le_bytes()[0],
            r if r == REG_RESOLUTION + 4 => y_res.to_le_bytes()[1],
            r if r == REG_STATUS => self.status,
            r if (REG_POINT1..REG_POINT1 + POINT_LEN as u16).contains(&r) => {
                self.point[(r - REG_POINT1) as usize]
            }
            _ => 0xFF,
        }
    }

    fn read_block(&mut self, addr: u8, reg: u16, buf: &mut [u8]) -> Result<(), MockError> {
        self.log.push(Access::Read { addr, reg });
        if self.fail_point_reads && reg == REG_POINT1 {
            return Err(MockError::nack());
        }
        for (offset, slot) in buf.iter_mut().enumerate() {
            *slot = self.register_byte(reg.wrapping_add(offset as u16));
        }
        Ok(())
    }

    fn write_block(&mut self, addr: u8, reg: u16, data: &[u8]) -> Result<(), MockError> {
        let value = data.first().copied().unwrap_or(0);
        self.log.push(Access::Write { addr, reg, value });
        if reg == REG_STATUS {
            self.status = value;
        }
        Ok(())
    }

    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), MockError> {
        let acked = self.active_address() == Some(address);

        if matches!(operations, [Operation::Write(bytes)] if bytes.is_empty()) {
            self.log.push(Access::Probe {
                addr: address,
                acked,
            });
            return if acked { Ok(()) } else { Err(MockError::nack()) };
        }

        if !acked {
            return Err(MockError::nack());
        }

        match operations {
            [Operation::Write(reg_bytes), Operation::Read(buf)] if reg_bytes.len() == 2 => {
                let reg = self.decode_reg([reg_bytes[0], reg_bytes[1]]);
                self.read_block(address, reg, buf)
            }
            [Operation::Write(reg_bytes), Operation::Write(data)] if reg_bytes.len() == 2 => {
                let reg = self.decode_reg([reg_bytes[0], reg_bytes[1]]);
                self.write_block(address, reg, data)
            }
            other => panic!("unexpected transaction shape: {} operations", other.len()),
        }
    }
}

pub(crate) struct MockBus {
    state: Rc<RefCell<Sim>>,
}

impl ErrorType for MockBus {
    type Error = MockError;
}

impl I2c<SevenBitAddress> for MockBus {
    async fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.state.borrow_mut().transaction(address, operations)
    }
}

/// A bus whose transactions never complete; exercises the deadline race.
pub(crate) struct WedgedBus;

impl ErrorType for WedgedBus {
    type Error = MockError;
}

impl I2c<SevenBitAddress> for WedgedBus {
    async fn transaction(
        &mut self,
        _address: SevenBitAddress,
        _operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        core::future::pending().await
    }
}

pub(crate) struct MockResetPin {
    state: Rc<RefCell<Sim>>,
}

impl embedded_hal::digital::ErrorType for MockResetPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for MockResetPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().rst_low = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut sim = self.state.borrow_mut();
        if sim.rst_low {
            // Rising edge: the device samples the select line, which the
            // pull-up holds high when nobody drives it.
            sim.latched = Some(sim.select_driven.unwrap_or(true));
        }
        sim.rst_low = false;
        Ok(())
    }
}

pub(crate) struct MockSelectPin {
    state: Rc<RefCell<Sim>>,
}

impl AddressSelectPin for MockSelectPin {
    fn drive(&mut self, high: bool) {
        self.state.borrow_mut().select_driven = Some(high);
    }

    fn release(&mut self) {
        self.state.borrow_mut().select_driven = None;
    }
}

pub(crate) struct MockDelay;

impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}
