//! Timed register access over the raw I2C peripheral.
//!
//! The GT9xx exposes a flat 16-bit register space behind a 7-bit device
//! address. [`RegisterBus`] wraps the peripheral with the two operations the
//! rest of the driver needs (read/write N bytes at a register address) and
//! bounds every transaction with a caller-supplied millisecond deadline by
//! racing it against the delay provider. It also carries the address-only
//! acknowledge probe used while hunting for the device.
//!
//! The register address is always transmitted most-significant-byte first
//! here; callers that need the swapped wire order pre-swap the address (see
//! [`crate::config::RegisterAccessor`]).

use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorKind, I2c, Operation, SevenBitAddress};

/// An error from a single bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError<E> {
    /// The device did not acknowledge its address or a data byte.
    Nack(E),
    /// The transaction did not complete within the caller's deadline.
    Timeout,
    /// Any other failure reported by the underlying bus controller.
    Bus(E),
}

fn classify<E: embedded_hal_async::i2c::Error>(err: E) -> BusError<E> {
    match err.kind() {
        ErrorKind::NoAcknowledge(_) => BusError::Nack(err),
        _ => BusError::Bus(err),
    }
}

/// Byte-oriented register access with per-operation deadlines.
pub struct RegisterBus<I2cType, Delay> {
    i2c: I2cType,
    delay: Delay,
}

impl<I2cType, Delay, ErrorType> RegisterBus<I2cType, Delay>
where
    I2cType: I2c<SevenBitAddress, Error = ErrorType>,
    Delay: DelayNs,
    ErrorType: embedded_hal_async::i2c::Error,
{
    /// Creates a new `RegisterBus`.
    ///
    /// The I2C peripheral must already be configured; bringing up the bus
    /// controller is the caller's responsibility.
    pub fn new(i2c: I2cType, delay: Delay) -> Self {
        Self { i2c, delay }
    }

    pub(crate) fn delay_mut(&mut self) -> &mut Delay {
        &mut self.delay
    }

    /// Reads `buf.len()` bytes starting at the 16-bit register address
    /// `reg`, giving up after `timeout_ms`.
    pub async fn read_register(
        &mut self,
        address: u8,
        reg: u16,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), BusError<ErrorType>> {
        let reg_bytes = reg.to_be_bytes();
        let Self { i2c, delay } = self;
        match select(
            i2c.write_read(address, &reg_bytes, buf),
            delay.delay_ms(timeout_ms),
        )
        .await
        {
            Either::First(result) => result.map_err(classify),
            Either::Second(()) => Err(BusError::Timeout),
        }
    }

    /// Writes `data` starting at the 16-bit register address `reg`, giving
    /// up after `timeout_ms`.
    pub async fn write_register(
        &mut self,
        address: u8,
        reg: u16,
        data: &[u8],
        timeout_ms: u32,
    ) -> Result<(), BusError<ErrorType>> {
        let reg_bytes = reg.to_be_bytes();
        let Self { i2c, delay } = self;
        let mut ops = [Operation::Write(&reg_bytes), Operation::Write(data)];
        match select(
            i2c.transaction(address, &mut ops),
            delay.delay_ms(timeout_ms),
        )
        .await
        {
            Either::First(result) => result.map_err(classify),
            Either::Second(()) => Err(BusError::Timeout),
        }
    }

    /// Sends an address-only transaction and reports whether any of
    /// `attempts` tries was acknowledged within `timeout_ms` each.
    pub async fn probe_ready(&mut self, address: u8, attempts: u8, timeout_ms: u32) -> bool {
        for _ in 0..attempts {
            let Self { i2c, delay } = self;
            match select(i2c.write(address, &[]), delay.delay_ms(timeout_ms)).await {
                Either::First(Ok(())) => return true,
                Either::First(Err(_)) | Either::Second(()) => {}
            }
        }
        false
    }
}
