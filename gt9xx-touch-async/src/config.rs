//! Bus-side configuration: candidate addresses, register wire order, and
//! the accessor every post-calibration transfer goes through.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::bus::{BusError, RegisterBus};

// --- Register map ---
// 0x8140..0x8143 product id (ASCII, e.g. "911")
// 0x8145        firmware version high byte
// 0x8146..0x8149 panel X/Y output range, little-endian
// 0x814E        status: bit 7 data-ready, bits 3..0 point count
// 0x814F..0x8156 first point: track id, X (LE), Y (LE), reserved
pub(crate) const REG_PRODUCT_ID: u16 = 0x8140;
pub(crate) const REG_RESOLUTION: u16 = 0x8145;
pub(crate) const REG_STATUS: u16 = 0x814E;
pub(crate) const REG_POINT1: u16 = 0x814F;

pub(crate) const RESOLUTION_LEN: usize = 5;
pub(crate) const POINT_LEN: usize = 8;

/// One of the two 7-bit bus addresses a GT9xx can latch at reset.
///
/// Which one the chip picks depends on the level of the INT/select line
/// while RESET rises, and the mapping is not consistent across module
/// batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAddress {
    /// 0x5D, the address most modules ship on.
    Main,
    /// 0x14, the alternate address.
    Alt,
}

impl DeviceAddress {
    /// The raw 7-bit address.
    pub const fn raw(self) -> u8 {
        match self {
            DeviceAddress::Main => 0x5D,
            DeviceAddress::Alt => 0x14,
        }
    }
}

/// Byte order of the 16-bit register address on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOrder {
    /// Most-significant byte first, the documented GT9xx convention.
    MsbFirst,
    /// Least-significant byte first, seen on some module batches.
    LsbFirst,
}

impl RegisterOrder {
    /// Pre-swaps `reg` so that a most-significant-byte-first transmit puts
    /// the bytes on the wire in this order.
    pub const fn apply(self, reg: u16) -> u16 {
        match self {
            RegisterOrder::MsbFirst => reg,
            RegisterOrder::LsbFirst => reg.swap_bytes(),
        }
    }
}

/// The address/order pair calibration settled on.
///
/// Exactly one of these is active per controller; it is replaced as a whole
/// when `init()` recalibrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedConfig {
    /// Device address the controller acknowledged.
    pub address: DeviceAddress,
    /// Register-address byte order the controller decoded correctly.
    pub order: RegisterOrder,
}

impl LockedConfig {
    /// The hard-coded default used when calibration cannot find anything
    /// better. Polling with it on a misconfigured module yields no samples
    /// but is harmless.
    pub const FALLBACK: LockedConfig = LockedConfig {
        address: DeviceAddress::Main,
        order: RegisterOrder::MsbFirst,
    };
}

/// Register I/O bound to a [`LockedConfig`].
///
/// All steady-state transfers go through this type; nothing outside
/// calibration addresses the bus with a raw address/order pair.
#[derive(Debug, Clone, Copy)]
pub struct RegisterAccessor {
    config: LockedConfig,
}

impl RegisterAccessor {
    /// Creates an accessor bound to `config`.
    pub fn new(config: LockedConfig) -> Self {
        Self { config }
    }

    /// The configuration this accessor is bound to.
    pub fn config(&self) -> LockedConfig {
        self.config
    }

    /// Reads `buf.len()` bytes at `reg` through the locked configuration.
    pub async fn read<I2cType, Delay, ErrorType>(
        &self,
        bus: &mut RegisterBus<I2cType, Delay>,
        reg: u16,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), BusError<ErrorType>>
    where
        I2cType: I2c<SevenBitAddress, Error = ErrorType>,
        Delay: DelayNs,
        ErrorType: embedded_hal_async::i2c::Error,
    {
        bus.read_register(
            self.config.address.raw(),
            self.config.order.apply(reg),
            buf,
            timeout_ms,
        )
        .await
    }

    /// Writes `data` at `reg` through the locked configuration.
    pub async fn write<I2cType, Delay, ErrorType>(
        &self,
        bus: &mut RegisterBus<I2cType, Delay>,
        reg: u16,
        data: &[u8],
        timeout_ms: u32,
    ) -> Result<(), BusError<ErrorType>>
    where
        I2cType: I2c<SevenBitAddress, Error = ErrorType>,
        Delay: DelayNs,
        ErrorType: embedded_hal_async::i2c::Error,
    {
        bus.write_register(
            self.config.address.raw(),
            self.config.order.apply(reg),
            data,
            timeout_ms,
        )
        .await
    }
}
