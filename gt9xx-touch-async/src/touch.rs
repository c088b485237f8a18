//! The touch controller: calibrate once, then poll for samples.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::bus::{BusError, RegisterBus};
use crate::calibrate::{CalibrationReport, Calibrator};
use crate::config::{RegisterAccessor, POINT_LEN, REG_POINT1, REG_PRODUCT_ID, REG_STATUS};
use crate::reset::{AddressSelectPin, ResetSequencer};

const STATUS_TIMEOUT_MS: u32 = 20;
const POINT_TIMEOUT_MS: u32 = 30;
const ACK_TIMEOUT_MS: u32 = 20;
const PRODUCT_ID_TIMEOUT_MS: u32 = 50;

/// Status register: an unconsumed sample is available.
const STATUS_READY: u8 = 0x80;
/// Status register: reported touch-point count.
const STATUS_COUNT_MASK: u8 = 0x0F;

/// One decoded touch sample. Recomputed fresh on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchSample {
    /// Whether a touch is currently reported.
    pub pressed: bool,
    /// Screen X coordinate, already transformed and clamped.
    pub x: u16,
    /// Screen Y coordinate, already transformed and clamped.
    pub y: u16,
}

/// Axis corrections for modules mounted rotated or mirrored relative to the
/// display. Supplied by the display integration, applied uniformly to every
/// decoded point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    /// Swap the X and Y axes before inversion.
    pub swap_xy: bool,
    /// Mirror X across the display width.
    pub invert_x: bool,
    /// Mirror Y across the display height.
    pub invert_y: bool,
}

/// Display-side parameters the driver needs: the panel resolution (used as
/// the calibration oracle and the clamp bound) and the axis corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchConfig {
    /// Display width in pixels.
    pub width: u16,
    /// Display height in pixels.
    pub height: u16,
    /// Axis corrections for this module/display pairing.
    pub orientation: Orientation,
}

impl TouchConfig {
    /// Maps a raw controller coordinate pair to screen space.
    fn map_to_screen(&self, raw_x: u16, raw_y: u16) -> (u16, u16) {
        let (x, y) = if self.orientation.swap_xy {
            (raw_y, raw_x)
        } else {
            (raw_x, raw_y)
        };

        let max_x = i32::from(self.width.max(1)) - 1;
        let max_y = i32::from(self.height.max(1)) - 1;

        let mut x = i32::from(x);
        let mut y = i32::from(y);
        if self.orientation.invert_x {
            x = max_x - x;
        }
        if self.orientation.invert_y {
            y = max_y - y;
        }

        (x.clamp(0, max_x) as u16, y.clamp(0, max_y) as u16)
    }
}

/// A loose sanity check for the product-identification block.
///
/// The ID is ASCII ("911" and friends); all-zero or all-0xFF blocks are the
/// signature of a floating bus, not a device.
pub fn product_id_looks_valid(id: &[u8; 4]) -> bool {
    let all_zero = id.iter().all(|&b| b == 0x00);
    let all_ones = id.iter().all(|&b| b == 0xFF);
    if all_zero || all_ones {
        return false;
    }
    let printable = id.iter().filter(|&&b| (0x20..=0x7E).contains(&b)).count();
    printable >= 2
}

/// A driver for a GT9xx touch controller.
///
/// Construct it, call [`init`](Self::init) once, then call
/// [`poll`](Self::poll) periodically (every 5–30 ms) from a single task.
pub struct TouchController<I2cType, Rst: OutputPin, Sel: AddressSelectPin, Delay> {
    bus: RegisterBus<I2cType, Delay>,
    reset: ResetSequencer<Rst, Sel>,
    accessor: RegisterAccessor,
    config: TouchConfig,
}

impl<I2cType, Rst, Sel, Delay, ErrorType> TouchController<I2cType, Rst, Sel, Delay>
where
    I2cType: I2c<SevenBitAddress, Error = ErrorType>,
    Rst: OutputPin,
    Sel: AddressSelectPin,
    Delay: DelayNs,
    ErrorType: embedded_hal_async::i2c::Error,
{
    /// Creates a new `TouchController`.
    ///
    /// # Arguments
    ///
    /// * `i2c` - An I2C peripheral that implements `embedded-hal-async::i2c::I2c`.
    /// * `rst` - The output pin wired to the controller's RESET line.
    /// * `sel` - The INT/select pin, driven only during reset.
    /// * `delay` - A delay provider, used for reset timing and bus deadlines.
    /// * `config` - Display resolution and axis corrections.
    ///
    /// Until [`init`](Self::init) runs, register access uses the fallback
    /// configuration, so a premature `poll` reports no touch instead of
    /// misbehaving.
    pub fn new(i2c: I2cType, rst: Rst, sel: Sel, delay: Delay, config: TouchConfig) -> Self {
        Self {
            bus: RegisterBus::new(i2c, delay),
            reset: ResetSequencer::new(rst, sel),
            accessor: RegisterAccessor::new(crate::config::LockedConfig::FALLBACK),
            config,
        }
    }

    /// Calibrates the controller and locks its bus configuration.
    ///
    /// Runs the reset/probe/readback sweep to completion and leaves the
    /// device latched on the winning polarity. Never fails: when nothing
    /// usable is found the fallback configuration is locked and the outcome
    /// is reported as degraded; the rest of the system keeps running and
    /// `poll` simply reports no touches. Calling this again recalibrates
    /// from scratch.
    pub async fn init(&mut self) -> CalibrationReport {
        let report = Calibrator::new(
            &mut self.bus,
            &mut self.reset,
            self.config.width,
            self.config.height,
        )
        .run()
        .await;
        self.accessor = RegisterAccessor::new(report.config);
        report
    }

    /// Reads at most one pending touch sample.
    ///
    /// Every transient bus failure degrades to "no touch this cycle"; the
    /// status register is acknowledged exactly once per cycle that was
    /// successfully consumed and left alone otherwise, so an unread sample
    /// stays pending for the next poll.
    pub async fn poll(&mut self) -> TouchSample {
        let mut status = [0u8; 1];
        if self
            .accessor
            .read(&mut self.bus, REG_STATUS, &mut status, STATUS_TIMEOUT_MS)
            .await
            .is_err()
        {
            // Nothing was read, so there is nothing to acknowledge.
            return TouchSample::default();
        }
        let status = status[0];

        if status & STATUS_READY == 0 {
            // No pending sample. Writing the status register now could
            // collide with an update in progress on the controller side.
            return TouchSample::default();
        }

        let count = status & STATUS_COUNT_MASK;
        if count == 0 {
            self.acknowledge().await;
            return TouchSample::default();
        }

        let mut point = [0u8; POINT_LEN];
        match self
            .accessor
            .read(&mut self.bus, REG_POINT1, &mut point, POINT_TIMEOUT_MS)
            .await
        {
            Ok(()) => {
                // Point block: track id, X low/high, Y low/high, reserved.
                let raw_x = u16::from_le_bytes([point[1], point[2]]);
                let raw_y = u16::from_le_bytes([point[3], point[4]]);
                let (x, y) = self.config.map_to_screen(raw_x, raw_y);

                self.acknowledge().await;
                TouchSample {
                    pressed: true,
                    x,
                    y,
                }
            }
            Err(err) => {
                // Leave the ready bit set so the next poll retries this
                // sample instead of dropping it.
                log::warn!("touch point read failed: {err:?}");
                TouchSample::default()
            }
        }
    }

    /// Reads the 4-byte product-identification block. Diagnostics only; the
    /// poll protocol does not depend on it.
    pub async fn read_product_id(&mut self) -> Result<[u8; 4], BusError<ErrorType>> {
        let mut id = [0u8; 4];
        self.accessor
            .read(&mut self.bus, REG_PRODUCT_ID, &mut id, PRODUCT_ID_TIMEOUT_MS)
            .await?;
        Ok(id)
    }

    /// Tells the device the pending sample was consumed.
    async fn acknowledge(&mut self) {
        if let Err(err) = self
            .accessor
            .write(&mut self.bus, REG_STATUS, &[0], ACK_TIMEOUT_MS)
            .await
        {
            log::warn!("touch status acknowledge failed: {err:?}");
        }
    }
}
