//! Mutex-serialized access to a [`TouchController`].
//!
//! The driver itself assumes a single periodic caller. When a deployment
//! adds a second consumer (typically a diagnostics or telemetry reader next
//! to the polling task), every access has to be serialized, and it has to
//! happen above the locked-configuration choke point rather than on the raw
//! bus. This wrapper does exactly that and nothing more.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};

use crate::bus::BusError;
use crate::calibrate::CalibrationReport;
use crate::reset::AddressSelectPin;
use crate::touch::{TouchController, TouchSample};

/// A [`TouchController`] that can be shared between tasks.
pub struct SharedTouchController<I2cType, Rst: OutputPin, Sel: AddressSelectPin, Delay> {
    inner: Mutex<CriticalSectionRawMutex, TouchController<I2cType, Rst, Sel, Delay>>,
}

impl<I2cType, Rst, Sel, Delay, ErrorType> SharedTouchController<I2cType, Rst, Sel, Delay>
where
    I2cType: I2c<SevenBitAddress, Error = ErrorType>,
    Rst: OutputPin,
    Sel: AddressSelectPin,
    Delay: DelayNs,
    ErrorType: embedded_hal_async::i2c::Error,
{
    /// Wraps a controller for shared use.
    pub fn new(controller: TouchController<I2cType, Rst, Sel, Delay>) -> Self {
        Self {
            inner: Mutex::new(controller),
        }
    }

    /// Calibrates under the lock. Call once before spawning consumers.
    pub async fn init(&self) -> CalibrationReport {
        let mut controller = self.inner.lock().await;
        controller.init().await
    }

    /// Polls under the lock.
    pub async fn poll(&self) -> TouchSample {
        let mut controller = self.inner.lock().await;
        controller.poll().await
    }

    /// Reads the product-identification block under the lock.
    pub async fn read_product_id(&self) -> Result<[u8; 4], BusError<ErrorType>> {
        let mut controller = self.inner.lock().await;
        controller.read_product_id().await
    }
}
