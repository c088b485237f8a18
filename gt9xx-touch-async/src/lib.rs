//! An asynchronous, `no_std` driver for Goodix GT9xx capacitive touch
//! controllers that auto-discovers their bus configuration.
//!
//! GT9xx modules differ by batch in three ways the datasheet does not pin
//! down: which of two 7-bit I2C addresses the chip latches at reset, which
//! byte order it expects for the 16-bit register address, and which level on
//! the shared INT/select line picks which address. This driver sweeps all of
//! those combinations at startup, scores each candidate by reading back the
//! panel resolution register block and comparing it against the display
//! resolution the caller already knows, and locks the best match. After that
//! it decodes single-point touch samples with the controller's
//! acknowledge-on-read protocol.
//!
//! The driver is generic over `embedded-hal-async` traits and allocates
//! nothing. The `esp` cargo feature adds an [`AddressSelectPin`]
//! implementation for `esp_hal::gpio::Flex` and enables the
//! `simple_touch` example.
//!
//! # Usage
//!
//! ```ignore
//! use gt9xx_touch_async::{Orientation, TouchConfig, TouchController};
//!
//! #[esp_hal_embassy::main]
//! async fn main(_spawner: Spawner) {
//!     let peripherals = esp_hal::init(esp_hal::Config::default());
//!
//!     let config = esp_hal::i2c::master::Config::default().with_frequency(Rate::from_khz(100));
//!     let i2c = I2c::new(peripherals.I2C0, config)
//!         .unwrap()
//!         .with_sda(peripherals.GPIO13)
//!         .with_scl(peripherals.GPIO14)
//!         .into_async();
//!
//!     let rst = Output::new(peripherals.GPIO45, Level::High, OutputConfig::default());
//!     let sel = Flex::new(peripherals.GPIO12);
//!
//!     let mut touch = TouchController::new(
//!         i2c,
//!         rst,
//!         sel,
//!         embassy_time::Delay,
//!         TouchConfig {
//!             width: 800,
//!             height: 480,
//!             orientation: Orientation::default(),
//!         },
//!     );
//!
//!     let report = touch.init().await;
//!     log::info!("touch calibrated: {report:?}");
//!
//!     loop {
//!         let sample = touch.poll().await;
//!         if sample.pressed {
//!             log::info!("touch at {},{}", sample.x, sample.y);
//!         }
//!         Timer::after(Duration::from_millis(15)).await;
//!     }
//! }
//! ```

#![no_std]

#[cfg(test)]
extern crate std;

pub mod bus;
pub mod calibrate;
pub mod config;
pub mod reset;
pub mod shared;
pub mod touch;

#[cfg(test)]
pub(crate) mod mock;

pub use bus::{BusError, RegisterBus};
pub use calibrate::{CalibrationReport, DegradedCause};
pub use config::{DeviceAddress, LockedConfig, RegisterAccessor, RegisterOrder};
pub use reset::{AddressSelectPin, ResetSequencer};
pub use shared::SharedTouchController;
pub use touch::{product_id_looks_valid, Orientation, TouchConfig, TouchController, TouchSample};
