//! The reset/address-select GPIO sequence.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

// The device samples the select line while RESET rises; the high phase has
// to outlast its internal boot time before the sample is taken.
const RESET_LOW_MS: u32 = 10;
const RESET_HIGH_MS: u32 = 50;
const RELEASE_SETTLE_MS: u32 = 10;

/// A pin that can be driven as a push-pull output during reset and then
/// released to a floating input.
///
/// On GT9xx modules this is the INT line, which doubles as the bus-address
/// select input while RESET rises. `embedded-hal` has no trait for a pin
/// that changes direction at runtime, so the driver asks for this small
/// capability instead; HALs with a dynamic-direction pin type implement it
/// in a few lines (see the `esp` feature for the `esp-hal` one).
pub trait AddressSelectPin {
    /// Drives the pin as an output at the given level.
    fn drive(&mut self, high: bool);

    /// Releases the pin back to a floating input.
    fn release(&mut self);
}

#[cfg(feature = "esp")]
impl AddressSelectPin for esp_hal::gpio::Flex<'_> {
    fn drive(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
        self.set_as_output();
    }

    fn release(&mut self) {
        self.set_as_input(esp_hal::gpio::Pull::Up);
    }
}

/// Owns the RESET and select pins and runs the timed sequence that
/// determines the device's bus address.
pub struct ResetSequencer<Rst: OutputPin, Sel: AddressSelectPin> {
    rst: Rst,
    sel: Sel,
}

impl<Rst: OutputPin, Sel: AddressSelectPin> ResetSequencer<Rst, Sel> {
    /// Creates a new `ResetSequencer` from the RESET output and the
    /// INT/select pin.
    pub fn new(rst: Rst, sel: Sel) -> Self {
        Self { rst, sel }
    }

    /// Resets the device with the select line held at `select_high`.
    ///
    /// On return the select pin is floating again and the device is ready
    /// for bus transactions on whichever address it latched. This sequence
    /// is the only way the address is chosen; it runs once per candidate
    /// polarity during calibration and one final time to latch the winner.
    pub async fn reset_with_select(
        &mut self,
        delay: &mut impl DelayNs,
        select_high: bool,
    ) -> Result<(), Rst::Error> {
        self.sel.drive(select_high);

        self.rst.set_low()?;
        delay.delay_ms(RESET_LOW_MS).await;
        self.rst.set_high()?;
        delay.delay_ms(RESET_HIGH_MS).await;

        self.sel.release();
        delay.delay_ms(RELEASE_SETTLE_MS).await;
        Ok(())
    }
}
