//! Startup calibration: find the address, wire order and select polarity
//! the mounted module actually uses.
//!
//! Nothing on the bus states these directly, but the panel resolution
//! registers give an indirect oracle: the value read back is only correct
//! when both the device address and the register-address byte order are
//! right, and the correct value is known in advance: it must equal the
//! display resolution. The calibrator sweeps every combination, scores the
//! readbacks, and locks the best candidate.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{I2c, SevenBitAddress};
use heapless::Vec;

use crate::bus::RegisterBus;
use crate::config::{
    DeviceAddress, LockedConfig, RegisterOrder, REG_RESOLUTION, RESOLUTION_LEN,
};
use crate::reset::{AddressSelectPin, ResetSequencer};

const PROBE_ATTEMPTS: u8 = 2;
const PROBE_TIMEOUT_MS: u32 = 20;
const RESOLUTION_TIMEOUT_MS: u32 = 50;

/// Score for a resolution readback that matches the display exactly, in
/// either axis order.
const SCORE_EXACT: u8 = 80;
/// Score for a readback that is merely in a believable sensor range.
const SCORE_IN_RANGE: u8 = 10;
/// Upper bound of that range; GT9xx panels do not report more.
const MAX_PLAUSIBLE: u16 = 4096;

/// Why calibration fell back to [`LockedConfig::FALLBACK`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedCause {
    /// Neither candidate address acknowledged under either select level.
    Unresponsive,
    /// At least one address acknowledged, but no register order produced a
    /// believable resolution readback.
    ImplausibleReadback,
}

/// Outcome of one calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationReport {
    /// The configuration that was locked.
    pub config: LockedConfig,
    /// Select level latched by the final reset.
    pub select_high: bool,
    /// Plausibility score of the winning readback (0 when degraded).
    pub score: u8,
    /// Set when the fallback default was used instead of a measured winner.
    pub degraded: Option<DegradedCause>,
}

/// One polarity's best candidate.
#[derive(Debug, Clone, Copy)]
struct ProbeResult {
    select_high: bool,
    address: DeviceAddress,
    order: RegisterOrder,
    x: u16,
    y: u16,
    score: u8,
    /// Whether the alternate address was among those that acknowledged
    /// under this polarity; used as the selection tie-break.
    alt_acked: bool,
}

/// Scores a resolution readback against the known display resolution.
pub(crate) fn plausibility(x: u16, y: u16, width: u16, height: u16) -> u8 {
    if (x, y) == (width, height) || (x, y) == (height, width) {
        SCORE_EXACT
    } else if x > 0 && y > 0 && x <= MAX_PLAUSIBLE && y <= MAX_PLAUSIBLE {
        SCORE_IN_RANGE
    } else {
        0
    }
}

/// Borrows the controller's parts for the duration of one calibration run.
pub(crate) struct Calibrator<'a, I2cType, Rst: OutputPin, Sel: AddressSelectPin, Delay> {
    bus: &'a mut RegisterBus<I2cType, Delay>,
    reset: &'a mut ResetSequencer<Rst, Sel>,
    width: u16,
    height: u16,
}

impl<'a, I2cType, Rst, Sel, Delay, ErrorType> Calibrator<'a, I2cType, Rst, Sel, Delay>
where
    I2cType: I2c<SevenBitAddress, Error = ErrorType>,
    Rst: OutputPin,
    Sel: AddressSelectPin,
    Delay: DelayNs,
    ErrorType: embedded_hal_async::i2c::Error,
{
    pub(crate) fn new(
        bus: &'a mut RegisterBus<I2cType, Delay>,
        reset: &'a mut ResetSequencer<Rst, Sel>,
        width: u16,
        height: u16,
    ) -> Self {
        Self {
            bus,
            reset,
            width,
            height,
        }
    }

    /// Runs the full sweep and leaves the device latched on the winner.
    pub(crate) async fn run(mut self) -> CalibrationReport {
        let mut probes: Vec<ProbeResult, 2> = Vec::new();

        for select_high in [false, true] {
            if let Some(result) = self.probe_polarity(select_high).await {
                let _ = probes.push(result);
            }
        }

        let mut best: Option<ProbeResult> = None;
        for probe in &probes {
            let better = match best {
                None => true,
                Some(current) => {
                    probe.score > current.score
                        || (probe.score == current.score && probe.alt_acked && !current.alt_acked)
                }
            };
            if better {
                best = Some(*probe);
            }
        }

        let report = match best {
            Some(winner) if winner.score > 0 => {
                log::info!(
                    "touch calibration locked addr={:#04x} order={:?} ({}x{} read back, score {})",
                    winner.address.raw(),
                    winner.order,
                    winner.x,
                    winner.y,
                    winner.score,
                );
                CalibrationReport {
                    config: LockedConfig {
                        address: winner.address,
                        order: winner.order,
                    },
                    select_high: winner.select_high,
                    score: winner.score,
                    degraded: None,
                }
            }
            Some(winner) => {
                log::warn!(
                    "touch calibration: device acknowledged but no readback was usable, \
                     falling back to addr={:#04x}",
                    LockedConfig::FALLBACK.address.raw(),
                );
                CalibrationReport {
                    config: LockedConfig::FALLBACK,
                    select_high: winner.select_high,
                    score: 0,
                    degraded: Some(DegradedCause::ImplausibleReadback),
                }
            }
            None => {
                log::warn!(
                    "touch calibration: no acknowledge on any address, \
                     falling back to addr={:#04x}",
                    LockedConfig::FALLBACK.address.raw(),
                );
                CalibrationReport {
                    config: LockedConfig::FALLBACK,
                    select_high: false,
                    score: 0,
                    degraded: Some(DegradedCause::Unresponsive),
                }
            }
        };

        // Latch the winning polarity with one final reset. A device left
        // idle between calibration and the first poll can drop the
        // selection; this pins it down before steady state begins.
        self.latch(report.select_high, report.config.address).await;

        report
    }

    /// Resets with one polarity and evaluates both addresses and orders.
    async fn probe_polarity(&mut self, select_high: bool) -> Option<ProbeResult> {
        let Self { bus, reset, .. } = self;
        if let Err(_err) = reset.reset_with_select(bus.delay_mut(), select_high).await {
            log::warn!("touch reset pin failed, skipping select_high={select_high}");
            return None;
        }

        let main_acked = bus
            .probe_ready(DeviceAddress::Main.raw(), PROBE_ATTEMPTS, PROBE_TIMEOUT_MS)
            .await;
        let alt_acked = bus
            .probe_ready(DeviceAddress::Alt.raw(), PROBE_ATTEMPTS, PROBE_TIMEOUT_MS)
            .await;
        log::debug!(
            "touch probe select_high={select_high}: main_ack={main_acked} alt_ack={alt_acked}"
        );
        if !main_acked && !alt_acked {
            return None;
        }

        // Provisional choice for the exploratory reads; the readback score
        // decides whether it survives.
        let address = if alt_acked {
            DeviceAddress::Alt
        } else {
            DeviceAddress::Main
        };

        let mut best: Option<ProbeResult> = None;
        for order in [RegisterOrder::MsbFirst, RegisterOrder::LsbFirst] {
            let (x, y, score) = self.score_order(address, order).await;
            log::debug!(
                "touch readback addr={:#04x} order={order:?}: x={x} y={y} score={score}",
                address.raw(),
            );
            let candidate = ProbeResult {
                select_high,
                address,
                order,
                x,
                y,
                score,
                alt_acked,
            };
            if best.map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Reads the resolution block with one register order and scores it.
    async fn score_order(&mut self, address: DeviceAddress, order: RegisterOrder) -> (u16, u16, u8) {
        let mut block = [0u8; RESOLUTION_LEN];
        let read = self
            .bus
            .read_register(
                address.raw(),
                order.apply(REG_RESOLUTION),
                &mut block,
                RESOLUTION_TIMEOUT_MS,
            )
            .await;
        if read.is_err() {
            return (0, 0, 0);
        }

        // Block layout: one lead byte, then X and Y little-endian.
        let x = u16::from_le_bytes([block[1], block[2]]);
        let y = u16::from_le_bytes([block[3], block[4]]);
        (x, y, plausibility(x, y, self.width, self.height))
    }

    async fn latch(&mut self, select_high: bool, address: DeviceAddress) {
        let Self { bus, reset, .. } = self;
        if reset
            .reset_with_select(bus.delay_mut(), select_high)
            .await
            .is_err()
        {
            log::warn!("touch latch reset failed");
            return;
        }
        if !bus
            .probe_ready(address.raw(), PROBE_ATTEMPTS, PROBE_TIMEOUT_MS)
            .await
        {
            log::warn!(
                "touch device not acknowledging {:#04x} after latch",
                address.raw()
            );
        }
    }
}
