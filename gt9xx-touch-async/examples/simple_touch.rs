#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_hal::i2c::master::I2c;
use esp_hal::Async;
use esp_hal::{
    clock::CpuClock,
    gpio::{Flex, Level, Output, OutputConfig},
    time::Rate,
    timer::systimer::SystemTimer,
};
use esp_println::println;
use gt9xx_touch_async::{Orientation, TouchConfig, TouchController};
use log::{info, warn};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("{}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

const DISPLAY_WIDTH: u16 = 800;
const DISPLAY_HEIGHT: u16 = 480;

/// The main entry point of the application.
#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    // Init logging
    esp_println::logger::init_logger(log::LevelFilter::Debug);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    info!("Peripherals initialized");

    let timer0 = SystemTimer::new(peripherals.SYSTIMER);
    esp_hal_embassy::init(timer0.alarm0);

    let touch_rst = Output::new(peripherals.GPIO45, Level::High, OutputConfig::default());
    let touch_sel = Flex::new(peripherals.GPIO12);

    let touch_scl = peripherals.GPIO14;
    let touch_sda = peripherals.GPIO13;

    let config = esp_hal::i2c::master::Config::default().with_frequency(Rate::from_khz(100));

    let touch_i2c = I2c::new(peripherals.I2C0, config)
        .unwrap()
        .with_sda(touch_sda)
        .with_scl(touch_scl)
        .into_async();

    let mut touch_controller = TouchController::new(
        touch_i2c,
        touch_rst,
        touch_sel,
        embassy_time::Delay,
        TouchConfig {
            width: DISPLAY_WIDTH,
            height: DISPLAY_HEIGHT,
            orientation: Orientation::default(),
        },
    );

    let report = touch_controller.init().await;
    if report.degraded.is_some() {
        warn!("Touch calibration degraded: {report:?}");
    } else {
        info!("Touch calibrated: {report:?}");
    }

    match touch_controller.read_product_id().await {
        Ok(id) => info!("Touch product id: {id:02x?}"),
        Err(err) => warn!("Could not read product id: {err:?}"),
    }

    spawner.spawn(poll_touch(touch_controller)).unwrap();

    info!("Entering idle loop.");
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}

/// A task that polls for touch samples and logs them.
#[embassy_executor::task]
async fn poll_touch(
    mut touch_controller: TouchController<
        I2c<'static, Async>,
        Output<'static>,
        Flex<'static>,
        embassy_time::Delay,
    >,
) {
    let mut was_pressed = false;
    loop {
        let sample = touch_controller.poll().await;
        if sample.pressed != was_pressed {
            info!(
                "Touch {} at {},{}",
                if sample.pressed { "down" } else { "up" },
                sample.x,
                sample.y
            );
            was_pressed = sample.pressed;
        }
        Timer::after(Duration::from_millis(15)).await;
    }
}
