// bin/esp32wstation.rs

#![warn(clippy::large_futures)]

use esp_idf_hal::{
    delay::FreeRtos,
    gpio::{IOPin, OutputPin, PinDriver},
    prelude::Peripherals,
};
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs, timer::EspTaskTimerService, wifi::WifiDriver};
use esp_idf_sys::esp;

use esp32wstation::*;

#[cfg(all(feature = "esp32c3", feature = "esp32s"))]
compile_error!("Select only one hardware feature: `esp32c3` or `esp32s`");
#[cfg(not(any(feature = "esp32c3", feature = "esp32s")))]
compile_error!("Select a hardware feature: `esp32c3` or `esp32s`");

fn main() -> anyhow::Result<()> {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    // eventfd is needed by our mio poll implementation.  Note you should set max_fds
    // higher if you have other code that may need eventfd.
    #[allow(clippy::needless_update)]
    let eventfd_config = esp_idf_sys::esp_vfs_eventfd_config_t {
        max_fds: 1,
        ..Default::default()
    };
    esp! { unsafe { esp_idf_sys::esp_vfs_eventfd_register(&eventfd_config) } }?;

    info!("Starting up, firmware version {}", FW_VERSION);

    let sysloop = EspSystemEventLoop::take()?;
    let timer = EspTaskTimerService::new()?;
    let nvs_default_partition = nvs::EspDefaultNvsPartition::take()?;

    let config = MyConfig::default();
    info!("My config:\n{config:#?}");

    let peripherals = Peripherals::take().unwrap();
    let pins = peripherals.pins;

    #[cfg(feature = "esp32c3")]
    let (sensor_pin, led) = (pins.gpio4.downgrade(), pins.gpio8.downgrade_output());

    #[cfg(feature = "esp32s")]
    let (sensor_pin, led) = (pins.gpio4.downgrade(), pins.gpio2.downgrade_output());

    // the AM2301 data line idles high
    let mut sensor_line = PinDriver::input_output_od(sensor_pin)?;
    sensor_line.set_high()?;
    let sensor = Am2301::new(sensor_line);

    let wifi_driver = WifiDriver::new(
        peripherals.modem,
        sysloop.clone(),
        Some(nvs_default_partition),
    )?;

    let state = Box::pin(MyState::new(config));
    let shared_state = Arc::new(state);

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(Box::pin(async move {
            let mut wifi_loop = WifiLoop {
                state: shared_state.clone(),
                wifi: None,
            };

            // nothing else runs until the station has an address
            if let Err(e) = Box::pin(wifi_loop.bring_up(wifi_driver, sysloop, timer)).await {
                error!("Network bring-up failed: {e}");
                return;
            }

            info!("Entering main loop...");
            tokio::select! {
                _ = Box::pin(run_sensor(shared_state.clone(), sensor)) => { error!("run_sensor() ended."); }
                _ = Box::pin(run_api_server(shared_state.clone())) => { error!("run_api_server() ended."); }
                _ = Box::pin(run_blink(shared_state.clone(), led)) => { error!("run_blink() ended."); }
                _ = Box::pin(wifi_loop.stay_connected()) => { error!("stay_connected() ended."); }
            };
        }));

    // not actually returning from main() but we reboot instead!
    info!("main() finished, reboot.");
    FreeRtos::delay_ms(3000);
    esp_idf_hal::reset::restart();
}

// EOF
