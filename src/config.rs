// config.rs

use embedded_svc::wifi::AuthMethod;

use crate::*;

/// Station configuration, fixed at compile time.
///
/// Wireless credentials come from the `WIFI_SSID` / `WIFI_PSK` environment
/// at build time; everything else is a constant of the deployment.
#[derive(Clone, Debug)]
pub struct MyConfig {
    pub ssid: String,
    pub psk: String,
    pub auth: AuthMethod,
    /// `None` means bring-up waits for an IP address forever.
    pub wifi_timeout: Option<Duration>,
    pub http_port: u16,
    pub poll_interval_ms: u64,
    pub blink_dur_ms: i32,
    pub blink_rate_ms: i32,
}

impl Default for MyConfig {
    fn default() -> Self {
        MyConfig {
            ssid: option_env!("WIFI_SSID").unwrap_or("internet").into(),
            psk: option_env!("WIFI_PSK").unwrap_or("password").into(),
            auth: AuthMethod::WPA2Personal,
            wifi_timeout: None,
            http_port: 80,
            poll_interval_ms: 60_000,
            blink_dur_ms: 400,
            blink_rate_ms: 50,
        }
    }
}

// EOF
