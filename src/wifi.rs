// wifi.rs

use std::future::Future;

use anyhow::anyhow;
use embedded_svc::wifi::{ClientConfiguration, Configuration};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    timer::EspTaskTimerService,
    wifi::{AsyncWifi, EspWifi, WifiDriver},
};

use crate::*;

// A single association attempt gets this long before it is re-issued.
const ASSOC_RETRY: Duration = Duration::from_secs(10);

pub struct WifiLoop {
    pub state: Arc<Pin<Box<MyState>>>,
    pub wifi: Option<AsyncWifi<EspWifi<'static>>>,
}

impl WifiLoop {
    /// Bring the station up: configure, associate, and wait for an IP address.
    ///
    /// Association is retried forever, so a station booted while the AP is
    /// down joins once it appears. With `wifi_timeout: None` the whole wait
    /// is unbounded; with a bounded timeout the entire associate-plus-IP
    /// sequence must finish within it or the error propagates out and
    /// main() reboots. The hostname is cached once the link is up.
    pub async fn bring_up(
        &mut self,
        driver: WifiDriver<'static>,
        sysloop: EspSystemEventLoop,
        timer: EspTaskTimerService,
    ) -> anyhow::Result<()> {
        let config = &self.state.config;

        let mut wifi = AsyncWifi::wrap(EspWifi::wrap(driver)?, sysloop, timer)?;
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: config
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("SSID too long: {:?}", config.ssid))?,
            password: config
                .psk
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("passphrase too long"))?,
            auth_method: config.auth,
            ..Default::default()
        }))?;

        wifi.start().await?;
        info!("Attempting to connect to SSID {:?}...", config.ssid);

        with_deadline(
            config.wifi_timeout,
            Box::pin(wait_until_up(&mut wifi, &config.ssid)),
        )
        .await?;

        let netif = wifi.wifi().sta_netif();
        let ip_info = netif.get_ip_info()?;
        let hostname = netif.get_hostname()?;
        info!("Connected, ip {} hostname {:?}", ip_info.ip, hostname);

        *self.state.hostname.write().await = hostname.to_string();
        *self.state.wifi_up.write().await = true;

        self.wifi = Some(wifi);
        Ok(())
    }

    /// Keep the link alive for the process lifetime: whenever it drops,
    /// reconnect with no backoff and no retry ceiling.
    pub async fn stay_connected(mut self) -> anyhow::Result<()> {
        let ssid = self.state.config.ssid.clone();
        let wifi = self
            .wifi
            .as_mut()
            .ok_or_else(|| anyhow!("stay_connected() before bring_up()"))?;

        loop {
            wifi.wifi_wait(|w| w.wifi().is_up(), None).await?;
            warn!("Disconnected from {ssid:?}. Attempting to reconnect...");
            *self.state.wifi_up.write().await = false;

            Box::pin(wait_until_up(wifi, &ssid)).await?;

            *self.state.wifi_up.write().await = true;
            info!("Reconnected to {ssid:?}");
        }
    }
}

/// Associate with the AP, retrying forever, then wait for an IP address.
async fn wait_until_up(wifi: &mut AsyncWifi<EspWifi<'static>>, ssid: &str) -> anyhow::Result<()> {
    loop {
        match tokio::time::timeout(ASSOC_RETRY, wifi.connect()).await {
            Ok(Ok(())) => break,
            Ok(Err(e)) => warn!("Connect to {ssid:?} failed: {e}. Retrying..."),
            Err(_) => {
                // the driver gave up without an error event; issue a
                // fresh attempt unless it actually made it
                if wifi.wifi().is_connected()? {
                    break;
                }
                warn!("No association with {ssid:?} yet. Retrying...");
            }
        }
    }

    wifi.ip_wait_while(|w| w.wifi().is_up().map(|up| !up), None)
        .await?;
    Ok(())
}

/// Run a bring-up wait, bounded only if a timeout is configured.
/// An elapsed deadline is fatal: the caller gets an error, not a retry.
async fn with_deadline<F>(limit: Option<Duration>, fut: F) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| anyhow!("network not up within {limit:?}, giving up"))?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_covers_the_whole_wait() {
        // a wait that never finishes must fail after the configured
        // duration, no matter which phase it is stuck in
        let stuck = std::future::pending::<anyhow::Result<()>>();
        let res = with_deadline(Some(Duration::from_millis(10)), stuck).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn deadline_passes_a_completed_wait_through() {
        let res = with_deadline(
            Some(Duration::from_millis(10)),
            std::future::ready(Ok(())),
        )
        .await;
        assert!(res.is_ok());

        let res = with_deadline(None, std::future::ready(Ok(()))).await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn no_deadline_means_indefinite_wait() {
        let stuck = std::future::pending::<anyhow::Result<()>>();
        let unbounded = with_deadline(None, stuck);

        // the unbounded wait must still be pending long after a bounded
        // one would have given up
        tokio::select! {
            _ = unbounded => panic!("indefinite wait resolved"),
            _ = sleep(Duration::from_millis(50)) => {}
        }
    }
}

// EOF
