// state.rs

use crate::*;

/// Validity of the latest sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorStatus {
    Ok,
    Fault(SensorFault),
}

/// Latest temperature/humidity sample in tenths of a unit.
///
/// The whole struct is replaced under one write lock so readers always see
/// a triple from a single poll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Tenths of a degree Celsius.
    pub temperature: i16,
    /// Tenths of a percent relative humidity.
    pub humidity: i16,
    pub status: SensorStatus,
}

impl Default for Reading {
    fn default() -> Self {
        Reading {
            temperature: 0,
            humidity: 0,
            status: SensorStatus::Fault(SensorFault::NoData),
        }
    }
}

pub struct MyState {
    pub config: MyConfig,
    pub reading: RwLock<Reading>,
    pub hostname: RwLock<String>,
    pub wifi_up: RwLock<bool>,
    pub api_cnt: AtomicU32,
    pub blink_ms: AtomicI32,
}

impl MyState {
    pub fn new(config: MyConfig) -> Self {
        MyState {
            config,
            reading: RwLock::new(Reading::default()),
            hostname: RwLock::new(String::new()),
            wifi_up: RwLock::new(false),
            api_cnt: AtomicU32::new(0),
            blink_ms: AtomicI32::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_reading_is_not_ok() {
        let r = Reading::default();
        assert_eq!(r.status, SensorStatus::Fault(SensorFault::NoData));
        assert_eq!(r.temperature, 0);
        assert_eq!(r.humidity, 0);
    }

    #[tokio::test]
    async fn readers_never_observe_torn_triple() {
        let state = Arc::new(Box::pin(MyState::new(MyConfig::default())));
        let a = Reading {
            temperature: 235,
            humidity: 410,
            status: SensorStatus::Ok,
        };
        let b = Reading {
            temperature: -15,
            humidity: 999,
            status: SensorStatus::Ok,
        };

        let writer = {
            let state = state.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    *state.reading.write().await = if i % 2 == 0 { a } else { b };
                    tokio::task::yield_now().await;
                }
            })
        };

        let initial = Reading::default();
        for _ in 0..200 {
            let r = *state.reading.read().await;
            assert!(r == a || r == b || r == initial, "torn reading: {r:?}");
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
    }
}

// EOF
