// sensor.rs

use std::fmt;

use dht_sensor::{dht22, DhtError, DhtReading};
use embedded_hal::digital::v2::{InputPin, OutputPin};
use esp_idf_hal::delay::Ets;

use crate::*;

/// Sensor failure, kept alongside the last good values in the reading store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorFault {
    /// No sample has been taken yet.
    NoData,
    Timeout,
    Checksum,
    Gpio,
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorFault::NoData => "no reading yet",
            SensorFault::Timeout => "timeout",
            SensorFault::Checksum => "checksum mismatch",
            SensorFault::Gpio => "gpio fault",
        };
        f.write_str(name)
    }
}

impl<E> From<DhtError<E>> for SensorFault {
    fn from(e: DhtError<E>) -> Self {
        match e {
            DhtError::Timeout => SensorFault::Timeout,
            DhtError::ChecksumMismatch => SensorFault::Checksum,
            DhtError::PinError(_) => SensorFault::Gpio,
        }
    }
}

/// One successful combined sample, in tenths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSample {
    pub temperature: i16,
    pub humidity: i16,
}

pub trait TempSensor {
    fn sample(&mut self) -> Result<RawSample, SensorFault>;
}

/// AM2301 (DHT22) on a single open-drain line.
/// The bit-timing protocol itself lives in the `dht-sensor` crate.
pub struct Am2301<P> {
    pin: P,
}

impl<P> Am2301<P> {
    pub fn new(pin: P) -> Self {
        Am2301 { pin }
    }
}

impl<P, E> TempSensor for Am2301<P>
where
    P: InputPin<Error = E> + OutputPin<Error = E>,
{
    fn sample(&mut self) -> Result<RawSample, SensorFault> {
        let mut delay = Ets;
        let r = dht22::Reading::read(&mut delay, &mut self.pin)?;
        Ok(RawSample {
            temperature: to_tenths(r.temperature),
            humidity: to_tenths(r.relative_humidity),
        })
    }
}

pub fn to_tenths(v: f32) -> i16 {
    (v * 10.0).round() as i16
}

/// Publish a poll result into the store. On failure the last good values
/// are retained and only the status flips.
pub fn apply_sample(reading: &mut Reading, sample: Result<RawSample, SensorFault>) {
    match sample {
        Ok(s) => {
            *reading = Reading {
                temperature: s.temperature,
                humidity: s.humidity,
                status: SensorStatus::Ok,
            }
        }
        Err(fault) => reading.status = SensorStatus::Fault(fault),
    }
}

/// Poll forever on a fixed interval. The interval is the only retry policy.
pub async fn run_sensor<S: TempSensor>(
    state: Arc<Pin<Box<MyState>>>,
    mut sensor: S,
) -> anyhow::Result<()> {
    let interval = Duration::from_millis(state.config.poll_interval_ms);

    loop {
        let sample = sensor.sample();
        match &sample {
            Ok(s) => info!(
                "Latest sensor data: temp={} humidity={}",
                s.temperature, s.humidity
            ),
            Err(e) => error!("Could not determine temperature and humidity: {e}"),
        }

        apply_sample(&mut *state.reading.write().await, sample);

        sleep(interval).await;
    }
}


// EOF
