// blink.rs

use esp_idf_hal::gpio::{AnyOutputPin, PinDriver};

use crate::*;

/// Ask the indicator task for `ms` milliseconds of blinking.
/// A request arriving mid-sequence overwrites whatever is still owed.
pub fn request_blink(state: &MyState, ms: i32) {
    state.blink_ms.store(ms, Ordering::Relaxed);
}

/// Take one blink period off the owed duration, if a full period is owed.
fn take_period(owed: &AtomicI32, period: i32) -> bool {
    owed
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
            if v >= period {
                Some(v - period)
            } else {
                None
            }
        })
        .is_ok()
}

/// Drive the LED with one on/off pulse per owed blink period, forever.
pub async fn run_blink(state: Arc<Pin<Box<MyState>>>, led: AnyOutputPin) -> anyhow::Result<()> {
    let mut led = PinDriver::output(led)?;
    let period = state.config.blink_rate_ms;
    let half = Duration::from_millis(period as u64 / 2);

    loop {
        if take_period(&state.blink_ms, period) {
            led.set_high()?;
            sleep(half).await;

            led.set_low()?;
            sleep(half).await;
        } else {
            sleep(Duration::from_millis(period as u64)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_request_drains_to_exact_pulse_count() {
        let owed = AtomicI32::new(400);
        let mut pulses = 0;
        while take_period(&owed, 50) {
            pulses += 1;
        }
        assert_eq!(pulses, 8);
        assert_eq!(owed.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn new_request_overwrites_remaining_duration() {
        let owed = AtomicI32::new(400);
        for _ in 0..3 {
            assert!(take_period(&owed, 50));
        }

        // last writer wins, the old remainder is gone
        owed.store(100, Ordering::Relaxed);

        let mut pulses = 0;
        while take_period(&owed, 50) {
            pulses += 1;
        }
        assert_eq!(pulses, 2);
    }

    #[test]
    fn partial_period_is_not_drained() {
        let owed = AtomicI32::new(49);
        assert!(!take_period(&owed, 50));
        assert_eq!(owed.load(Ordering::Relaxed), 49);
    }
}

// EOF
