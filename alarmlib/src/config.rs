use anyhow::anyhow;
use serde;
use serde::{Deserialize, Serialize};

// All timing and threshold knobs for the alarm. Values are passed in at
// construction; the host decides where they come from (TOML file, hardcoded
// defaults, ...).
//
// Blink rates are derived from the loop counter, not wall-clock time, so they
// scale with loop_period_secs: a slow blink toggles every
// slow_blink_divisor ticks, i.e. every slow_blink_divisor * loop_period_secs
// seconds.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct AlarmConfig {
    // Arming / exit delay. Also the grace period between an interior motion
    // trip and the horn sounding.
    pub arming_delay_secs: f64,
    // How long a triggered zone is allowed to ring before auto-silencing.
    pub max_ring_minutes: f64,
    // Minimum time between honored button presses. Shared across both zones'
    // buttons and the web disarm command.
    pub button_debounce_secs: f64,
    // Allowed voltage deviation on the bike trip-wire channels before the
    // wire counts as cut or shorted.
    pub wire_trip_volts: f32,
    pub slow_blink_divisor: u64,
    pub fast_blink_divisor: u64,
    // Polling period the host should run tick() at.
    pub loop_period_secs: f64,
}

impl AlarmConfig {
    pub fn new_with_reasonable_defaults() -> Self {
        Self {
            arming_delay_secs: 30.0,
            max_ring_minutes: 1.0,
            button_debounce_secs: 1.0,
            wire_trip_volts: 0.2,
            slow_blink_divisor: 6,
            fast_blink_divisor: 1,
            loop_period_secs: 0.25,
        }
    }

    pub fn max_ring_secs(&self) -> f64 {
        self.max_ring_minutes * 60.0
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.arming_delay_secs <= 0.0 {
            return Err(anyhow!(
                "arming_delay_secs must be positive, got {}",
                self.arming_delay_secs
            ));
        }
        if self.max_ring_minutes <= 0.0 {
            return Err(anyhow!(
                "max_ring_minutes must be positive, got {}",
                self.max_ring_minutes
            ));
        }
        if self.button_debounce_secs < 0.0 {
            return Err(anyhow!(
                "button_debounce_secs must not be negative, got {}",
                self.button_debounce_secs
            ));
        }
        if self.wire_trip_volts <= 0.0 {
            return Err(anyhow!(
                "wire_trip_volts must be positive, got {}",
                self.wire_trip_volts
            ));
        }
        if self.slow_blink_divisor == 0 || self.fast_blink_divisor == 0 {
            return Err(anyhow!("blink divisors must be at least 1"));
        }
        if self.loop_period_secs <= 0.0 {
            return Err(anyhow!(
                "loop_period_secs must be positive, got {}",
                self.loop_period_secs
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self::new_with_reasonable_defaults()
    }
}
