use crate::types::{Annunciators, Pattern, Zone, ZoneState};
use jiff::Timestamp;

// One armable alarm circuit. Holds the lifecycle state and the two timestamps
// the timed transitions are computed from. The controller owns two of these
// and is their only mutator.
pub struct ZoneAlarm {
    zone: Zone,
    state: ZoneState,
    state_entry_time: Timestamp,
    // Set when the zone trips while armed (TrigDelay entry for interior,
    // Triggered entry for bike). Not meaningful before the first trip.
    trigger_time: Option<Timestamp>,
}

fn elapsed_secs(now: Timestamp, since: Timestamp) -> f64 {
    now.duration_since(since).as_secs_f64()
}

impl ZoneAlarm {
    pub fn new(zone: Zone, now: Timestamp) -> Self {
        Self {
            zone,
            state: ZoneState::Off,
            state_entry_time: now,
            trigger_time: None,
        }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn state(&self) -> ZoneState {
        self.state
    }

    pub fn state_entry_time(&self) -> Timestamp {
        self.state_entry_time
    }

    pub fn trigger_time(&self) -> Option<Timestamp> {
        self.trigger_time
    }

    fn set_state(&mut self, state: ZoneState, now: Timestamp) {
        log::info!("{}: {:?} -> {:?}", self.zone.name(), self.state, state);
        self.state = state;
        // A fault during arming does not restart the arming countdown, so the
        // Starting entry time is kept.
        if state != ZoneState::StartError {
            self.state_entry_time = now;
        }
    }

    // An honored button press toggles the zone: arm from Off, otherwise a
    // master reset back to Off. Debounce is the controller's job.
    pub fn press_button(&mut self, now: Timestamp) {
        match self.state {
            ZoneState::Off => self.set_state(ZoneState::Starting, now),
            _ => self.set_state(ZoneState::Off, now),
        }
    }

    // The web disarm command: forces the zone to Off, never arms.
    pub fn force_off(&mut self, now: Timestamp) {
        if self.state != ZoneState::Off {
            self.set_state(ZoneState::Off, now);
        }
    }

    // Called when this tick's sensor read came back as a trip condition. Only
    // Starting and On react; every other state ignores the sensor.
    pub fn sense_trip(&mut self, now: Timestamp) {
        match self.state {
            ZoneState::Starting => self.set_state(ZoneState::StartError, now),
            ZoneState::On => match self.zone {
                Zone::Interior => {
                    self.trigger_time = Some(now);
                    self.set_state(ZoneState::TrigDelay, now);
                }
                // The bike trip wire has no grace period.
                Zone::Bike => {
                    self.trigger_time = Some(now);
                    self.set_state(ZoneState::Triggered, now);
                }
            },
            _ => {}
        }
    }

    // Clock-driven transitions, evaluated once per tick. All comparisons are
    // strict, so expiry lands within one polling period after the threshold.
    pub fn apply_timers(&mut self, now: Timestamp, arming_delay_secs: f64, max_ring_secs: f64) {
        match self.state {
            // StartError keeps the Starting entry time, so both states finish
            // the same countdown.
            ZoneState::Starting | ZoneState::StartError => {
                if elapsed_secs(now, self.state_entry_time) > arming_delay_secs {
                    self.set_state(ZoneState::On, now);
                }
            }
            ZoneState::TrigDelay => {
                if let Some(t) = self.trigger_time {
                    if elapsed_secs(now, t) > arming_delay_secs {
                        self.set_state(ZoneState::Triggered, now);
                    }
                }
            }
            ZoneState::Triggered => {
                if let Some(t) = self.trigger_time {
                    if elapsed_secs(now, t) > max_ring_secs {
                        self.set_state(ZoneState::Silenced, now);
                    }
                }
            }
            _ => {}
        }
    }

    // What this zone wants from its indicator light and from the shared
    // buzzer and horn. The controller combines the two zones' buzzer/horn
    // requests before driving the hardware.
    pub fn annunciators(&self) -> Annunciators {
        match self.state {
            ZoneState::Off => Annunciators::default(),
            ZoneState::Starting => Annunciators {
                indicator: Pattern::SlowBlink,
                buzzer: Pattern::SlowBlink,
                horn: Pattern::Off,
            },
            ZoneState::StartError => Annunciators {
                indicator: Pattern::FastBlink,
                buzzer: Pattern::SlowBlink,
                horn: Pattern::Off,
            },
            ZoneState::On => Annunciators {
                indicator: Pattern::Steady,
                buzzer: Pattern::Off,
                horn: Pattern::Off,
            },
            ZoneState::TrigDelay => Annunciators {
                indicator: Pattern::FastBlink,
                buzzer: Pattern::FastBlink,
                horn: Pattern::Off,
            },
            ZoneState::Triggered => Annunciators {
                indicator: Pattern::FastBlink,
                buzzer: Pattern::FastBlink,
                horn: Pattern::FastBlink,
            },
            ZoneState::Silenced => Annunciators {
                indicator: Pattern::FastBlink,
                buzzer: Pattern::Off,
                horn: Pattern::Off,
            },
        }
    }
}

#[cfg(test)]
mod zone_machine {
    use super::*;

    const ARMING: f64 = 30.0;
    const RING: f64 = 60.0;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_second(secs).unwrap()
    }

    #[test]
    fn arm_then_complete_countdown() {
        let mut z = ZoneAlarm::new(Zone::Interior, ts(0));
        z.press_button(ts(0));
        assert_eq!(z.state(), ZoneState::Starting);
        z.apply_timers(ts(29), ARMING, RING);
        assert_eq!(z.state(), ZoneState::Starting);
        z.apply_timers(ts(31), ARMING, RING);
        assert_eq!(z.state(), ZoneState::On);
    }

    #[test]
    fn button_disarms_from_every_state() {
        for state_setup in [
            ZoneState::Starting,
            ZoneState::StartError,
            ZoneState::On,
            ZoneState::TrigDelay,
            ZoneState::Triggered,
            ZoneState::Silenced,
        ] {
            let mut z = ZoneAlarm::new(Zone::Interior, ts(0));
            z.press_button(ts(0)); // Starting
            if state_setup != ZoneState::Starting {
                match state_setup {
                    ZoneState::StartError => z.sense_trip(ts(5)),
                    _ => {
                        z.apply_timers(ts(31), ARMING, RING); // On
                        if state_setup != ZoneState::On {
                            z.sense_trip(ts(40)); // TrigDelay
                            if state_setup != ZoneState::TrigDelay {
                                z.apply_timers(ts(71), ARMING, RING); // Triggered
                                if state_setup == ZoneState::Silenced {
                                    z.apply_timers(ts(101), ARMING, RING);
                                }
                            }
                        }
                    }
                }
            }
            assert_eq!(z.state(), state_setup);
            z.press_button(ts(200));
            assert_eq!(z.state(), ZoneState::Off, "disarm from {state_setup:?}");
        }
    }

    #[test]
    fn start_error_does_not_restart_countdown() {
        let mut z = ZoneAlarm::new(Zone::Interior, ts(0));
        z.press_button(ts(0));
        z.sense_trip(ts(5));
        assert_eq!(z.state(), ZoneState::StartError);
        // 29s after the Starting entry, 24s after the fault: still counting.
        z.apply_timers(ts(29), ARMING, RING);
        assert_eq!(z.state(), ZoneState::StartError);
        // 31s after the Starting entry: armed, even though the fault was at 5s.
        z.apply_timers(ts(31), ARMING, RING);
        assert_eq!(z.state(), ZoneState::On);
    }

    #[test]
    fn interior_trip_has_grace_period() {
        let mut z = ZoneAlarm::new(Zone::Interior, ts(0));
        z.press_button(ts(0));
        z.apply_timers(ts(31), ARMING, RING);
        z.sense_trip(ts(100));
        assert_eq!(z.state(), ZoneState::TrigDelay);
        assert_eq!(z.trigger_time(), Some(ts(100)));
        z.apply_timers(ts(129), ARMING, RING);
        assert_eq!(z.state(), ZoneState::TrigDelay);
        z.apply_timers(ts(131), ARMING, RING);
        assert_eq!(z.state(), ZoneState::Triggered);
    }

    #[test]
    fn bike_trip_sounds_immediately() {
        let mut z = ZoneAlarm::new(Zone::Bike, ts(0));
        z.press_button(ts(0));
        z.apply_timers(ts(31), ARMING, RING);
        z.sense_trip(ts(40));
        assert_eq!(z.state(), ZoneState::Triggered);
        assert_eq!(z.trigger_time(), Some(ts(40)));
    }

    #[test]
    fn auto_silence_measured_from_trigger_time() {
        let mut z = ZoneAlarm::new(Zone::Bike, ts(0));
        z.press_button(ts(0));
        z.apply_timers(ts(31), ARMING, RING);
        z.sense_trip(ts(40));
        z.apply_timers(ts(99), ARMING, RING);
        assert_eq!(z.state(), ZoneState::Triggered);
        z.apply_timers(ts(101), ARMING, RING);
        assert_eq!(z.state(), ZoneState::Silenced);
        // Silenced is stable until disarmed.
        z.apply_timers(ts(5000), ARMING, RING);
        assert_eq!(z.state(), ZoneState::Silenced);
    }

    #[test]
    fn armed_zone_is_stable_without_trips() {
        let mut z = ZoneAlarm::new(Zone::Interior, ts(0));
        z.press_button(ts(0));
        z.apply_timers(ts(31), ARMING, RING);
        assert_eq!(z.state(), ZoneState::On);
        let entry = z.state_entry_time();
        for t in [32, 100, 10_000, 1_000_000] {
            z.apply_timers(ts(t), ARMING, RING);
        }
        assert_eq!(z.state(), ZoneState::On);
        assert_eq!(z.state_entry_time(), entry);
    }

    #[test]
    fn trip_ignored_when_off_or_silenced() {
        let mut z = ZoneAlarm::new(Zone::Interior, ts(0));
        z.sense_trip(ts(1));
        assert_eq!(z.state(), ZoneState::Off);

        z.press_button(ts(2));
        z.apply_timers(ts(33), ARMING, RING);
        z.sense_trip(ts(40));
        z.apply_timers(ts(71), ARMING, RING);
        z.apply_timers(ts(101), ARMING, RING);
        assert_eq!(z.state(), ZoneState::Silenced);
        z.sense_trip(ts(102));
        assert_eq!(z.state(), ZoneState::Silenced);
    }

    #[test]
    fn force_off_never_arms() {
        let mut z = ZoneAlarm::new(Zone::Bike, ts(0));
        z.force_off(ts(1));
        assert_eq!(z.state(), ZoneState::Off);
        z.press_button(ts(2));
        z.force_off(ts(3));
        assert_eq!(z.state(), ZoneState::Off);
    }

    #[test]
    fn triggered_annunciators_sound_everything() {
        let mut z = ZoneAlarm::new(Zone::Bike, ts(0));
        z.press_button(ts(0));
        z.apply_timers(ts(31), ARMING, RING);
        z.sense_trip(ts(40));
        let ann = z.annunciators();
        assert_eq!(ann.indicator, Pattern::FastBlink);
        assert_eq!(ann.buzzer, Pattern::FastBlink);
        assert_eq!(ann.horn, Pattern::FastBlink);
    }

    #[test]
    fn off_annunciators_are_dark() {
        let z = ZoneAlarm::new(Zone::Interior, ts(0));
        assert_eq!(z.annunciators(), Annunciators::default());
    }
}
