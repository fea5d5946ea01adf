use crate::board::{
    ADC_WIRE_A, ADC_WIRE_B, ADC_WIRE_REF, Board, DIN_BIKE_BUTTON, DIN_INTERIOR_BUTTON, DIN_PIR,
    DOUT_BIKE_LIGHT, DOUT_BUZZER, DOUT_HORN, DOUT_INTERIOR_LIGHT,
};
use crate::config::AlarmConfig;
use crate::types::{AlarmSnapshot, Pattern, Zone, ZoneState};
use crate::zone::ZoneAlarm;
use jiff::Timestamp;
use std::sync::{Arc, Mutex};

// Trip-wire voltage divider calibration: expected tap voltages as fractions
// of the reference channel.
const WIRE_RATIO_A: f32 = 0.6666;
const WIRE_RATIO_B: f32 = 0.3333;

// The AlarmController owns the two zone state machines and is their only
// mutator. Each call to tick() runs one evaluation cycle in a fixed order:
// buttons, interior sensor, bike trip wire, timed transitions, outputs. The
// ordering matters - a disarm press and a trip read in the same tick always
// resolves in favor of the disarm.
//
// tick() must be driven from a single task; snapshot() and force_off() may be
// called from HTTP handlers, so hosts wrap the controller in Arc<Mutex<_>>.
pub struct AlarmController {
    board: Arc<Mutex<dyn Board + Send>>,
    config: AlarmConfig,
    interior: ZoneAlarm,
    bike: ZoneAlarm,
    // One debounce timestamp shared across both zones' buttons and the web
    // disarm command. A press on one zone inhibits the other for the debounce
    // window. Inherited from the hardware design, which has a single timer.
    last_button_time: Option<Timestamp>,
    interior_button_level: bool,
    bike_button_level: bool,
    // Only used to derive blink phase, so blink rate scales with the polling
    // period.
    loop_count: u64,
}

impl AlarmController {
    pub fn new(
        board: Arc<Mutex<dyn Board + Send>>,
        config: AlarmConfig,
        now: Timestamp,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            board,
            config,
            interior: ZoneAlarm::new(Zone::Interior, now),
            bike: ZoneAlarm::new(Zone::Bike, now),
            last_button_time: None,
            interior_button_level: false,
            bike_button_level: false,
            loop_count: 0,
        })
    }

    pub fn board(&self) -> Arc<Mutex<dyn Board + Send>> {
        self.board.clone()
    }

    pub fn config(&self) -> &AlarmConfig {
        &self.config
    }

    // One full evaluation cycle. Never panics on I/O faults: a failed read
    // degrades to "no information this tick" and is logged.
    pub fn tick(&mut self, now: Timestamp) {
        self.check_buttons(now);
        self.check_interior_sensor(now);
        self.check_bike_wire(now);

        let arming = self.config.arming_delay_secs;
        let ring = self.config.max_ring_secs();
        self.interior.apply_timers(now, arming, ring);
        self.bike.apply_timers(now, arming, ring);

        self.drive_outputs();
        self.loop_count += 1;
    }

    // Read-only state for the HTTP/MQTT layer.
    pub fn snapshot(&self) -> AlarmSnapshot {
        let alarm_time = match (self.interior.trigger_time(), self.bike.trigger_time()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        AlarmSnapshot {
            interior_state: self.interior.state(),
            bike_state: self.bike.state(),
            alarm_time,
        }
    }

    // The web disarm command. Subject to the same shared debounce as the
    // physical buttons; returns false when the command lands inside the
    // debounce window and is dropped.
    pub fn force_off(&mut self, zone: Zone, now: Timestamp) -> bool {
        if !self.debounce_elapsed(now) {
            log::info!("{}: disarm command dropped by debounce", zone.name());
            return false;
        }
        self.last_button_time = Some(now);
        match zone {
            Zone::Interior => self.interior.force_off(now),
            Zone::Bike => self.bike.force_off(now),
        }
        true
    }

    fn debounce_elapsed(&self, now: Timestamp) -> bool {
        match self.last_button_time {
            None => true,
            Some(t) => now.duration_since(t).as_secs_f64() > self.config.button_debounce_secs,
        }
    }

    fn check_buttons(&mut self, now: Timestamp) {
        let (interior_level, bike_level) = {
            let mut board = self.board.lock().unwrap();
            (
                board.read_digital(DIN_INTERIOR_BUTTON),
                board.read_digital(DIN_BIKE_BUTTON),
            )
        };

        // Interior is processed first so a same-tick press on both buttons
        // resolves deterministically. A failed read counts as "not pressed"
        // and leaves the stored level alone, so the next good read still sees
        // the edge.
        match interior_level {
            Some(level) => {
                if level && !self.interior_button_level && self.debounce_elapsed(now) {
                    self.interior.press_button(now);
                    self.last_button_time = Some(now);
                }
                self.interior_button_level = level;
            }
            None => log::warn!("interior button read failed"),
        }
        match bike_level {
            Some(level) => {
                if level && !self.bike_button_level && self.debounce_elapsed(now) {
                    self.bike.press_button(now);
                    self.last_button_time = Some(now);
                }
                self.bike_button_level = level;
            }
            None => log::warn!("bike button read failed"),
        }
    }

    fn check_interior_sensor(&mut self, now: Timestamp) {
        // The PIR only matters while arming or armed.
        if !matches!(self.interior.state(), ZoneState::Starting | ZoneState::On) {
            return;
        }
        match self.board.lock().unwrap().read_digital(DIN_PIR) {
            Some(true) => self.interior.sense_trip(now),
            Some(false) => {}
            None => log::warn!("PIR read failed; skipping interior evaluation this tick"),
        }
    }

    fn check_bike_wire(&mut self, now: Timestamp) {
        if !matches!(self.bike.state(), ZoneState::Starting | ZoneState::On) {
            return;
        }
        let reads = {
            let mut board = self.board.lock().unwrap();
            (
                board.read_analog(ADC_WIRE_REF),
                board.read_analog(ADC_WIRE_A),
                board.read_analog(ADC_WIRE_B),
            )
        };
        let (Some(reference), Some(tap_a), Some(tap_b)) = reads else {
            log::warn!("trip-wire read failed; skipping bike evaluation this tick");
            return;
        };
        let delta_a = (tap_a - reference * WIRE_RATIO_A).abs();
        let delta_b = (tap_b - reference * WIRE_RATIO_B).abs();
        if delta_a > self.config.wire_trip_volts || delta_b > self.config.wire_trip_volts {
            self.bike.sense_trip(now);
        }
    }

    // Level for a single zone's request at the current blink phase.
    fn pattern_level(&self, pattern: Pattern) -> bool {
        match pattern {
            Pattern::Off => false,
            Pattern::Steady => true,
            Pattern::SlowBlink => (self.loop_count / self.config.slow_blink_divisor) % 2 == 0,
            Pattern::FastBlink => (self.loop_count / self.config.fast_blink_divisor) % 2 == 0,
        }
    }

    // The buzzer and horn are single physical outputs shared by both zones,
    // so the zones' pattern codes are summed. A sum matching a single-pattern
    // code renders that pattern; any other nonzero sum (both zones audible at
    // once) toggles the output every tick instead of following a duty cycle.
    fn drive_shared(&self, board: &mut dyn Board, channel: u8, a: Pattern, b: Pattern) {
        let sum = a.code() + b.code();
        let level = if sum == Pattern::Off.code() {
            false
        } else if sum == Pattern::Steady.code() {
            true
        } else if sum == Pattern::SlowBlink.code() {
            self.pattern_level(Pattern::SlowBlink)
        } else if sum == Pattern::FastBlink.code() {
            self.pattern_level(Pattern::FastBlink)
        } else {
            board.toggle_digital(channel);
            return;
        };
        board.write_digital(channel, level);
    }

    fn drive_outputs(&self) {
        let interior = self.interior.annunciators();
        let bike = self.bike.annunciators();
        let mut board = self.board.lock().unwrap();
        board.write_digital(DOUT_INTERIOR_LIGHT, self.pattern_level(interior.indicator));
        board.write_digital(DOUT_BIKE_LIGHT, self.pattern_level(bike.indicator));
        self.drive_shared(&mut *board, DOUT_BUZZER, interior.buzzer, bike.buzzer);
        self.drive_shared(&mut *board, DOUT_HORN, interior.horn, bike.horn);
    }
}
