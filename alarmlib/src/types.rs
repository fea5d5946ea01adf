use serde;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub enum Zone {
    Interior,
    Bike,
}

impl Zone {
    pub fn name(&self) -> &'static str {
        match self {
            Zone::Interior => "interior",
            Zone::Bike => "bike",
        }
    }
}

// Lifecycle of a single alarm zone. Both zones share this set; TrigDelay is
// only ever entered by the interior zone (the bike trip wire sounds
// immediately).
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Debug, Default)]
pub enum ZoneState {
    #[default]
    Off,
    // Arming / exit delay is counting down.
    Starting,
    // A trip occurred while still arming. The arming countdown keeps running.
    StartError,
    // Fully armed, nothing tripped.
    On,
    // Motion seen while armed; grace period before the horn sounds.
    TrigDelay,
    // Actively sounding.
    Triggered,
    // Auto-silenced after the maximum ring duration. Still faulted until
    // manually disarmed.
    Silenced,
}

// What a zone asks of one output channel. The buzzer and horn are shared
// between the zones, so the numeric codes of both zones' requests are summed
// before rendering; the gaps between codes keep single-zone sums unambiguous.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Pattern {
    #[default]
    Off,
    Steady,
    SlowBlink,
    FastBlink,
}

impl Pattern {
    pub fn code(self) -> u32 {
        match self {
            Pattern::Off => 0,
            Pattern::Steady => 1,
            Pattern::SlowBlink => 4,
            Pattern::FastBlink => 16,
        }
    }
}

// Per-zone output requests: the zone's own indicator light plus what it wants
// from the shared buzzer and horn.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Annunciators {
    pub indicator: Pattern,
    pub buzzer: Pattern,
    pub horn: Pattern,
}

// Read-only state for the HTTP/MQTT layer. alarm_time is the most recent
// trigger time of either zone; None until something has tripped since startup.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Debug)]
pub struct AlarmSnapshot {
    pub interior_state: ZoneState,
    pub bike_state: ZoneState,
    pub alarm_time: Option<jiff::Timestamp>,
}

// Body of the web disarm command.
#[derive(Serialize, Deserialize, PartialEq, Debug)]
pub struct DisarmRequest {
    pub zone: Zone,
}

#[cfg(test)]
mod json_format {
    use super::*;

    #[test]
    fn snapshot_serialize() {
        let snap = AlarmSnapshot {
            interior_state: ZoneState::On,
            bike_state: ZoneState::Off,
            alarm_time: None,
        };
        assert_eq!(
            serde_json::to_string(&snap).unwrap(),
            "{\"interior_state\":\"On\",\"bike_state\":\"Off\",\"alarm_time\":null}"
        );
    }

    #[test]
    fn disarm_request_deserialize() {
        let req: DisarmRequest = serde_json::from_str("{\"zone\":\"Bike\"}").unwrap();
        assert_eq!(req, DisarmRequest { zone: Zone::Bike });
    }

    #[test]
    fn pattern_codes() {
        assert!(Pattern::Off.code() < Pattern::Steady.code());
        assert!(Pattern::Steady.code() < Pattern::SlowBlink.code());
        assert!(Pattern::SlowBlink.code() < Pattern::FastBlink.code());
    }
}
