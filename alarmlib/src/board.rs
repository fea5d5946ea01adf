use std::collections::HashMap;

// Channel assignments on the TINKERplate HAT. Digital inputs/outputs and ADC
// channels share a numbering space per kind, so plain u8 channel numbers are
// enough.
pub const DIN_INTERIOR_BUTTON: u8 = 1;
pub const DOUT_INTERIOR_LIGHT: u8 = 2;
pub const DIN_BIKE_BUTTON: u8 = 3;
pub const DOUT_BIKE_LIGHT: u8 = 4;
pub const DIN_PIR: u8 = 5;
pub const DOUT_BUZZER: u8 = 6;
pub const DOUT_HORN: u8 = 7;
pub const ADC_WIRE_REF: u8 = 1;
pub const ADC_WIRE_A: u8 = 3;
pub const ADC_WIRE_B: u8 = 4;

// Interface to the alarm I/O board. One implementation of this is a fake that
// allows the controller to be tested on your pc and one implementation runs
// only on the RV's pi against the real HAT.
//
// Reads return None when the underlying I/O call fails; the controller treats
// that as "no information this tick" rather than a trip. Writes are
// fire-and-forget.
pub trait Board {
    fn read_digital(&mut self, channel: u8) -> Option<bool>;
    // Calibrated voltage reading.
    fn read_analog(&mut self, channel: u8) -> Option<f32>;
    fn write_digital(&mut self, channel: u8, level: bool);
    fn toggle_digital(&mut self, channel: u8);
}

// FakeBoard implements the Board interface and is used for testing and the
// demoserver. Inputs are plain maps the test pokes directly; quiescent analog
// defaults match the trip-wire voltage divider (3.3V reference, 0.6666 and
// 0.3333 taps).
pub struct FakeBoard {
    pub digital_in: HashMap<u8, bool>,
    pub analog_in: HashMap<u8, f32>,
    pub outputs: HashMap<u8, bool>,
    // When set, all reads return None to simulate a flaky I/O layer.
    pub fail_reads: bool,
}

impl FakeBoard {
    pub fn new() -> Self {
        let mut analog_in = HashMap::new();
        analog_in.insert(ADC_WIRE_REF, 3.3);
        analog_in.insert(ADC_WIRE_A, 3.3 * 0.6666);
        analog_in.insert(ADC_WIRE_B, 3.3 * 0.3333);
        Self {
            digital_in: HashMap::new(),
            analog_in,
            outputs: HashMap::new(),
            fail_reads: false,
        }
    }

    pub fn output(&self, channel: u8) -> bool {
        *self.outputs.get(&channel).unwrap_or(&false)
    }
}

impl Default for FakeBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for FakeBoard {
    fn read_digital(&mut self, channel: u8) -> Option<bool> {
        if self.fail_reads {
            return None;
        }
        Some(*self.digital_in.get(&channel).unwrap_or(&false))
    }

    fn read_analog(&mut self, channel: u8) -> Option<f32> {
        if self.fail_reads {
            return None;
        }
        self.analog_in.get(&channel).copied()
    }

    fn write_digital(&mut self, channel: u8, level: bool) {
        self.outputs.insert(channel, level);
    }

    fn toggle_digital(&mut self, channel: u8) {
        let level = self.output(channel);
        self.outputs.insert(channel, !level);
    }
}

#[cfg(test)]
mod fake_board {
    use super::*;

    #[test]
    fn digital_roundtrip() {
        let b: &mut dyn Board = &mut FakeBoard::new();
        assert_eq!(b.read_digital(DIN_PIR), Some(false));
        b.write_digital(DOUT_HORN, true);
        b.toggle_digital(DOUT_HORN);
        b.toggle_digital(DOUT_BUZZER);
    }

    #[test]
    fn toggle_flips_output() {
        let mut b = FakeBoard::new();
        assert!(!b.output(DOUT_HORN));
        b.toggle_digital(DOUT_HORN);
        assert!(b.output(DOUT_HORN));
        b.toggle_digital(DOUT_HORN);
        assert!(!b.output(DOUT_HORN));
    }

    #[test]
    fn quiescent_wire_voltages() {
        let mut b = FakeBoard::new();
        let r = b.read_analog(ADC_WIRE_REF).unwrap();
        let a = b.read_analog(ADC_WIRE_A).unwrap();
        assert!((a - r * 0.6666).abs() < 1e-6);
    }

    #[test]
    fn fail_reads() {
        let mut b = FakeBoard::new();
        b.fail_reads = true;
        assert_eq!(b.read_digital(DIN_PIR), None);
        assert_eq!(b.read_analog(ADC_WIRE_REF), None);
    }
}
