//! Trend machine: the bar-to-bar accumulator behind bias, BOS and CHoCH.
//!
//! States are `Bull` and `Bear`. Only a CHoCH changes state; a BOS confirms
//! the current one. The machine is a plain value folded over the bars, so two
//! timeframes never share state.

use crate::domain::{Bias, Direction, StructureEvent, SwingKind, SwingPoint};

/// Running state threaded from bar to bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendMachine {
    pub bias: Bias,
    /// Price of the most recent confirmed swing-high.
    pub last_high: Option<f64>,
    /// Price of the most recent confirmed swing-low.
    pub last_low: Option<f64>,
}

impl TrendMachine {
    pub fn new(initial_bias: Bias) -> Self {
        Self {
            bias: initial_bias,
            last_high: None,
            last_low: None,
        }
    }

    /// Advance over the swings confirmed at one bar.
    ///
    /// `swings` holds zero, one or two points sharing a bar index (high first).
    /// At most one event fires; reference levels update for every swing.
    pub fn step(&mut self, swings: &[SwingPoint]) -> StructureEvent {
        let mut event = StructureEvent::NONE;

        for swing in swings {
            let fired = match swing.kind {
                SwingKind::High => self.on_high(swing.price),
                SwingKind::Low => self.on_low(swing.price),
            };
            if !event.is_some() {
                if let Some(e) = fired {
                    if let Some(Direction::Up) = e.choch {
                        self.bias = Bias::Bull;
                    }
                    if let Some(Direction::Down) = e.choch {
                        self.bias = Bias::Bear;
                    }
                    event = e;
                }
            }
        }

        event
    }

    /// Evaluate a new swing-high against the reference, then record it.
    fn on_high(&mut self, price: f64) -> Option<StructureEvent> {
        let broke = self.last_high.is_some_and(|prev| price > prev);
        self.last_high = Some(price);
        match (broke, self.bias) {
            (true, Bias::Bear) => Some(StructureEvent::choch(Direction::Up)),
            (true, Bias::Bull) => Some(StructureEvent::bos(Direction::Up)),
            _ => None,
        }
    }

    fn on_low(&mut self, price: f64) -> Option<StructureEvent> {
        let broke = self.last_low.is_some_and(|prev| price < prev);
        self.last_low = Some(price);
        match (broke, self.bias) {
            (true, Bias::Bull) => Some(StructureEvent::choch(Direction::Down)),
            (true, Bias::Bear) => Some(StructureEvent::bos(Direction::Down)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn high(index: usize, price: f64) -> SwingPoint {
        SwingPoint {
            index,
            price,
            kind: SwingKind::High,
        }
    }

    fn low(index: usize, price: f64) -> SwingPoint {
        SwingPoint {
            index,
            price,
            kind: SwingKind::Low,
        }
    }

    #[test]
    fn first_swing_of_a_kind_only_sets_reference() {
        let mut m = TrendMachine::new(Bias::Bull);
        assert_eq!(m.step(&[high(5, 100.0)]), StructureEvent::NONE);
        assert_eq!(m.last_high, Some(100.0));
    }

    #[test]
    fn higher_high_in_bull_is_bos() {
        let mut m = TrendMachine::new(Bias::Bull);
        m.step(&[high(5, 100.0)]);
        assert_eq!(m.step(&[high(10, 105.0)]), StructureEvent::bos(Direction::Up));
        assert_eq!(m.bias, Bias::Bull);
    }

    #[test]
    fn lower_low_in_bull_is_choch_and_flips() {
        let mut m = TrendMachine::new(Bias::Bull);
        m.step(&[low(5, 90.0)]);
        assert_eq!(m.step(&[low(10, 85.0)]), StructureEvent::choch(Direction::Down));
        assert_eq!(m.bias, Bias::Bear);
        // Further lower low is now a BOS in the bear trend
        assert_eq!(m.step(&[low(15, 80.0)]), StructureEvent::bos(Direction::Down));
    }

    #[test]
    fn higher_high_in_bear_flips_back() {
        let mut m = TrendMachine::new(Bias::Bear);
        m.step(&[high(3, 100.0)]);
        assert_eq!(m.step(&[high(8, 101.0)]), StructureEvent::choch(Direction::Up));
        assert_eq!(m.bias, Bias::Bull);
    }

    #[test]
    fn lower_high_updates_reference_without_event() {
        let mut m = TrendMachine::new(Bias::Bull);
        m.step(&[high(3, 100.0)]);
        assert_eq!(m.step(&[high(8, 95.0)]), StructureEvent::NONE);
        // Reference follows the latest swing, so 97 now breaks it
        assert_eq!(m.step(&[high(13, 97.0)]), StructureEvent::bos(Direction::Up));
    }

    #[test]
    fn outside_bar_fires_at_most_one_event() {
        let mut m = TrendMachine::new(Bias::Bull);
        m.step(&[high(3, 100.0), low(3, 90.0)]);
        let e = m.step(&[high(9, 110.0), low(9, 80.0)]);
        assert_eq!(e, StructureEvent::bos(Direction::Up));
        assert_eq!(m.bias, Bias::Bull);
        // Both references still updated
        assert_eq!(m.last_high, Some(110.0));
        assert_eq!(m.last_low, Some(80.0));
    }
}
