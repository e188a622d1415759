//! Market-structure value types: swing points, bias, BOS/CHoCH events.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed local extremum.
///
/// Created once during the forward scan and never mutated. A swing at
/// `index` is only observable `window` bars later, see [`SwingPoint::confirmed_at`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub price: f64,
    pub kind: SwingKind,
}

impl SwingPoint {
    /// Bar index at which this swing becomes known to a causal observer.
    pub fn confirmed_at(&self, swing_window: usize) -> usize {
        self.index + swing_window
    }
}

/// Directional trend state attached to every bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bias {
    Bull,
    Bear,
}

impl Bias {
    pub fn is_bull(self) -> bool {
        self == Bias::Bull
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

/// Per-bar structure flags. At most one of `bos` / `choch` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEvent {
    pub bos: Option<Direction>,
    pub choch: Option<Direction>,
}

impl StructureEvent {
    pub const NONE: StructureEvent = StructureEvent {
        bos: None,
        choch: None,
    };

    pub fn bos(direction: Direction) -> Self {
        Self {
            bos: Some(direction),
            choch: None,
        }
    }

    pub fn choch(direction: Direction) -> Self {
        Self {
            bos: None,
            choch: Some(direction),
        }
    }

    pub fn is_some(&self) -> bool {
        self.bos.is_some() || self.choch.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_exactly_one_flag() {
        let e = StructureEvent::bos(Direction::Up);
        assert!(e.is_some());
        assert!(e.choch.is_none());
        let e = StructureEvent::choch(Direction::Down);
        assert!(e.bos.is_none());
        assert!(!StructureEvent::NONE.is_some());
    }

    #[test]
    fn confirmation_lag() {
        let sp = SwingPoint {
            index: 10,
            price: 2000.0,
            kind: SwingKind::High,
        };
        assert_eq!(sp.confirmed_at(5), 15);
    }
}
