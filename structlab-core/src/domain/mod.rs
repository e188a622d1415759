//! Domain types for StructLab

pub mod bar;
pub mod structure;
pub mod timeframe;
pub mod trade;

pub use bar::{Bar, BarSeries};
pub use structure::{Bias, Direction, StructureEvent, SwingKind, SwingPoint};
pub use timeframe::Timeframe;
pub use trade::{ExitReason, Outcome, Side, TradeRecord};
