//! StructLab Core: market structure, confluence scoring, risk planning and
//! trade replay for one instrument on one timeframe.
//!
//! This crate is the pure computational core:
//! - Domain types (bars, validated series, swings, structure events, trades)
//! - Structure detector with an explicit trend accumulator
//! - Geometric candle pattern classifier
//! - Confluence scorer with causal trailing windows and entry gating
//! - Risk engine producing bounded trade plans or typed rejections
//! - Forward replay simulator with a configurable intrabar policy
//!
//! Nothing here performs I/O, reads clocks or draws random numbers.

pub mod confluence;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod indicators;
pub mod patterns;
pub mod pipeline;
pub mod profile;
pub mod risk;
pub mod simulator;
pub mod structure;

pub use error::CoreError;
pub use pipeline::{run_pipeline, PipelineOutput};
pub use profile::Profile;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: every value handed between pipeline stages or
    /// across the runner's worker threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::BarSeries>();
        require_sync::<domain::BarSeries>();
        require_send::<domain::SwingPoint>();
        require_sync::<domain::SwingPoint>();
        require_send::<domain::StructureEvent>();
        require_sync::<domain::StructureEvent>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();

        // Stage outputs
        require_send::<structure::StructureOutput>();
        require_sync::<structure::StructureOutput>();
        require_send::<confluence::ConfluenceSeries>();
        require_sync::<confluence::ConfluenceSeries>();
        require_send::<confluence::HtfRegime>();
        require_sync::<confluence::HtfRegime>();
        require_send::<risk::TradePlan>();
        require_sync::<risk::TradePlan>();
        require_send::<risk::Rejection>();
        require_sync::<risk::Rejection>();
        require_send::<pipeline::PipelineOutput>();
        require_sync::<pipeline::PipelineOutput>();

        // Configuration
        require_send::<profile::Profile>();
        require_sync::<profile::Profile>();
        require_send::<risk::RiskEngine>();
        require_sync::<risk::RiskEngine>();
        require_send::<patterns::GeometricClassifier>();
        require_sync::<patterns::GeometricClassifier>();
    }

    /// The classifier seam takes bars only: a classifier cannot see scores,
    /// plans or account state.
    #[test]
    fn pattern_classifier_sees_bars_only() {
        fn _check_trait_object_builds(
            classifier: &dyn patterns::PatternClassifier,
            bars: &[domain::Bar],
        ) -> Vec<patterns::PatternCode> {
            classifier.classify(bars)
        }
    }
}
