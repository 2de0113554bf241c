use std::time::Instant;

mod amrr;
mod fixed;

pub use amrr::{AmrrConfig, AmrrConfigBuilder};
pub use fixed::FixedRate;

/// The rate-control algorithms that can drive a
/// [`RateManager`](crate::RateManager).
#[derive(Debug, Clone)]
pub enum Algorithm {
    /// Adaptive multi-rate retry: periodic reevaluation with asymmetric
    /// success/failure thresholds and a self-tuning promotion threshold.
    Amrr(AmrrConfig),
    /// One configured rate index, no adaptation.
    Fixed(FixedRate),
}

impl Algorithm {
    /// Fresh adaptation state for one peer.
    pub(crate) fn new_station(&self) -> Box<dyn Control> {
        match self {
            Algorithm::Amrr(config) => Box::new(amrr::Amrr::new(config.clone())),
            Algorithm::Fixed(fixed) => Box::new(*fixed),
        }
    }
}

/// Per-station hooks every algorithm implements, one notification per
/// outcome. The informational hooks default to no-ops so algorithms only
/// spell out what they react to.
pub(crate) trait Control: Send {
    fn on_data_ok(&mut self);

    fn on_data_failed(&mut self);

    fn on_final_data_failed(&mut self);

    fn on_rts_ok(&mut self) {}

    fn on_rts_failed(&mut self) {}

    fn on_final_rts_failed(&mut self) {}

    fn on_rx_ok(&mut self) {}

    /// Index of the mode for the next data attempt, given the size of the
    /// peer's rate set. Runs the periodic reevaluation if it is due.
    fn data_index(&mut self, n_supported: usize, now: Instant) -> usize;

    /// Index of the mode for control frames. Also runs the periodic
    /// reevaluation if it is due.
    fn rts_index(&mut self, n_supported: usize, now: Instant) -> usize;

    /// Back to the initial adaptation state.
    fn reset(&mut self);
}
