use std::time::{Duration, Instant};

use wbase::{ChannelWidth, PeerCapabilities, PeerId, TxVector};

mod algorithm;
pub use algorithm::{Algorithm, AmrrConfig, AmrrConfigBuilder, FixedRate};
mod manager;
pub use manager::RateManager;

/// Guard interval of every vector emitted by this crate; the legacy PHYs
/// covered here have no short guard interval.
pub const GUARD_INTERVAL: Duration = Duration::from_nanos(800);

/// The [`RateControl`] trait is the operation surface of a rate controller:
/// the link layer reports transmission outcomes through it, and the frame
/// transmission path asks it for the vector of the next attempt.
///
/// Outcome notifications never change the selected rate directly; adaptive
/// implementations defer every decision to a periodic reevaluation that
/// runs lazily from the selection calls. `now` is supplied by the caller,
/// so a controller works under any monotonic clock, simulated or real; a
/// late selection simply performs the overdue reevaluation first.
pub trait RateControl {
    /// The peer acknowledged a data frame.
    fn on_data_ok(&self, peer: PeerId);

    /// A data transmission attempt failed and the frame will be retried.
    fn on_data_failed(&self, peer: PeerId);

    /// A data frame was dropped after exhausting its attempts.
    fn on_final_data_failed(&self, peer: PeerId);

    /// A CTS answered our RTS. Informational.
    fn on_rts_ok(&self, peer: PeerId);

    /// An RTS attempt went unanswered. Informational.
    fn on_rts_failed(&self, peer: PeerId);

    /// An RTS exchange was abandoned. Informational.
    fn on_final_rts_failed(&self, peer: PeerId);

    /// A frame was received from the peer. Informational.
    fn on_rx_ok(&self, peer: PeerId);

    /// The vector for the next data transmission attempt to `peer`, at most
    /// `allowed_width` wide.
    fn data_tx_vector(&self, peer: PeerId, allowed_width: ChannelWidth, now: Instant) -> TxVector;

    /// The vector for an RTS addressed to `peer`; always the most robust
    /// mode available.
    fn rts_tx_vector(&self, peer: PeerId, now: Instant) -> TxVector;
}

/// Collaborator that knows, for every peer, the ordered set of usable
/// transmit modes and the peer's transmission capabilities. Controllers
/// query it on each decision and never cache the answer.
pub trait PeerRates: Send + Sync {
    fn capabilities(&self, peer: PeerId) -> PeerCapabilities;
}

/// Telemetry sink for data-rate changes.
pub trait ObserveRate: Send + Sync {
    /// The selected data rate (bits per second) differs from the last one
    /// reported.
    fn current_rate_changed(&self, rate: u64);
}
