use std::fmt;

use getset::{CopyGetters, Getters};

use crate::mode::{ChannelWidth, RateSet};

/// Link-layer address of a remote peer. Keys all per-peer adaptation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId([u8; 6]);

impl PeerId {
    pub const fn new(addr: [u8; 6]) -> Self {
        Self(addr)
    }

    pub const fn octets(self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for PeerId {
    fn from(addr: [u8; 6]) -> Self {
        Self(addr)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// What the surrounding station registry knows about one peer. Queried by
/// the rate controller on every decision, never cached by it.
#[derive(Getters, CopyGetters, Debug, Clone, PartialEq, Eq)]
pub struct PeerCapabilities {
    /// The general rate set, robust to fast.
    #[getset(get = "pub")]
    rates: RateSet,
    /// The subset decodable by pre-ERP stations, used for protection
    /// exchanges. Hosts without a distinct subset pass the general set.
    #[getset(get = "pub")]
    non_erp_rates: RateSet,
    /// The peer's operating channel width.
    #[getset(get_copy = "pub")]
    channel_width: ChannelWidth,
    /// Whether frames to this peer may be aggregated.
    #[getset(get_copy = "pub")]
    aggregation: bool,
}

impl PeerCapabilities {
    pub fn new(
        rates: RateSet,
        non_erp_rates: RateSet,
        channel_width: ChannelWidth,
        aggregation: bool,
    ) -> Self {
        Self {
            rates,
            non_erp_rates,
            channel_width,
            aggregation,
        }
    }
}

/// Device-level PHY support, checked once when a rate manager is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub ht_supported: bool,
    pub vht_supported: bool,
    pub he_supported: bool,
}
