use std::time::Duration;

use getset::CopyGetters;

use crate::mode::{ChannelWidth, ModulationClass, TxMode};

/// PHY preamble variant of one transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preamble {
    Long,
    Short,
}

impl Preamble {
    /// The preamble used when transmitting `modulation`. Only the DSSS
    /// family can shorten its preamble; everything else sends the long one.
    pub fn for_transmission(modulation: ModulationClass, short_preamble_enabled: bool) -> Self {
        match modulation {
            ModulationClass::Dsss | ModulationClass::HrDsss if short_preamble_enabled => {
                Preamble::Short
            }
            _ => Preamble::Long,
        }
    }
}

/// Everything the transmit path needs to send one frame.
#[derive(CopyGetters, Debug, Clone, Copy, PartialEq, Eq)]
#[getset(get_copy = "pub")]
pub struct TxVector {
    mode: TxMode,
    tx_power_level: u8,
    preamble: Preamble,
    guard_interval: Duration,
    nss: u8,
    channel_width: ChannelWidth,
    aggregation: bool,
}

impl TxVector {
    pub fn new(
        mode: TxMode,
        tx_power_level: u8,
        preamble: Preamble,
        guard_interval: Duration,
        nss: u8,
        channel_width: ChannelWidth,
        aggregation: bool,
    ) -> Self {
        Self {
            mode,
            tx_power_level,
            preamble,
            guard_interval,
            nss,
            channel_width,
            aggregation,
        }
    }
}
