use std::fmt;

use crate::error::Error;

/// Modulation classes of the legacy 802.11 PHYs. The high-throughput
/// families are listed only so a capability check can name what it rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModulationClass {
    Dsss,
    HrDsss,
    ErpOfdm,
    Ofdm,
    Ht,
    Vht,
    He,
}

impl ModulationClass {
    /// Whether data rates of this class scale with channel width.
    pub const fn is_width_scaled(self) -> bool {
        matches!(self, ModulationClass::ErpOfdm | ModulationClass::Ofdm)
    }
}

impl fmt::Display for ModulationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModulationClass::Dsss => "DSSS",
            ModulationClass::HrDsss => "HR-DSSS",
            ModulationClass::ErpOfdm => "ERP-OFDM",
            ModulationClass::Ofdm => "OFDM",
            ModulationClass::Ht => "HT",
            ModulationClass::Vht => "VHT",
            ModulationClass::He => "HE",
        };
        f.write_str(name)
    }
}

/// Channel width in MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelWidth(u16);

impl ChannelWidth {
    pub const MHZ_5: Self = Self(5);
    pub const MHZ_10: Self = Self(10);
    pub const MHZ_20: Self = Self(20);
    /// The historical 22 MHz DSSS channelization.
    pub const MHZ_22: Self = Self(22);
    pub const MHZ_40: Self = Self(40);

    pub const fn new(mhz: u16) -> Self {
        Self(mhz)
    }

    pub const fn mhz(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ChannelWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}MHz", self.0)
    }
}

/// A transmit mode: one modulation/coding point with its nominal bitrate on
/// a 20 MHz channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxMode {
    name: &'static str,
    modulation: ModulationClass,
    bitrate: u64,
}

impl TxMode {
    pub const fn new(name: &'static str, modulation: ModulationClass, bitrate: u64) -> Self {
        Self {
            name,
            modulation,
            bitrate,
        }
    }

    pub const fn name(self) -> &'static str {
        self.name
    }

    pub const fn modulation(self) -> ModulationClass {
        self.modulation
    }

    /// Data rate in bits per second when transmitting at `width`.
    ///
    /// DSSS-family rates do not depend on channel width; OFDM-family rates
    /// scale linearly relative to 20 MHz.
    pub fn data_rate(self, width: ChannelWidth) -> u64 {
        if self.modulation.is_width_scaled() {
            self.bitrate * u64::from(width.mhz()) / 20
        } else {
            self.bitrate
        }
    }
}

impl fmt::Display for TxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The canonical legacy mode table.
pub mod modes {
    use super::{ModulationClass, TxMode};

    pub const DSSS_1MBPS: TxMode = TxMode::new("DsssRate1Mbps", ModulationClass::Dsss, 1_000_000);
    pub const DSSS_2MBPS: TxMode = TxMode::new("DsssRate2Mbps", ModulationClass::Dsss, 2_000_000);
    pub const HR_DSSS_5_5MBPS: TxMode =
        TxMode::new("DsssRate5_5Mbps", ModulationClass::HrDsss, 5_500_000);
    pub const HR_DSSS_11MBPS: TxMode =
        TxMode::new("DsssRate11Mbps", ModulationClass::HrDsss, 11_000_000);
    pub const ERP_OFDM_6MBPS: TxMode =
        TxMode::new("ErpOfdmRate6Mbps", ModulationClass::ErpOfdm, 6_000_000);
    pub const ERP_OFDM_9MBPS: TxMode =
        TxMode::new("ErpOfdmRate9Mbps", ModulationClass::ErpOfdm, 9_000_000);
    pub const ERP_OFDM_12MBPS: TxMode =
        TxMode::new("ErpOfdmRate12Mbps", ModulationClass::ErpOfdm, 12_000_000);
    pub const ERP_OFDM_18MBPS: TxMode =
        TxMode::new("ErpOfdmRate18Mbps", ModulationClass::ErpOfdm, 18_000_000);
    pub const ERP_OFDM_24MBPS: TxMode =
        TxMode::new("ErpOfdmRate24Mbps", ModulationClass::ErpOfdm, 24_000_000);
    pub const ERP_OFDM_36MBPS: TxMode =
        TxMode::new("ErpOfdmRate36Mbps", ModulationClass::ErpOfdm, 36_000_000);
    pub const ERP_OFDM_48MBPS: TxMode =
        TxMode::new("ErpOfdmRate48Mbps", ModulationClass::ErpOfdm, 48_000_000);
    pub const ERP_OFDM_54MBPS: TxMode =
        TxMode::new("ErpOfdmRate54Mbps", ModulationClass::ErpOfdm, 54_000_000);
}

/// The ordered set of transmit modes usable towards one peer, most robust
/// first, ascending towards throughput. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSet {
    modes: Vec<TxMode>,
}

impl RateSet {
    pub fn new(modes: Vec<TxMode>) -> Result<Self, Error> {
        if modes.is_empty() {
            return Err(Error::EmptyRateSet);
        }
        Ok(Self { modes })
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// The mode at `index`. An out-of-range index is a caller bug; it is
    /// clamped to the last entry in release builds.
    pub fn mode(&self, index: usize) -> TxMode {
        debug_assert!(index < self.modes.len());
        self.modes[index.min(self.modes.len() - 1)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TxMode> {
        self.modes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ofdm_rate_scales_with_width() {
        let mode = modes::ERP_OFDM_6MBPS;
        assert_eq!(mode.data_rate(ChannelWidth::MHZ_20), 6_000_000);
        assert_eq!(mode.data_rate(ChannelWidth::MHZ_10), 3_000_000);
        assert_eq!(mode.data_rate(ChannelWidth::MHZ_5), 1_500_000);
    }

    #[test]
    fn dsss_rate_ignores_width() {
        let mode = modes::HR_DSSS_11MBPS;
        assert_eq!(mode.data_rate(ChannelWidth::MHZ_22), 11_000_000);
        assert_eq!(mode.data_rate(ChannelWidth::MHZ_20), 11_000_000);
        assert_eq!(mode.data_rate(ChannelWidth::MHZ_5), 11_000_000);
    }

    #[test]
    fn rate_set_rejects_empty() {
        assert_eq!(RateSet::new(vec![]), Err(Error::EmptyRateSet));
    }

    #[test]
    fn rate_set_is_ordered() {
        let set = RateSet::new(vec![modes::DSSS_1MBPS, modes::DSSS_2MBPS]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.mode(0), modes::DSSS_1MBPS);
        assert_eq!(set.mode(1), modes::DSSS_2MBPS);
    }
}
