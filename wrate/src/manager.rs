use std::{
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Instant,
};

use dashmap::DashMap;
use tracing::debug;
use wbase::{
    ChannelWidth, DeviceCapabilities, Error, ModulationClass, PeerCapabilities, PeerId, Preamble,
    TxMode, TxVector,
};

use crate::{
    GUARD_INTERVAL, ObserveRate, PeerRates, RateControl,
    algorithm::{Algorithm, Control},
};

/// Every legacy transmission runs on a single spatial stream.
const SPATIAL_STREAMS: u8 = 1;

/// Widths above 20 MHz are not meaningful for the legacy modes selected
/// here; the one exception is the historical 22 MHz DSSS channelization.
fn normalize_width(width: ChannelWidth) -> ChannelWidth {
    if width > ChannelWidth::MHZ_20 && width != ChannelWidth::MHZ_22 {
        ChannelWidth::MHZ_20
    } else {
        width
    }
}

/// Per-peer rate control over a pluggable [`Algorithm`].
///
/// One manager serves every peer of a device. Adaptation state is keyed by
/// [`PeerId`], created lazily on first contact and independently lockable,
/// so decisions for one peer never wait on another. Rate sets and peer
/// capabilities come from the [`PeerRates`] collaborator on every decision,
/// and each selected data rate that differs from the previously reported
/// one is pushed to the [`ObserveRate`] sink.
pub struct RateManager<PR, OR> {
    algorithm: Algorithm,
    peer_rates: PR,
    observer: OR,
    stations: DashMap<PeerId, Mutex<Box<dyn Control>>>,
    short_preamble_enabled: AtomicBool,
    use_non_erp_protection: AtomicBool,
    default_tx_power_level: u8,
    current_rate: AtomicU64,
}

impl<PR, OR> RateManager<PR, OR>
where
    PR: PeerRates,
    OR: ObserveRate,
{
    /// Attaches a rate manager to a device.
    ///
    /// The legacy algorithms in this crate cannot drive high-throughput
    /// PHYs; attaching one to such a device is a fatal configuration error
    /// and no manager is constructed.
    pub fn new(
        algorithm: Algorithm,
        device: DeviceCapabilities,
        peer_rates: PR,
        observer: OR,
    ) -> Result<Self, Error> {
        if device.ht_supported {
            return Err(Error::UnsupportedModulation(ModulationClass::Ht));
        }
        if device.vht_supported {
            return Err(Error::UnsupportedModulation(ModulationClass::Vht));
        }
        if device.he_supported {
            return Err(Error::UnsupportedModulation(ModulationClass::He));
        }
        Ok(Self {
            algorithm,
            peer_rates,
            observer,
            stations: DashMap::new(),
            short_preamble_enabled: AtomicBool::new(false),
            use_non_erp_protection: AtomicBool::new(false),
            default_tx_power_level: 0,
            current_rate: AtomicU64::new(0),
        })
    }

    /// Whether short DSSS preambles may be used.
    pub fn set_short_preamble_enabled(&self, enabled: bool) {
        self.short_preamble_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether control frames must stick to the non-ERP subset so legacy
    /// stations keep decoding them.
    pub fn set_use_non_erp_protection(&self, protection: bool) {
        self.use_non_erp_protection.store(protection, Ordering::Relaxed);
    }

    /// Restores `peer` to its initial adaptation state.
    pub fn reset_peer(&self, peer: PeerId) {
        if let Some(station) = self.stations.get(&peer) {
            station.lock().unwrap().reset();
        }
    }

    /// Forgets `peer` entirely; the association ended.
    pub fn remove_peer(&self, peer: PeerId) {
        self.stations.remove(&peer);
    }

    fn with_station<T>(&self, peer: PeerId, f: impl FnOnce(&mut dyn Control) -> T) -> T {
        let station = self
            .stations
            .entry(peer)
            .or_insert_with(|| Mutex::new(self.algorithm.new_station()));
        let mut station = station.lock().unwrap();
        f(station.as_mut())
    }

    fn report_data_rate(&self, mode: TxMode, width: ChannelWidth) {
        let rate = mode.data_rate(width);
        if self.current_rate.swap(rate, Ordering::Relaxed) != rate {
            debug!(rate, mode = mode.name(), "new data rate");
            self.observer.current_rate_changed(rate);
        }
    }

    fn build_vector(&self, mode: TxMode, width: ChannelWidth, aggregation: bool) -> TxVector {
        let preamble = Preamble::for_transmission(
            mode.modulation(),
            self.short_preamble_enabled.load(Ordering::Relaxed),
        );
        TxVector::new(
            mode,
            self.default_tx_power_level,
            preamble,
            GUARD_INTERVAL,
            SPATIAL_STREAMS,
            width,
            aggregation,
        )
    }

    fn robust_mode(&self, caps: &PeerCapabilities, index: usize) -> TxMode {
        if self.use_non_erp_protection.load(Ordering::Relaxed) {
            caps.non_erp_rates().mode(index)
        } else {
            caps.rates().mode(index)
        }
    }
}

impl<PR, OR> RateControl for RateManager<PR, OR>
where
    PR: PeerRates,
    OR: ObserveRate,
{
    fn on_data_ok(&self, peer: PeerId) {
        self.with_station(peer, |station| station.on_data_ok());
    }

    fn on_data_failed(&self, peer: PeerId) {
        self.with_station(peer, |station| station.on_data_failed());
    }

    fn on_final_data_failed(&self, peer: PeerId) {
        self.with_station(peer, |station| station.on_final_data_failed());
    }

    fn on_rts_ok(&self, peer: PeerId) {
        self.with_station(peer, |station| station.on_rts_ok());
    }

    fn on_rts_failed(&self, peer: PeerId) {
        self.with_station(peer, |station| station.on_rts_failed());
    }

    fn on_final_rts_failed(&self, peer: PeerId) {
        self.with_station(peer, |station| station.on_final_rts_failed());
    }

    fn on_rx_ok(&self, peer: PeerId) {
        self.with_station(peer, |station| station.on_rx_ok());
    }

    fn data_tx_vector(&self, peer: PeerId, allowed_width: ChannelWidth, now: Instant) -> TxVector {
        let caps = self.peer_rates.capabilities(peer);
        let width = normalize_width(allowed_width);
        let index = self.with_station(peer, |station| {
            station.data_index(caps.rates().len(), now)
        });
        let mode = caps.rates().mode(index);
        self.report_data_rate(mode, width);
        self.build_vector(mode, width, caps.aggregation())
    }

    fn rts_tx_vector(&self, peer: PeerId, now: Instant) -> TxVector {
        let caps = self.peer_rates.capabilities(peer);
        let width = normalize_width(caps.channel_width());
        let index = self.with_station(peer, |station| {
            station.rts_index(caps.rates().len(), now)
        });
        let mode = self.robust_mode(&caps, index);
        self.build_vector(mode, width, caps.aggregation())
    }
}
