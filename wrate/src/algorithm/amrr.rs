use std::time::{Duration, Instant};

use derive_builder::Builder;
use getset::CopyGetters;
use tracing::{debug, trace};
use wbase::Error;

use crate::algorithm::Control;

/// A period needs more window samples than this before it can be
/// classified at all.
const MIN_SAMPLES: u32 = 10;
/// An attempt never steps down more than this many indices below the
/// long-run rate, no matter how many retries the frame has seen.
const MAX_RETRY_STEP_DOWN: u32 = 3;

/// Tunables of the adaptive multi-rate retry algorithm.
#[derive(Builder, CopyGetters, Debug, Clone, PartialEq)]
#[builder(default, build_fn(skip))]
#[getset(get_copy = "pub")]
pub struct AmrrConfig {
    /// Interval between decisions about rate changes.
    update_period: Duration,
    /// Largest erroneous-to-successful ratio still classified a success.
    success_ratio: f64,
    /// Smallest erroneous-to-successful ratio already classified a failure.
    failure_ratio: f64,
    /// Lower bound of the self-tuning promotion threshold.
    min_success_threshold: u32,
    /// Upper bound of the self-tuning promotion threshold.
    max_success_threshold: u32,
}

impl Default for AmrrConfig {
    fn default() -> Self {
        Self {
            update_period: Duration::from_secs(1),
            success_ratio: 0.1,
            failure_ratio: 1.0 / 3.0,
            min_success_threshold: 1,
            max_success_threshold: 10,
        }
    }
}

impl AmrrConfig {
    pub fn builder() -> AmrrConfigBuilder {
        AmrrConfigBuilder::default()
    }

    fn validate(&self) -> Result<(), Error> {
        if self.update_period.is_zero() {
            return Err(Error::InvalidConfig("update period must be nonzero"));
        }
        if !(self.success_ratio > 0.0 && self.success_ratio <= 1.0) {
            return Err(Error::InvalidConfig("success ratio must be in (0, 1]"));
        }
        if !(self.failure_ratio > 0.0 && self.failure_ratio <= 1.0) {
            return Err(Error::InvalidConfig("failure ratio must be in (0, 1]"));
        }
        if self.min_success_threshold < 1 {
            return Err(Error::InvalidConfig(
                "minimum success threshold must be at least 1",
            ));
        }
        if self.min_success_threshold > self.max_success_threshold {
            return Err(Error::InvalidConfig(
                "minimum success threshold must not exceed the maximum",
            ));
        }
        Ok(())
    }
}

impl AmrrConfigBuilder {
    pub fn build(&self) -> Result<AmrrConfig, Error> {
        let default = AmrrConfig::default();
        let config = AmrrConfig {
            update_period: self.update_period.unwrap_or(default.update_period),
            success_ratio: self.success_ratio.unwrap_or(default.success_ratio),
            failure_ratio: self.failure_ratio.unwrap_or(default.failure_ratio),
            min_success_threshold: self
                .min_success_threshold
                .unwrap_or(default.min_success_threshold),
            max_success_threshold: self
                .max_success_threshold
                .unwrap_or(default.max_success_threshold),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Per-peer adaptation state of the AMRR algorithm.
///
/// The long-run `rate_index` moves at most one step per reevaluation
/// period. The in-flight `attempt_retries` additionally steps the next
/// attempt down without touching the long-run state.
#[derive(Debug)]
pub(crate) struct Amrr {
    config: AmrrConfig,
    /// Index into the peer's rate set used for a fresh frame.
    rate_index: usize,
    /// Consecutive failed attempts of the frame currently in flight.
    attempt_retries: u32,
    /// Window counters, reset together at reevaluation.
    acked: u32,
    dropped: u32,
    retries: u32,
    /// Consecutive periods classified as successful.
    success_streak: u32,
    /// Successful periods required before the next promotion.
    success_threshold: u32,
    /// The current rate was reached by a promotion.
    recovering: bool,
    /// Armed on the first selection; advances one period per reevaluation.
    next_update: Option<Instant>,
}

impl Amrr {
    pub(crate) fn new(config: AmrrConfig) -> Self {
        let success_threshold = config.min_success_threshold();
        Self {
            config,
            rate_index: 0,
            attempt_retries: 0,
            acked: 0,
            dropped: 0,
            retries: 0,
            success_streak: 0,
            success_threshold,
            recovering: false,
            next_update: None,
        }
    }

    fn erroneous(&self) -> u32 {
        self.dropped + self.retries
    }

    fn sampled_enough(&self) -> bool {
        self.acked + self.erroneous() > MIN_SAMPLES
    }

    fn period_succeeded(&self) -> bool {
        f64::from(self.erroneous()) < f64::from(self.acked) * self.config.success_ratio()
    }

    fn period_failed(&self) -> bool {
        f64::from(self.erroneous()) > f64::from(self.acked) * self.config.failure_ratio()
    }

    fn reset_window(&mut self) {
        self.acked = 0;
        self.dropped = 0;
        self.retries = 0;
    }

    /// One run of the periodic decision. Moves `rate_index` by at most one
    /// step and keeps `success_threshold` within its configured bounds.
    fn reevaluate(&mut self, n_supported: usize) {
        let mut rate_changed = false;
        if self.period_succeeded() && self.sampled_enough() {
            self.success_streak += 1;
            if self.success_streak >= self.success_threshold && self.rate_index + 1 < n_supported {
                self.recovering = true;
                self.success_streak = 0;
                self.rate_index += 1;
                rate_changed = true;
                debug!(
                    rate_index = self.rate_index,
                    success_threshold = self.success_threshold,
                    "promoted after a successful streak"
                );
            } else {
                self.recovering = false;
            }
        } else if self.period_failed() {
            self.success_streak = 0;
            if self.rate_index > 0 {
                if self.recovering {
                    // Failing right after a promotion makes promotions harder.
                    self.success_threshold =
                        (self.success_threshold * 2).min(self.config.max_success_threshold());
                } else {
                    self.success_threshold = self.config.min_success_threshold();
                }
                self.recovering = false;
                self.rate_index -= 1;
                rate_changed = true;
                debug!(
                    rate_index = self.rate_index,
                    success_threshold = self.success_threshold,
                    "demoted after a failed period"
                );
            } else {
                self.recovering = false;
            }
        }
        // Sparse traffic keeps its counters, so a later period can still
        // reach a confident classification.
        if self.sampled_enough() || rate_changed {
            self.reset_window();
        }
    }

    fn update_if_due(&mut self, n_supported: usize, now: Instant) {
        match self.next_update {
            Some(at) if now >= at => {
                self.next_update = Some(now + self.config.update_period());
                trace!(
                    acked = self.acked,
                    dropped = self.dropped,
                    retries = self.retries,
                    "reevaluating"
                );
                self.reevaluate(n_supported);
            }
            Some(_) => {}
            None => self.next_update = Some(now + self.config.update_period()),
        }
    }
}

impl Control for Amrr {
    fn on_data_ok(&mut self) {
        self.attempt_retries = 0;
        self.acked += 1;
    }

    fn on_data_failed(&mut self) {
        self.attempt_retries += 1;
        self.retries += 1;
    }

    fn on_final_data_failed(&mut self) {
        self.attempt_retries = 0;
        self.dropped += 1;
    }

    fn data_index(&mut self, n_supported: usize, now: Instant) -> usize {
        self.update_if_due(n_supported, now);
        debug_assert!(self.rate_index < n_supported);
        let index = self.rate_index.min(n_supported.saturating_sub(1));
        index.saturating_sub(self.attempt_retries.min(MAX_RETRY_STEP_DOWN) as usize)
    }

    fn rts_index(&mut self, n_supported: usize, now: Instant) -> usize {
        self.update_if_due(n_supported, now);
        0
    }

    fn reset(&mut self) {
        *self = Amrr::new(self.config.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const N_SUPPORTED: usize = 8;
    const PERIOD: Duration = Duration::from_secs(1);

    fn station() -> Amrr {
        Amrr::new(AmrrConfig::default())
    }

    /// Arms the deadline at `now` without reevaluating.
    fn arm(station: &mut Amrr, now: Instant) {
        station.data_index(N_SUPPORTED, now);
        assert_eq!(station.next_update, Some(now + PERIOD));
    }

    fn record_ok(station: &mut Amrr, n: u32) {
        for _ in 0..n {
            station.on_data_ok();
        }
    }

    fn record_final_failed(station: &mut Amrr, n: u32) {
        for _ in 0..n {
            station.on_final_data_failed();
        }
    }

    #[test]
    fn builder_applies_defaults() {
        let config = AmrrConfig::builder().build().unwrap();
        assert_eq!(config, AmrrConfig::default());
        assert_eq!(config.update_period(), Duration::from_secs(1));
        assert_eq!(config.min_success_threshold(), 1);
        assert_eq!(config.max_success_threshold(), 10);
    }

    #[test]
    fn builder_rejects_out_of_range_parameters() {
        let cases = [
            AmrrConfig::builder()
                .update_period(Duration::ZERO)
                .build(),
            AmrrConfig::builder().success_ratio(0.0).build(),
            AmrrConfig::builder().success_ratio(1.5).build(),
            AmrrConfig::builder().failure_ratio(-0.1).build(),
            AmrrConfig::builder().min_success_threshold(0).build(),
            AmrrConfig::builder()
                .min_success_threshold(5)
                .max_success_threshold(4)
                .build(),
        ];
        for case in cases {
            assert!(matches!(case, Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn successful_period_promotes_once_streak_reaches_threshold() {
        // Scenario: 8 supported rates, rate index 2, threshold 1. Eleven
        // acknowledged frames classify the period as a success with enough
        // samples, so the next reevaluation promotes.
        let mut station = station();
        station.rate_index = 2;
        let t0 = Instant::now();
        arm(&mut station, t0);

        record_ok(&mut station, 11);
        let index = station.data_index(N_SUPPORTED, t0 + PERIOD);

        assert_eq!(station.rate_index, 3);
        assert_eq!(index, 3);
        assert!(station.recovering);
        assert_eq!(station.success_streak, 0);
        assert_eq!((station.acked, station.dropped, station.retries), (0, 0, 0));
    }

    #[test]
    fn failure_after_promotion_demotes_and_doubles_threshold() {
        // Continues the promotion scenario: 3 acks against 8 drops fails the
        // 1/3 ratio, so the rate steps back and the threshold doubles.
        let mut station = station();
        station.rate_index = 2;
        let t0 = Instant::now();
        arm(&mut station, t0);
        record_ok(&mut station, 11);
        station.data_index(N_SUPPORTED, t0 + PERIOD);
        assert_eq!(station.rate_index, 3);

        record_ok(&mut station, 3);
        record_final_failed(&mut station, 8);
        station.data_index(N_SUPPORTED, t0 + 2 * PERIOD);

        assert_eq!(station.rate_index, 2);
        assert_eq!(station.success_threshold, 2);
        assert!(!station.recovering);
        assert_eq!((station.acked, station.dropped, station.retries), (0, 0, 0));
    }

    #[test]
    fn failure_without_recovery_resets_threshold() {
        let mut station = station();
        station.rate_index = 4;
        station.success_threshold = 8;
        station.recovering = false;
        let t0 = Instant::now();
        arm(&mut station, t0);

        record_ok(&mut station, 2);
        record_final_failed(&mut station, 10);
        station.data_index(N_SUPPORTED, t0 + PERIOD);

        assert_eq!(station.rate_index, 3);
        assert_eq!(station.success_threshold, 1);
    }

    #[test]
    fn threshold_doubling_is_capped() {
        let mut station = station();
        station.rate_index = 4;
        station.success_threshold = 8;
        station.recovering = true;
        let t0 = Instant::now();
        arm(&mut station, t0);

        record_final_failed(&mut station, 12);
        station.data_index(N_SUPPORTED, t0 + PERIOD);

        assert_eq!(station.success_threshold, 10);
    }

    #[test]
    fn rate_never_drops_below_the_floor() {
        let mut station = station();
        let t0 = Instant::now();
        arm(&mut station, t0);

        for period in 1..=3u32 {
            record_final_failed(&mut station, 12);
            station.data_index(N_SUPPORTED, t0 + period * PERIOD);
            assert_eq!(station.rate_index, 0);
            assert!(!station.recovering);
        }
        // At the floor the threshold is left alone.
        assert_eq!(station.success_threshold, 1);
    }

    #[test]
    fn rate_never_climbs_past_the_ceiling() {
        let mut station = station();
        station.rate_index = N_SUPPORTED - 1;
        let t0 = Instant::now();
        arm(&mut station, t0);

        record_ok(&mut station, 20);
        station.data_index(N_SUPPORTED, t0 + PERIOD);

        assert_eq!(station.rate_index, N_SUPPORTED - 1);
        assert!(!station.recovering);
    }

    #[test]
    fn sparse_window_persists_across_periods() {
        // Fewer than 11 samples: no classification, counters accumulate.
        let mut station = station();
        station.rate_index = 2;
        let t0 = Instant::now();
        arm(&mut station, t0);

        record_ok(&mut station, 5);
        station.data_index(N_SUPPORTED, t0 + PERIOD);
        assert_eq!(station.rate_index, 2);
        assert_eq!(station.acked, 5);

        // The accumulated counters finally classify in a later period.
        record_ok(&mut station, 6);
        station.data_index(N_SUPPORTED, t0 + 2 * PERIOD);
        assert_eq!(station.rate_index, 3);
        assert_eq!(station.acked, 0);
    }

    #[test]
    fn ambiguous_period_touches_neither_streak_nor_rate() {
        // 12 acks vs 2 drops: not a success (2 >= 1.2) and not a failure
        // (2 <= 4). Counters still reset because there were enough samples.
        let mut station = station();
        station.rate_index = 2;
        station.success_streak = 1;
        station.success_threshold = 3;
        let t0 = Instant::now();
        arm(&mut station, t0);

        record_ok(&mut station, 12);
        record_final_failed(&mut station, 2);
        station.data_index(N_SUPPORTED, t0 + PERIOD);

        assert_eq!(station.rate_index, 2);
        assert_eq!(station.success_streak, 1);
        assert_eq!((station.acked, station.dropped, station.retries), (0, 0, 0));
    }

    #[test]
    fn promotion_waits_for_the_full_streak() {
        let mut station = station();
        station.success_threshold = 2;
        let t0 = Instant::now();
        arm(&mut station, t0);

        record_ok(&mut station, 11);
        station.data_index(N_SUPPORTED, t0 + PERIOD);
        assert_eq!(station.rate_index, 0);
        assert_eq!(station.success_streak, 1);
        assert!(!station.recovering);

        record_ok(&mut station, 11);
        station.data_index(N_SUPPORTED, t0 + 2 * PERIOD);
        assert_eq!(station.rate_index, 1);
        assert_eq!(station.success_streak, 0);
        assert!(station.recovering);
    }

    #[test]
    fn retry_fallback_steps_down_at_most_three() {
        let mut station = station();
        station.rate_index = 5;
        let now = Instant::now();
        station.next_update = Some(now + PERIOD);

        let expected = [5, 4, 3, 2, 2];
        for (attempt_retries, index) in expected.into_iter().enumerate() {
            station.attempt_retries = attempt_retries as u32;
            assert_eq!(station.data_index(N_SUPPORTED, now), index);
        }

        station.rate_index = 1;
        station.attempt_retries = 3;
        assert_eq!(station.data_index(N_SUPPORTED, now), 0);
    }

    #[test]
    fn retries_feed_the_failure_classification() {
        // A frame that is retried and then delivered still leaves its
        // intermediate failures in the window.
        let mut station = station();
        station.rate_index = 2;
        let t0 = Instant::now();
        arm(&mut station, t0);

        for _ in 0..4 {
            station.on_data_failed();
            station.on_data_failed();
            station.on_data_ok();
        }
        assert_eq!(station.attempt_retries, 0);
        assert_eq!((station.acked, station.retries), (4, 8));

        station.data_index(N_SUPPORTED, t0 + PERIOD);
        assert_eq!(station.rate_index, 1);
    }

    #[test]
    fn selection_within_the_period_does_not_reevaluate() {
        let mut station = station();
        let t0 = Instant::now();
        arm(&mut station, t0);

        record_ok(&mut station, 11);
        station.data_index(N_SUPPORTED, t0 + PERIOD - Duration::from_millis(1));
        assert_eq!(station.rate_index, 0);
        assert_eq!(station.acked, 11);

        station.data_index(N_SUPPORTED, t0 + PERIOD);
        assert_eq!(station.rate_index, 1);
    }

    #[test]
    fn reset_restores_the_initial_state() {
        let mut station = station();
        station.rate_index = 4;
        station.attempt_retries = 2;
        station.acked = 7;
        station.success_threshold = 8;
        station.recovering = true;
        station.next_update = Some(Instant::now());

        station.reset();

        assert_eq!(station.rate_index, 0);
        assert_eq!(station.attempt_retries, 0);
        assert_eq!((station.acked, station.dropped, station.retries), (0, 0, 0));
        assert_eq!(station.success_threshold, 1);
        assert!(!station.recovering);
        assert_eq!(station.next_update, None);
    }
}
