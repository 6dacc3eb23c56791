//! Cumulative energy integration from periodic power samples
//!
//! The device reports instantaneous watts only; cumulative kWh is
//! derived by integrating successive samples with the trapezoidal rule.
//! A single canonical algorithm handles restarts, clock regressions and
//! long outages, parameterized by metering point so the whole device
//! and each outlet accumulate independently.

use crate::error::{Result, WattBoxError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Longest gap integrated in one step. Past this, the device is assumed
/// to have been unreachable and the new sample's power is extrapolated
/// over exactly this many hours.
pub const MAX_TIME_GAP_HOURS: f64 = 24.0;

/// Identity of one metering point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeteringPoint {
    /// The whole device
    Device,
    /// One outlet, by device-assigned number
    Outlet(u32),
}

/// Persisted integrator state for hand-off to the host framework
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySnapshot {
    /// Accumulated energy in kWh
    pub energy_kwh: f64,
    /// Power of the last sample, in watts
    pub last_power: Option<f64>,
    /// Timestamp of the last sample
    pub last_sample: Option<DateTime<Utc>>,
}

/// Trapezoidal energy integrator for one metering point
///
/// The accumulator is monotonically non-decreasing except through an
/// explicit [`restore`](Self::restore). Not internally locked; callers
/// observing the same instance from multiple tasks must serialize.
#[derive(Debug, Clone, Default)]
pub struct EnergyIntegrator {
    last_power: Option<f64>,
    last_sample: Option<DateTime<Utc>>,
    total_kwh: f64,
    observed: bool,
}

impl EnergyIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed state from externally persisted values.
    ///
    /// Valid at most once, before the first observation.
    pub fn restore(&mut self, snapshot: EnergySnapshot) -> Result<()> {
        if self.observed {
            return Err(WattBoxError::invalid_input(
                "Integrator state can only be restored before the first sample",
            ));
        }
        self.total_kwh = snapshot.energy_kwh;
        self.last_power = snapshot.last_power;
        self.last_sample = snapshot.last_sample;
        Ok(())
    }

    /// Feed one power sample.
    ///
    /// An absent sample (the poll failed) changes nothing. The first
    /// sample only primes the state. Afterwards:
    /// - a backwards clock step skips integration but re-anchors on the
    ///   new sample;
    /// - a gap beyond [`MAX_TIME_GAP_HOURS`] integrates the new power
    ///   alone over exactly that many hours;
    /// - otherwise the trapezoidal average of the two samples over the
    ///   elapsed time is added.
    pub fn observe(&mut self, power: Option<f64>, now: DateTime<Utc>) {
        let Some(power) = power else {
            return;
        };
        self.observed = true;

        if let Some(last_sample) = self.last_sample {
            let dt_hours = (now - last_sample).num_milliseconds() as f64 / 3_600_000.0;
            if dt_hours > MAX_TIME_GAP_HOURS {
                self.total_kwh += power * MAX_TIME_GAP_HOURS / 1000.0;
            } else if dt_hours >= 0.0 {
                let last_power = self.last_power.unwrap_or(power);
                self.total_kwh += (power + last_power) / 2.0 * dt_hours / 1000.0;
            }
            // dt < 0: clock moved backward, integrate nothing.
        }

        self.last_power = Some(power);
        self.last_sample = Some(now);
    }

    /// Accumulated energy rounded to 3 decimals for display.
    /// The unrounded internal accumulator stays authoritative.
    pub fn energy_kwh(&self) -> f64 {
        (self.total_kwh * 1000.0).round() / 1000.0
    }

    /// Power of the most recent sample
    pub fn last_power(&self) -> Option<f64> {
        self.last_power
    }

    /// Timestamp of the most recent sample
    pub fn last_sample(&self) -> Option<DateTime<Utc>> {
        self.last_sample
    }

    /// Current state as the persistable hand-off triple
    pub fn snapshot(&self) -> EnergySnapshot {
        EnergySnapshot {
            energy_kwh: self.total_kwh,
            last_power: self.last_power,
            last_sample: self.last_sample,
        }
    }
}

/// Energy integrators for a whole device, one per metering point
///
/// Points come into existence on their first sample or restore; a point
/// that never produced a value reports nothing rather than zero.
#[derive(Debug, Clone, Default)]
pub struct EnergyLedger {
    points: HashMap<MeteringPoint, EnergyIntegrator>,
}

impl EnergyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample for a metering point
    pub fn observe(&mut self, point: MeteringPoint, power: Option<f64>, now: DateTime<Utc>) {
        if power.is_none() && !self.points.contains_key(&point) {
            return;
        }
        self.points.entry(point).or_default().observe(power, now);
    }

    /// Seed one metering point from persisted state
    pub fn restore(&mut self, point: MeteringPoint, snapshot: EnergySnapshot) -> Result<()> {
        self.points.entry(point).or_default().restore(snapshot)
    }

    /// Display energy for a point; `None` until it has produced data
    pub fn energy_kwh(&self, point: MeteringPoint) -> Option<f64> {
        self.points.get(&point).map(EnergyIntegrator::energy_kwh)
    }

    /// Persistable state for a point, if it has any
    pub fn snapshot(&self, point: MeteringPoint) -> Option<EnergySnapshot> {
        self.points.get(&point).map(EnergyIntegrator::snapshot)
    }

    /// All known metering points and their persistable state
    pub fn snapshots(&self) -> impl Iterator<Item = (MeteringPoint, EnergySnapshot)> + '_ {
        self.points
            .iter()
            .map(|(point, integrator)| (*point, integrator.snapshot()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn first_sample_primes_without_accumulating() {
        let mut integrator = EnergyIntegrator::new();
        integrator.observe(Some(150.0), t0());
        assert_eq!(integrator.energy_kwh(), 0.0);
        assert_eq!(integrator.last_power(), Some(150.0));
        assert_eq!(integrator.last_sample(), Some(t0()));
    }

    #[test]
    fn absent_sample_is_a_no_op() {
        let mut integrator = EnergyIntegrator::new();
        integrator.observe(Some(100.0), t0());
        integrator.observe(None, t0() + Duration::hours(1));
        assert_eq!(integrator.last_sample(), Some(t0()));
        assert_eq!(integrator.energy_kwh(), 0.0);
    }

    #[test]
    fn steady_load_integrates_trapezoidally() {
        let mut integrator = EnergyIntegrator::new();
        integrator.observe(Some(100.0), t0());
        integrator.observe(Some(100.0), t0() + Duration::hours(1));
        assert_eq!(integrator.energy_kwh(), 0.1);
    }

    #[test]
    fn ramping_load_averages_the_samples() {
        let mut integrator = EnergyIntegrator::new();
        integrator.observe(Some(100.0), t0());
        integrator.observe(Some(300.0), t0() + Duration::minutes(30));
        // (100 + 300) / 2 * 0.5h / 1000
        assert_eq!(integrator.energy_kwh(), 0.1);
    }

    #[test]
    fn long_gap_is_capped_at_24_hours() {
        let mut integrator = EnergyIntegrator::new();
        integrator.observe(Some(200.0), t0());
        integrator.observe(Some(200.0), t0() + Duration::hours(30));
        assert_eq!(integrator.energy_kwh(), 4.8);
    }

    #[test]
    fn clock_regression_skips_integration_but_reanchors() {
        let mut integrator = EnergyIntegrator::new();
        integrator.observe(Some(100.0), t0());
        let earlier = t0() - Duration::minutes(5);
        integrator.observe(Some(250.0), earlier);
        assert_eq!(integrator.energy_kwh(), 0.0);
        assert_eq!(integrator.last_power(), Some(250.0));
        assert_eq!(integrator.last_sample(), Some(earlier));
    }

    #[test]
    fn accumulation_is_monotonic_for_valid_sequences() {
        let mut integrator = EnergyIntegrator::new();
        let mut previous = 0.0;
        let samples = [50.0, 75.0, 0.0, 120.0, 10.0, 10.0];
        for (i, power) in samples.iter().enumerate() {
            integrator.observe(Some(*power), t0() + Duration::minutes(10 * i as i64));
            assert!(integrator.energy_kwh() >= previous);
            previous = integrator.energy_kwh();
        }
    }

    #[test]
    fn display_value_is_rounded_but_accumulator_is_not() {
        let mut integrator = EnergyIntegrator::new();
        integrator.observe(Some(1.0), t0());
        integrator.observe(Some(1.0), t0() + Duration::minutes(10));
        // 1 W over 10 minutes: 0.000167 kWh internally, 0.000 shown
        assert_eq!(integrator.energy_kwh(), 0.0);
        assert!(integrator.snapshot().energy_kwh > 0.0);
    }

    #[test]
    fn restore_seeds_prior_state() {
        let mut integrator = EnergyIntegrator::new();
        integrator
            .restore(EnergySnapshot {
                energy_kwh: 12.345,
                last_power: Some(80.0),
                last_sample: Some(t0()),
            })
            .unwrap();
        integrator.observe(Some(120.0), t0() + Duration::hours(1));
        // 12.345 + (80 + 120) / 2 * 1h / 1000
        assert_eq!(integrator.energy_kwh(), 12.445);
    }

    #[test]
    fn restore_after_observation_is_rejected() {
        let mut integrator = EnergyIntegrator::new();
        integrator.observe(Some(10.0), t0());
        let result = integrator.restore(EnergySnapshot {
            energy_kwh: 1.0,
            last_power: None,
            last_sample: None,
        });
        assert!(result.is_err());
        assert_eq!(integrator.energy_kwh(), 0.0);
    }

    #[test]
    fn ledger_tracks_points_independently() {
        let mut ledger = EnergyLedger::new();
        ledger.observe(MeteringPoint::Device, Some(400.0), t0());
        ledger.observe(MeteringPoint::Outlet(3), Some(100.0), t0());
        ledger.observe(
            MeteringPoint::Device,
            Some(400.0),
            t0() + Duration::hours(1),
        );

        assert_eq!(ledger.energy_kwh(MeteringPoint::Device), Some(0.4));
        assert_eq!(ledger.energy_kwh(MeteringPoint::Outlet(3)), Some(0.0));
        assert_eq!(ledger.energy_kwh(MeteringPoint::Outlet(4)), None);
    }

    #[test]
    fn snapshot_serializes_for_host_persistence() {
        let mut integrator = EnergyIntegrator::new();
        integrator.observe(Some(80.0), t0());
        let json = serde_json::to_string(&integrator.snapshot()).unwrap();
        assert!(json.contains("\"energy_kwh\":0.0"));
        assert!(json.contains("\"last_power\":80.0"));
    }

    #[test]
    fn ledger_reports_nothing_for_points_that_never_sampled() {
        let mut ledger = EnergyLedger::new();
        ledger.observe(MeteringPoint::Outlet(1), None, t0());
        assert_eq!(ledger.energy_kwh(MeteringPoint::Outlet(1)), None);
        assert!(ledger.snapshot(MeteringPoint::Outlet(1)).is_none());
    }
}
