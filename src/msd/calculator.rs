//! Mean squared displacement calculator.
//!
//! For a particle observed at times `t_0..t_{n-1}` with positions `r_i`, the
//! MSD at index offset `δ` is
//!
//! ```text
//! MSD(δ) = mean_i |r_{i+δ} - r_i|²      lag(δ) = t_δ - t_0
//! ```
//!
//! The per-particle curves are then merged on exact lag-time values into an
//! ensemble mean, sample standard deviation and contributor count. Finally the
//! running diffusion coefficient (RDC) is obtained by finite differences.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::domain::{
    AverageMsd, Dimension, MsdCurve, MsdResults, ParticleMsd, RdcCurve, TrajectoryPoint, TrajectorySet,
};
use crate::error::AppError;

/// Progress callback: `(percent, message)`.
pub type Progress<'a> = &'a (dyn Fn(u8, &str) + Sync);

/// Go parallel above this many particles...
const PARALLEL_MIN_PARTICLES: usize = 10;
/// ...or above this much pairwise work (`Σ n²`).
const PARALLEL_MIN_WORK: usize = 100_000;

/// Calculator with a re-entrancy guard.
///
/// Front-ends that may trigger a computation while one is running (the TUI)
/// share one calculator; a second concurrent call returns `Ok(None)`.
#[derive(Debug, Default)]
pub struct MsdCalculator {
    calculating: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MsdCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_calculating(&self) -> bool {
        self.calculating.load(Ordering::Acquire)
    }

    /// Run [`compute_msd`] unless another computation is in flight.
    pub fn calculate(
        &self,
        set: &TrajectorySet,
        excluded: &[String],
        progress: Option<Progress<'_>>,
    ) -> Result<Option<MsdResults>, AppError> {
        if self.calculating.swap(true, Ordering::AcqRel) {
            tracing::debug!("MSD computation already running, ignoring request");
            return Ok(None);
        }
        let _guard = BusyGuard(&self.calculating);
        compute_msd(set, excluded, progress).map(Some)
    }
}

/// Compute per-particle MSDs, the ensemble average, and the RDC.
pub fn compute_msd(
    set: &TrajectorySet,
    excluded: &[String],
    progress: Option<Progress<'_>>,
) -> Result<MsdResults, AppError> {
    let report = |pct: u8, msg: &str| {
        if let Some(cb) = progress {
            cb(pct, msg);
        }
    };

    let active: Vec<_> = set.active(excluded).collect();
    if active.is_empty() {
        return Err(AppError::insufficient(
            "No trajectories left to analyse (all particles excluded).",
        ));
    }
    report(5, "Preparing data...");

    let dims = set.dimension.components();
    let total = active.len();
    let work: usize = active.iter().map(|t| t.len() * t.len()).sum();
    let parallel = use_parallel(total, work);
    tracing::debug!(particles = total, work, parallel, "computing per-particle MSD");

    let completed = AtomicUsize::new(0);
    let per_particle = |points: &[TrajectoryPoint]| {
        let curve = single_particle_msd(points, dims);
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        let pct = 10 + (70 * done / total) as u8;
        report(pct, &format!("Computing particle MSD ({done}/{total})..."));
        curve
    };

    let individual: Vec<ParticleMsd> = if parallel {
        active
            .par_iter()
            .map(|t| ParticleMsd {
                particle_id: t.id.clone(),
                curve: per_particle(&t.points),
            })
            .collect()
    } else {
        active
            .iter()
            .map(|t| ParticleMsd {
                particle_id: t.id.clone(),
                curve: per_particle(&t.points),
            })
            .collect()
    };

    report(85, "Computing average MSD...");
    let average = ensemble_average(&individual);
    if average.is_empty() {
        return Err(AppError::insufficient(
            "No particle has two or more distinct positions; MSD is undefined.",
        ));
    }

    report(95, "Computing RDC...");
    let rdc = running_diffusion(&average.lag_time, &average.msd, set.dimension);

    tracing::info!(
        particles = individual.len(),
        lags = average.len(),
        "MSD computation finished"
    );

    Ok(MsdResults {
        dimension: set.dimension,
        individual,
        average,
        rdc,
    })
}

fn use_parallel(particles: usize, work: usize) -> bool {
    particles > PARALLEL_MIN_PARTICLES || work > PARALLEL_MIN_WORK
}

/// MSD of a single time-ordered trajectory.
///
/// Returns an empty curve for fewer than two points. Lags whose MSD is not
/// strictly positive (no net motion) are dropped.
pub fn single_particle_msd(points: &[TrajectoryPoint], dims: usize) -> MsdCurve {
    let n = points.len();
    if n < 2 {
        return MsdCurve::default();
    }

    let t0 = points[0].t;
    let mut out = MsdCurve {
        lag_time: Vec::with_capacity(n - 1),
        msd: Vec::with_capacity(n - 1),
    };

    for delta in 1..n {
        let mut sum = 0.0;
        for (a, b) in points.iter().zip(&points[delta..]) {
            sum += (0..dims).map(|k| (b.pos[k] - a.pos[k]).powi(2)).sum::<f64>();
        }
        let msd = sum / (n - delta) as f64;
        if msd > 0.0 {
            out.lag_time.push(points[delta].t - t0);
            out.msd.push(msd);
        }
    }

    out
}

/// Merge per-particle curves on exact lag values.
pub fn ensemble_average(individual: &[ParticleMsd]) -> AverageMsd {
    let mut entries: Vec<(f64, f64)> = individual
        .iter()
        .flat_map(|p| p.curve.lag_time.iter().copied().zip(p.curve.msd.iter().copied()))
        .collect();
    entries.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut out = AverageMsd::default();
    let mut start = 0;
    while start < entries.len() {
        let lag = entries[start].0;
        let mut end = start + 1;
        while end < entries.len() && entries[end].0 == lag {
            end += 1;
        }

        let group = &entries[start..end];
        let n = group.len();
        let mean = group.iter().map(|e| e.1).sum::<f64>() / n as f64;
        let std = if n > 1 {
            let ss: f64 = group.iter().map(|e| (e.1 - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        out.lag_time.push(lag);
        out.msd.push(mean);
        out.std.push(std);
        out.count.push(n);
        start = end;
    }

    out
}

/// Running diffusion coefficient by finite differences.
///
/// Forward difference at the first lag, central differences inside, backward
/// difference at the last lag; each divided by `2·d`. With fewer than two lags
/// the RDC is all zeros.
pub fn running_diffusion(lag_time: &[f64], msd: &[f64], dim: Dimension) -> RdcCurve {
    let n = lag_time.len();
    let mut rdc = vec![0.0; n];
    if n < 2 {
        return RdcCurve {
            lag_time: lag_time.to_vec(),
            rdc,
        };
    }

    let slope = |i: usize, j: usize| (msd[j] - msd[i]) / (lag_time[j] - lag_time[i]);

    rdc[0] = slope(0, 1);
    for i in 1..n - 1 {
        rdc[i] = slope(i - 1, i + 1);
    }
    rdc[n - 1] = slope(n - 2, n - 1);

    let denom = 2.0 * dim.as_f64();
    for v in &mut rdc {
        *v /= denom;
    }

    RdcCurve {
        lag_time: lag_time.to_vec(),
        rdc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Trajectory;
    use std::sync::Mutex;

    fn line_track(id: &str, n: usize, speed: f64) -> Trajectory {
        Trajectory {
            id: id.to_string(),
            points: (0..n)
                .map(|i| TrajectoryPoint {
                    t: i as f64,
                    pos: [speed * i as f64, 0.0, 0.0],
                })
                .collect(),
        }
    }

    fn set_of(tracks: Vec<Trajectory>) -> TrajectorySet {
        TrajectorySet {
            dimension: Dimension::Two,
            trajectories: tracks,
        }
    }

    #[test]
    fn ballistic_track_has_quadratic_msd() {
        let track = line_track("a", 5, 2.0);
        let curve = single_particle_msd(&track.points, 2);
        assert_eq!(curve.lag_time, vec![1.0, 2.0, 3.0, 4.0]);
        for (lag, msd) in curve.lag_time.iter().zip(&curve.msd) {
            assert!((msd - 4.0 * lag * lag).abs() < 1e-12);
        }
    }

    #[test]
    fn short_or_static_tracks_yield_empty_curves() {
        let single = line_track("a", 1, 1.0);
        assert!(single_particle_msd(&single.points, 2).is_empty());

        let still = line_track("b", 4, 0.0);
        assert!(single_particle_msd(&still.points, 2).is_empty());
    }

    #[test]
    fn z_is_ignored_in_two_dimensions() {
        let points = vec![
            TrajectoryPoint { t: 0.0, pos: [0.0, 0.0, 0.0] },
            TrajectoryPoint { t: 1.0, pos: [1.0, 0.0, 5.0] },
        ];
        assert_eq!(single_particle_msd(&points, 2).msd, vec![1.0]);
        assert_eq!(single_particle_msd(&points, 3).msd, vec![26.0]);
    }

    #[test]
    fn ensemble_average_mean_std_and_counts() {
        let set = set_of(vec![line_track("a", 3, 1.0), line_track("b", 2, 3.0)]);
        let results = compute_msd(&set, &[], None).unwrap();
        let avg = &results.average;
        assert_eq!(avg.lag_time, vec![1.0, 2.0]);
        assert_eq!(avg.count, vec![2, 1]);
        // lag 1: particle a -> 1, particle b -> 9
        assert!((avg.msd[0] - 5.0).abs() < 1e-12);
        assert!((avg.std[0] - 32.0_f64.sqrt()).abs() < 1e-12);
        assert!((avg.msd[1] - 4.0).abs() < 1e-12);
        assert_eq!(avg.std[1], 0.0);
    }

    #[test]
    fn rdc_uses_forward_central_backward_differences() {
        let lag = [1.0, 2.0, 3.0, 4.0];
        let msd = [4.0, 8.0, 12.0, 16.0];
        let rdc = running_diffusion(&lag, &msd, Dimension::Two);
        for v in &rdc.rdc {
            assert!((v - 1.0).abs() < 1e-12);
        }

        let msd = [1.0, 4.0, 9.0];
        let rdc = running_diffusion(&lag[..3], &msd, Dimension::Three);
        assert!((rdc.rdc[0] - 3.0 / 6.0).abs() < 1e-12);
        assert!((rdc.rdc[1] - 4.0 / 6.0).abs() < 1e-12);
        assert!((rdc.rdc[2] - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn rdc_of_single_lag_is_zero() {
        let rdc = running_diffusion(&[1.0], &[2.0], Dimension::Two);
        assert_eq!(rdc.rdc, vec![0.0]);
    }

    #[test]
    fn excluding_everything_is_an_error() {
        let set = set_of(vec![line_track("a", 3, 1.0)]);
        let err = compute_msd(&set, &["a".to_string()], None).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn parallel_path_preserves_particle_order() {
        let tracks: Vec<_> = (0..25).map(|i| line_track(&i.to_string(), 6, 1.0 + i as f64)).collect();
        let set = set_of(tracks);
        let results = compute_msd(&set, &[], None).unwrap();
        let ids: Vec<String> = results.individual.iter().map(|p| p.particle_id.clone()).collect();
        let expected: Vec<String> = (0..25).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn progress_reaches_ninety_five_percent() {
        let seen = Mutex::new(Vec::new());
        let cb = |pct: u8, _msg: &str| seen.lock().unwrap().push(pct);
        let set = set_of(vec![line_track("a", 4, 1.0), line_track("b", 4, 2.0)]);
        compute_msd(&set, &[], Some(&cb)).unwrap();
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.first(), Some(&5));
        assert!(seen.contains(&80));
        assert_eq!(seen.last(), Some(&95));
    }

    #[test]
    fn calculator_resets_busy_flag() {
        let calc = MsdCalculator::new();
        let set = set_of(vec![line_track("a", 4, 1.0)]);
        assert!(calc.calculate(&set, &[], None).unwrap().is_some());
        assert!(!calc.is_calculating());
        assert!(calc.calculate(&set, &["a".to_string()], None).is_err());
        assert!(!calc.is_calculating());
    }

    #[test]
    fn concurrent_request_is_ignored() {
        let calc = MsdCalculator::new();
        let set = set_of(vec![line_track("a", 4, 1.0), line_track("b", 4, 2.0)]);
        let nested = Mutex::new(Vec::new());
        let cb = |_pct: u8, _msg: &str| {
            let mut nested = nested.lock().unwrap();
            if nested.is_empty() {
                assert!(calc.is_calculating());
                nested.push(calc.calculate(&set, &[], None).unwrap().is_none());
            }
        };

        let outer = calc.calculate(&set, &[], Some(&cb)).unwrap();
        assert!(outer.is_some());
        assert_eq!(nested.into_inner().unwrap(), vec![true]);
        assert!(!calc.is_calculating());
    }

    #[test]
    fn few_long_tracks_go_parallel() {
        assert!(!use_parallel(2, 2 * 200 * 200));
        assert!(use_parallel(2, 2 * 300 * 300));
        assert!(use_parallel(11, 11 * 4));

        let set = set_of(vec![line_track("a", 300, 1.0), line_track("b", 300, 2.0)]);
        let results = compute_msd(&set, &[], None).unwrap();
        assert_eq!(results.individual[0].particle_id, "a");
        assert_eq!(results.individual[1].curve.len(), 299);
        // lag 10: a -> 100, b -> 400
        assert_eq!(results.average.lag_time[9], 10.0);
        assert!((results.average.msd[9] - 250.0).abs() < 1e-9);
        assert_eq!(results.average.count[9], 2);
    }
}
