use approx::assert_abs_diff_eq;

use dslab_iops::core::monitoring::{HostSnapshot, VmSnapshot};
use dslab_iops::core::overload_detector::{overload_detector_resolver, OverloadDetector};
use dslab_iops::core::overload_detectors::interquartile_range::InterQuartileRange;
use dslab_iops::core::overload_detectors::local_regression::LocalRegression;
use dslab_iops::core::overload_detectors::static_threshold::StaticThreshold;
use dslab_iops::Error;

fn loaded_host(requested_compute: f64, requested_io: f64) -> HostSnapshot {
    let mut host = HostSnapshot::new(0, 0., 1000., 1000.);
    host.add_vm(VmSnapshot {
        id: 1,
        total_compute: 1000.,
        io_capacity: 1000.,
        requested_compute,
        requested_io,
        migration_time: 0.,
    });
    host
}

#[test]
// Dimensions are checked independently.
fn test_static_threshold() {
    let detector = StaticThreshold::new(0.8, 0.6).unwrap();

    let decision = detector.detect(&loaded_host(900., 100.));
    assert!(decision.overloaded);
    assert_eq!(decision.compute_utilization, 0.9);
    assert_eq!(decision.compute_threshold, 0.8);
    assert_eq!(decision.io_threshold, 0.6);

    assert!(detector.detect(&loaded_host(100., 700.)).overloaded);
    assert!(!detector.detect(&loaded_host(800., 600.)).overloaded);

    assert!(StaticThreshold::new(1.2, 0.5).is_err());
}

#[test]
// With fewer than 12 samples before the zero tail, the fallback decides.
fn test_interquartile_range_fallback() {
    let fallback = StaticThreshold::new(0.7, 0.7).unwrap();
    let detector = InterQuartileRange::new(1.5, 0.5, 0.5, Box::new(fallback)).unwrap();

    let mut history = vec![0.5; 11];
    history.extend([0., 0., 0.]);
    let host = loaded_host(750., 100.).with_history(history, vec![0.3; 20]);
    let decision = detector.detect(&host);
    assert!(decision.used_fallback);
    assert!(decision.overloaded);
    assert_eq!(decision.compute_threshold, 0.7);

    let host = loaded_host(650., 100.).with_history(vec![], vec![]);
    let decision = detector.detect(&host);
    assert!(decision.used_fallback);
    assert!(!decision.overloaded);
}

#[test]
// Compute history 0.05, 0.10, ..., 0.60 has IQR 0.5 - 0.15 = 0.35, so with safety 1 the threshold is 0.65.
// Constant I/O history has zero IQR and threshold 1. Weighted threshold is 0.5 * 0.65 + 0.5 * 1 = 0.825.
fn test_interquartile_range_threshold() {
    let fallback = StaticThreshold::new(0.7, 0.7).unwrap();
    let detector = InterQuartileRange::new(1., 0.5, 0.5, Box::new(fallback)).unwrap();
    let compute_history: Vec<f64> = (1..=12).map(|i| i as f64 * 0.05).collect();
    let io_history = vec![0.3; 12];

    let host = loaded_host(900., 800.).with_history(compute_history.clone(), io_history.clone());
    let decision = detector.detect(&host);
    assert!(!decision.used_fallback);
    assert_abs_diff_eq!(decision.compute_threshold, 0.65, epsilon = 1e-9);
    assert_abs_diff_eq!(decision.io_threshold, 1., epsilon = 1e-9);
    assert!(decision.overloaded);

    let host = loaded_host(900., 700.).with_history(compute_history, io_history);
    assert!(!detector.detect(&host).overloaded);
}

#[test]
fn test_negative_safety_is_rejected() {
    let fallback = StaticThreshold::new(0.7, 0.7).unwrap();
    let result = InterQuartileRange::new(-0.5, 0.5, 0.5, Box::new(fallback));
    assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    assert!(overload_detector_resolver("InterQuartileRange[safety=-1]", 0.5, 0.5).is_err());
}

#[test]
fn test_overload_detector_resolver() {
    let detector = overload_detector_resolver("StaticThreshold[compute=0.5,io=0.9]", 0.5, 0.5).unwrap();
    let decision = detector.detect(&loaded_host(600., 0.));
    assert!(decision.overloaded);
    assert_eq!(decision.io_threshold, 0.9);

    let detector = overload_detector_resolver("InterQuartileRange[safety=1.5,fallback_compute=0.5]", 0.5, 0.5).unwrap();
    let decision = detector.detect(&loaded_host(600., 0.));
    assert!(decision.used_fallback);
    assert_eq!(decision.compute_threshold, 0.5);
    assert_eq!(decision.io_threshold, 0.7);

    let detector = overload_detector_resolver("LocalRegression[safety=1.2]", 0.5, 0.5).unwrap();
    assert!(detector.detect(&loaded_host(750., 0.)).used_fallback);

    assert!(overload_detector_resolver("MedianAbsoluteDeviation", 0.5, 0.5).is_err());
    assert!(overload_detector_resolver("LocalRegression[scheduling_interval=0]", 0.5, 0.5).is_err());
}

/// Compute history rising by 0.05 per sample from 0.3 to 0.85, most recent first.
fn rising_history() -> Vec<f64> {
    (0..12).rev().map(|k| 0.3 + 0.05 * k as f64).collect()
}

fn local_regression(safety: f64, compute_weight: f64, io_weight: f64) -> LocalRegression {
    let fallback = StaticThreshold::new(0.7, 0.7).unwrap();
    LocalRegression::new(safety, 300., compute_weight, io_weight, Box::new(fallback)).unwrap()
}

#[test]
// The 10 most recent samples lie on 0.35 + 0.05 * x for x = 1..10, so the next value is predicted as 0.85
// and 1.02 with safety 1.2. Flat I/O history of 0.5 is predicted as 0.6.
fn test_local_regression_prediction() {
    let host = loaded_host(500., 500.).with_history(rising_history(), vec![0.5; 12]);

    let decision = local_regression(1.2, 1., 0.).detect(&host);
    assert!(!decision.used_fallback);
    assert_abs_diff_eq!(decision.compute_utilization, 1.02, epsilon = 1e-9);
    assert_abs_diff_eq!(decision.io_utilization, 0.6, epsilon = 1e-9);
    assert!(decision.overloaded);

    // 0.5 * 1.02 + 0.5 * 0.6 < 1
    assert!(!local_regression(1.2, 0.5, 0.5).detect(&host).overloaded);
}

#[test]
// Migrating the VM takes two scheduling intervals, so the prediction looks two samples further ahead.
fn test_local_regression_migration_horizon() {
    let mut host = HostSnapshot::new(0, 0., 1000., 1000.).with_history(rising_history(), vec![0.5; 12]);
    host.add_vm(VmSnapshot {
        id: 1,
        total_compute: 1000.,
        io_capacity: 1000.,
        requested_compute: 500.,
        requested_io: 500.,
        migration_time: 600.,
    });
    let decision = local_regression(1., 1., 0.).detect(&host);
    assert_abs_diff_eq!(decision.compute_utilization, 0.95, epsilon = 1e-9);
    assert!(!decision.overloaded);
}

#[test]
fn test_local_regression_fallback() {
    let mut history = rising_history();
    history.truncate(11);
    let host = loaded_host(750., 0.).with_history(history, vec![0.5; 12]);
    let decision = local_regression(1.2, 0.5, 0.5).detect(&host);
    assert!(decision.used_fallback);
    assert!(decision.overloaded);
    assert_eq!(decision.compute_threshold, 0.7);

    let fallback = StaticThreshold::new(0.7, 0.7).unwrap();
    assert!(LocalRegression::new(-1., 300., 0.5, 0.5, Box::new(fallback)).is_err());
}
