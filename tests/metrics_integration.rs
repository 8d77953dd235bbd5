use approx::assert_relative_eq;
use chrono::Weekday;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use forecast_bench::evaluation::{
    MetricError, MetricReport, Prices, Seasonality, mae, mape, mase, naive_forecast, rmae, rmse,
    smape,
};

fn random_series(rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.random_range(-50.0..150.0)).collect()
}

#[test]
fn rmse_dominates_mae() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..50 {
        let n = rng.random_range(1..200);
        let real = random_series(&mut rng, n);
        let pred = random_series(&mut rng, n);
        let rmse = rmse(&real, &pred).expect("rmse");
        let mae = mae(&real, &pred).expect("mae");
        assert!(rmse + 1e-12 >= mae, "rmse {rmse} < mae {mae}");
    }
}

#[test]
fn perfect_forecast_scores_zero() {
    let mut rng = StdRng::seed_from_u64(7);
    let real: Vec<f64> = (0..96).map(|_| rng.random_range(1.0..100.0)).collect();
    assert_eq!(rmse(&real, &real), Ok(0.0));
    assert_eq!(mae(&real, &real), Ok(0.0));
    assert_eq!(mape(&real, &real), Ok(0.0));
    assert_eq!(smape(&real, &real), Ok(0.0));
}

#[test]
fn metrics_ignore_layout() {
    let mut rng = StdRng::seed_from_u64(3);
    // strictly positive so mape never divides by zero
    let real: Vec<f64> = (0..48).map(|_| rng.random_range(1.0..150.0)).collect();
    let pred: Vec<f64> = (0..48).map(|_| rng.random_range(1.0..150.0)).collect();
    let wide_real: Vec<Vec<f64>> = real.chunks(24).map(<[f64]>::to_vec).collect();
    let wide_pred: Vec<Vec<f64>> = pred.chunks(24).map(<[f64]>::to_vec).collect();

    macro_rules! assert_same_across_layouts {
        ($($metric:ident),+) => {$(
            let flat = $metric(&real, &pred).expect(stringify!($metric));
            assert_relative_eq!($metric(&wide_real, &wide_pred).expect("wide"), flat);
            assert_relative_eq!($metric(&wide_real, &pred).expect("mixed"), flat);
            assert_relative_eq!(
                $metric(Prices::Column(&real), &wide_pred).expect("column"),
                flat
            );
        )+};
    }
    assert_same_across_layouts!(mae, rmse, mape, smape);
}

#[test]
fn incompatible_shapes_are_rejected() {
    let two_wide = vec![vec![1.0, 2.0]; 3];
    let three_wide = vec![vec![1.0, 2.0, 3.0]; 2];
    assert!(matches!(
        rmse(&two_wide, &three_wide),
        Err(MetricError::ShapeMismatch(_))
    ));
    assert!(matches!(
        rmse(&[1.0, 2.0, 3.0], &[1.0, 2.0]),
        Err(MetricError::ShapeMismatch(_))
    ));
}

#[test]
fn textbook_values() {
    let real = [0.0, 2.0, 4.0, 6.0];
    let pred = [1.0, 1.0, 5.0, 5.0];
    assert_eq!(rmse(&real, &pred), Ok(1.0));
    assert_eq!(mae(&real, &pred), Ok(1.0));
    assert_eq!(
        mape(&real, &pred),
        Err(MetricError::DivisionByZero {
            metric: "MAPE",
            index: Some(0)
        })
    );
}

#[test]
fn naive_forecast_scores_rmae_one() {
    let mut rng = StdRng::seed_from_u64(11);
    let real = random_series(&mut rng, 24 * 14);
    let baseline = naive_forecast(&real, Seasonality::daily(24)).expect("baseline");
    let mut pred = real.clone();
    pred[baseline.offset..].copy_from_slice(&baseline.values);
    assert_relative_eq!(
        rmae(&real, &pred, Seasonality::daily(24)).expect("rmae"),
        1.0
    );
}

#[test]
fn epf_seasonality_uses_weekly_lag_on_weekends() {
    // two weeks starting on a Monday, one value per day
    let real: Vec<f64> = (0..14).map(f64::from).collect();
    let seasonality = Seasonality::Epf {
        periods_per_day: 1,
        first_day: Weekday::Mon,
    };
    let baseline = naive_forecast(&real, seasonality).expect("baseline");
    assert_eq!(baseline.offset, 7);
    // Mon repeats last Mon, Tue..Fri repeat yesterday, Sat and Sun repeat last week
    assert_eq!(baseline.values, vec![0.0, 7.0, 8.0, 9.0, 10.0, 5.0, 6.0]);
}

#[test]
fn mase_scales_by_in_sample_naive_error() {
    let in_sample = [1.0, 3.0, 5.0, 7.0];
    let real = [9.0, 11.0];
    let pred = [10.0, 10.0];
    // naive one-step error in sample is 2, forecast MAE is 1
    assert_relative_eq!(
        mase(&real, &pred, &in_sample, Seasonality::Lag(1)).expect("mase"),
        0.5
    );
}

#[test]
fn report_marks_undefined_metrics() {
    let real = [0.0, 2.0, 4.0, 6.0];
    let pred = [1.0, 1.0, 5.0, 5.0];
    let report = MetricReport::compute(&real, &pred, None).expect("report");
    assert_eq!(report.observations, 4);
    assert_eq!(report.mape, None);
    assert!(report.smape.is_some());
    assert!(report.to_string().contains("n/a"));
}

#[test]
fn non_finite_input_is_an_error() {
    assert_eq!(
        mae(&[1.0, f64::NAN], &[1.0, 2.0]),
        Err(MetricError::NonFinite { index: 1 })
    );
}
