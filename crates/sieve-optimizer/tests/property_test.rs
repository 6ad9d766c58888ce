//! Randomized checks of the optimizer's feasibility guarantees.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sieve_optimizer::{
    NormalizedConstraints, Objective, OptimizerConfig, OptimizerError, PortfolioOptimizer,
};

/// Random positive definite covariance with daily-return scale.
fn random_covariance(rng: &mut StdRng, n: usize) -> Array2<f64> {
    let factors = 3;
    let loadings = Array2::from_shape_fn((n, factors), |_| rng.gen_range(-0.01..0.01));
    let mut cov = loadings.dot(&loadings.t());
    for i in 0..n {
        cov[[i, i]] += rng.gen_range(5e-5..4e-4);
    }
    cov
}

fn random_config(rng: &mut StdRng) -> OptimizerConfig {
    let objective = match rng.gen_range(0..3) {
        0 => Objective::MaxSharpe,
        1 => Objective::MinRisk,
        _ => Objective::Utility,
    };
    OptimizerConfig {
        objective,
        risk_aversion: rng.gen_range(0.5..10.0),
        max_weight: rng.gen_range(0.1..1.0),
        max_holdings: rng.gen_range(1..16),
        weight_floor: rng.gen_range(0.0..0.06),
        max_iterations: 2000,
        tolerance: 1e-9,
        ..Default::default()
    }
}

#[test]
fn test_feasible_configurations_yield_feasible_weights() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut solved = 0;

    for _ in 0..40 {
        let n = rng.gen_range(2..14);
        let tickers: Vec<String> = (0..n).map(|i| format!("S{i:02}")).collect();
        let mean = Array1::from_shape_fn(n, |_| rng.gen_range(-0.0005..0.0015));
        let cov = random_covariance(&mut rng, n);
        let config = random_config(&mut rng);

        let expected = NormalizedConstraints::new(&config, n);
        let result = PortfolioOptimizer::new(config.clone()).optimize(&tickers, &mean, &cov);

        match (expected, result) {
            (Ok(constraints), Ok(result)) => {
                solved += 1;
                let weights = result.weights;
                assert!(
                    (weights.total() - 1.0).abs() <= 1e-6,
                    "sum {} for {config:?}",
                    weights.total()
                );
                assert!(weights.active_count() <= constraints.max_holdings);
                assert!(weights.active_count() <= config.max_holdings);
                for (ticker, w) in weights.entries() {
                    assert!(
                        *w >= config.weight_floor - 1e-9 && *w <= config.max_weight + 1e-9,
                        "{ticker} = {w} outside [{}, {}]",
                        config.weight_floor,
                        config.max_weight
                    );
                }
            }
            (Err(reason), Err(OptimizerError::Infeasible(actual))) => {
                assert_eq!(reason, actual);
            }
            (expected, result) => {
                panic!("constraint check {expected:?} disagrees with optimizer {result:?}")
            }
        }
    }

    assert!(solved > 10, "too few feasible draws: {solved}");
}

#[test]
fn test_holdings_times_cap_below_one_is_infeasible() {
    let n = 10;
    let tickers: Vec<String> = (0..n).map(|i| format!("S{i}")).collect();
    let mut rng = StdRng::seed_from_u64(3);
    let cov = random_covariance(&mut rng, n);

    let config = OptimizerConfig {
        max_holdings: 3,
        max_weight: 0.2,
        ..Default::default()
    };
    let err = PortfolioOptimizer::new(config)
        .optimize(&tickers, &Array1::from_elem(n, 0.001), &cov)
        .unwrap_err();
    assert!(matches!(err, OptimizerError::Infeasible(_)));
    assert!(err.to_string().contains("0.6000"));
}
