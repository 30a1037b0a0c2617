//! The spread-interpolated cube against the same market fixture.

mod common;

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use common::*;
use nalgebra::DMatrix;
use volcube::core::{Error, Time};
use volcube::volatilities::{
    AtmVolatilityStructure, CubeConfig, FlatCurveSwapRate, ForwardRateProvider,
    MarketVolatilityCube, SmileInterpolation, SmileSection, SpreadInterpolatedCube,
    SwaptionVolatilityCube, TenorSwitchedForward,
};

fn zero_market() -> MarketVolatilityCube {
    MarketVolatilityCube::new(
        SPARSE_EXPIRIES.to_vec(),
        SPARSE_LENGTHS.to_vec(),
        OFFSETS.to_vec(),
        DMatrix::zeros(SPARSE_EXPIRIES.len() * SPARSE_LENGTHS.len(), OFFSETS.len()),
    )
    .unwrap()
}

#[test]
fn zero_spreads_return_the_atm_surface() {
    init_tracing();
    let atm = atm(&smile_params());
    let cube =
        SpreadInterpolatedCube::new(atm.clone(), forwards(), zero_market(), CubeConfig::default())
            .unwrap();
    for &(e, l) in &[(1.0, 2.0), (3.0, 7.0), (0.5, 30.0)] {
        let f = cube.atm_strike(e, l).unwrap();
        assert_eq!(f, FORWARD);
        assert_eq!(
            cube.volatility(e, l, f).unwrap(),
            atm.volatility(e, l, f).unwrap()
        );
    }
}

#[test]
fn market_smiles_are_returned_on_sparse_nodes() {
    let p = smile_params();
    let atm = atm(&p);
    let market = sabr_market(atm.as_ref(), &p);
    let cube = SpreadInterpolatedCube::new(atm, forwards(), market, CubeConfig::default()).unwrap();
    for &e in &SPARSE_EXPIRIES {
        for &l in &SPARSE_LENGTHS {
            let smile = cube.smile(e, l).unwrap();
            assert_eq!(smile.exercise_time(), e);
            assert_eq!(smile.atm_level(), Some(FORWARD));
            for &o in &OFFSETS {
                let k = FORWARD + o;
                assert_abs_diff_eq!(smile.volatility(k), sabr_vol(k, e, &p), epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn cubic_smiles_agree_on_quoted_strikes_only() {
    let p = smile_params();
    let atm = atm(&p);
    let linear = SpreadInterpolatedCube::new(
        atm.clone(),
        forwards(),
        sabr_market(atm.as_ref(), &p),
        CubeConfig::default(),
    )
    .unwrap();
    let cubic = SpreadInterpolatedCube::new(
        atm.clone(),
        forwards(),
        sabr_market(atm.as_ref(), &p),
        CubeConfig::default().with_smile_interpolation(SmileInterpolation::CubicSpline),
    )
    .unwrap();

    let quoted = FORWARD + OFFSETS[1];
    assert_abs_diff_eq!(
        linear.volatility(5.0, 10.0, quoted).unwrap(),
        cubic.volatility(5.0, 10.0, quoted).unwrap(),
        epsilon = 1e-12
    );
    // The SABR smile is convex, so the chord lies above the spline.
    let between = FORWARD - 0.005;
    assert!(
        linear.volatility(5.0, 10.0, between).unwrap()
            > cubic.volatility(5.0, 10.0, between).unwrap()
    );
}

#[test]
fn closed_cube_rejects_queries_outside_the_market_grid() {
    let cube = SpreadInterpolatedCube::new(
        atm(&smile_params()),
        forwards(),
        zero_market(),
        CubeConfig::default().with_extrapolation(false),
    )
    .unwrap();
    assert!(cube.volatility(5.0, 10.0, FORWARD).is_ok());
    assert!(matches!(
        cube.volatility(0.5, 10.0, FORWARD),
        Err(Error::OutOfDomain(_))
    ));
}

#[test]
fn forward_providers_drive_the_atm_strike() {
    let quarterly = FlatCurveSwapRate::new(0.03, 4, 0.0).unwrap();
    let annual = FlatCurveSwapRate::new(0.03, 1, 0.0).unwrap();
    let short: Arc<dyn ForwardRateProvider> = Arc::new(quarterly);
    let long: Arc<dyn ForwardRateProvider> = Arc::new(annual);
    let forwards: Arc<dyn ForwardRateProvider> =
        Arc::new(TenorSwitchedForward::new(1.0, short.clone(), long.clone()));
    let cube = SpreadInterpolatedCube::new(
        atm(&smile_params()),
        forwards,
        zero_market(),
        CubeConfig::default(),
    )
    .unwrap();

    let at = |e: Time, l: Time, p: &Arc<dyn ForwardRateProvider>| {
        p.fair_forward_rate(e, l).unwrap()
    };
    assert_eq!(cube.atm_strike(2.0, 1.0).unwrap(), at(2.0, 1.0, &short));
    assert_eq!(cube.atm_strike(2.0, 10.0).unwrap(), at(2.0, 10.0, &long));
    assert!(cube.atm_strike(2.0, 10.0).unwrap() > 0.0);
}

#[test]
fn malformed_market_input_is_rejected() {
    let rows = SPARSE_EXPIRIES.len() * SPARSE_LENGTHS.len();
    let wrong_rows = MarketVolatilityCube::new(
        SPARSE_EXPIRIES.to_vec(),
        SPARSE_LENGTHS.to_vec(),
        OFFSETS.to_vec(),
        DMatrix::zeros(rows - 1, OFFSETS.len()),
    );
    assert!(matches!(wrong_rows, Err(Error::DimensionMismatch(_))));

    let unsorted = MarketVolatilityCube::new(
        vec![5.0, 1.0, 10.0],
        SPARSE_LENGTHS.to_vec(),
        OFFSETS.to_vec(),
        DMatrix::zeros(rows, OFFSETS.len()),
    );
    assert!(matches!(unsorted, Err(Error::InvalidInput(_))));

    let one_strike = MarketVolatilityCube::new(
        SPARSE_EXPIRIES.to_vec(),
        SPARSE_LENGTHS.to_vec(),
        vec![0.0],
        DMatrix::zeros(rows, 1),
    );
    assert!(matches!(one_strike, Err(Error::InvalidInput(_))));
}
