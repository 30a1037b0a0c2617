//! Shared market fixture: a flat 4% forward and a single SABR smile whose
//! volatilities are linear in expiry, so every synthesised node is exactly
//! SABR-representable.

#![allow(dead_code)]

use std::sync::Arc;

use nalgebra::DMatrix;
use volcube::core::{Rate, Real, Time, Volatility};
use volcube::math::{sabr_volatility, SabrParameters};
use volcube::volatilities::{
    AtmVolatilityStructure, ForwardRateProvider, MarketVolatilityCube, SwaptionVolatilityMatrix,
};

pub const FORWARD: Rate = 0.04;
pub const OFFSETS: [Real; 5] = [-0.02, -0.01, 0.0, 0.01, 0.02];
pub const NATIVE_EXPIRIES: [Time; 7] = [0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0];
pub const NATIVE_LENGTHS: [Time; 5] = [1.0, 2.0, 5.0, 10.0, 20.0];
pub const SPARSE_EXPIRIES: [Time; 3] = [1.0, 5.0, 10.0];
pub const SPARSE_LENGTHS: [Time; 3] = [2.0, 10.0, 20.0];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn smile_params() -> SabrParameters {
    SabrParameters::new(0.06, 0.7, 0.4, -0.2)
}

pub fn sabr_vol(strike: Rate, expiry: Time, p: &SabrParameters) -> Volatility {
    sabr_volatility(FORWARD, strike, expiry, p)
}

pub fn forwards() -> Arc<dyn ForwardRateProvider> {
    Arc::new(|_: Time, _: Time| FORWARD)
}

pub fn atm_matrix(p: &SabrParameters) -> SwaptionVolatilityMatrix {
    let vols = DMatrix::from_fn(NATIVE_EXPIRIES.len(), NATIVE_LENGTHS.len(), |i, _| {
        sabr_vol(FORWARD, NATIVE_EXPIRIES[i], p)
    });
    SwaptionVolatilityMatrix::new(NATIVE_EXPIRIES.to_vec(), NATIVE_LENGTHS.to_vec(), vols)
        .expect("valid ATM matrix")
}

pub fn atm(p: &SabrParameters) -> Arc<dyn AtmVolatilityStructure> {
    Arc::new(atm_matrix(p))
}

/// Spreads over `atm` reproducing the SABR smile `p` on the sparse grid.
pub fn sabr_spreads(atm: &dyn AtmVolatilityStructure, p: &SabrParameters) -> DMatrix<Real> {
    let nl = SPARSE_LENGTHS.len();
    DMatrix::from_fn(SPARSE_EXPIRIES.len() * nl, OFFSETS.len(), |row, k| {
        let (e, l) = (SPARSE_EXPIRIES[row / nl], SPARSE_LENGTHS[row % nl]);
        let atm_vol = atm.volatility(e, l, FORWARD).expect("ATM vol");
        sabr_vol(FORWARD + OFFSETS[k], e, p) - atm_vol
    })
}

pub fn sabr_market(atm: &dyn AtmVolatilityStructure, p: &SabrParameters) -> MarketVolatilityCube {
    MarketVolatilityCube::new(
        SPARSE_EXPIRIES.to_vec(),
        SPARSE_LENGTHS.to_vec(),
        OFFSETS.to_vec(),
        sabr_spreads(atm, p),
    )
    .expect("valid market cube")
}
