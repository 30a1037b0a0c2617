//! Swaption volatility cubes: ATM surface plus smile.
//!
//! [`SpreadInterpolatedCube`] interpolates the market volatility spreads
//! directly.  [`SabrVolatilityCube`] calibrates SABR on the sparse market
//! grid, densifies onto the ATM reference grid, recalibrates and answers
//! queries from the dense SABR parameters.

use std::sync::Arc;

use nalgebra::DMatrix;
use tracing::info;
use vc_core::{errors::Result, Rate, Real, Spread, Time, Volatility};

use crate::atm::AtmVolatilityStructure;
use crate::config::CubeConfig;
use crate::cube::LayeredCube;
use crate::densification::{DensificationEngine, SmileGrid};
use crate::forward::ForwardRateProvider;
use crate::market::MarketVolatilityCube;
use crate::sabr_calibration::{CalibrationContext, SabrCalibrator, SmileQuotes};
use crate::smile_section::{
    InterpolatedSmileSection, SabrParameterSet, SabrSmileSection, SmileSection,
};

/// Query contract shared by the cube variants.
pub trait SwaptionVolatilityCube {
    /// Smile type returned by [`smile`](Self::smile).
    type Smile: SmileSection;

    /// Smile of the swaption with the given expiry and underlying length.
    fn smile(&self, expiry: Time, length: Time) -> Result<Self::Smile>;

    /// ATM strike (forward swap rate) at `(expiry, length)`.
    fn atm_strike(&self, expiry: Time, length: Time) -> Result<Rate>;

    /// Strike offsets of the market quotes.
    fn strike_spreads(&self) -> &[Spread];

    /// Black volatility at `(expiry, length, strike)`.
    fn volatility(&self, expiry: Time, length: Time, strike: Rate) -> Result<Volatility> {
        Ok(self.smile(expiry, length)?.volatility(strike))
    }

    /// Black variance σ²·T at `(expiry, length, strike)`.
    fn variance(&self, expiry: Time, length: Time, strike: Rate) -> Result<Real> {
        Ok(self.smile(expiry, length)?.variance(strike))
    }
}

// ── Spread-interpolated cube ──────────────────────────────────────────────────

/// Cube interpolating market volatility spreads over the ATM surface.
///
/// The smile at `(expiry, length)` runs through `F + offset[i]` with
/// volatility `ATM(expiry, length) + spread[i]`, where the spreads are
/// bilinearly interpolated per strike offset.
pub struct SpreadInterpolatedCube {
    atm: Arc<dyn AtmVolatilityStructure>,
    forwards: Arc<dyn ForwardRateProvider>,
    market: MarketVolatilityCube,
    config: CubeConfig,
    spreads: LayeredCube,
}

impl SpreadInterpolatedCube {
    /// Build the cube.
    ///
    /// # Errors
    /// [`vc_core::Error::InvalidGrid`] if an axis of `market` has fewer than
    /// two entries.
    pub fn new(
        atm: Arc<dyn AtmVolatilityStructure>,
        forwards: Arc<dyn ForwardRateProvider>,
        market: MarketVolatilityCube,
        config: CubeConfig,
    ) -> Result<Self> {
        let mut spreads = LayeredCube::new(
            market.expiries(),
            market.lengths(),
            market.n_strikes(),
            config.extrapolate,
        )?;
        spreads.set_layers(market.spread_layers())?;
        spreads.refresh()?;
        Ok(Self {
            atm,
            forwards,
            market,
            config,
            spreads,
        })
    }

    /// Market input.
    pub fn market(&self) -> &MarketVolatilityCube {
        &self.market
    }

    /// Spread layers, one per strike offset.
    pub fn spreads(&self) -> &LayeredCube {
        &self.spreads
    }
}

impl std::fmt::Debug for SpreadInterpolatedCube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpreadInterpolatedCube")
            .field("atm", &self.atm)
            .field("market", &self.market)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SwaptionVolatilityCube for SpreadInterpolatedCube {
    type Smile = InterpolatedSmileSection;

    fn smile(&self, expiry: Time, length: Time) -> Result<InterpolatedSmileSection> {
        let forward = self.atm_strike(expiry, length)?;
        let atm_vol = self.atm.volatility(expiry, length, forward)?;
        let spreads = self.spreads.query(expiry, length)?;
        let strikes: Vec<Rate> = self
            .market
            .strike_spreads()
            .iter()
            .map(|o| forward + o)
            .collect();
        let vols: Vec<Volatility> = spreads.iter().map(|s| atm_vol + s).collect();
        InterpolatedSmileSection::new(
            expiry,
            Some(forward),
            &strikes,
            &vols,
            self.config.smile_interpolation,
        )
    }

    fn atm_strike(&self, expiry: Time, length: Time) -> Result<Rate> {
        self.forwards.fair_forward_rate(expiry, length)
    }

    fn strike_spreads(&self) -> &[Spread] {
        self.market.strike_spreads()
    }
}

// ── SABR cube ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SabrCubeState {
    market_vols: LayeredCube,
    sparse_parameters: LayeredCube,
    dense_vols: LayeredCube,
    dense_parameters: LayeredCube,
}

/// Cube of SABR smiles calibrated on a grid densified to the ATM reference.
///
/// Construction runs the whole pipeline: market volatilities on the sparse
/// grid, a sparse calibration pass, densification onto the union of the
/// sparse and ATM grids, and a dense calibration pass.  Queries interpolate
/// the dense parameter layers.  [`update_spreads`](Self::update_spreads) and
/// [`recalibrate`](Self::recalibrate) rerun the pipeline and leave the cube
/// untouched when any step fails.
pub struct SabrVolatilityCube {
    atm: Arc<dyn AtmVolatilityStructure>,
    forwards: Arc<dyn ForwardRateProvider>,
    market: MarketVolatilityCube,
    config: CubeConfig,
    state: SabrCubeState,
}

impl SabrVolatilityCube {
    /// Build and calibrate the cube.
    ///
    /// # Errors
    /// * [`vc_core::Error::InvalidGrid`] if an axis of `market` has fewer
    ///   than two entries.
    /// * [`vc_core::Error::CalibrationAccuracy`] if any node of either pass
    ///   cannot be fitted within tolerance.
    /// * [`vc_core::Error::InvalidInput`] if a strike `F + offset` is not
    ///   positive.
    pub fn new(
        atm: Arc<dyn AtmVolatilityStructure>,
        forwards: Arc<dyn ForwardRateProvider>,
        market: MarketVolatilityCube,
        config: CubeConfig,
    ) -> Result<Self> {
        let state = build_state(atm.as_ref(), forwards.as_ref(), &market, &config)?;
        Ok(Self {
            atm,
            forwards,
            market,
            config,
            state,
        })
    }

    /// Market input.
    pub fn market(&self) -> &MarketVolatilityCube {
        &self.market
    }

    /// Settings in use.
    pub fn config(&self) -> &CubeConfig {
        &self.config
    }

    /// Market volatilities on the sparse grid, one layer per strike offset.
    pub fn market_volatilities(&self) -> &LayeredCube {
        &self.state.market_vols
    }

    /// SABR parameters fitted on the sparse grid.
    pub fn sparse_parameters(&self) -> &LayeredCube {
        &self.state.sparse_parameters
    }

    /// Volatilities on the densified grid, one layer per strike offset.
    pub fn dense_volatilities(&self) -> &LayeredCube {
        &self.state.dense_vols
    }

    /// SABR parameters fitted on the densified grid.
    pub fn dense_parameters(&self) -> &LayeredCube {
        &self.state.dense_parameters
    }

    /// Smile interpolated from the sparse calibration instead of the dense
    /// one.
    pub fn sparse_smile(&self, expiry: Time, length: Time) -> Result<SabrSmileSection> {
        let values = self.state.sparse_parameters.query(expiry, length)?;
        SabrSmileSection::from_layers(expiry, &values)
    }

    /// Replace the market volatility spreads and rebuild the cube.
    ///
    /// On error the cube keeps its previous market data and calibration.
    pub fn update_spreads(&mut self, vol_spreads: DMatrix<Real>) -> Result<()> {
        let market = self.market.with_vol_spreads(vol_spreads)?;
        let state = build_state(
            self.atm.as_ref(),
            self.forwards.as_ref(),
            &market,
            &self.config,
        )?;
        self.market = market;
        self.state = state;
        Ok(())
    }

    /// Rerun both calibration passes from a new starting point.
    ///
    /// On error the cube keeps its previous calibration.
    pub fn recalibrate(&mut self, context: CalibrationContext) -> Result<()> {
        let config = self.config.clone().with_context(context);
        let state = build_state(
            self.atm.as_ref(),
            self.forwards.as_ref(),
            &self.market,
            &config,
        )?;
        self.config = config;
        self.state = state;
        Ok(())
    }
}

impl std::fmt::Debug for SabrVolatilityCube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SabrVolatilityCube")
            .field("atm", &self.atm)
            .field("market", &self.market)
            .field("config", &self.config)
            .field("dense_expiries", &self.state.dense_parameters.expiries())
            .field("dense_lengths", &self.state.dense_parameters.lengths())
            .finish_non_exhaustive()
    }
}

impl SwaptionVolatilityCube for SabrVolatilityCube {
    type Smile = SabrSmileSection;

    fn smile(&self, expiry: Time, length: Time) -> Result<SabrSmileSection> {
        let values = self.state.dense_parameters.query(expiry, length)?;
        SabrSmileSection::from_layers(expiry, &values)
    }

    fn atm_strike(&self, expiry: Time, length: Time) -> Result<Rate> {
        self.forwards.fair_forward_rate(expiry, length)
    }

    fn strike_spreads(&self) -> &[Spread] {
        self.market.strike_spreads()
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

fn build_state(
    atm: &dyn AtmVolatilityStructure,
    forwards: &dyn ForwardRateProvider,
    market: &MarketVolatilityCube,
    config: &CubeConfig,
) -> Result<SabrCubeState> {
    let market_vols = market_volatilities(atm, forwards, market, config.extrapolate)?;
    let sparse_parameters =
        calibrate_cube(&market_vols, forwards, market.strike_spreads(), config)?;

    let smiles = SmileGrid::from_parameters(&sparse_parameters)?;
    let dense_vols = DensificationEngine::new(atm, forwards, market.strike_spreads())
        .with_bracket_policy(config.bracket_policy)
        .densify(&market_vols, &smiles)?;
    let dense_parameters =
        calibrate_cube(&dense_vols, forwards, market.strike_spreads(), config)?;

    info!(
        sparse_nodes = market_vols.expiries().len() * market_vols.lengths().len(),
        dense_nodes = dense_parameters.expiries().len() * dense_parameters.lengths().len(),
        "SABR volatility cube built"
    );
    Ok(SabrCubeState {
        market_vols,
        sparse_parameters,
        dense_vols,
        dense_parameters,
    })
}

/// Absolute smile volatilities `ATM + spread` on the market grid.
fn market_volatilities(
    atm: &dyn AtmVolatilityStructure,
    forwards: &dyn ForwardRateProvider,
    market: &MarketVolatilityCube,
    extrapolate: bool,
) -> Result<LayeredCube> {
    let mut vols = LayeredCube::new(
        market.expiries(),
        market.lengths(),
        market.n_strikes(),
        extrapolate,
    )?;
    for (i, &expiry) in market.expiries().iter().enumerate() {
        for (j, &length) in market.lengths().iter().enumerate() {
            let forward = forwards.fair_forward_rate(expiry, length)?;
            let atm_vol = atm.volatility(expiry, length, forward)?;
            for k in 0..market.n_strikes() {
                vols.set_element(k, i, j, atm_vol + market.vol_spread(i, j, k))?;
            }
        }
    }
    vols.refresh()?;
    Ok(vols)
}

/// One SABR fit per node of `vols`, stored as a five-layer parameter cube.
fn calibrate_cube(
    vols: &LayeredCube,
    forwards: &dyn ForwardRateProvider,
    strike_spreads: &[Spread],
    config: &CubeConfig,
) -> Result<LayeredCube> {
    let expiries = vols.expiries().values();
    let lengths = vols.lengths().values();

    let mut quotes = Vec::with_capacity(expiries.len() * lengths.len());
    for (i, &expiry) in expiries.iter().enumerate() {
        for (j, &length) in lengths.iter().enumerate() {
            let forward = forwards.fair_forward_rate(expiry, length)?;
            quotes.push(SmileQuotes {
                expiry,
                length,
                forward,
                strikes: strike_spreads.iter().map(|o| forward + o).collect(),
                vols: vols.values_at(i, j)?,
            });
        }
    }

    let fits = SabrCalibrator::new(config.calibration.clone())
        .calibrate_all(&quotes, &config.context)?;

    let mut parameters = LayeredCube::new(
        expiries,
        lengths,
        SabrParameterSet::LAYERS,
        vols.extrapolate(),
    )?;
    for (node, fit) in fits.iter().enumerate() {
        let (i, j) = (node / lengths.len(), node % lengths.len());
        for (k, &value) in fit.parameter_set().to_layers().iter().enumerate() {
            parameters.set_element(k, i, j, value)?;
        }
    }
    parameters.refresh()?;
    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atm::SwaptionVolatilityMatrix;
    use approx::assert_abs_diff_eq;
    use vc_core::Error;

    fn flat_atm(vol: Volatility) -> Arc<dyn AtmVolatilityStructure> {
        Arc::new(
            SwaptionVolatilityMatrix::new(
                vec![1.0, 5.0],
                vec![2.0, 10.0],
                DMatrix::from_element(2, 2, vol),
            )
            .unwrap(),
        )
    }

    fn market(spreads: DMatrix<Real>) -> MarketVolatilityCube {
        MarketVolatilityCube::new(
            vec![1.0, 5.0],
            vec![2.0, 10.0],
            vec![-0.01, 0.0, 0.01],
            spreads,
        )
        .unwrap()
    }

    #[test]
    fn spread_cube_adds_interpolated_spreads_to_atm() {
        let mut spreads = DMatrix::zeros(4, 3);
        // expiry 1y: [+0.02, 0, +0.01]; expiry 5y: [+0.04, 0, +0.03]
        for row in 0..2 {
            spreads[(row, 0)] = 0.02;
            spreads[(row, 2)] = 0.01;
        }
        for row in 2..4 {
            spreads[(row, 0)] = 0.04;
            spreads[(row, 2)] = 0.03;
        }
        let cube = SpreadInterpolatedCube::new(
            flat_atm(0.2),
            Arc::new(|_: Time, _: Time| 0.03),
            market(spreads),
            CubeConfig::default(),
        )
        .unwrap();

        assert_eq!(cube.atm_strike(3.0, 5.0).unwrap(), 0.03);
        assert_abs_diff_eq!(cube.volatility(3.0, 5.0, 0.03).unwrap(), 0.2, epsilon = 1e-15);
        assert_abs_diff_eq!(cube.volatility(3.0, 5.0, 0.02).unwrap(), 0.23, epsilon = 1e-12);
        assert_abs_diff_eq!(cube.volatility(1.0, 2.0, 0.045).unwrap(), 0.215, epsilon = 1e-12);
        let smile = cube.smile(3.0, 5.0).unwrap();
        assert_eq!(smile.atm_level(), Some(0.03));
        assert_abs_diff_eq!(
            cube.variance(3.0, 5.0, 0.04).unwrap(),
            0.22 * 0.22 * 3.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn spread_cube_needs_two_lines_per_axis() {
        let single = MarketVolatilityCube::new(
            vec![1.0],
            vec![2.0, 10.0],
            vec![-0.01, 0.01],
            DMatrix::zeros(2, 2),
        )
        .unwrap();
        let err = SpreadInterpolatedCube::new(
            flat_atm(0.2),
            Arc::new(|_: Time, _: Time| 0.03),
            single,
            CubeConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidGrid(_)));
    }

    #[test]
    fn sabr_cube_rejects_non_positive_strikes() {
        let err = SabrVolatilityCube::new(
            flat_atm(0.2),
            Arc::new(|_: Time, _: Time| 0.005),
            market(DMatrix::zeros(4, 3)),
            CubeConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
