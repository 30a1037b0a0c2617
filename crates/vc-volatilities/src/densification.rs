//! Sparse-to-dense expansion of a market volatility cube.
//!
//! Every cell of the union of the sparse grid and the ATM reference grid
//! that is not a sparse node gets synthetic smile volatilities:
//!
//! 1. bracket the cell by the 2×2 nearest sparse smiles,
//! 2. for each strike offset, map the target strike to its moneyness
//!    `F / K` and read each bracketing smile at the strike with the same
//!    moneyness relative to that smile's own forward,
//! 3. interpolate the four spreads over ATM bilinearly (extrapolating at the
//!    edges) and add the ATM volatility of the cell.

use std::sync::Arc;

use nalgebra::DMatrix;
use tracing::{debug, info};
use vc_core::{ensure, errors::Result, Rate, Size, Spread, Time, Volatility};
use vc_math::{BilinearInterpolation, Interpolation2D};

use crate::atm::AtmVolatilityStructure;
use crate::cube::LayeredCube;
use crate::forward::ForwardRateProvider;
use crate::grid::{BracketPolicy, GridIndex};
use crate::smile_section::{SabrParameterSet, SabrSmileSection, SmileSection};

// ── Smile grid ────────────────────────────────────────────────────────────────

/// Smiles on a rectangular (expiry, length) grid, stored expiry-major.
#[derive(Debug, Clone)]
pub struct SmileGrid {
    expiries: GridIndex,
    lengths: GridIndex,
    smiles: Vec<Arc<dyn SmileSection>>,
}

impl SmileGrid {
    /// Assemble a grid; `smiles[i * lengths.len() + j]` sits at
    /// `(expiries[i], lengths[j])`.
    pub fn new(
        expiries: GridIndex,
        lengths: GridIndex,
        smiles: Vec<Arc<dyn SmileSection>>,
    ) -> Result<Self> {
        ensure!(
            smiles.len() == expiries.len() * lengths.len(),
            DimensionMismatch,
            "{} smiles for a {}×{} grid",
            smiles.len(),
            expiries.len(),
            lengths.len()
        );
        Ok(Self {
            expiries,
            lengths,
            smiles,
        })
    }

    /// SABR smiles read from the nodes of a five-layer parameter cube.
    pub fn from_parameters(parameters: &LayeredCube) -> Result<Self> {
        ensure!(
            parameters.n_layers() == SabrParameterSet::LAYERS,
            DimensionMismatch,
            "SABR parameter cube needs {} layers, got {}",
            SabrParameterSet::LAYERS,
            parameters.n_layers()
        );
        let expiries = parameters.expiries().clone();
        let lengths = parameters.lengths().clone();
        let mut smiles: Vec<Arc<dyn SmileSection>> =
            Vec::with_capacity(expiries.len() * lengths.len());
        for (i, &expiry) in expiries.values().iter().enumerate() {
            for j in 0..lengths.len() {
                let values = parameters.values_at(i, j)?;
                smiles.push(Arc::new(SabrSmileSection::from_layers(expiry, &values)?));
            }
        }
        Self::new(expiries, lengths, smiles)
    }

    /// Expiry axis.
    pub fn expiries(&self) -> &GridIndex {
        &self.expiries
    }

    /// Length axis.
    pub fn lengths(&self) -> &GridIndex {
        &self.lengths
    }

    /// Smile at grid position `(i, j)`.
    pub fn smile(&self, i: Size, j: Size) -> Option<&dyn SmileSection> {
        if j >= self.lengths.len() {
            return None;
        }
        self.smiles.get(i * self.lengths.len() + j).map(|s| &**s)
    }
}

// ── Moneyness-preserving spread interpolation ─────────────────────────────────

/// The 2×2 smiles bracketing a target cell, with their ATM forwards.
///
/// Index `[a][b]` refers to `(expiries[a], lengths[b])`.
#[derive(Debug, Clone, Copy)]
pub struct SpreadBracket<'a> {
    /// Bracketing expiries.
    pub expiries: [Time; 2],
    /// Bracketing lengths.
    pub lengths: [Time; 2],
    /// Bracketing smiles.
    pub smiles: [[&'a dyn SmileSection; 2]; 2],
    /// ATM forward of each bracketing cell.
    pub forwards: [[Rate; 2]; 2],
}

impl SpreadBracket<'_> {
    /// Volatility spread over ATM at `(expiry, length)` for the strike
    /// `forward + offset`.
    ///
    /// # Errors
    /// [`vc_core::Error::InvalidInput`] if the forward or the strike is not
    /// positive, so that moneyness is undefined.
    pub fn spread(
        &self,
        expiry: Time,
        length: Time,
        forward: Rate,
        offset: Spread,
    ) -> Result<Volatility> {
        let strike = forward + offset;
        ensure!(
            forward > 0.0 && strike > 0.0,
            InvalidInput,
            "moneyness undefined for forward {forward} and strike {strike}"
        );
        let moneyness = forward / strike;

        let spreads = DMatrix::from_fn(2, 2, |a, b| {
            let smile = self.smiles[a][b];
            let f = self.forwards[a][b];
            smile.volatility(f / moneyness) - smile.volatility(f)
        });
        BilinearInterpolation::new(&self.expiries, &self.lengths, &spreads, true)?
            .value(expiry, length)
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Fills an ATM reference grid with smile volatilities synthesised from
/// sparse smiles.
pub struct DensificationEngine<'a> {
    atm: &'a dyn AtmVolatilityStructure,
    forwards: &'a dyn ForwardRateProvider,
    strike_spreads: &'a [Spread],
    policy: BracketPolicy,
}

impl<'a> DensificationEngine<'a> {
    /// Create an engine using [`BracketPolicy::Enclosing`].
    pub fn new(
        atm: &'a dyn AtmVolatilityStructure,
        forwards: &'a dyn ForwardRateProvider,
        strike_spreads: &'a [Spread],
    ) -> Self {
        Self {
            atm,
            forwards,
            strike_spreads,
            policy: BracketPolicy::default(),
        }
    }

    /// Choose how target cells are bracketed by the sparse grid.
    pub fn with_bracket_policy(mut self, policy: BracketPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The 2×2 sparse smiles used for the cell `(expiry, length)`.
    pub fn bracket<'g>(
        &self,
        smiles: &'g SmileGrid,
        expiry: Time,
        length: Time,
    ) -> Result<SpreadBracket<'g>> {
        let i = smiles.expiries.bracket(expiry, self.policy);
        let j = smiles.lengths.bracket(length, self.policy);
        let e = [smiles.expiries.values()[i], smiles.expiries.values()[i + 1]];
        let l = [smiles.lengths.values()[j], smiles.lengths.values()[j + 1]];

        let mut forwards = [[0.0; 2]; 2];
        for (a, &ea) in e.iter().enumerate() {
            for (b, &lb) in l.iter().enumerate() {
                forwards[a][b] = self.forwards.fair_forward_rate(ea, lb)?;
            }
        }
        let n = smiles.lengths.len();
        let at = move |a: Size, b: Size| -> &'g dyn SmileSection {
            &*smiles.smiles[(i + a) * n + j + b]
        };
        Ok(SpreadBracket {
            expiries: e,
            lengths: l,
            smiles: [[at(0, 0), at(0, 1)], [at(1, 0), at(1, 1)]],
            forwards,
        })
    }

    /// Synthetic volatilities at `(expiry, length)`, one per strike offset.
    pub fn cell_volatilities(
        &self,
        smiles: &SmileGrid,
        expiry: Time,
        length: Time,
    ) -> Result<Vec<Volatility>> {
        let forward = self.forwards.fair_forward_rate(expiry, length)?;
        let atm_vol = self.atm.volatility(expiry, length, forward)?;
        let bracket = self.bracket(smiles, expiry, length)?;
        self.strike_spreads
            .iter()
            .map(|&offset| Ok(atm_vol + bracket.spread(expiry, length, forward, offset)?))
            .collect()
    }

    /// Extend `sparse_vols` (one layer per strike offset) to the union of its
    /// grid and the ATM reference grid.
    ///
    /// Sparse nodes keep their market values; every other cell of the union
    /// grid is synthesised from `smiles`.  The returned cube is refreshed.
    pub fn densify(&self, sparse_vols: &LayeredCube, smiles: &SmileGrid) -> Result<LayeredCube> {
        ensure!(
            sparse_vols.n_layers() == self.strike_spreads.len(),
            DimensionMismatch,
            "volatility cube has {} layers for {} strike spreads",
            sparse_vols.n_layers(),
            self.strike_spreads.len()
        );

        let mut union_expiries = sparse_vols.expiries().clone();
        for &e in self.atm.native_expiries() {
            union_expiries.insert(e)?;
        }
        let mut union_lengths = sparse_vols.lengths().clone();
        for &l in self.atm.native_lengths() {
            union_lengths.insert(l)?;
        }

        let mut dense = sparse_vols.clone();
        let mut synthesised = 0usize;
        for &e in union_expiries.values() {
            let sparse_expiry = sparse_vols.expiries().contains(e);
            for &l in union_lengths.values() {
                if sparse_expiry && sparse_vols.lengths().contains(l) {
                    continue;
                }
                let vols = self.cell_volatilities(smiles, e, l)?;
                debug!(expiry = e, length = l, "synthesised smile");
                dense.set_point(e, l, &vols)?;
                synthesised += 1;
            }
        }
        dense.refresh()?;

        info!(
            expiries = dense.expiries().len(),
            lengths = dense.lengths().len(),
            synthesised,
            policy = ?self.policy,
            "densified volatility cube"
        );
        Ok(dense)
    }
}
