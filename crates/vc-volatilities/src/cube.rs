//! Layered cube: several expiry × length matrices sharing one pair of axes.
//!
//! Each layer is an `nalgebra` matrix with rows indexed by option expiry and
//! columns by swap length.  A bilinear interpolator is kept per layer; any
//! write marks the interpolators stale and [`LayeredCube::query`] refuses to
//! answer until [`LayeredCube::refresh`] has rebuilt them.

use nalgebra::DMatrix;
use tracing::trace;
use vc_core::{ensure, errors::Result, Error, Real, Size, Time};
use vc_math::{BilinearInterpolation, Interpolation2D};

use crate::grid::GridIndex;

/// A stack of expiry × length matrices with bilinear interpolation.
#[derive(Debug, Clone)]
pub struct LayeredCube {
    expiries: GridIndex,
    lengths: GridIndex,
    layers: Vec<DMatrix<Real>>,
    extrapolate: bool,
    interpolators: Vec<BilinearInterpolation>,
    stale: bool,
}

impl LayeredCube {
    /// Build a zero-filled cube with `n_layers` layers on the given axes.
    /// The interpolators are built, so the new cube can be queried at once.
    ///
    /// # Errors
    /// [`Error::InvalidGrid`] if either axis is invalid, and
    /// [`Error::InvalidInput`] if `n_layers` is zero.
    pub fn new(
        expiries: &[Time],
        lengths: &[Time],
        n_layers: Size,
        extrapolate: bool,
    ) -> Result<Self> {
        ensure!(n_layers > 0, InvalidInput, "a cube needs at least one layer");
        let expiries = GridIndex::new(expiries.to_vec())?;
        let lengths = GridIndex::new(lengths.to_vec())?;
        let layers = vec![DMatrix::zeros(expiries.len(), lengths.len()); n_layers];
        let mut cube = Self {
            expiries,
            lengths,
            layers,
            extrapolate,
            interpolators: Vec::new(),
            stale: true,
        };
        cube.refresh()?;
        Ok(cube)
    }

    /// Option-expiry axis.
    pub fn expiries(&self) -> &GridIndex {
        &self.expiries
    }

    /// Swap-length axis.
    pub fn lengths(&self) -> &GridIndex {
        &self.lengths
    }

    /// Number of layers.
    pub fn n_layers(&self) -> Size {
        self.layers.len()
    }

    /// Whether queries outside the grid extrapolate.
    pub fn extrapolate(&self) -> bool {
        self.extrapolate
    }

    /// Whether a write happened since the last [`refresh`](Self::refresh).
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// All layers.
    pub fn layers(&self) -> &[DMatrix<Real>] {
        &self.layers
    }

    /// Layer `k`.
    pub fn layer(&self, k: Size) -> Result<&DMatrix<Real>> {
        self.layers.get(k).ok_or(Error::IndexOutOfRange {
            index: k,
            size: self.layers.len(),
        })
    }

    /// Stored value of layer `k` at grid position `(i, j)`.
    pub fn element(&self, k: Size, i: Size, j: Size) -> Result<Real> {
        let layer = self.layer(k)?;
        self.check_position(i, j)?;
        Ok(layer[(i, j)])
    }

    /// Overwrite the value of layer `k` at grid position `(i, j)`.
    pub fn set_element(&mut self, k: Size, i: Size, j: Size, value: Real) -> Result<()> {
        self.check_position(i, j)?;
        let size = self.layers.len();
        let layer = self
            .layers
            .get_mut(k)
            .ok_or(Error::IndexOutOfRange { index: k, size })?;
        layer[(i, j)] = value;
        self.stale = true;
        Ok(())
    }

    /// Replace layer `k` wholesale.
    ///
    /// # Errors
    /// [`Error::IndexOutOfRange`] for a bad layer index and
    /// [`Error::DimensionMismatch`] if `values` is not expiries × lengths.
    pub fn set_layer(&mut self, k: Size, values: DMatrix<Real>) -> Result<()> {
        self.check_shape(&values)?;
        let size = self.layers.len();
        let layer = self
            .layers
            .get_mut(k)
            .ok_or(Error::IndexOutOfRange { index: k, size })?;
        *layer = values;
        self.stale = true;
        Ok(())
    }

    /// Replace every layer at once.
    ///
    /// Nothing is written unless the layer count and every shape match.
    pub fn set_layers(&mut self, layers: Vec<DMatrix<Real>>) -> Result<()> {
        ensure!(
            layers.len() == self.layers.len(),
            DimensionMismatch,
            "expected {} layers, got {}",
            self.layers.len(),
            layers.len()
        );
        for layer in &layers {
            self.check_shape(layer)?;
        }
        self.layers = layers;
        self.stale = true;
        Ok(())
    }

    /// Write one value per layer at `(expiry, length)`.
    ///
    /// Coordinates not yet on the grid are inserted, growing every layer by
    /// a zero-filled row or column.  Returns the grid position written.
    ///
    /// # Errors
    /// [`Error::DimensionMismatch`] if `values` does not hold one value per
    /// layer; [`Error::InvalidGrid`] for non-finite coordinates.  The cube
    /// is unchanged on error.
    pub fn set_point(
        &mut self,
        expiry: Time,
        length: Time,
        values: &[Real],
    ) -> Result<(Size, Size)> {
        ensure!(
            values.len() == self.layers.len(),
            DimensionMismatch,
            "expected {} values, got {}",
            self.layers.len(),
            values.len()
        );
        ensure!(
            expiry.is_finite() && length.is_finite(),
            InvalidGrid,
            "cannot insert point ({expiry}, {length})"
        );

        let (i, new_row) = self.expiries.insert(expiry)?;
        if new_row {
            trace!(expiry, row = i, "inserting expiry row");
            self.layers = std::mem::take(&mut self.layers)
                .into_iter()
                .map(|m| m.insert_row(i, 0.0))
                .collect();
        }
        let (j, new_column) = self.lengths.insert(length)?;
        if new_column {
            trace!(length, column = j, "inserting length column");
            self.layers = std::mem::take(&mut self.layers)
                .into_iter()
                .map(|m| m.insert_column(j, 0.0))
                .collect();
        }

        for (layer, &v) in self.layers.iter_mut().zip(values) {
            layer[(i, j)] = v;
        }
        self.stale = true;
        Ok((i, j))
    }

    /// Stored value of layer `k` at an exact grid coordinate, if present.
    pub fn value_at(&self, k: Size, expiry: Time, length: Time) -> Option<Real> {
        let i = self.expiries.find(expiry)?;
        let j = self.lengths.find(length)?;
        self.layers.get(k).map(|m| m[(i, j)])
    }

    /// Stored values of every layer at grid position `(i, j)`.
    pub fn values_at(&self, i: Size, j: Size) -> Result<Vec<Real>> {
        self.check_position(i, j)?;
        Ok(self.layers.iter().map(|m| m[(i, j)]).collect())
    }

    /// Rebuild the per-layer interpolators from the current data.
    pub fn refresh(&mut self) -> Result<()> {
        let interpolators = self
            .layers
            .iter()
            .map(|m| {
                BilinearInterpolation::new(
                    self.expiries.values(),
                    self.lengths.values(),
                    m,
                    self.extrapolate,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        self.interpolators = interpolators;
        self.stale = false;
        Ok(())
    }

    /// Interpolated value of every layer at `(expiry, length)`.
    ///
    /// # Errors
    /// [`Error::Precondition`] if the cube was written since the last
    /// refresh; [`Error::OutOfDomain`] outside the grid when extrapolation is
    /// disabled.
    pub fn query(&self, expiry: Time, length: Time) -> Result<Vec<Real>> {
        ensure!(
            !self.stale,
            Precondition,
            "interpolators stale; call refresh()"
        );
        self.interpolators
            .iter()
            .map(|interp| interp.value(expiry, length))
            .collect()
    }

    fn check_position(&self, i: Size, j: Size) -> Result<()> {
        if i >= self.expiries.len() {
            return Err(Error::IndexOutOfRange {
                index: i,
                size: self.expiries.len(),
            });
        }
        if j >= self.lengths.len() {
            return Err(Error::IndexOutOfRange {
                index: j,
                size: self.lengths.len(),
            });
        }
        Ok(())
    }

    fn check_shape(&self, values: &DMatrix<Real>) -> Result<()> {
        ensure!(
            values.nrows() == self.expiries.len() && values.ncols() == self.lengths.len(),
            DimensionMismatch,
            "layer is {}×{}, grid is {}×{}",
            values.nrows(),
            values.ncols(),
            self.expiries.len(),
            self.lengths.len()
        );
        Ok(())
    }
}
