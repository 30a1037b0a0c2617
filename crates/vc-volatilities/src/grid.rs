//! Sorted coordinate axes for the cube (option expiries, swap lengths).

use vc_core::{ensure, errors::Result, Real, Size};
use vc_math::comparison::is_strictly_increasing;

/// How a query coordinate is mapped to the lower index of its bracketing
/// interval `[i, i + 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BracketPolicy {
    /// `i` is the last grid point `<= x`, clamped to `[0, n - 2]`.
    ///
    /// A coordinate strictly between two grid points is always enclosed by
    /// them; coordinates outside the grid use the boundary interval.
    #[default]
    Enclosing,
    /// `i` is the first grid point `>= x`, pulled back to `n - 2` when it
    /// lands on or past the last point.
    ///
    /// Interior coordinates are bracketed by the interval to their right,
    /// so they are extrapolated rather than interpolated.
    LowerBound,
}

/// A strictly increasing, finite sequence of at least two coordinates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GridIndex {
    values: Vec<Real>,
}

impl GridIndex {
    /// Build an index from strictly increasing finite values.
    ///
    /// # Errors
    /// [`vc_core::Error::InvalidGrid`] if fewer than two values are given,
    /// any value is not finite, or the values are not strictly increasing.
    pub fn new(values: Vec<Real>) -> Result<Self> {
        ensure!(
            values.len() >= 2,
            InvalidGrid,
            "need at least 2 grid points, got {}",
            values.len()
        );
        ensure!(
            values.iter().all(|v| v.is_finite()),
            InvalidGrid,
            "grid points must be finite"
        );
        ensure!(
            is_strictly_increasing(&values),
            InvalidGrid,
            "grid points must be strictly increasing"
        );
        Ok(Self { values })
    }

    /// The coordinates, in increasing order.
    pub fn values(&self) -> &[Real] {
        &self.values
    }

    /// Number of coordinates.
    pub fn len(&self) -> Size {
        self.values.len()
    }

    /// `false` for every valid index, which holds at least two coordinates.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Coordinate at position `i`.
    pub fn get(&self, i: Size) -> Option<Real> {
        self.values.get(i).copied()
    }

    /// Position of a coordinate exactly equal to `x`.
    pub fn find(&self, x: Real) -> Option<Size> {
        self.values.binary_search_by(|v| v.total_cmp(&x)).ok()
    }

    /// Whether `x` is one of the coordinates.
    pub fn contains(&self, x: Real) -> bool {
        self.find(x).is_some()
    }

    /// Position of the first coordinate `>= x` (`len()` if none).
    pub fn lower_bound(&self, x: Real) -> Size {
        self.values.partition_point(|&v| v < x)
    }

    /// Insert `x`, keeping the index sorted.
    ///
    /// Returns the position of `x` and whether a new coordinate was added.
    ///
    /// # Errors
    /// [`vc_core::Error::InvalidGrid`] if `x` is not finite.
    pub fn insert(&mut self, x: Real) -> Result<(Size, bool)> {
        ensure!(x.is_finite(), InvalidGrid, "cannot insert grid point {x}");
        if let Some(i) = self.find(x) {
            return Ok((i, false));
        }
        let i = self.lower_bound(x);
        self.values.insert(i, x);
        Ok((i, true))
    }

    /// Lower index `i` of the interval `[i, i + 1]` used to interpolate at `x`.
    ///
    /// The result is always in `[0, len() - 2]`.
    pub fn bracket(&self, x: Real, policy: BracketPolicy) -> Size {
        let n = self.values.len();
        match policy {
            BracketPolicy::Enclosing => {
                if x <= self.values[0] {
                    0
                } else if x >= self.values[n - 1] {
                    n - 2
                } else {
                    self.values.partition_point(|&v| v <= x) - 1
                }
            }
            BracketPolicy::LowerBound => self.lower_bound(x).min(n - 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vc_core::Error;

    fn expiries() -> GridIndex {
        GridIndex::new(vec![1.0, 2.0, 5.0, 10.0]).unwrap()
    }

    #[test]
    fn rejects_short_unsorted_or_non_finite_grids() {
        assert!(matches!(GridIndex::new(vec![1.0]), Err(Error::InvalidGrid(_))));
        assert!(matches!(
            GridIndex::new(vec![1.0, 1.0]),
            Err(Error::InvalidGrid(_))
        ));
        assert!(matches!(
            GridIndex::new(vec![2.0, 1.0]),
            Err(Error::InvalidGrid(_))
        ));
        assert!(matches!(
            GridIndex::new(vec![1.0, Real::NAN]),
            Err(Error::InvalidGrid(_))
        ));
    }

    #[test]
    fn exact_lookup() {
        let g = expiries();
        assert_eq!(g.len(), 4);
        assert!(!g.is_empty());
        assert_eq!(g.find(5.0), Some(2));
        assert_eq!(g.find(4.0), None);
        assert!(g.contains(10.0));
        assert_eq!(g.lower_bound(4.0), 2);
        assert_eq!(g.lower_bound(11.0), 4);
    }

    #[test]
    fn insert_keeps_order() {
        let mut g = expiries();
        assert_eq!(g.insert(3.0).unwrap(), (2, true));
        assert_eq!(g.insert(0.5).unwrap(), (0, true));
        assert_eq!(g.insert(30.0).unwrap(), (6, true));
        assert_eq!(g.insert(5.0).unwrap(), (4, false));
        assert_eq!(g.values(), &[0.5, 1.0, 2.0, 3.0, 5.0, 10.0, 30.0]);
        assert!(g.insert(Real::INFINITY).is_err());
    }

    #[test]
    fn enclosing_bracket() {
        let g = expiries();
        assert_eq!(g.bracket(0.1, BracketPolicy::Enclosing), 0);
        assert_eq!(g.bracket(1.0, BracketPolicy::Enclosing), 0);
        assert_eq!(g.bracket(1.5, BracketPolicy::Enclosing), 0);
        assert_eq!(g.bracket(2.0, BracketPolicy::Enclosing), 1);
        assert_eq!(g.bracket(7.0, BracketPolicy::Enclosing), 2);
        assert_eq!(g.bracket(10.0, BracketPolicy::Enclosing), 2);
        assert_eq!(g.bracket(50.0, BracketPolicy::Enclosing), 2);
    }

    #[test]
    fn lower_bound_bracket() {
        let g = expiries();
        assert_eq!(g.bracket(0.1, BracketPolicy::LowerBound), 0);
        assert_eq!(g.bracket(1.5, BracketPolicy::LowerBound), 1);
        assert_eq!(g.bracket(2.0, BracketPolicy::LowerBound), 1);
        assert_eq!(g.bracket(7.0, BracketPolicy::LowerBound), 2);
        assert_eq!(g.bracket(50.0, BracketPolicy::LowerBound), 2);
    }
}
