use ndarray::{Array2, Array4, Dimension};

/// Dense n x n partition-function matrix; only the upper triangle
/// (j >= i - 1) carries meaning.
pub type Mat = Array2<f64>;

/// Rank-4 tensor indexed (i, d, e, j) for the pseudoknot recurrences.
pub type Tensor4 = Array4<f64>;

/// Zeroed square matrix.
#[must_use]
pub fn square(n: usize) -> Mat {
    Array2::zeros((n, n))
}

/// Zeroed rank-4 tensor.
#[must_use]
pub fn tensor(n: usize) -> Tensor4 {
    Array4::zeros((n, n, n, n))
}

/// Three equally-shaped snapshots of one rolling DP tensor at consecutive
/// subsequence lengths.
///
/// `cur` is read during the current length sweep, `ahead` and `ahead2`
/// receive seeds for the next two sweeps. The arrays are rotated by
/// swapping, never aliased.
#[derive(Debug)]
pub struct Rolling<D: Dimension> {
    pub cur: ndarray::Array<f64, D>,
    pub ahead: ndarray::Array<f64, D>,
    pub ahead2: ndarray::Array<f64, D>,
}

impl<D: Dimension> Rolling<D> {
    pub fn new(shape: impl ndarray::ShapeBuilder<Dim = D> + Clone) -> Self {
        Self {
            cur: ndarray::Array::zeros(shape.clone()),
            ahead: ndarray::Array::zeros(shape.clone()),
            ahead2: ndarray::Array::zeros(shape),
        }
    }

    /// Advance one length: `cur <- ahead`, `ahead <- ahead2`,
    /// `ahead2 <- 0`. Must run serially before each length's sweep.
    pub fn advance(&mut self) {
        std::mem::swap(&mut self.cur, &mut self.ahead);
        std::mem::swap(&mut self.ahead, &mut self.ahead2);
        self.ahead2.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_rotates_without_aliasing() {
        let mut r: Rolling<ndarray::Ix2> = Rolling::new((3, 3));
        r.cur[[0, 0]] = 1.0;
        r.ahead[[0, 0]] = 2.0;
        r.ahead2[[0, 0]] = 3.0;
        r.advance();
        assert_eq!(r.cur[[0, 0]], 2.0);
        assert_eq!(r.ahead[[0, 0]], 3.0);
        assert_eq!(r.ahead2[[0, 0]], 0.0);
    }
}
