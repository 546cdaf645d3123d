//! Dense LU factorization with partial pivoting.
//!
//! All buffers are allocated once for a system size; `factor` and `solve`
//! never allocate, so both can run on the audio thread.

/// Pivot magnitude below which the matrix is treated as singular.
pub const PIVOT_THRESHOLD: f64 = 1e-15;

/// The matrix has no usable pivot in `column`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingularMatrix {
    pub column: usize,
}

/// LU decomposition `P·A = L·U` of a square row-major matrix.
#[derive(Debug, Clone)]
pub struct LuSolver {
    size: usize,
    lu: Vec<f64>,
    pivots: Vec<usize>,
    factored: bool,
}

impl LuSolver {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            lu: vec![0.0; size * size],
            pivots: (0..size).collect(),
            factored: false,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether a factorization is currently held.
    pub fn is_factored(&self) -> bool {
        self.factored
    }

    /// Drop the held factorization.
    pub fn invalidate(&mut self) {
        self.factored = false;
    }

    /// Perform LU decomposition with partial pivoting of `a` (row-major,
    /// `size × size`).
    pub fn factor(&mut self, a: &[f64]) -> Result<(), SingularMatrix> {
        let n = self.size;
        debug_assert_eq!(a.len(), n * n);
        self.factored = false;
        self.lu.copy_from_slice(a);

        for (i, p) in self.pivots.iter_mut().enumerate() {
            *p = i;
        }

        for k in 0..n {
            // Find pivot
            let mut max_val = self.lu[k * n + k].abs();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = self.lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val.is_nan() || max_val < PIVOT_THRESHOLD {
                return Err(SingularMatrix { column: k });
            }

            // Swap rows if needed
            if max_row != k {
                self.pivots.swap(k, max_row);
                for j in 0..n {
                    self.lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = self.lu[k * n + k];
            for i in (k + 1)..n {
                let factor = self.lu[i * n + k] / pivot;
                self.lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    self.lu[i * n + j] -= factor * self.lu[k * n + j];
                }
            }
        }

        self.factored = true;
        Ok(())
    }

    /// Solve `A·x = b` with the held factorization.
    pub fn solve(&self, b: &[f64], x: &mut [f64]) {
        let n = self.size;
        debug_assert!(self.factored);

        // Apply pivot permutation to b
        for i in 0..n {
            x[i] = b[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                x[i] -= self.lu[i * n + j] * x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                x[i] -= self.lu[i * n + j] * x[j];
            }
            x[i] /= self.lu[i * n + i];
        }
    }
}
