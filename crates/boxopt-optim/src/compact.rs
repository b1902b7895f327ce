//! Limited-memory BFGS matrix in compact form.
//!
//! The quasi-Newton approximation of the Hessian is never formed. With the
//! `k ≤ m` most recent correction pairs stored as columns of `S` and `Y`, it
//! is represented as
//!
//! ```text
//! B = θ·I − W · M · Wᵀ
//! W = [Y, θ·S]                         (n × 2k)
//! M = [[−D, Lᵀ], [L, θ·SᵀS]]⁻¹         (2k × 2k)
//! ```
//!
//! where `D = diag(SᵀY)` and `L` is the strictly lower triangular part of
//! `SᵀY`. `θ = yᵀy / yᵀs` is taken from the newest pair.
//!
//! A pair is stored only if it passes the curvature test `sᵀy > ε‖y‖₂`.
//! After each accepted pair the whole representation is rebuilt from the
//! stored pairs. If the block matrix turns out singular, the history is
//! dropped and the representation falls back to the identity (`θ = 1`,
//! empty `W` and `M`).

use boxopt_core::{
    numerical::checked_inverse,
    types::{DMatrix, DVector, Scalar},
};
use std::collections::VecDeque;

/// Fixed-capacity FIFO of correction pairs `(s, y)`.
#[derive(Debug, Clone)]
pub struct CorrectionHistory<T: Scalar> {
    capacity: usize,
    pairs: VecDeque<(DVector<T>, DVector<T>)>,
}

impl<T: Scalar> CorrectionHistory<T> {
    /// Creates an empty history holding at most `capacity` pairs.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pairs: VecDeque::with_capacity(capacity),
        }
    }

    /// Maximum number of stored pairs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True if no pair is stored.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Appends a pair, evicting the oldest one when full.
    pub fn push(&mut self, s: DVector<T>, y: DVector<T>) {
        if self.capacity == 0 {
            return;
        }
        if self.pairs.len() == self.capacity {
            self.pairs.pop_front();
        }
        self.pairs.push_back((s, y));
    }

    /// Drops every stored pair.
    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Stored pairs, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (&DVector<T>, &DVector<T>)> {
        self.pairs.iter().map(|(s, y)| (s, y))
    }

    /// Most recently stored pair.
    pub fn newest(&self) -> Option<(&DVector<T>, &DVector<T>)> {
        self.pairs.back().map(|(s, y)| (s, y))
    }

    /// `S` as an `n × k` matrix, oldest pair in column 0.
    pub fn s_matrix(&self, n: usize) -> DMatrix<T> {
        DMatrix::from_fn(n, self.pairs.len(), |i, j| self.pairs[j].0[i])
    }

    /// `Y` as an `n × k` matrix, oldest pair in column 0.
    pub fn y_matrix(&self, n: usize) -> DMatrix<T> {
        DMatrix::from_fn(n, self.pairs.len(), |i, j| self.pairs[j].1[i])
    }
}

/// The `(θ, W, M)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactRepresentation<T: Scalar> {
    theta: T,
    w: DMatrix<T>,
    m: DMatrix<T>,
}

impl<T: Scalar> CompactRepresentation<T> {
    /// `B = I`: `θ = 1` with empty `W` (`n × 0`) and `M` (`0 × 0`).
    pub fn identity(n: usize) -> Self {
        Self {
            theta: T::one(),
            w: DMatrix::zeros(n, 0),
            m: DMatrix::zeros(0, 0),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(theta: T, w: DMatrix<T>, m: DMatrix<T>) -> Self {
        Self { theta, w, m }
    }

    /// Scaling factor `θ`.
    pub fn theta(&self) -> T {
        self.theta
    }

    /// `W = [Y, θS]`.
    pub fn w(&self) -> &DMatrix<T> {
        &self.w
    }

    /// Middle matrix `M`.
    pub fn m(&self) -> &DMatrix<T> {
        &self.m
    }

    /// Number of columns of `W` (twice the number of stored pairs).
    pub fn columns(&self) -> usize {
        self.w.ncols()
    }

    /// Computes `B·v = θv − W·M·Wᵀv`.
    pub fn apply(&self, v: &DVector<T>) -> DVector<T> {
        let wtv = self.w.tr_mul(v);
        let mwtv = &self.m * wtv;
        v * self.theta - &self.w * mwtv
    }
}

/// Outcome of offering a correction pair to [`LimitedMemory::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The pair was stored and the representation rebuilt.
    Accepted,
    /// The pair failed the curvature test; nothing changed.
    Rejected,
    /// The rebuilt block matrix was singular; history and representation were reset.
    Reset,
}

/// Correction history plus the compact representation built from it.
#[derive(Debug, Clone)]
pub struct LimitedMemory<T: Scalar> {
    dimension: usize,
    history: CorrectionHistory<T>,
    representation: CompactRepresentation<T>,
}

impl<T: Scalar> LimitedMemory<T> {
    /// Creates an empty memory of capacity `memory_size` for dimension `n`.
    pub fn new(n: usize, memory_size: usize) -> Self {
        Self {
            dimension: n,
            history: CorrectionHistory::new(memory_size),
            representation: CompactRepresentation::identity(n),
        }
    }

    /// Stored correction pairs.
    pub fn history(&self) -> &CorrectionHistory<T> {
        &self.history
    }

    /// Current `(θ, W, M)`.
    pub fn representation(&self) -> &CompactRepresentation<T> {
        &self.representation
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// True if no pair is stored.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Forgets all pairs and returns to `B = I`.
    pub fn reset(&mut self) {
        self.history.clear();
        self.representation = CompactRepresentation::identity(self.dimension);
    }

    /// Curvature test `sᵀy > ε‖y‖₂`.
    pub fn satisfies_curvature(s: &DVector<T>, y: &DVector<T>) -> bool {
        s.dot(y) > T::EPSILON * y.norm()
    }

    /// Offers the pair `s = x_new − x_old`, `y = g_new − g_old`.
    pub fn update(&mut self, s: DVector<T>, y: DVector<T>) -> UpdateOutcome {
        if !Self::satisfies_curvature(&s, &y) {
            log::trace!(
                "rejected correction pair: s'y = {:e}, |y| = {:e}",
                Scalar::to_f64(s.dot(&y)),
                Scalar::to_f64(y.norm())
            );
            return UpdateOutcome::Rejected;
        }

        self.history.push(s, y);
        self.rebuild()
    }

    fn rebuild(&mut self) -> UpdateOutcome {
        let n = self.dimension;
        let k = self.history.len();
        let Some((s_new, y_new)) = self.history.newest() else {
            self.representation = CompactRepresentation::identity(n);
            return UpdateOutcome::Accepted;
        };
        let theta = y_new.dot(y_new) / y_new.dot(s_new);

        let s = self.history.s_matrix(n);
        let y = self.history.y_matrix(n);

        let mut w = DMatrix::zeros(n, 2 * k);
        w.columns_mut(0, k).copy_from(&y);
        w.columns_mut(k, k).copy_from(&(&s * theta));

        let sy = s.tr_mul(&y);
        let ss = s.tr_mul(&s);

        let mut block = DMatrix::zeros(2 * k, 2 * k);
        for i in 0..k {
            block[(i, i)] = -sy[(i, i)];
            for j in 0..i {
                // L in the lower-left block, Lᵀ in the upper-right one.
                block[(k + i, j)] = sy[(i, j)];
                block[(j, k + i)] = sy[(i, j)];
            }
        }
        block.view_mut((k, k), (k, k)).copy_from(&(ss * theta));

        match checked_inverse(&block) {
            Ok(m) => {
                self.representation = CompactRepresentation { theta, w, m };
                UpdateOutcome::Accepted
            }
            Err(err) => {
                log::warn!("compact representation reset to identity: {err}");
                self.reset();
                UpdateOutcome::Reset
            }
        }
    }
}
