//! Generalized Cauchy point.
//!
//! Starting from a feasible `x` with gradient `g`, the projected
//! steepest-descent path `x(t) = P(x − t·g)` is piecewise linear, with a kink
//! at every breakpoint `t_i` where coordinate `i` reaches the bound it moves
//! toward. Along this path the quadratic model
//!
//! ```text
//! m(z) = gᵀ(z − x) + ½ (z − x)ᵀ B (z − x),   B = θI − W M Wᵀ
//! ```
//!
//! is piecewise quadratic. The sweep visits breakpoints in increasing order
//! and keeps the first derivative `f′` and second derivative `f″` of the
//! model on the current segment, together with `p = Wᵀd` and `c = Wᵀ(z − x)`,
//! updated in `O(k)` per breakpoint. It stops at the first segment that
//! contains a local minimizer, or when every coordinate is pinned.
//!
//! Ties between equal breakpoints are resolved by coordinate index, so the
//! result does not depend on the sort implementation.

use crate::compact::CompactRepresentation;
use boxopt_core::{
    bounds::Bounds,
    types::{DVector, Scalar},
};
use num_traits::Float;
use std::cmp::Ordering;

/// Below this dimension the data-parallel parts always run sequentially.
#[cfg(feature = "parallel")]
pub const PARALLEL_THRESHOLD: usize = 4096;

/// Result of the breakpoint sweep.
#[derive(Debug, Clone)]
pub struct CauchyPoint<T: Scalar> {
    /// The generalized Cauchy point `x_c`
    pub point: DVector<T>,

    /// `c = Wᵀ(x_c − x)`, consumed by the subspace minimization
    pub c: DVector<T>,

    /// Path parameter at which the sweep stopped
    pub path_length: T,

    /// `pinned[i]` is true if coordinate `i` was swept onto its bound
    pub pinned: Vec<bool>,

    /// Number of coordinates pinned to a bound during the sweep
    pub breakpoints_swept: usize,
}

/// Time at which coordinate `i` reaches the bound it moves toward along `−g`.
#[inline]
fn breakpoint<T: Scalar>(xi: T, gi: T, li: T, ui: T) -> T {
    if gi < T::zero() {
        (xi - ui) / gi
    } else if gi > T::zero() {
        (xi - li) / gi
    } else {
        <T as Float>::infinity()
    }
}

fn breakpoints<T: Scalar>(x: &DVector<T>, g: &DVector<T>, bounds: &Bounds<T>) -> Vec<T> {
    let (lower, upper) = (bounds.lower(), bounds.upper());

    #[cfg(feature = "parallel")]
    if x.len() >= PARALLEL_THRESHOLD {
        use rayon::prelude::*;
        return (0..x.len())
            .into_par_iter()
            .map(|i| breakpoint(x[i], g[i], lower[i], upper[i]))
            .collect();
    }

    (0..x.len())
        .map(|i| breakpoint(x[i], g[i], lower[i], upper[i]))
        .collect()
}

/// Minimizer offset of the one-dimensional model `f′·t + ½ f″·t²`.
#[inline]
fn segment_minimizer<T: Scalar>(f1: T, f2: T) -> T {
    if f2 > T::zero() {
        -f1 / f2
    } else if f1 < T::zero() {
        <T as Float>::infinity()
    } else {
        T::zero()
    }
}

/// Computes the generalized Cauchy point of the model at `x`.
///
/// `x` must be feasible and `g` finite; both must have the dimension of
/// `bounds`. Pinned coordinates are set exactly to their bound and a
/// coordinate with zero gradient is never pinned.
pub fn generalized_cauchy_point<T: Scalar>(
    x: &DVector<T>,
    g: &DVector<T>,
    bounds: &Bounds<T>,
    representation: &CompactRepresentation<T>,
) -> CauchyPoint<T> {
    let n = x.len();
    let theta = representation.theta();
    let w = representation.w();
    let m = representation.m();

    let t = breakpoints(x, g, bounds);
    let mut d = DVector::from_fn(n, |i, _| if t[i] > T::zero() { -g[i] } else { T::zero() });

    let mut order: Vec<usize> = (0..n)
        .filter(|&i| t[i] > T::zero() && Float::is_finite(t[i]))
        .collect();
    order.sort_by(|&a, &b| {
        t[a].partial_cmp(&t[b])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut point = x.clone();
    let mut pinned = vec![false; n];
    let mut p = w.tr_mul(&d);
    let mut c = DVector::zeros(w.ncols());

    let mut f1 = -d.dot(&d);
    let mut f2 = -theta * f1 - p.dot(&(m * &p));
    let mut dt_min = segment_minimizer(f1, f2);
    let mut t_old = T::zero();
    let mut swept = 0;

    for &b in &order {
        let dt = t[b] - t_old;
        if dt_min < dt {
            break;
        }

        let gb = g[b];
        let bound = if d[b] > T::zero() {
            bounds.upper()[b]
        } else {
            bounds.lower()[b]
        };
        let zb = bound - x[b];
        point[b] = bound;
        pinned[b] = true;

        c += &p * dt;
        let wb = w.row(b).transpose();
        let m_wb = m * &wb;

        f1 = f1 + dt * f2 + gb * gb + theta * gb * zb - gb * m_wb.dot(&c);
        f2 = f2 - theta * gb * gb - (gb + gb) * m_wb.dot(&p) - gb * gb * m_wb.dot(&wb);
        p += &wb * gb;
        d[b] = T::zero();

        dt_min = segment_minimizer(f1, f2);
        t_old = t[b];
        swept += 1;
    }

    if !Float::is_finite(dt_min) {
        dt_min = T::zero();
    }
    dt_min = Float::max(dt_min, T::zero());
    t_old = t_old + dt_min;

    assign_free_coordinates(&mut point, x, &d, &pinned, t_old, bounds);
    c += &p * dt_min;

    log::trace!(
        "cauchy point: {swept} of {} breakpoints swept, path length {:e}",
        order.len(),
        Scalar::to_f64(t_old)
    );

    CauchyPoint {
        point,
        c,
        path_length: t_old,
        pinned,
        breakpoints_swept: swept,
    }
}

/// `x_c[i] = P(x[i] + t·d[i])` for every coordinate that was not pinned.
fn assign_free_coordinates<T: Scalar>(
    point: &mut DVector<T>,
    x: &DVector<T>,
    d: &DVector<T>,
    pinned: &[bool],
    t: T,
    bounds: &Bounds<T>,
) {
    #[cfg(feature = "parallel")]
    if point.len() >= PARALLEL_THRESHOLD {
        use rayon::prelude::*;
        point
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .filter(|(i, _)| !pinned[*i])
            .for_each(|(i, xi)| *xi = bounds.clamp(i, x[i] + t * d[i]));
        return;
    }

    for i in (0..point.len()).filter(|&i| !pinned[i]) {
        point[i] = bounds.clamp(i, x[i] + t * d[i]);
    }
}
