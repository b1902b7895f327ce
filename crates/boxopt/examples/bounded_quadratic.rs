//! Example: a two-dimensional quadratic with one bounded variable
//!
//! Minimizes f(x) = xᵀAx + bᵀx with A = [[3, 3.1], [3.1, 10]] and
//! b = [1, 3], keeping x1 ≥ 0 while x0 is free. The unconstrained
//! minimizer has x1 < 0, so the bound becomes active.

use boxopt::prelude::*;

/// Prints the objective every iteration.
struct Trace;

impl OptimizationCallback<f64> for Trace {
    fn on_iteration_end(&mut self, info: &CallbackInfo<'_, f64>) -> Result<bool> {
        println!(
            "  iter {:>3}  f = {:>12.8}  |pg| = {:.3e}  step = {:.3e}  free = {}",
            info.iteration, info.value, info.gradient_norm, info.step_size, info.free_variables
        );
        Ok(true)
    }
}

fn main() -> Result<()> {
    println!("Bounded quadratic with L-BFGS-B");
    println!("===============================\n");

    let a = DMatrix::from_row_slice(2, 2, &[3.0, 3.1, 3.1, 10.0]);
    let b = DVector::from_vec(vec![1.0, 3.0]);
    let cost = QuadraticCost::new(a.clone(), b.clone())?;

    let unconstrained = a.try_inverse().map(|inv| inv * &b * -0.5);
    if let Some(x) = &unconstrained {
        println!("Unconstrained minimizer: [{:.6}, {:.6}]", x[0], x[1]);
    }

    let lower = DVector::from_vec(vec![f64::NEG_INFINITY, 0.0]);
    let upper = DVector::from_element(2, f64::INFINITY);
    let config = LBFGSBConfig::new()
        .with_memory_size(5)
        .with_gradient_tolerance(1e-8);
    let mut solver = LBFGSB::with_config(lower, upper, config)?;

    let mut x = DVector::from_vec(vec![0.3, 0.3]);
    println!("Starting point:          [{:.6}, {:.6}]\n", x[0], x[1]);

    let result = solver.solve_with_callback(&mut x, &cost, &mut Trace)?;

    println!("\nTermination:  {}", result.termination_reason);
    println!("Solution:     [{:.8}, {:.8}]", x[0], x[1]);
    println!("Objective:    {:.10}", result.value);
    println!("|pg|_inf:     {:.3e}", result.gradient_norm);
    println!(
        "Evaluations:  {} objective, {} gradient in {:?}",
        result.function_evaluations, result.gradient_evaluations, result.duration
    );

    Ok(())
}
