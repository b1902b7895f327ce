//! Callback support for optimization algorithms.
//!
//! This module provides traits and types for implementing callbacks that can
//! monitor and control the optimization process.

use crate::error::Result;
use crate::types::{DVector, Scalar};
use std::time::Duration;

/// Snapshot of the solver state handed to callbacks.
#[derive(Clone, Debug)]
pub struct CallbackInfo<'a, T: Scalar> {
    /// Completed iterations (0 before the first step)
    pub iteration: usize,

    /// Current iterate
    pub point: &'a DVector<T>,

    /// Objective value at the current iterate
    pub value: T,

    /// Gradient at the current iterate
    pub gradient: &'a DVector<T>,

    /// Projected-gradient infinity norm at the current iterate
    pub gradient_norm: T,

    /// Step accepted by the last line search (zero before the first step)
    pub step_size: T,

    /// Free variables at the last Cauchy point
    pub free_variables: usize,

    /// Elapsed time since optimization start
    pub elapsed: Duration,

    /// Whether convergence has been achieved
    pub converged: bool,
}

/// Trait for optimization callbacks.
///
/// Callbacks allow monitoring and controlling the optimization process.
/// They can be used for logging, recording the iterate trace, early stopping.
pub trait OptimizationCallback<T: Scalar>: Send {
    /// Called once with the starting point, after its first evaluation.
    fn on_optimization_start(&mut self, info: &CallbackInfo<'_, T>) -> Result<()> {
        let _ = info;
        Ok(())
    }

    /// Called at the end of each iteration.
    ///
    /// Returns `true` to continue optimization, `false` to stop early.
    fn on_iteration_end(&mut self, info: &CallbackInfo<'_, T>) -> Result<bool> {
        let _ = info;
        Ok(true)
    }

    /// Called at the end of optimization.
    fn on_optimization_end(&mut self, info: &CallbackInfo<'_, T>) -> Result<()> {
        let _ = info;
        Ok(())
    }
}

/// A no-op callback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl<T: Scalar> OptimizationCallback<T> for NoOpCallback {}

/// Logs progress through the `log` facade every `log_every` iterations.
#[derive(Debug, Clone)]
pub struct LoggingCallback {
    log_every: usize,
}

impl LoggingCallback {
    /// Create a new progress logging callback.
    pub fn new(log_every: usize) -> Self {
        Self {
            log_every: log_every.max(1),
        }
    }
}

impl<T: Scalar> OptimizationCallback<T> for LoggingCallback {
    fn on_optimization_start(&mut self, info: &CallbackInfo<'_, T>) -> Result<()> {
        log::info!(
            "starting optimization: f = {:e}, |pg|_inf = {:e}",
            Scalar::to_f64(info.value),
            Scalar::to_f64(info.gradient_norm)
        );
        Ok(())
    }

    fn on_iteration_end(&mut self, info: &CallbackInfo<'_, T>) -> Result<bool> {
        if info.iteration % self.log_every == 0 {
            log::info!(
                "iteration {}: f = {:e}, |pg|_inf = {:e}, step = {:e}, free = {}",
                info.iteration,
                Scalar::to_f64(info.value),
                Scalar::to_f64(info.gradient_norm),
                Scalar::to_f64(info.step_size),
                info.free_variables
            );
        }
        Ok(true)
    }

    fn on_optimization_end(&mut self, info: &CallbackInfo<'_, T>) -> Result<()> {
        log::info!(
            "optimization finished after {} iterations in {:?}: f = {:e}",
            info.iteration,
            info.elapsed,
            Scalar::to_f64(info.value)
        );
        Ok(())
    }
}

/// Records every accepted iterate and its objective value.
///
/// The first entry is the starting point.
#[derive(Debug, Clone, Default)]
pub struct IterateRecorder<T: Scalar> {
    points: Vec<DVector<T>>,
    values: Vec<T>,
}

impl<T: Scalar> IterateRecorder<T> {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Recorded iterates, oldest first.
    pub fn points(&self) -> &[DVector<T>] {
        &self.points
    }

    /// Recorded objective values, oldest first.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Number of recorded iterates.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn record(&mut self, info: &CallbackInfo<'_, T>) {
        self.points.push(info.point.clone());
        self.values.push(info.value);
    }
}

impl<T: Scalar> OptimizationCallback<T> for IterateRecorder<T> {
    fn on_optimization_start(&mut self, info: &CallbackInfo<'_, T>) -> Result<()> {
        self.points.clear();
        self.values.clear();
        self.record(info);
        Ok(())
    }

    fn on_iteration_end(&mut self, info: &CallbackInfo<'_, T>) -> Result<bool> {
        self.record(info);
        Ok(true)
    }
}
