//! Conditional parallel iteration.
//!
//! With the `parallel` feature the macro below dispatches to rayon; without it
//! they fall back to the standard sequential iterators. Bootstrap resampling
//! and the per-channel loops of the delay and quadrature estimators go through
//! it, so results never depend on whether the feature is enabled.
//!
//! ```ignore
//! use crate::iter_maybe_parallel;
//!
//! let squares: Vec<_> = iter_maybe_parallel!(0..n).map(|i| i * i).collect();
//! ```

/// Parallel `into_par_iter()` with the `parallel` feature, `into_iter()` otherwise.
#[macro_export]
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

pub use iter_maybe_parallel;
