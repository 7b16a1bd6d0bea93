//! Assertion macros used by the model's tests and by downstream crates comparing
//! floating-point trajectories.
mod assert_almost_eq;
