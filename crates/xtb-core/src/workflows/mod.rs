//! # Workflows Module
//!
//! User-facing entry points. [`single_point`] drives one complete
//! energy/gradient/dipole evaluation through any [`XtbApi`](crate::engine::api::XtbApi)
//! implementation and guarantees that every engine handle is released on every
//! exit path.

pub mod single_point;
