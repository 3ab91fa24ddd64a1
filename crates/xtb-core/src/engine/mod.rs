//! # Engine Module
//!
//! The seam between this crate and the native xtb library.
//!
//! - **Interface** ([`api`]) - the [`XtbApi`](api::XtbApi) trait mirroring the C entry points
//! - **Handles** ([`handles`]) - RAII owners of the environment, molecule, calculator and results
//! - **Configuration** ([`config`]) - method, verbosity and calculator settings, loadable from TOML
//! - **Error Handling** ([`error`]) - workflow phases and the crate error type
//!
//! The native bindings are compiled with the `libxtb` feature; an in-memory
//! engine for tests is available with the `mock` feature.

pub mod api;
pub mod config;
pub mod error;
pub mod handles;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(feature = "libxtb")]
pub mod native;
#[cfg(feature = "libxtb")]
mod sys;
