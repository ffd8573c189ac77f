//! # hlsfuzz
//!
//! Plumbs the hlsfuzz crates together and provides the command line
//! interface. Depend on [`hlsfuzz_ir`], [`hlsfuzz_gen`] and
//! [`hlsfuzz_backend`] directly instead of this crate.
pub mod cmdline;
pub mod driver;
