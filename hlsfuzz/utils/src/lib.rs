//! Shared utilities for the hlsfuzz generator.
mod errors;
mod id;
mod namegenerator;
mod out_file;

pub use errors::{Error, ErrorKind, FuzzResult};
pub use id::{GSym, Id};
pub use namegenerator::NameGenerator;
pub use out_file::OutputFile;
