//! Backends that lower a program graph to source text.
mod hls_cpp;
mod traits;

pub use hls_cpp::{Arguments, CodeGenerator, GeneratedProgram, HlsCppBackend};
pub use traits::Backend;
