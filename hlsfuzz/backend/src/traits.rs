//! Interface for an hlsfuzz backend.
use hlsfuzz_ir::ProgramGraph;
use hlsfuzz_utils::{FuzzResult, OutputFile};

/// A backend for generated programs.
pub trait Backend {
    /// The name of this backend.
    fn name(&self) -> &'static str;
    /// Validate this program for emitting using this backend. Returns an
    /// Err(..) if the program has unexpected constructs.
    fn validate(prog: &ProgramGraph) -> FuzzResult<()>;
    /// Transforms the program into a formatted string and writes it to
    /// `file`.
    fn emit(&self, prog: &ProgramGraph, file: &mut OutputFile)
    -> FuzzResult<()>;
    /// Convience function to validate and emit the program.
    fn run(&self, prog: &ProgramGraph, mut file: OutputFile) -> FuzzResult<()> {
        Self::validate(prog)?;
        self.emit(prog, &mut file)
    }
}
