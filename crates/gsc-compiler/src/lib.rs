//! Reference GSC toolchain.
//!
//! [`ScriptCompiler`] turns source into an [`Assembly`] and
//! [`StackAssembler`] turns that into the two buffers the host runtime
//! loads: bytecode and the stack that describes it. Both sit behind the
//! [`Compiler`] and [`Assembler`] traits so other toolchains can be
//! substituted.
//!
//! # Example
//!
//! ```
//! use gsc_compiler::{Assembler, Compiler, NoIncludes, ScriptCompiler, StackAssembler, StackReader};
//!
//! let assembly = ScriptCompiler::default()
//!     .compile("scripts/example", b"main() { level.ready = true; }", &mut NoIncludes)
//!     .unwrap();
//! let script = StackAssembler::new().assemble("scripts/example", &assembly).unwrap();
//! let stack = StackReader::parse(&script.stack).unwrap();
//! assert!(stack.find("main", None).is_some());
//! ```

mod assembler;
pub mod assembly;
pub mod bytecode;
mod compiler;
mod error;
mod function_compiler;
mod stack;

pub use assembler::StackAssembler;
pub use assembly::{AsmFunction, Assembly};
pub use compiler::{IncludeCallback, NoIncludes, ScriptCompiler};
pub use error::StackError;
pub use function_compiler::{MAX_ARGUMENTS, MAX_DEPTH, MAX_LOCALS};
pub use stack::{Export, ExportName, STACK_MAGIC, StackReader};

use gsc_core::{AssembleError, CompileError};

/// Output of an [`Assembler`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledScript {
    pub bytecode: Vec<u8>,
    pub stack: Vec<u8>,
}

/// Source to assembly.
pub trait Compiler: Send + Sync {
    /// Compile the script `name`. Includes are requested from `includes`.
    fn compile(
        &self,
        name: &str,
        source: &[u8],
        includes: &mut dyn IncludeCallback,
    ) -> Result<Assembly, CompileError>;
}

/// Assembly to bytecode and stack.
pub trait Assembler: Send + Sync {
    fn assemble(&self, name: &str, assembly: &Assembly) -> Result<AssembledScript, AssembleError>;
}

impl Compiler for ScriptCompiler {
    fn compile(
        &self,
        _name: &str,
        source: &[u8],
        includes: &mut dyn IncludeCallback,
    ) -> Result<Assembly, CompileError> {
        self.compile_source(source, includes)
    }
}

impl Assembler for StackAssembler {
    fn assemble(&self, _name: &str, assembly: &Assembly) -> Result<AssembledScript, AssembleError> {
        self.assemble_script(assembly)
    }
}
