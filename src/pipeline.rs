//! Source to [`CompiledScript`].

use std::sync::Arc;

use gsc_compiler::{Assembler, Compiler, IncludeCallback, ScriptCompiler, StackAssembler};
use gsc_core::{BuildMode, TokenTable};
use tracing::debug;
use xxhash_rust::xxh64::xxh64;

use crate::error::LoaderError;
use crate::script::{CompiledScript, compress_stack};

/// Compile, assemble and compress one script.
///
/// The result is materialized completely before anything is published, so a
/// failure at any step leaves no trace.
pub struct Pipeline {
    compiler: Box<dyn Compiler>,
    assembler: Box<dyn Assembler>,
    compression_level: u32,
}

impl Pipeline {
    pub fn new(
        compiler: Box<dyn Compiler>,
        assembler: Box<dyn Assembler>,
        compression_level: u32,
    ) -> Self {
        Self {
            compiler,
            assembler,
            compression_level,
        }
    }

    /// The bundled [`ScriptCompiler`] and [`StackAssembler`].
    pub fn reference(mode: BuildMode, tokens: Arc<TokenTable>, compression_level: u32) -> Self {
        Self::new(
            Box::new(ScriptCompiler::new(mode)),
            Box::new(StackAssembler::with_tokens(tokens)),
            compression_level,
        )
    }

    pub fn compile_and_assemble(
        &self,
        name: &str,
        source: &[u8],
        includes: &mut dyn IncludeCallback,
    ) -> Result<CompiledScript, LoaderError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("Pipeline::compile_and_assemble");

        let assembly = self.compiler.compile(name, source, includes)?;
        let assembled = self.assembler.assemble(name, &assembly)?;
        let compressed =
            compress_stack(&assembled.stack, self.compression_level).map_err(LoaderError::Compress)?;

        debug!(
            script = name,
            functions = assembly.functions.len(),
            bytecode = assembled.bytecode.len(),
            stack = assembled.stack.len(),
            compressed = compressed.len(),
            "assembled script"
        );

        Ok(
            CompiledScript::new(name, assembled.bytecode, compressed, assembled.stack.len())
                .with_source_hash(xxh64(source, 0)),
        )
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("compression_level", &self.compression_level)
            .finish_non_exhaustive()
    }
}
