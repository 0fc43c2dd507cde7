//! Script compiler: source text to [`Assembly`].
//!
//! Compilation parses the script, loads its includes through an
//! [`IncludeCallback`], builds the call scope and then compiles each
//! function. Any error aborts the whole compilation.

use bumpalo::Bump;
use gsc_core::{BuildMode, CompileError};
use gsc_parser::{Parser, Script};
use rustc_hash::FxHashSet;

use crate::assembly::Assembly;
use crate::function_compiler::{CallScope, FunctionCompiler};

/// Supplies the source of included files.
///
/// Called synchronously, possibly several times per compilation, once for
/// every distinct include path reachable from the script.
pub trait IncludeCallback {
    /// Return the source of `name` as written in the `#include` directive.
    ///
    /// Returning an error aborts the compilation with that error.
    fn load_include(&mut self, name: &str) -> Result<Vec<u8>, CompileError>;
}

impl<F> IncludeCallback for F
where
    F: FnMut(&str) -> Result<Vec<u8>, CompileError>,
{
    fn load_include(&mut self, name: &str) -> Result<Vec<u8>, CompileError> {
        self(name)
    }
}

/// Include callback for scripts that must not include anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIncludes;

impl IncludeCallback for NoIncludes {
    fn load_include(&mut self, name: &str) -> Result<Vec<u8>, CompileError> {
        Err(CompileError::MissingInclude {
            name: name.to_string(),
            path: name.to_string(),
        })
    }
}

/// The reference GSC compiler.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptCompiler {
    mode: BuildMode,
}

impl ScriptCompiler {
    pub fn new(mode: BuildMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Compile `source` to assembly.
    pub fn compile_source(
        &self,
        source: &[u8],
        includes: &mut dyn IncludeCallback,
    ) -> Result<Assembly, CompileError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("ScriptCompiler::compile_source");

        let arena = Bump::new();
        let script = Parser::parse_bytes(source, &arena)?;

        let mut scope = CallScope::default();
        for function in script.functions {
            if scope
                .locals
                .insert(function.name.name, function.name.span)
                .is_some()
            {
                return Err(CompileError::DuplicateFunction {
                    name: function.name.name.to_string(),
                    span: function.name.span,
                });
            }
        }

        let mut visited = FxHashSet::default();
        load_includes(&script, &arena, includes, &mut visited, &mut scope)?;

        let functions = script
            .functions
            .iter()
            .map(|decl| FunctionCompiler::new(&scope, self.mode, decl).compile())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Assembly { functions })
    }
}

/// Depth-first include loading. Each path is loaded once per compilation.
fn load_includes<'ast>(
    script: &Script<'ast>,
    arena: &'ast Bump,
    callback: &mut dyn IncludeCallback,
    visited: &mut FxHashSet<&'ast str>,
    scope: &mut CallScope<'ast>,
) -> Result<(), CompileError> {
    for include in script.includes {
        if !visited.insert(include.path) {
            continue;
        }

        let bytes = callback.load_include(include.path)?;
        let included = Parser::parse_bytes(&bytes, arena).map_err(|errors| CompileError::IncludeSyntax {
            name: include.path.to_string(),
            errors,
        })?;

        for function in included.functions {
            scope.included.entry(function.name.name).or_insert(include.path);
        }

        load_includes(&included, arena, callback, visited, scope)?;
    }
    Ok(())
}
