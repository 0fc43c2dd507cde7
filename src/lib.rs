//! On-demand GSC compilation in front of a host's script asset lookup.
//!
//! A [`ScriptLoader`] sits between the host and its asset database. When
//! the host asks for a script file that has a loose `.gsc` source, the
//! loader compiles it, caches the result for the rest of the session and
//! hands that out instead of the packaged asset. Everything else passes
//! through untouched.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use gsc_loader::{AssetDatabase, AssetType, FileAccess, ScriptLoader};
//!
//! struct NoAssets;
//!
//! impl AssetDatabase for NoAssets {
//!     type Asset = ();
//!     fn find_asset(&self, _: AssetType, _: &str, _: bool) -> Option<()> { None }
//!     fn is_default(&self, _: AssetType, _: &str) -> bool { true }
//! }
//!
//! struct Files(HashMap<String, Vec<u8>>);
//!
//! impl FileAccess for Files {
//!     fn read_file(&self, path: &str) -> Option<Vec<u8>> { self.0.get(path).cloned() }
//!     fn list_files(&self, _: &str, _: &str, _: usize) -> Vec<String> { Vec::new() }
//! }
//!
//! let files = Files(HashMap::from([("scripts/foo.gsc".to_string(), b"main() { }".to_vec())]));
//! let loader = ScriptLoader::new(NoAssets, files);
//!
//! let asset = loader.find_script(AssetType::ScriptFile, "scripts/foo", false).unwrap();
//! assert!(asset.is_compiled());
//! assert!(!loader.is_default(AssetType::ScriptFile, "scripts/foo"));
//! ```

pub mod cache;
mod config;
mod diagnostics;
mod error;
pub mod fs;
mod host;
mod include;
mod interception;
mod lifecycle;
mod pipeline;
mod resolver;
mod script;

pub use cache::{EntryPointTable, Publish, ScriptCache};
pub use config::LoaderConfig;
pub use diagnostics::{DiagnosticSink, TracingSink};
pub use error::{CacheError, GscBinError, LoaderError};
pub use fs::DirFileAccess;
pub use host::{
    AssetDatabase, AssetType, EntryHandle, ExecutionEngine, FileAccess, ScriptAsset, ThreadId,
};
pub use include::IncludeLoader;
pub use interception::{LoaderBuilder, ScriptLoader};
pub use lifecycle::LoadReport;
pub use pipeline::Pipeline;
pub use resolver::{NameResolver, ScriptIdentity};
pub use script::{CompiledScript, compress_stack};

pub use gsc_compiler::{
    AssembledScript, Assembler, Assembly, Compiler, IncludeCallback, ScriptCompiler,
    StackAssembler, StackReader,
};
pub use gsc_core::{
    AssembleError, BuildMode, CompileError, Diagnostic, Diagnostics, Stage, TokenId, TokenTable,
};
