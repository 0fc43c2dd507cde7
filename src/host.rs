//! Interfaces of the host process the loader plugs into.
//!
//! The loader never touches the host directly. Asset lookups, file reads
//! and thread creation all go through these traits so the same loader
//! runs against the game, a test double or a tool.

use std::fmt;
use std::sync::Arc;

use crate::resolver::ScriptIdentity;
use crate::script::CompiledScript;

/// Asset kinds the host asks the database for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    ScriptFile,
    RawFile,
    StringTable,
    LocalizeEntry,
    /// Any other host asset type, by its raw id.
    Other(u32),
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetType::ScriptFile => f.write_str("scriptfile"),
            AssetType::RawFile => f.write_str("rawfile"),
            AssetType::StringTable => f.write_str("stringtable"),
            AssetType::LocalizeEntry => f.write_str("localize"),
            AssetType::Other(id) => write!(f, "asset type {id}"),
        }
    }
}

/// The host's packaged asset store.
pub trait AssetDatabase: Send + Sync {
    /// Whatever the host hands out for an asset.
    type Asset;

    fn find_asset(&self, ty: AssetType, name: &str, allow_create_default: bool) -> Option<Self::Asset>;

    /// Whether `name` would be served by a default placeholder.
    fn is_default(&self, ty: AssetType, name: &str) -> bool;

    /// The packaged script behind `asset` in the runtime layout, for
    /// `.gscbin` dumps. Hosts that cannot expose it return `None`.
    fn script_image(&self, asset: &Self::Asset) -> Option<CompiledScript> {
        let _ = asset;
        None
    }
}

/// Read access to loose files.
pub trait FileAccess: Send + Sync {
    /// Contents of `path`. `None` means not found, an empty vector means
    /// the file exists and is empty.
    fn read_file(&self, path: &str) -> Option<Vec<u8>>;

    /// Files below `dir` with the given extension, descending at most
    /// `depth` directory levels, in the host's listing order.
    fn list_files(&self, dir: &str, extension: &str, depth: usize) -> Vec<String>;
}

impl<T: FileAccess + ?Sized> FileAccess for &T {
    fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        (**self).read_file(path)
    }

    fn list_files(&self, dir: &str, extension: &str, depth: usize) -> Vec<String> {
        (**self).list_files(dir, extension, depth)
    }
}

/// Opaque handle of a script function inside the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(pub u32);

/// Opaque id of a script thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(pub u32);

/// The host's bytecode runtime.
pub trait ExecutionEngine {
    /// Handle of `entry` inside a loaded script, if the script exports it.
    fn function_handle(&self, script: &ScriptIdentity, entry: &str) -> Option<EntryHandle>;

    /// Start a thread at `handle` with `args` arguments already pushed.
    fn exec_thread(&mut self, handle: EntryHandle, args: u32) -> ThreadId;

    fn free_thread(&mut self, thread: ThreadId);
}

/// Result of an intercepted lookup.
#[derive(Debug)]
pub enum ScriptAsset<A> {
    /// Compiled from custom source.
    Compiled(Arc<CompiledScript>),
    /// Served by the host asset database.
    Host(A),
}

impl<A> ScriptAsset<A> {
    pub fn as_compiled(&self) -> Option<&Arc<CompiledScript>> {
        match self {
            ScriptAsset::Compiled(script) => Some(script),
            ScriptAsset::Host(_) => None,
        }
    }

    pub fn as_host(&self) -> Option<&A> {
        match self {
            ScriptAsset::Compiled(_) => None,
            ScriptAsset::Host(asset) => Some(asset),
        }
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self, ScriptAsset::Compiled(_))
    }
}
