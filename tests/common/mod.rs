//! In-memory stand-ins for the host.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gsc_loader::fs::path_cmp;
use gsc_loader::{
    AssetDatabase, AssetType, Assembly, CompileError, CompiledScript, Compiler, EntryHandle,
    ExecutionEngine, compress_stack,
    FileAccess, IncludeCallback, ScriptCache, ScriptCompiler, ScriptIdentity, StackReader,
    ThreadId, TokenTable,
};
use parking_lot::Mutex;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A packaged asset as the fake database hands it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAsset {
    pub ty: AssetType,
    pub name: String,
}

#[derive(Default)]
pub struct FakeAssetDatabase {
    assets: Mutex<HashMap<(AssetType, String), bool>>,
    find_calls: AtomicUsize,
    default_calls: AtomicUsize,
    delay: Option<Duration>,
    images: bool,
}

impl FakeAssetDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset. `is_default` marks a placeholder.
    pub fn with_asset(self, ty: AssetType, name: &str, is_default: bool) -> Self {
        self.assets.lock().insert((ty, name.to_string()), is_default);
        self
    }

    /// Expose a packaged image of every script asset for dumping.
    pub fn with_script_images(mut self) -> Self {
        self.images = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn default_calls(&self) -> usize {
        self.default_calls.load(Ordering::SeqCst)
    }
}

impl AssetDatabase for FakeAssetDatabase {
    type Asset = HostAsset;

    fn find_asset(&self, ty: AssetType, name: &str, _allow_create_default: bool) -> Option<HostAsset> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.assets
            .lock()
            .contains_key(&(ty, name.to_string()))
            .then(|| HostAsset {
                ty,
                name: name.to_string(),
            })
    }

    fn is_default(&self, ty: AssetType, name: &str) -> bool {
        self.default_calls.fetch_add(1, Ordering::SeqCst);
        self.assets
            .lock()
            .get(&(ty, name.to_string()))
            .copied()
            .unwrap_or(true)
    }

    fn script_image(&self, asset: &HostAsset) -> Option<CompiledScript> {
        if !self.images || asset.ty != AssetType::ScriptFile {
            return None;
        }
        let stack = format!("packaged {}", asset.name).into_bytes();
        let compressed = compress_stack(&stack, 6).ok()?;
        Some(CompiledScript::new(&asset.name, vec![0x2a, 0], compressed, stack.len()))
    }
}

#[derive(Default)]
pub struct MemoryFiles {
    files: Mutex<HashMap<String, Vec<u8>>>,
    reads: AtomicUsize,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, contents: &str) -> Self {
        self.set(path, contents);
        self
    }

    pub fn set(&self, path: &str, contents: &str) {
        self.set_bytes(path, contents.as_bytes());
    }

    pub fn set_bytes(&self, path: &str, contents: impl Into<Vec<u8>>) {
        self.files.lock().insert(path.to_string(), contents.into());
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl FileAccess for MemoryFiles {
    fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files.lock().get(path).cloned()
    }

    fn list_files(&self, dir: &str, extension: &str, depth: usize) -> Vec<String> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let suffix = format!(".{extension}");
        let mut listed: Vec<String> = self
            .files
            .lock()
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .filter(|rest| rest.ends_with(&suffix) && rest.matches('/').count() <= depth)
            .map(str::to_string)
            .collect();
        listed.sort_by(|a, b| path_cmp(a, b));
        listed
    }
}

/// The bundled compiler, counting its invocations.
pub struct CountingCompiler {
    inner: ScriptCompiler,
    calls: Arc<AtomicUsize>,
}

impl CountingCompiler {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let compiler = Self {
            inner: ScriptCompiler::default(),
            calls: Arc::clone(&calls),
        };
        (compiler, calls)
    }
}

impl Compiler for CountingCompiler {
    fn compile(
        &self,
        name: &str,
        source: &[u8],
        includes: &mut dyn IncludeCallback,
    ) -> Result<Assembly, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compile(name, source, includes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    Exec(EntryHandle),
    Free(ThreadId),
    LevelLoad,
}

/// Resolves entry points by decoding cached stacks.
pub struct FakeEngine {
    cache: Arc<ScriptCache>,
    tokens: Arc<TokenTable>,
    handles: Mutex<Vec<(String, String)>>,
    next_thread: u32,
    pub events: Vec<EngineEvent>,
}

impl FakeEngine {
    pub fn new(cache: Arc<ScriptCache>, tokens: Arc<TokenTable>) -> Self {
        Self {
            cache,
            tokens,
            handles: Mutex::new(Vec::new()),
            next_thread: 0,
            events: Vec::new(),
        }
    }

    /// `(script, entry)` behind a handle.
    pub fn describe(&self, handle: EntryHandle) -> Option<(String, String)> {
        let index = (handle.0 as usize).checked_sub(1)?;
        self.handles.lock().get(index).cloned()
    }
}

impl ExecutionEngine for FakeEngine {
    fn function_handle(&self, script: &ScriptIdentity, entry: &str) -> Option<EntryHandle> {
        let compiled = self.cache.get(&script.name)?;
        let stack = compiled.decompress_stack().ok()?;
        let reader = StackReader::parse(&stack).ok()?;
        reader.find(entry, self.tokens.id(entry))?;

        let mut handles = self.handles.lock();
        handles.push((script.name.clone(), entry.to_string()));
        Some(EntryHandle(handles.len() as u32))
    }

    fn exec_thread(&mut self, handle: EntryHandle, _args: u32) -> ThreadId {
        self.events.push(EngineEvent::Exec(handle));
        self.next_thread += 1;
        ThreadId(self.next_thread)
    }

    fn free_thread(&mut self, thread: ThreadId) {
        self.events.push(EngineEvent::Free(thread));
    }
}
