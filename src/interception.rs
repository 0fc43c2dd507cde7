//! The override placed in front of the host's asset lookup.
//!
//! ```text
//! find_script(ScriptFile, key)
//!   resolve key -> identity
//!   cache hit            -> compiled script
//!   no or empty <name>.gsc -> host asset database
//!   compile + assemble   -> publish, compiled script
//!   failure              -> diagnostic, host asset database
//! ```
//!
//! With a dump directory configured, fresh compiles and the host scripts
//! served in their place are both written out as `.gscbin`.
//!
//! Lookups for any other asset type go straight to the host.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use gsc_compiler::{Assembler, Compiler};
use gsc_core::{Diagnostic, Stage, TokenTable};
use tracing::{debug, error, info, trace, warn};

use crate::cache::{Publish, ScriptCache};
use crate::config::LoaderConfig;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::LoaderError;
use crate::host::{AssetDatabase, AssetType, FileAccess, ScriptAsset};
use crate::include::IncludeLoader;
use crate::pipeline::Pipeline;
use crate::resolver::{NameResolver, ScriptIdentity};
use crate::script::CompiledScript;

/// Serves script assets, compiling custom sources on demand.
pub struct ScriptLoader<D, F> {
    pub(crate) config: LoaderConfig,
    resolver: NameResolver,
    pub(crate) cache: Arc<ScriptCache>,
    pipeline: Pipeline,
    database: D,
    pub(crate) files: F,
    sink: Arc<dyn DiagnosticSink>,
}

/// Configures a [`ScriptLoader`].
pub struct LoaderBuilder<D, F> {
    config: LoaderConfig,
    tokens: Arc<TokenTable>,
    cache: Option<Arc<ScriptCache>>,
    sink: Arc<dyn DiagnosticSink>,
    toolchain: Option<(Box<dyn Compiler>, Box<dyn Assembler>)>,
    database: D,
    files: F,
}

impl<D: AssetDatabase, F: FileAccess> LoaderBuilder<D, F> {
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Token table for numeric script aliases and token-named exports.
    pub fn tokens(mut self, tokens: Arc<TokenTable>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Share an existing cache instead of creating one.
    pub fn cache(mut self, cache: Arc<ScriptCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the bundled compiler and assembler.
    pub fn toolchain(mut self, compiler: Box<dyn Compiler>, assembler: Box<dyn Assembler>) -> Self {
        self.toolchain = Some((compiler, assembler));
        self
    }

    pub fn build(self) -> ScriptLoader<D, F> {
        let pipeline = match self.toolchain {
            Some((compiler, assembler)) => {
                Pipeline::new(compiler, assembler, self.config.compression_level)
            }
            None => Pipeline::reference(
                self.config.build_mode,
                Arc::clone(&self.tokens),
                self.config.compression_level,
            ),
        };

        ScriptLoader {
            resolver: NameResolver::new(self.tokens),
            cache: self.cache.unwrap_or_default(),
            pipeline,
            database: self.database,
            files: self.files,
            sink: self.sink,
            config: self.config,
        }
    }
}

impl<D: AssetDatabase, F: FileAccess> ScriptLoader<D, F> {
    /// A loader with default settings and the bundled toolchain.
    pub fn new(database: D, files: F) -> Self {
        Self::builder(database, files).build()
    }

    pub fn builder(database: D, files: F) -> LoaderBuilder<D, F> {
        LoaderBuilder {
            config: LoaderConfig::default(),
            tokens: Arc::default(),
            cache: None,
            sink: Arc::new(TracingSink),
            toolchain: None,
            database,
            files,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &Arc<ScriptCache> {
        &self.cache
    }

    pub fn database(&self) -> &D {
        &self.database
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    /// Look up an asset, substituting compiled custom scripts.
    pub fn find_script(
        &self,
        ty: AssetType,
        name: &str,
        allow_create_default: bool,
    ) -> Option<ScriptAsset<D::Asset>> {
        if ty != AssetType::ScriptFile {
            return self.find_host_asset(ty, name, allow_create_default).map(ScriptAsset::Host);
        }

        let identity = self.resolver.resolve(name);
        match self.load_identity(&identity) {
            Ok(script) => Some(ScriptAsset::Compiled(script)),
            Err(LoaderError::SourceUnavailable(_)) => self.find_host_script(name, allow_create_default),
            Err(err) => {
                self.report(&identity.name, err.stage(), err.to_string());
                self.find_host_script(name, allow_create_default)
            }
        }
    }

    /// Whether the host would serve a placeholder for this asset. Never
    /// true for a script this loader has compiled.
    pub fn is_default(&self, ty: AssetType, name: &str) -> bool {
        if ty == AssetType::ScriptFile && self.cache.contains(&self.resolver.resolve(name).name) {
            return false;
        }
        self.database.is_default(ty, name)
    }

    /// The compiled script for `key`, compiling it if needed. Never falls
    /// back to the host.
    pub fn load_script(&self, key: &str) -> Result<Arc<CompiledScript>, LoaderError> {
        self.load_identity(&self.resolver.resolve(key))
    }

    /// Session end. With `free_scripts` every compiled script and entry
    /// point is released.
    pub fn on_shutdown(&self, free_scripts: bool) {
        if free_scripts {
            info!(scripts = self.cache.len(), "releasing custom scripts");
            self.cache.clear();
        }
    }

    fn load_identity(&self, identity: &ScriptIdentity) -> Result<Arc<CompiledScript>, LoaderError> {
        if let Some(script) = self.cache.get(&identity.name) {
            trace!(script = %identity, "cache hit");
            return Ok(script);
        }

        let path = self.config.source_path(&identity.name);
        let source = self
            .files
            .read_file(&path)
            .filter(|source| !source.is_empty())
            .ok_or_else(|| LoaderError::SourceUnavailable(identity.name.clone()))?;

        let epoch = self.cache.epoch();
        let mut includes = IncludeLoader::new(&self.files, &self.config.extension);
        let script = self
            .pipeline
            .compile_and_assemble(&identity.name, &source, &mut includes)?;

        if self.config.dump_dir.is_some() {
            self.dump(&script);
        }

        Ok(match self.cache.publish(script, epoch) {
            Publish::Inserted(script) => {
                debug!(script = %identity, bytecode = script.bytecode_len(), "compiled custom script");
                script
            }
            publish => publish.into_script(),
        })
    }

    fn dump(&self, script: &CompiledScript) {
        let Some(dir) = &self.config.dump_dir else {
            return;
        };
        let path: PathBuf = dir.join(format!("{}.gscbin", script.name().replace('\\', "/")));
        let written = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| std::fs::write(&path, script.to_gscbin()));

        match written {
            Ok(()) => debug!(script = script.name(), path = %path.display(), "dumped script"),
            Err(err) => self.report(
                script.name(),
                Stage::Dump,
                format!("{}: {err}", path.display()),
            ),
        }
    }

    fn find_host_script(&self, name: &str, allow_create_default: bool) -> Option<ScriptAsset<D::Asset>> {
        let asset = self.find_host_asset(AssetType::ScriptFile, name, allow_create_default)?;
        let image = self
            .config
            .dump_dir
            .as_ref()
            .and_then(|_| self.database.script_image(&asset));
        if let Some(image) = image {
            self.dump(&image);
        }
        Some(ScriptAsset::Host(asset))
    }

    fn find_host_asset(&self, ty: AssetType, name: &str, allow_create_default: bool) -> Option<D::Asset> {
        let start = Instant::now();
        let asset = self.database.find_asset(ty, name, allow_create_default);
        let waited = start.elapsed();

        if waited > self.config.slow_lookup_threshold {
            let msec = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX);
            if asset.is_some() {
                warn!(asset = name, %ty, msec, "slow asset lookup");
            } else {
                error!(asset = name, %ty, msec, "slow lookup of missing asset");
            }
        }
        asset
    }

    fn report(&self, script: &str, stage: Stage, message: String) {
        self.sink.report(Diagnostic::new(script, stage, message));
    }
}

impl<D, F> std::fmt::Debug for ScriptLoader<D, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptLoader")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
