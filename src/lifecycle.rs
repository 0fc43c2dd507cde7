//! Session load and execution passes.
//!
//! The load pass compiles every custom script up front and records which
//! of them export the session entry points. The execution pass runs those
//! entry points around the host's level load.

use tracing::{debug, error, info};

use crate::host::{AssetDatabase, AssetType, ExecutionEngine, FileAccess, ScriptAsset};
use crate::interception::ScriptLoader;

/// Outcome of [`ScriptLoader::load_scripts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Scripts found, in listing order.
    pub loaded: Vec<String>,
    /// Scripts that could not be found at all, and listed files that are
    /// not script sources.
    pub failed: Vec<String>,
}

impl<D: AssetDatabase, F: FileAccess> ScriptLoader<D, F> {
    /// Load every custom script and record its entry points.
    ///
    /// Listed files are relative to the script directory; `foo.gsc` under
    /// `scripts` becomes the script `scripts/foo`.
    pub fn load_scripts<E: ExecutionEngine>(&self, engine: &E) -> LoadReport {
        #[cfg(feature = "profiling")]
        profiling::scope!("ScriptLoader::load_scripts");

        let files = self.files.list_files(
            &self.config.script_dir,
            &self.config.extension,
            self.config.list_depth,
        );

        let mut report = LoadReport::default();
        for file in &files {
            let Some(stem) = self.config.script_name(file) else {
                error!(file = %file, extension = %self.config.extension, "listed file is not a script source");
                report.failed.push(file.clone());
                continue;
            };
            let name = format!("{}/{stem}", self.config.script_dir);
            debug!(script = %name, "loading script");

            match self.find_script(AssetType::ScriptFile, &name, false) {
                Some(ScriptAsset::Compiled(script)) => {
                    if script.mark_loaded() {
                        debug!(script = %name, "script already loaded this session");
                    }
                }
                Some(ScriptAsset::Host(_)) => {}
                None => {
                    error!(script = %name, "script encountered an error while loading");
                    report.failed.push(name);
                    continue;
                }
            }

            let identity = self.resolver().resolve(&name);
            if let Some(handle) = engine.function_handle(&identity, &self.config.main_entry) {
                debug!(script = %identity, entry = %self.config.main_entry, "found entry point");
                self.cache.record_main(&identity.name, handle);
            }
            if let Some(handle) = engine.function_handle(&identity, &self.config.init_entry) {
                debug!(script = %identity, entry = %self.config.init_entry, "found entry point");
                self.cache.record_init(&identity.name, handle);
            }
            report.loaded.push(identity.name);
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "custom script load pass done"
        );
        report
    }

    /// Run every recorded main entry, then `level_load`, then every init
    /// entry. Each entry gets its own thread, released right after spawn.
    pub fn run_level<E: ExecutionEngine>(&self, engine: &mut E, level_load: impl FnOnce(&mut E)) {
        let entry_points = self.cache.entry_points();

        for (script, handle) in entry_points.main() {
            debug!(script, "running main");
            let thread = engine.exec_thread(handle, 0);
            engine.free_thread(thread);
        }

        level_load(engine);

        for (script, handle) in entry_points.init() {
            debug!(script, "running init");
            let thread = engine.exec_thread(handle, 0);
            engine.free_thread(thread);
        }
    }
}
