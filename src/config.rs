use std::path::PathBuf;
use std::time::Duration;

use gsc_core::BuildMode;

/// Settings for a [`ScriptLoader`](crate::ScriptLoader).
///
/// Every field has a default matching the stock game layout, so most
/// embedders only touch one or two through the `with_*` methods:
///
/// ```
/// use gsc_loader::{BuildMode, LoaderConfig};
///
/// let config = LoaderConfig::default()
///     .with_build_mode(BuildMode::Dev)
///     .with_dump_dir("dump");
/// assert_eq!(config.source_path("scripts/foo"), "scripts/foo.gsc");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Directory enumerated by the load pass.
    pub script_dir: String,
    /// Source extension, without the dot.
    pub extension: String,
    /// How deep the load pass descends into `script_dir`.
    pub list_depth: usize,
    /// Entry run before the host's level load.
    pub main_entry: String,
    /// Entry run after the host's level load.
    pub init_entry: String,
    pub build_mode: BuildMode,
    /// zlib level for the stack segment, 0 to 9.
    pub compression_level: u32,
    /// Where compiled and host-served scripts are dumped as `.gscbin`, if anywhere.
    pub dump_dir: Option<PathBuf>,
    /// Host lookups slower than this are logged.
    pub slow_lookup_threshold: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            script_dir: "scripts".to_string(),
            extension: "gsc".to_string(),
            list_depth: 10,
            main_entry: "main".to_string(),
            init_entry: "init".to_string(),
            build_mode: BuildMode::Prod,
            compression_level: flate2::Compression::default().level(),
            dump_dir: None,
            slow_lookup_threshold: Duration::from_millis(100),
        }
    }
}

impl LoaderConfig {
    pub fn with_script_dir(mut self, dir: impl Into<String>) -> Self {
        self.script_dir = dir.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_list_depth(mut self, depth: usize) -> Self {
        self.list_depth = depth;
        self
    }

    pub fn with_entry_names(mut self, main: impl Into<String>, init: impl Into<String>) -> Self {
        self.main_entry = main.into();
        self.init_entry = init.into();
        self
    }

    pub fn with_build_mode(mut self, mode: BuildMode) -> Self {
        self.build_mode = mode;
        self
    }

    /// Levels above 9 are clamped.
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(flate2::Compression::best().level());
        self
    }

    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    pub fn with_slow_lookup_threshold(mut self, threshold: Duration) -> Self {
        self.slow_lookup_threshold = threshold;
        self
    }

    /// Source file of a script or include.
    pub fn source_path(&self, name: &str) -> String {
        format!("{name}.{}", self.extension)
    }

    /// Script name of a listed source file, if it carries the source
    /// extension in any ASCII case.
    pub fn script_name<'a>(&self, file: &'a str) -> Option<&'a str> {
        let split = file.len().checked_sub(self.extension.len() + 1)?;
        let stem = file.get(..split)?;
        let extension = file.get(split..)?.strip_prefix('.')?;
        extension.eq_ignore_ascii_case(&self.extension).then_some(stem)
    }
}
