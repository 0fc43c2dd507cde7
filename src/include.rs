use gsc_compiler::IncludeCallback;
use gsc_core::CompileError;
use tracing::trace;

use crate::host::FileAccess;

/// Serves `#include` directives from loose source files.
///
/// Includes are read fresh on every request; nothing is cached between
/// compilations.
pub struct IncludeLoader<'a, F: ?Sized> {
    files: &'a F,
    extension: &'a str,
}

impl<'a, F: FileAccess + ?Sized> IncludeLoader<'a, F> {
    pub fn new(files: &'a F, extension: &'a str) -> Self {
        Self { files, extension }
    }
}

impl<F: FileAccess + ?Sized> IncludeCallback for IncludeLoader<'_, F> {
    fn load_include(&mut self, name: &str) -> Result<Vec<u8>, CompileError> {
        let path = format!("{name}.{}", self.extension);
        match self.files.read_file(&path) {
            Some(source) if !source.is_empty() => {
                trace!(include = name, bytes = source.len(), "loaded include");
                Ok(source)
            }
            _ => Err(CompileError::MissingInclude {
                name: name.to_string(),
                path,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    #[derive(Default)]
    struct MemoryFiles(FxHashMap<String, Vec<u8>>);

    impl FileAccess for MemoryFiles {
        fn read_file(&self, path: &str) -> Option<Vec<u8>> {
            self.0.get(path).cloned()
        }

        fn list_files(&self, _dir: &str, _extension: &str, _depth: usize) -> Vec<String> {
            Vec::new()
        }
    }

    fn files() -> MemoryFiles {
        let mut files = MemoryFiles::default();
        files.0.insert("common\\util.gsc".into(), b"helper() {}".to_vec());
        files.0.insert("empty.gsc".into(), Vec::new());
        files
    }

    #[test]
    fn appends_extension() {
        let files = files();
        let mut loader = IncludeLoader::new(&files, "gsc");
        assert_eq!(loader.load_include("common\\util").unwrap(), b"helper() {}");
    }

    #[test]
    fn missing_file_names_the_path() {
        let files = files();
        let mut loader = IncludeLoader::new(&files, "gsc");
        assert_eq!(
            loader.load_include("missing_module").unwrap_err(),
            CompileError::MissingInclude {
                name: "missing_module".into(),
                path: "missing_module.gsc".into(),
            }
        );
    }

    #[test]
    fn empty_file_counts_as_missing() {
        let files = files();
        let mut loader = IncludeLoader::new(&files, "gsc");
        assert_eq!(loader.load_include("empty").unwrap_err().missing_include(), Some("empty"));
    }
}
