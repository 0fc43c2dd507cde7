//! Loose files on disk.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::host::FileAccess;

/// [`FileAccess`] over an ordered list of base directories.
///
/// Reads take the first base that has the file. Listings merge all bases.
/// Path components match ignoring ASCII case, as on the host filesystem.
#[derive(Debug, Clone, Default)]
pub struct DirFileAccess {
    search_paths: Vec<PathBuf>,
}

impl DirFileAccess {
    pub fn new(search_paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a base directory with the lowest priority.
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl FileAccess for DirFileAccess {
    fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        let relative = normalize(path);
        self.search_paths.iter().find_map(|base| {
            let full = resolve_ignore_case(base, &relative)?;
            let data = std::fs::read(&full).ok()?;
            trace!(path = %full.display(), bytes = data.len(), "read file");
            Some(data)
        })
    }

    fn list_files(&self, dir: &str, extension: &str, depth: usize) -> Vec<String> {
        let relative = normalize(dir);
        let relative = relative.trim_matches('/');

        let mut seen = FxHashSet::default();
        let mut files = Vec::new();
        for base in &self.search_paths {
            let mut found = Vec::new();
            collect(&base.join(relative), "", extension, depth, &mut found);
            files.extend(found.into_iter().filter(|f| seen.insert(f.clone())));
        }

        files.sort_by(|a, b| path_cmp(a, b));
        files
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

fn resolve_ignore_case(base: &Path, relative: &str) -> Option<PathBuf> {
    let mut current = base.to_path_buf();
    for component in relative.split('/').filter(|c| !c.is_empty()) {
        let exact = current.join(component);
        if exact.exists() {
            current = exact;
            continue;
        }
        let entry = std::fs::read_dir(&current).ok()?.flatten().find(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.eq_ignore_ascii_case(component))
        })?;
        current = entry.path();
    }
    Some(current)
}

fn collect(dir: &Path, prefix: &str, extension: &str, depth: usize, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };
        let relative = if prefix.is_empty() {
            file_name
        } else {
            format!("{prefix}/{file_name}")
        };

        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if depth > 0 {
                collect(&entry.path(), &relative, extension, depth - 1, out);
            }
        } else if has_extension(&relative, extension) {
            out.push(relative);
        }
    }
}

fn has_extension(file: &str, extension: &str) -> bool {
    if extension.is_empty() {
        return true;
    }
    file.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(extension))
}

/// The host's path ordering: ASCII case-insensitive, with `\` and `:`
/// comparing as `/`.
pub fn path_cmp(a: &str, b: &str) -> Ordering {
    fn fold(byte: u8) -> u8 {
        match byte {
            b'\\' | b':' => b'/',
            other => other.to_ascii_uppercase(),
        }
    }
    a.bytes().map(fold).cmp(b.bytes().map(fold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn path_ordering() {
        assert_eq!(path_cmp("ABC", "abc"), Ordering::Equal);
        assert_eq!(path_cmp("a\\b", "a/b"), Ordering::Equal);
        assert_eq!(path_cmp("a/b", "a_b"), Ordering::Less);
        assert_eq!(path_cmp("ab", "abc"), Ordering::Less);
        assert_eq!(path_cmp("B", "a"), Ordering::Greater);
    }

    #[test]
    fn first_search_path_wins() {
        let high = TempDir::new("gsc-high").unwrap();
        let low = TempDir::new("gsc-low").unwrap();
        write(high.path(), "scripts/foo.gsc", "high");
        write(low.path(), "scripts/foo.gsc", "low");
        write(low.path(), "scripts/bar.gsc", "");

        let files = DirFileAccess::new([high.path(), low.path()]);
        assert_eq!(files.read_file("scripts\\foo.gsc").unwrap(), b"high");
        assert_eq!(files.read_file("scripts/bar.gsc").unwrap(), b"");
        assert!(files.read_file("scripts/missing.gsc").is_none());
    }

    #[test]
    fn reads_ignore_case() {
        let root = TempDir::new("gsc-case").unwrap();
        write(root.path(), "Scripts/MP/beta.GSC", "beta");

        let files = DirFileAccess::new([root.path()]);
        assert_eq!(files.read_file("scripts/mp/beta.gsc").unwrap(), b"beta");
        assert_eq!(files.read_file("SCRIPTS\\mp\\BETA.gsc").unwrap(), b"beta");
        assert!(files.read_file("scripts/mp/gamma.gsc").is_none());
    }

    #[test]
    fn listing_is_filtered_sorted_and_deduplicated() {
        let high = TempDir::new("gsc-high").unwrap();
        let low = TempDir::new("gsc-low").unwrap();
        write(high.path(), "scripts/zeta.gsc", "");
        write(high.path(), "scripts/mp/Alpha.gsc", "");
        write(high.path(), "scripts/readme.txt", "");
        write(low.path(), "scripts/zeta.gsc", "");
        write(low.path(), "scripts/beta.GSC", "");

        let files = DirFileAccess::new([high.path()]).with_search_path(low.path());
        assert_eq!(
            files.list_files("scripts", "gsc", 10),
            vec!["beta.GSC", "mp/Alpha.gsc", "zeta.gsc"]
        );
    }

    #[test]
    fn listing_respects_depth() {
        let root = TempDir::new("gsc-depth").unwrap();
        write(root.path(), "scripts/top.gsc", "");
        write(root.path(), "scripts/a/one.gsc", "");
        write(root.path(), "scripts/a/b/two.gsc", "");

        let files = DirFileAccess::new([root.path()]);
        assert_eq!(files.list_files("scripts", "gsc", 0), vec!["top.gsc"]);
        assert_eq!(files.list_files("scripts/", "gsc", 1), vec!["a/one.gsc", "top.gsc"]);
        assert_eq!(files.list_files("scripts", "gsc", 10).len(), 3);
    }

    #[test]
    fn listing_missing_directory_is_empty() {
        let root = TempDir::new("gsc-empty").unwrap();
        assert!(DirFileAccess::new([root.path()]).list_files("scripts", "gsc", 10).is_empty());
    }
}
