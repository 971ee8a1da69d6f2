//! Lazy discovery of RAW files below an image root.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::DiscoveryConfig;

/// Selects RAW files by name suffix.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// Lower-cased suffixes including the leading dot
    suffixes: Vec<String>,
    follow_links: bool,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            suffixes: config
                .extensions
                .iter()
                .map(|ext| format!(".{}", ext.trim_start_matches('.').to_lowercase()))
                .collect(),
            follow_links: config.follow_links,
        }
    }

    /// Walk `root` recursively, yielding supported regular files one at a time.
    ///
    /// Entries that cannot be read are logged and skipped; a missing root
    /// yields nothing.
    pub fn walk(&self, root: &Path) -> DiscoveredFiles {
        DiscoveredFiles {
            entries: WalkDir::new(root).follow_links(self.follow_links).into_iter(),
            discovery: self.clone(),
        }
    }

    /// Whether the final component of `path` ends with a supported suffix,
    /// ignoring case.
    pub fn is_supported(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_lowercase();
        self.suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }
}

/// Iterator over discovered RAW files.
pub struct DiscoveredFiles {
    entries: walkdir::IntoIter,
    discovery: FileDiscovery,
}

impl Iterator for DiscoveredFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {e}");
                    continue;
                }
            };
            if entry.file_type().is_file() && self.discovery.is_supported(entry.path()) {
                return Some(entry.into_path());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn discovery() -> FileDiscovery {
        FileDiscovery::new(&DiscoveryConfig::default())
    }

    #[test]
    fn test_is_supported() {
        let discovery = discovery();
        assert!(discovery.is_supported(Path::new("x.orf")));
        assert!(discovery.is_supported(Path::new("x.Orf")));
        assert!(discovery.is_supported(Path::new("/a/b/x.ORF")));
        assert!(!discovery.is_supported(Path::new("x.jpg")));
        assert!(!discovery.is_supported(Path::new("x.ORF.dop")));
        assert!(!discovery.is_supported(Path::new("xorf")));
    }

    #[test]
    fn test_custom_extensions() {
        let discovery = FileDiscovery::new(&DiscoveryConfig {
            extensions: vec![".NEF".into(), "orf".into()],
            follow_links: false,
        });
        assert!(discovery.is_supported(Path::new("a.nef")));
        assert!(discovery.is_supported(Path::new("a.ORF")));
    }

    #[test]
    fn test_walk_recurses_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2013").join("06");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("x.orf"), b"").unwrap();
        fs::write(nested.join("x.Orf"), b"").unwrap();
        fs::write(nested.join("x.ORF"), b"").unwrap();
        fs::write(nested.join("x.jpg"), b"").unwrap();
        fs::write(nested.join("x.ORF.dop"), b"").unwrap();
        // A directory with a matching name is not a regular file.
        fs::create_dir(dir.path().join("folder.ORF")).unwrap();

        let mut found: Vec<_> = discovery()
            .walk(dir.path())
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                PathBuf::from("2013/06/x.ORF"),
                PathBuf::from("2013/06/x.Orf"),
                PathBuf::from("x.orf"),
            ]
        );
    }

    #[test]
    fn test_walk_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(discovery().walk(&dir.path().join("missing")).count(), 0);
    }
}
