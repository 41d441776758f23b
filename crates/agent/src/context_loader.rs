//! `/add` support: inject files or whole directories into the transcript.
//!
//! Each file becomes one system entry introduced by its context marker. A
//! directory is walked recursively, skipping hidden entries, dependency and
//! build folders, lock files, binary and media formats, and anything above
//! the size limit.

use codewright_core::transcript::Transcript;
use codewright_tools::path::{PathError, normalize_path};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Names skipped wherever they appear, as files or directories.
const EXCLUDED_NAMES: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    ".gitignore",
    ".python-version",
    "uv.lock",
    ".uv",
    "uvenv",
    ".uvenv",
    ".venv",
    "venv",
    "__pycache__",
    ".pytest_cache",
    ".coverage",
    ".mypy_cache",
    "node_modules",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    ".next",
    ".nuxt",
    "dist",
    "build",
    ".cache",
    ".parcel-cache",
    ".turbo",
    ".vercel",
    ".output",
    ".contentlayer",
    "out",
    "coverage",
    ".nyc_output",
    "storybook-static",
    ".env",
    ".env.local",
    ".env.development",
    ".env.production",
    ".git",
    ".svn",
    ".hg",
    "CVS",
];

/// File name suffixes that never hold useful source text.
const EXCLUDED_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".ico", ".svg", ".webp", ".avif", ".mp4", ".webm", ".mov",
    ".mp3", ".wav", ".ogg", ".zip", ".tar", ".gz", ".7z", ".rar", ".exe", ".dll", ".so", ".dylib",
    ".bin", ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".pyc", ".pyo", ".pyd",
    ".egg", ".whl", ".uv", ".uvenv", ".db", ".sqlite", ".sqlite3", ".log", ".idea", ".vscode",
    ".map", ".chunk.js", ".chunk.css", ".min.js", ".min.css", ".bundle.js", ".bundle.css",
    ".cache", ".tmp", ".temp", ".ttf", ".otf", ".woff", ".woff2", ".eot",
];

/// Bytes inspected when sniffing for binary content.
const BINARY_PEEK: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum AddError {
    #[error("Could not add path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PathError,
    },

    #[error("Could not add path '{path}': {reason}")]
    Unreadable { path: String, reason: String },
}

/// Why a file was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Excluded,
    TooLarge,
    Binary,
    AlreadyInContext,
    Unreadable(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excluded => f.write_str("excluded"),
            Self::TooLarge => f.write_str("exceeds size limit"),
            Self::Binary => f.write_str("binary"),
            Self::AlreadyInContext => f.write_str("already in context"),
            Self::Unreadable(reason) => write!(f, "unreadable: {reason}"),
        }
    }
}

/// What an `/add` did.
#[derive(Debug, Default)]
pub struct AddReport {
    /// The normalized path the user asked for
    pub target: String,
    pub is_directory: bool,
    pub added: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
    /// The directory walk stopped at the file limit.
    pub limit_reached: bool,
}

/// Loads files into a transcript as context entries.
#[derive(Debug, Clone)]
pub struct ContextLoader {
    root: PathBuf,
    max_files: usize,
    max_file_size: u64,
}

impl ContextLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_files: 1000,
            max_file_size: 5_000_000,
        }
    }

    pub fn with_max_files(mut self, max: usize) -> Self {
        self.max_files = max;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Add a file, or every eligible file under a directory.
    pub async fn add(&self, transcript: &mut Transcript, raw: &str) -> Result<AddReport, AddError> {
        let path = normalize_path(raw, &self.root).map_err(|source| AddError::InvalidPath {
            path: raw.to_string(),
            source,
        })?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| AddError::Unreadable {
                path: raw.to_string(),
                reason: e.to_string(),
            })?;

        let mut report = AddReport {
            target: path.display().to_string(),
            is_directory: metadata.is_dir(),
            ..AddReport::default()
        };

        if report.is_directory {
            self.add_directory(transcript, &path, &mut report).await;
            info!(
                directory = %report.target,
                added = report.added.len(),
                skipped = report.skipped.len(),
                "Added directory to context"
            );
        } else {
            // A single file the user named explicitly is only refused for size or content.
            match self.load(&path, metadata.len()).await {
                Ok(content) => self.insert(transcript, &path, &content, &mut report),
                Err(SkipReason::Unreadable(reason)) => {
                    return Err(AddError::Unreadable {
                        path: raw.to_string(),
                        reason,
                    });
                }
                Err(reason) => report.skipped.push((report.target.clone(), reason)),
            }
        }
        Ok(report)
    }

    async fn add_directory(&self, transcript: &mut Transcript, dir: &Path, report: &mut AddReport) {
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(directory = %current.display(), error = %e, "Could not list directory");
                    continue;
                }
            };

            let mut files = Vec::new();
            let mut subdirs = Vec::new();
            while let Ok(Some(entry)) = entries.next_entry().await {
                let Ok(file_type) = entry.file_type().await else {
                    continue;
                };
                if file_type.is_dir() {
                    subdirs.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
            files.sort();
            // Reverse so the stack pops subdirectories in name order.
            subdirs.sort_by(|a, b| b.cmp(a));

            for file in files {
                if report.added.len() >= self.max_files {
                    report.limit_reached = true;
                    warn!(limit = self.max_files, "Reached maximum file limit");
                    return;
                }
                let display = file.display().to_string();
                if is_excluded_file(&file) {
                    report.skipped.push((display, SkipReason::Excluded));
                    continue;
                }
                let size = match tokio::fs::metadata(&file).await {
                    Ok(metadata) => metadata.len(),
                    Err(e) => {
                        report.skipped.push((display, SkipReason::Unreadable(e.to_string())));
                        continue;
                    }
                };
                match self.load(&file, size).await {
                    Ok(content) => self.insert(transcript, &file, &content, report),
                    Err(reason) => report.skipped.push((display, reason)),
                }
            }

            pending.extend(subdirs.into_iter().filter(|d| !is_excluded_dir(d)));
        }
    }

    async fn load(&self, path: &Path, size: u64) -> Result<String, SkipReason> {
        if size > self.max_file_size {
            return Err(SkipReason::TooLarge);
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SkipReason::Unreadable(e.to_string()))?;
        if is_binary(&bytes) {
            return Err(SkipReason::Binary);
        }
        String::from_utf8(bytes).map_err(|_| SkipReason::Binary)
    }

    fn insert(&self, transcript: &mut Transcript, path: &Path, content: &str, report: &mut AddReport) {
        let display = path.display().to_string();
        if transcript.add_context_file(&display, content) {
            debug!(path = %path.display(), bytes = content.len(), "Added file to context");
            report.added.push(display);
        } else {
            report.skipped.push((display, SkipReason::AlreadyInContext));
        }
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

fn is_excluded_dir(path: &Path) -> bool {
    let name = file_name(path);
    name.starts_with('.') || EXCLUDED_NAMES.contains(&name)
}

fn is_excluded_file(path: &Path) -> bool {
    let name = file_name(path);
    if name.starts_with('.') || EXCLUDED_NAMES.contains(&name) {
        return true;
    }
    let lower = name.to_lowercase();
    EXCLUDED_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// A null byte near the start marks a file as binary.
pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_PEEK).any(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("src/nested")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join("README.md"), "# readme\n").unwrap();
        std::fs::write(root.join("src/main.py"), "print('hi')\n").unwrap();
        std::fs::write(root.join("src/nested/util.py"), "X = 1\n").unwrap();
        std::fs::write(root.join("src/logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        std::fs::write(root.join("src/app.min.js"), "a()").unwrap();
        std::fs::write(root.join("src/blob.dat"), [b'a', 0, b'b']).unwrap();
        std::fs::write(root.join(".env"), "SECRET=1").unwrap();
        std::fs::write(root.join("package-lock.json"), "{}").unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        std::fs::write(root.join(".git/HEAD"), "ref").unwrap();
        (dir, root)
    }

    #[test]
    fn binary_sniffing_only_looks_at_prefix() {
        assert!(is_binary(b"ab\0cd"));
        assert!(!is_binary(b"plain text"));
        let mut late = vec![b'a'; BINARY_PEEK];
        late.push(0);
        assert!(!is_binary(&late));
    }

    #[tokio::test]
    async fn add_single_file() {
        let (_dir, root) = tree();
        let loader = ContextLoader::new(&root);
        let mut transcript = Transcript::new("system");

        let report = loader.add(&mut transcript, "src/main.py").await.unwrap();
        let path = root.join("src/main.py").display().to_string();

        assert!(!report.is_directory);
        assert_eq!(report.added, vec![path.clone()]);
        assert_eq!(
            transcript.last().unwrap().content(),
            Some(format!("Content of file '{path}':\n\nprint('hi')\n").as_str())
        );
    }

    #[tokio::test]
    async fn adding_twice_does_not_duplicate() {
        let (_dir, root) = tree();
        let loader = ContextLoader::new(&root);
        let mut transcript = Transcript::new("system");

        loader.add(&mut transcript, "README.md").await.unwrap();
        let report = loader.add(&mut transcript, "README.md").await.unwrap();
        assert!(report.added.is_empty());
        assert_eq!(report.skipped[0].1, SkipReason::AlreadyInContext);
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn add_directory_filters_entries() {
        let (_dir, root) = tree();
        let loader = ContextLoader::new(&root);
        let mut transcript = Transcript::new("system");

        let report = loader.add(&mut transcript, ".").await.unwrap();
        assert!(report.is_directory);

        let expected: Vec<String> = ["README.md", "src/main.py", "src/nested/util.py"]
            .iter()
            .map(|p| root.join(p).display().to_string())
            .collect();
        assert_eq!(report.added, expected);

        let skipped: Vec<&SkipReason> = report.skipped.iter().map(|(_, r)| r).collect();
        assert!(skipped.contains(&&SkipReason::Binary));
        assert!(skipped.contains(&&SkipReason::Excluded));
        // Excluded directories are never entered.
        assert!(!report.skipped.iter().any(|(p, _)| p.contains("node_modules")));
        assert!(!report.skipped.iter().any(|(p, _)| p.contains(".git")));
        assert_eq!(transcript.len(), 4);
    }

    #[tokio::test]
    async fn oversized_files_are_skipped() {
        let (_dir, root) = tree();
        std::fs::write(root.join("src/big.py"), "x".repeat(64)).unwrap();
        let loader = ContextLoader::new(&root).with_max_file_size(32);
        let mut transcript = Transcript::new("system");

        let report = loader.add(&mut transcript, "src").await.unwrap();
        assert!(
            report
                .skipped
                .iter()
                .any(|(p, r)| p.ends_with("big.py") && *r == SkipReason::TooLarge)
        );
    }

    #[tokio::test]
    async fn file_limit_stops_the_walk() {
        let (_dir, root) = tree();
        let loader = ContextLoader::new(&root).with_max_files(2);
        let mut transcript = Transcript::new("system");

        let report = loader.add(&mut transcript, ".").await.unwrap();
        assert_eq!(report.added.len(), 2);
        assert!(report.limit_reached);
    }

    #[tokio::test]
    async fn missing_and_traversal_paths_fail() {
        let (_dir, root) = tree();
        let loader = ContextLoader::new(&root);
        let mut transcript = Transcript::new("system");

        let err = loader.add(&mut transcript, "ghost.py").await.unwrap_err();
        assert!(matches!(err, AddError::Unreadable { .. }));
        assert!(err.to_string().starts_with("Could not add path 'ghost.py'"));

        let err = loader.add(&mut transcript, "../outside").await.unwrap_err();
        assert!(matches!(err, AddError::InvalidPath { .. }));
        assert_eq!(transcript.len(), 1);
    }
}
