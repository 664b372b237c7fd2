//! Watch target derivation and event filtering.

use std::path::{Path, PathBuf};

/// Directory to watch for a given artifact path.
///
/// An absolute artifact is watched through its parent directory. A relative
/// one is resolved against `cwd`: `dist/apps/server/main.js` watches
/// `<cwd>/dist/apps/server`, and a bare `main.js` watches `cwd` itself.
pub fn derive_watch_dir(artifact: &Path, cwd: &Path) -> PathBuf {
    if artifact.is_absolute() {
        return artifact
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| artifact.to_path_buf());
    }

    match artifact.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => cwd.join(parent),
        None => cwd.to_path_buf(),
    }
}

/// True when the file name of `path` ends in one of `extensions`.
///
/// Matching is case-sensitive: `bundle.JS` is not a `.js` file.
/// `extensions` are expected in normalized form, see [`normalize_extensions`].
pub fn is_relevant(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}

/// Trim each extension and ensure it starts with a dot.
pub fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| ext.as_ref().trim())
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            if ext.starts_with('.') {
                ext.to_string()
            } else {
                format!(".{}", ext)
            }
        })
        .collect()
}
