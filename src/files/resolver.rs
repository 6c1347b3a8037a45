//! Maps a request target onto a file under the served root.
//!
//! Containment is checked twice: lexically, before the filesystem is touched,
//! so `..` can never climb above the root; then on the canonical path, so a
//! symlink inside the root cannot point outside it. Both checks compare path
//! components, never string prefixes, so `/srv/ab` does not contain
//! `/srv/abc`.
//!
//! The lexical check is stricter than joining and canonicalizing: a target
//! that climbs above the root and comes back in, such as `/../srv/a.png`
//! with root `/srv`, is refused with 403 even though it would land inside.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs::File;
use tracing::debug;

/// A readable regular file inside the root.
#[derive(Debug)]
pub struct ResolvedFile {
    /// Canonical path of the file.
    pub path: PathBuf,
    pub file: File,
    pub len: u64,
}

#[derive(Debug)]
pub enum Resolution {
    Found(ResolvedFile),
    /// Outside the root, not a regular file, or unreadable.
    Forbidden,
    NotFound,
}

/// Resolves `target` (e.g. `/videos/a.mp4`) against `root`.
///
/// `root` must already be canonical.
pub async fn resolve(root: &Path, target: &str) -> Resolution {
    let Some(relative) = sanitize(target) else {
        debug!(path = %target, "Target escapes file root");
        return Resolution::Forbidden;
    };

    let candidate = root.join(&relative);
    let canonical = match tokio::fs::canonicalize(&candidate).await {
        Ok(path) => path,
        Err(e) if is_missing(&e) => return Resolution::NotFound,
        Err(e) => {
            debug!(path = %target, error = %e, "Failed to canonicalize target");
            return Resolution::Forbidden;
        }
    };

    if !canonical.starts_with(root) {
        debug!(path = %target, "Target resolves outside file root");
        return Resolution::Forbidden;
    }

    match tokio::fs::metadata(&canonical).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            debug!(path = %target, "Target is not a regular file");
            return Resolution::Forbidden;
        }
        Err(e) if is_missing(&e) => return Resolution::NotFound,
        Err(e) => {
            debug!(path = %target, error = %e, "Failed to stat target");
            return Resolution::Forbidden;
        }
    }

    let file = match File::open(&canonical).await {
        Ok(file) => file,
        Err(e) if is_missing(&e) => return Resolution::NotFound,
        Err(e) => {
            debug!(path = %target, error = %e, "Target is not readable");
            return Resolution::Forbidden;
        }
    };

    match file.metadata().await {
        Ok(meta) => Resolution::Found(ResolvedFile {
            path: canonical,
            file,
            len: meta.len(),
        }),
        Err(e) => {
            debug!(path = %target, error = %e, "Failed to stat target");
            Resolution::Forbidden
        }
    }
}

/// Normalizes `target` into a root-relative path, folding `.` and `..`.
///
/// Returns `None` if a `..` would step above the root.
fn sanitize(target: &str) -> Option<PathBuf> {
    let mut result = PathBuf::new();

    for component in Path::new(target.trim_start_matches('/')).components() {
        match component {
            Component::Normal(c) => result.push(c),
            Component::ParentDir => {
                if !result.pop() {
                    return None;
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    Some(result)
}

fn is_missing(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_plain_paths() {
        assert_eq!(sanitize("/a/b.png"), Some(PathBuf::from("a/b.png")));
        assert_eq!(sanitize("/"), Some(PathBuf::new()));
    }

    #[test]
    fn sanitize_folds_dots_inside_root() {
        assert_eq!(sanitize("/a/./../b.png"), Some(PathBuf::from("b.png")));
    }

    #[test]
    fn sanitize_rejects_escape() {
        assert_eq!(sanitize("/../../etc/passwd"), None);
        assert_eq!(sanitize("/a/../../b"), None);
    }
}
