//! Path confinement for tools.
//!
//! Paths are checked lexically: `.` and `..` components are folded before
//! comparing against the base directory. Symbolic links are not followed.

use std::path::{Component, Path, PathBuf};

use super::Error;

/// Folds `.` and `..` components of `path` without touching the
/// filesystem.
///
/// A `..` at the root (or at the start of a relative path) is dropped for
/// absolute paths and kept for relative ones.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// Resolves `path` against `base` and checks it stays inside `base`.
///
/// Relative paths are joined onto `base`; absolute paths are taken as
/// they are. `base` is expected to be absolute.
pub fn resolve_path<P: AsRef<Path>>(base: &Path, path: P) -> Result<PathBuf, Error> {
    let path = path.as_ref();
    let base = normalize(base);
    let resolved = normalize(&base.join(path));
    if !resolved.starts_with(&base) {
        return Err(Error::permission_denied().with_reason(format!(
            "Path '{}' is outside the base directory",
            path.display()
        )));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ErrorKind;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), Path::new("/a/c"));
        assert_eq!(normalize(Path::new("/../a")), Path::new("/a"));
        assert_eq!(normalize(Path::new("a/../../b")), Path::new("../b"));
        assert_eq!(normalize(Path::new("./")), Path::new(""));
    }

    #[test]
    fn test_resolve_inside_base() {
        let base = Path::new("/srv/site");
        assert_eq!(resolve_path(base, ".").unwrap(), Path::new("/srv/site"));
        assert_eq!(
            resolve_path(base, "src/../index.html").unwrap(),
            Path::new("/srv/site/index.html")
        );
        assert_eq!(
            resolve_path(base, "/srv/site/css/main.css").unwrap(),
            Path::new("/srv/site/css/main.css")
        );
    }

    #[test]
    fn test_reject_escaping_paths() {
        let base = Path::new("/srv/site");
        for path in ["..", "../other", "src/../../etc/passwd", "/etc/passwd", "/srv/site-other"] {
            let err = resolve_path(base, path).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PermissionDenied, "{path}");
        }
    }
}
