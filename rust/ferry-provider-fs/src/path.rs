//! Pure path manipulation. Only `absolute` and `normalize` touch the
//! filesystem.

use crate::error::{FsError, IoContext};
use std::path::{Component, Path, PathBuf};

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub fn parent(path: &str) -> String {
    Path::new(path).parent().map(display).unwrap_or_default()
}

pub fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Extension including the leading dot, or empty.
pub fn extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

pub fn stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Join components left to right. An absolute component replaces what came
/// before it.
pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    let mut iter = parts.iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let mut out = PathBuf::from(first.as_ref());
    for part in iter {
        out.push(part.as_ref());
    }
    display(&out)
}

pub fn absolute(path: &str) -> Result<String, FsError> {
    std::path::absolute(path)
        .map(|p| display(&p))
        .context(|| "Failed to get absolute path".to_string())
}

/// Canonical form for existing paths, lexical normalization otherwise.
pub fn normalize(path: &str) -> String {
    let p = Path::new(path);
    if p.exists() {
        if let Ok(canonical) = p.canonicalize() {
            return display(&canonical);
        }
    }
    display(&lexical_normal(p))
}

fn lexical_normal(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_paths() {
        assert_eq!(parent("/data/notes/today.md"), "/data/notes");
        assert_eq!(file_name("/data/notes/today.md"), "today.md");
        assert_eq!(extension("/data/notes/today.md"), ".md");
        assert_eq!(stem("/data/notes/today.md"), "today");
        assert_eq!(extension("/data/Makefile"), "");
        assert_eq!(parent("relative"), "");
    }

    #[test]
    fn joins_variadic_components() {
        assert_eq!(join(&["/a", "b", "c.txt"]), "/a/b/c.txt");
        assert_eq!(join(&["a", "/abs"]), "/abs");
        assert_eq!(join::<&str>(&[]), "");
    }

    #[test]
    fn normalizes_missing_paths_lexically() {
        assert_eq!(
            normalize("/definitely/not/here/../there/./x"),
            "/definitely/not/there/x"
        );
        assert_eq!(normalize("a/.."), ".");
        assert_eq!(normalize("../a"), "../a");
    }
}
