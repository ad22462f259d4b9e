//! Normalized path handling for cross-platform compatibility

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A path normalized to use forward slashes internally.
///
/// Provides consistent path handling across platforms by normalizing
/// all paths to forward slashes internally and converting to
/// platform-native format only at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    ///
    /// Converts backslashes to forward slashes and drops `.` segments.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        Self {
            inner: clean(&path_str.replace('\\', "/")),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment.
    pub fn join(&self, segment: &str) -> Self {
        let segment_normalized = segment.replace('\\', "/");
        let joined = if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment_normalized)
        } else {
            format!("{}/{}", self.inner, segment_normalized)
        };
        Self {
            inner: clean(&joined),
        }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) if idx > 0 => Some(Self {
                inner: trimmed[..idx].to_string(),
            }),
            Some(0) => Some(Self {
                inner: "/".to_string(),
            }),
            _ => None,
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 { None } else { Some(&name[idx + 1..]) }
        })
    }

    /// Whether the path is rooted (`/x`, `//server/share` or `C:/x`).
    pub fn is_absolute(&self) -> bool {
        let bytes = self.inner.as_bytes();
        self.inner.starts_with('/')
            || (bytes.len() >= 3
                && bytes[0].is_ascii_alphabetic()
                && bytes[1] == b':'
                && bytes[2] == b'/')
    }

    /// Resolve a relative path against `base`; absolute paths are returned as-is.
    pub fn resolve_against(&self, base: &Path) -> Self {
        if self.is_absolute() {
            return self.clone();
        }
        let joined = base.join(self.to_native());
        Self::new(dunce::simplified(&joined))
    }

    /// Check if this path exists on the filesystem.
    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

/// Drop `.` segments and repeated separators, keeping a leading `//`.
fn clean(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let prefix = if raw.starts_with("//") && !raw.starts_with("///") {
        "//"
    } else if raw.starts_with('/') {
        "/"
    } else {
        ""
    };
    let body: Vec<&str> = raw
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    if body.is_empty() {
        return if prefix.is_empty() {
            ".".to_string()
        } else {
            prefix.to_string()
        };
    }
    format!("{}{}", prefix, body.join("/"))
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

impl From<NormalizedPath> for String {
    fn from(p: NormalizedPath) -> Self {
        p.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a/./b", "a/b")]
    #[case("./.venv", ".venv")]
    #[case("a//b/", "a/b")]
    #[case("/", "/")]
    #[case(".", ".")]
    #[case("C:\\work\\.venv", "C:/work/.venv")]
    fn test_new_cleans(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(NormalizedPath::new(input).as_str(), expected);
    }

    #[rstest]
    #[case("/opt/env", true)]
    #[case("C:/env", true)]
    #[case(".venv", false)]
    #[case("build/.venv", false)]
    fn test_is_absolute(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(NormalizedPath::new(input).is_absolute(), expected);
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let resolved = NormalizedPath::new(".venv").resolve_against(Path::new("/work/proj"));
        assert_eq!(resolved.as_str(), "/work/proj/.venv");
    }

    #[test]
    fn test_resolve_absolute_is_identity() {
        let path = NormalizedPath::new("/opt/env");
        assert_eq!(path.resolve_against(Path::new("/elsewhere")), path);
    }

    #[test]
    fn test_file_name_and_extension() {
        let path = NormalizedPath::new("/cfg/provision.toml");
        assert_eq!(path.file_name(), Some("provision.toml"));
        assert_eq!(path.extension(), Some("toml"));
        assert_eq!(NormalizedPath::new("/x/.venv").extension(), None);
    }

    #[test]
    fn test_serde_as_plain_string() {
        let path = NormalizedPath::new("/a/b");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/a/b\"");
        let back: NormalizedPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
