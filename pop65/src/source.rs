//! Source files, file resolution and the include stack

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::trace;

use crate::error::{AsmError, ErrorKind, Result};

/// A loaded source file split into lines.
#[derive(Debug)]
pub struct SourceFile {
    /// Name used in diagnostics.
    pub name: String,
    /// Resolved identity, used to detect include loops.
    pub path: PathBuf,
    lines: Vec<String>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn from_bytes(name: impl Into<String>, path: impl Into<PathBuf>, bytes: &[u8]) -> Self {
        Self::new(name, path, &String::from_utf8_lossy(bytes))
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Locates and reads files named by `.inc` and `.bin`.
pub trait FileResolver {
    /// Read `name` as referenced from the file at `from` (None at top level).
    /// Returns the resolved identity and the contents.
    fn load(&self, name: &str, from: Option<&Path>) -> Result<(PathBuf, Vec<u8>)>;
}

/// Treat `\` and `/` as the same separator.
pub fn normalize(name: &str) -> String {
    name.replace('\\', "/")
}

/// Resolves against the including file's directory, then the configured
/// include directories, then the working directory.
#[derive(Debug, Clone, Default)]
pub struct FsResolver {
    include_dirs: Vec<PathBuf>,
}

impl FsResolver {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        Self { include_dirs }
    }

    fn candidates(&self, name: &str, from: Option<&Path>) -> Vec<PathBuf> {
        let rel = PathBuf::from(normalize(name));
        let mut out = Vec::new();
        if let Some(dir) = from.and_then(Path::parent) {
            out.push(dir.join(&rel));
        }
        out.extend(self.include_dirs.iter().map(|dir| dir.join(&rel)));
        out.push(rel);
        out
    }
}

impl FileResolver for FsResolver {
    fn load(&self, name: &str, from: Option<&Path>) -> Result<(PathBuf, Vec<u8>)> {
        let candidates = self.candidates(name, from);
        let Some(found) = candidates.iter().find(|p| p.is_file()) else {
            return Err(AsmError::new(
                ErrorKind::FileNotFound,
                format!("'{}'", name),
            ));
        };
        trace!(name, path = %found.display(), "resolved file");
        let bytes = fs::read(found)?;
        let id = fs::canonicalize(found).unwrap_or_else(|_| found.clone());
        Ok((id, bytes))
    }
}

/// Serves files from memory. Names are matched after separator
/// normalization, first relative to the including file.
#[derive(Debug, Clone, Default)]
pub struct MemResolver {
    files: HashMap<String, Vec<u8>>,
}

impl MemResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, contents: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(normalize(name), contents.into());
        self
    }

    pub fn with(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.add(name, contents);
        self
    }
}

impl FileResolver for MemResolver {
    fn load(&self, name: &str, from: Option<&Path>) -> Result<(PathBuf, Vec<u8>)> {
        let name = normalize(name);
        let relative = from
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| format!("{}/{}", normalize(&dir.to_string_lossy()), name));
        relative
            .into_iter()
            .chain(std::iter::once(name.clone()))
            .find_map(|key| self.files.get(&key).map(|bytes| (PathBuf::from(&key), bytes.clone())))
            .ok_or_else(|| AsmError::new(ErrorKind::FileNotFound, format!("'{}'", name)))
    }
}

/// One entry of the include stack.
#[derive(Debug, Clone)]
pub struct IncludeFrame {
    pub file: Rc<SourceFile>,
    pub next_line: usize,
    /// Conditional depth when the file was entered.
    pub cond_base: usize,
}

impl IncludeFrame {
    pub fn new(file: Rc<SourceFile>, cond_base: usize) -> Self {
        Self {
            file,
            next_line: 0,
            cond_base,
        }
    }
}

/// File contents read during pass 1, replayed in order during pass 2.
#[derive(Debug, Clone)]
pub enum Loaded {
    Source(Rc<SourceFile>),
    Binary(Rc<[u8]>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_lines() {
        let file = SourceFile::new("t.s", "t.s", "a\r\nb\n\nc");
        assert_eq!(file.len(), 4);
        assert_eq!(file.line(0), Some("a"));
        assert_eq!(file.line(2), Some(""));
        assert_eq!(file.line(4), None);
    }

    #[test]
    fn test_mem_resolver_normalizes_separators() {
        let resolver = MemResolver::new().with("lib/util.s", "nop");
        let (id, bytes) = resolver.load("lib\\util.s", None).unwrap();
        assert_eq!(id, PathBuf::from("lib/util.s"));
        assert_eq!(bytes, b"nop");
    }

    #[test]
    fn test_mem_resolver_relative_to_includer() {
        let resolver = MemResolver::new()
            .with("lib/inner.s", "inner")
            .with("inner.s", "top");
        let (_, bytes) = resolver.load("inner.s", Some(Path::new("lib/outer.s"))).unwrap();
        assert_eq!(bytes, b"inner");
        let (_, bytes) = resolver.load("inner.s", Some(Path::new("main.s"))).unwrap();
        assert_eq!(bytes, b"top");
    }

    #[test]
    fn test_missing_file() {
        let err = MemResolver::new().load("nope.s", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        let err = FsResolver::default()
            .load("definitely/not/here.s", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_fs_resolver_include_dirs() {
        let dir = std::env::temp_dir().join(format!("pop65-resolver-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("defs.s"), "x = 1\n").unwrap();

        let resolver = FsResolver::new(vec![dir.clone()]);
        let (_, bytes) = resolver.load("defs.s", None).unwrap();
        assert_eq!(bytes, b"x = 1\n");

        fs::remove_dir_all(&dir).unwrap();
    }
}
