//! Cached source text used to resolve spans into lines and columns.

use crate::span::{FileId, Location, Span};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One TypeScript (or JSON) input file together with its line table.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub source: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(id: FileId, path: PathBuf, source: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| (i + 1) as u32))
            .collect();
        Self {
            id,
            path,
            source,
            line_starts,
        }
    }

    /// Zero-based `(line, character)` of a byte offset, the form Lua nodes
    /// record as their source position.
    pub fn position(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        (line as u32, offset - self.line_starts[line])
    }

    /// One-based `(line, column)` for display.
    pub fn line_column(&self, offset: u32) -> (u32, u32) {
        let (line, character) = self.position(offset);
        (line + 1, character + 1)
    }

    /// Text of a one-based line without its terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let idx = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(idx)? as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map_or(self.source.len(), |&e| e as usize);
        Some(self.source[start..end].trim_end_matches(['\n', '\r']))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn slice(&self, start: u32, end: u32) -> Option<&str> {
        self.source.get(start as usize..end as usize)
    }
}

/// All files seen during a compilation, addressed by [`FileId`].
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Vec<SourceFile>,
    by_path: HashMap<PathBuf, FileId>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file. Adding the same path twice returns the first id.
    pub fn add_file(&mut self, path: impl AsRef<Path>, source: String) -> FileId {
        let path = path.as_ref().to_path_buf();
        if let Some(&id) = self.by_path.get(&path) {
            return id;
        }
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile::new(id, path.clone(), source));
        self.by_path.insert(path, id);
        id
    }

    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    pub fn get_id(&self, path: impl AsRef<Path>) -> Option<FileId> {
        self.by_path.get(path.as_ref()).copied()
    }

    pub fn location(&self, span: Span) -> Option<Location> {
        if span.is_dummy() {
            return None;
        }
        let file = self.get_file(span.file_id)?;
        let (line, column) = file.line_column(span.start);
        Some(Location {
            file: file.path.to_string_lossy().into_owned(),
            line,
            column,
        })
    }

    pub fn source_text(&self, span: Span) -> Option<&str> {
        if span.is_dummy() {
            return None;
        }
        self.get_file(span.file_id)?.slice(span.start, span.end)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_is_zero_based() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("a.ts", "let a = 1;\n  foo();\n".to_string());
        let file = cache.get_file(id).unwrap();
        assert_eq!(file.position(0), (0, 0));
        assert_eq!(file.position(13), (1, 2));
        assert_eq!(file.line_column(13), (2, 3));
        assert_eq!(file.line_count(), 3);
    }

    #[test]
    fn test_line_text_strips_crlf() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("w.ts", "one\r\ntwo".to_string());
        let file = cache.get_file(id).unwrap();
        assert_eq!(file.line_text(1), Some("one"));
        assert_eq!(file.line_text(2), Some("two"));
        assert_eq!(file.line_text(0), None);
        assert_eq!(file.line_text(3), None);
    }

    #[test]
    fn test_same_path_reuses_id() {
        let mut cache = SourceCache::new();
        let a = cache.add_file("m.ts", "x".to_string());
        let b = cache.add_file("m.ts", "ignored".to_string());
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_id("m.ts"), Some(a));
    }

    #[test]
    fn test_location_and_text() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("m.ts", "const x = 42;\nx += 1;".to_string());
        let span = Span::new(id, 14, 15);
        assert_eq!(cache.location(span).unwrap().to_string(), "m.ts:2:1");
        assert_eq!(cache.source_text(Span::new(id, 6, 7)), Some("x"));
        assert_eq!(cache.location(Span::DUMMY), None);
    }
}
