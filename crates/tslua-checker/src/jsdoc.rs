//! JSDoc directive extraction.
//!
//! Directives are written as JSDoc tags (`/** @tupleReturn */`). The older
//! `/** !tupleReturn */` form is still accepted but reported as deprecated.

use swc_common::comments::{Comment, CommentKind, Comments, SingleThreadedComments};
use swc_common::BytePos;
use tslua_types::{DirectiveKind, Directives};

/// Problem found while reading a doc comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveIssue {
    /// `!name` with a known name.
    Deprecated(String),
    /// `!name` with an unknown name.
    Unknown(String),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DocComment {
    pub directives: Directives,
    pub issues: Vec<DirectiveIssue>,
}

fn is_jsdoc(comment: &Comment) -> bool {
    comment.kind == CommentKind::Block && comment.text.starts_with('*')
}

/// Lines of a block comment body with the leading `*` gutter removed.
fn doc_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(|line| {
        let line = line.trim();
        line.trim_start_matches('*').trim()
    })
}

/// Directive segments of one line. A segment starts at a word beginning
/// with `@` (or `!`, when it opens the line or follows another tag) and
/// takes the words up to the next such word as arguments. Words before the
/// first tag are description.
fn tag_segments(line: &str) -> Vec<(&str, Vec<String>)> {
    let mut segments: Vec<(&str, Vec<String>)> = Vec::new();
    for (index, word) in line.split_whitespace().enumerate() {
        let opens_tag =
            word.starts_with('@') || (word.starts_with('!') && (index == 0 || !segments.is_empty()));
        if opens_tag {
            segments.push((word, Vec::new()));
        } else if let Some((_, args)) = segments.last_mut() {
            args.push(word.to_string());
        }
    }
    segments
}

/// Reads the directives from one JSDoc comment body (the text between
/// `/*` and `*/`).
pub fn parse_doc_comment(text: &str) -> DocComment {
    let mut doc = DocComment::default();
    for line in doc_lines(text) {
        for (tag, args) in tag_segments(line) {
            if let Some(name) = tag.strip_prefix('!') {
                match DirectiveKind::from_tag(name) {
                    Some(kind) => {
                        doc.directives.insert(kind, args);
                        doc.issues.push(DirectiveIssue::Deprecated(tag.to_string()));
                    }
                    None => doc.issues.push(DirectiveIssue::Unknown(tag.to_string())),
                }
            } else if let Some(name) = tag.strip_prefix('@') {
                // Other JSDoc tags (@param, @returns, ...) are not directives
                if let Some(kind) = DirectiveKind::from_tag(name) {
                    doc.directives.insert(kind, args);
                }
            }
        }
    }
    doc
}

/// Directives from every JSDoc comment leading the node at `pos`, with the
/// position of each comment that produced an issue.
pub fn leading_directives(
    comments: &SingleThreadedComments,
    pos: BytePos,
) -> (Directives, Vec<(DirectiveIssue, swc_common::Span)>) {
    let mut directives = Directives::new();
    let mut issues = Vec::new();
    for comment in comments.get_leading(pos).unwrap_or_default() {
        if !is_jsdoc(&comment) {
            continue;
        }
        let doc = parse_doc_comment(&comment.text);
        directives.merge(&doc.directives);
        issues.extend(doc.issues.into_iter().map(|issue| (issue, comment.span)));
    }
    (directives, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_become_directives() {
        let doc = parse_doc_comment("*\n * Adds things.\n * @tupleReturn\n * @param a first\n ");
        assert!(doc.directives.has(DirectiveKind::TupleReturn));
        assert_eq!(doc.directives.kinds().count(), 1);
        assert!(doc.issues.is_empty());
    }

    #[test]
    fn test_directive_arguments() {
        let doc = parse_doc_comment("* @customConstructor MakeVector ");
        assert_eq!(
            doc.directives.args(DirectiveKind::CustomConstructor),
            Some(&["MakeVector".to_string()][..])
        );
    }

    #[test]
    fn test_several_tags_on_one_line() {
        let doc = parse_doc_comment("* @luaIterator @tupleReturn ");
        assert!(doc.directives.has(DirectiveKind::LuaIterator));
        assert!(doc.directives.has(DirectiveKind::TupleReturn));
        assert_eq!(doc.directives.args(DirectiveKind::LuaIterator), Some(&[] as &[String]));

        let doc = parse_doc_comment("* Calls out. @tupleReturn @noSelf ");
        assert!(doc.directives.has(DirectiveKind::TupleReturn));
        assert!(doc.directives.has(DirectiveKind::NoSelf));

        let doc = parse_doc_comment("* @customConstructor MakeVector @noSelf ");
        assert_eq!(
            doc.directives.args(DirectiveKind::CustomConstructor),
            Some(&["MakeVector".to_string()][..])
        );
        assert!(doc.directives.has(DirectiveKind::NoSelf));
    }

    #[test]
    fn test_bang_syntax_is_deprecated() {
        let doc = parse_doc_comment("* !noSelf\n * !frobnicate ");
        assert!(doc.directives.has(DirectiveKind::NoSelf));
        assert_eq!(
            doc.issues,
            vec![
                DirectiveIssue::Deprecated("!noSelf".to_string()),
                DirectiveIssue::Unknown("!frobnicate".to_string()),
            ]
        );
    }

    #[test]
    fn test_leading_comments_of_declaration() {
        let parsed = tslua_parser::parse_typescript(
            "/** @luaTable */\ndeclare class Table {}\n// @noSelf\nfunction f() {}",
            "doc.ts",
        )
        .unwrap();
        let first = swc_common::Spanned::span(&parsed.module.body[0]).lo;
        let second = swc_common::Spanned::span(&parsed.module.body[1]).lo;
        let (directives, _) = leading_directives(&parsed.comments, first);
        assert!(directives.has(DirectiveKind::LuaTable));
        let (directives, _) = leading_directives(&parsed.comments, second);
        assert!(directives.is_empty());
    }
}
