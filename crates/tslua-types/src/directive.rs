//! JSDoc directives (`/** @noSelf */`, `/** @tupleReturn */`, ...).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DirectiveKind {
    Extension,
    MetaExtension,
    CustomConstructor,
    CompileMembersOnly,
    NoResolution,
    PureAbstract,
    Phantom,
    TupleReturn,
    LuaIterator,
    LuaTable,
    NoSelf,
    NoSelfInFile,
    Vararg,
    ForRange,
}

impl DirectiveKind {
    pub const ALL: [DirectiveKind; 14] = [
        DirectiveKind::Extension,
        DirectiveKind::MetaExtension,
        DirectiveKind::CustomConstructor,
        DirectiveKind::CompileMembersOnly,
        DirectiveKind::NoResolution,
        DirectiveKind::PureAbstract,
        DirectiveKind::Phantom,
        DirectiveKind::TupleReturn,
        DirectiveKind::LuaIterator,
        DirectiveKind::LuaTable,
        DirectiveKind::NoSelf,
        DirectiveKind::NoSelfInFile,
        DirectiveKind::Vararg,
        DirectiveKind::ForRange,
    ];

    /// Tag name as written after `@`.
    pub fn tag(self) -> &'static str {
        match self {
            DirectiveKind::Extension => "extension",
            DirectiveKind::MetaExtension => "metaExtension",
            DirectiveKind::CustomConstructor => "customConstructor",
            DirectiveKind::CompileMembersOnly => "compileMembersOnly",
            DirectiveKind::NoResolution => "noResolution",
            DirectiveKind::PureAbstract => "pureAbstract",
            DirectiveKind::Phantom => "phantom",
            DirectiveKind::TupleReturn => "tupleReturn",
            DirectiveKind::LuaIterator => "luaIterator",
            DirectiveKind::LuaTable => "luaTable",
            DirectiveKind::NoSelf => "noSelf",
            DirectiveKind::NoSelfInFile => "noSelfInFile",
            DirectiveKind::Vararg => "vararg",
            DirectiveKind::ForRange => "forRange",
        }
    }

    /// Case-insensitive lookup of a tag name.
    pub fn from_tag(tag: &str) -> Option<DirectiveKind> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.tag().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown directive '@{0}'")]
pub struct UnknownDirective(pub String);

impl FromStr for DirectiveKind {
    type Err = UnknownDirective;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.strip_prefix('@').unwrap_or(s);
        DirectiveKind::from_tag(tag).ok_or_else(|| UnknownDirective(tag.to_string()))
    }
}

/// Directives attached to one declaration, each with its whitespace
/// separated arguments. A later directive of the same kind replaces an
/// earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Directives {
    entries: BTreeMap<DirectiveKind, Vec<String>>,
}

impl Directives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: DirectiveKind, args: Vec<String>) {
        self.entries.insert(kind, args);
    }

    pub fn has(&self, kind: DirectiveKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn args(&self, kind: DirectiveKind) -> Option<&[String]> {
        self.entries.get(&kind).map(Vec::as_slice)
    }

    pub fn merge(&mut self, other: &Directives) {
        for (kind, args) in &other.entries {
            self.entries.insert(*kind, args.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = DirectiveKind> + '_ {
        self.entries.keys().copied()
    }
}

impl FromIterator<(DirectiveKind, Vec<String>)> for Directives {
    fn from_iter<I: IntoIterator<Item = (DirectiveKind, Vec<String>)>>(iter: I) -> Self {
        Directives {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lookup_ignores_case() {
        assert_eq!(DirectiveKind::from_tag("noself"), Some(DirectiveKind::NoSelf));
        assert_eq!(DirectiveKind::from_tag("TupleReturn"), Some(DirectiveKind::TupleReturn));
        assert_eq!(DirectiveKind::from_tag("param"), None);
        assert_eq!("@luaTable".parse::<DirectiveKind>(), Ok(DirectiveKind::LuaTable));
        assert!("@returns".parse::<DirectiveKind>().is_err());
    }

    #[test]
    fn test_merge_keeps_latest_arguments() {
        let mut base: Directives = [(DirectiveKind::CustomConstructor, vec!["a".to_string()])]
            .into_iter()
            .collect();
        let mut other = Directives::new();
        other.insert(DirectiveKind::CustomConstructor, vec!["b".to_string()]);
        other.insert(DirectiveKind::NoSelf, vec![]);
        base.merge(&other);
        assert_eq!(base.args(DirectiveKind::CustomConstructor), Some(&["b".to_string()][..]));
        assert!(base.has(DirectiveKind::NoSelf));
        assert_eq!(base.kinds().count(), 2);
    }
}
