//! LuaLib: runtime helpers emitted on demand
//!
//! Lowering records the helpers a file needs as a [`FeatureSet`]. The
//! emitter then expands the set through the static dependency graph and
//! splices in helper sources, loaded from a [`LuaLibSource`], dependencies
//! first.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

macro_rules! features {
    ($($name:ident),* $(,)?) => {
        /// A named runtime helper. The helper source lives in
        /// `<Name>.lua` and defines `__TS__<Name>`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum LuaLibFeature {
            $($name,)*
        }

        impl LuaLibFeature {
            pub const ALL: &'static [LuaLibFeature] = &[$(LuaLibFeature::$name,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(LuaLibFeature::$name => stringify!($name),)*
                }
            }
        }
    };
}

features! {
    ArrayConcat,
    ArrayEvery,
    ArrayFilter,
    ArrayForEach,
    ArrayFindIndex,
    ArrayIndexOf,
    ArrayMap,
    ArrayPush,
    ArrayReduce,
    ArrayReverse,
    ArrayShift,
    ArrayUnshift,
    ArraySort,
    ArraySlice,
    ArraySome,
    ArraySplice,
    ArrayToObject,
    ArrayFlat,
    ArrayFlatMap,
    ArraySetLength,
    ClassIndex,
    ClassNewIndex,
    Decorate,
    FunctionApply,
    FunctionBind,
    FunctionCall,
    Index,
    InstanceOf,
    InstanceOfObject,
    Iterator,
    Map,
    NewIndex,
    Number,
    NumberIsFinite,
    NumberIsNaN,
    ObjectAssign,
    ObjectEntries,
    ObjectFromEntries,
    ObjectKeys,
    ObjectRest,
    ObjectValues,
    Set,
    WeakMap,
    WeakSet,
    SourceMapTraceBack,
    Spread,
    StringConcat,
    StringEndsWith,
    StringPadEnd,
    StringPadStart,
    StringReplace,
    StringSplit,
    StringStartsWith,
    Symbol,
    SymbolRegistry,
    TypeOf,
}

impl LuaLibFeature {
    /// Helpers this one calls at load time, in load order.
    pub fn dependencies(self) -> &'static [LuaLibFeature] {
        use LuaLibFeature::*;
        match self {
            ArrayFlat | ArrayFlatMap => &[ArrayConcat],
            InstanceOf | Iterator | SymbolRegistry => &[Symbol],
            ObjectFromEntries => &[Iterator, Symbol],
            Map | Set | WeakMap | WeakSet => &[InstanceOf, Iterator, Symbol],
            Spread => &[Iterator],
            _ => &[],
        }
    }

    /// Global function name the helper defines.
    pub fn function_name(self) -> String {
        format!("__TS__{}", self.name())
    }

    pub fn file_name(self) -> String {
        format!("{}.lua", self.name())
    }
}

impl fmt::Display for LuaLibFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LuaLibFeature {
    type Err = LuaLibError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LuaLibFeature::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| LuaLibError::UnknownFeature(s.to_string()))
    }
}

/// Features requested while lowering one file, in first-use order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureSet {
    order: IndexSet<LuaLibFeature>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the feature was not requested before.
    pub fn insert(&mut self, feature: LuaLibFeature) -> bool {
        let inserted = self.order.insert(feature);
        if inserted {
            log::debug!("lualib feature requested: {}", feature);
        }
        inserted
    }

    pub fn contains(&self, feature: LuaLibFeature) -> bool {
        self.order.contains(&feature)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = LuaLibFeature> + '_ {
        self.order.iter().copied()
    }

    pub fn extend(&mut self, other: &FeatureSet) {
        for feature in other.iter() {
            self.insert(feature);
        }
    }
}

impl FromIterator<LuaLibFeature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = LuaLibFeature>>(iter: I) -> Self {
        let mut set = FeatureSet::new();
        for feature in iter {
            set.insert(feature);
        }
        set
    }
}

/// How helpers reach the emitted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LuaLibImportKind {
    /// Never import helpers
    None,
    /// Always `require("lualib_bundle")`
    Always,
    /// Paste the used helpers into the file
    #[default]
    Inline,
    /// `require("lualib_bundle")` only when some helper is used
    Require,
}

impl LuaLibImportKind {
    pub const BUNDLE_MODULE: &'static str = "lualib_bundle";

    pub fn as_str(self) -> &'static str {
        match self {
            LuaLibImportKind::None => "none",
            LuaLibImportKind::Always => "always",
            LuaLibImportKind::Inline => "inline",
            LuaLibImportKind::Require => "require",
        }
    }

    /// Whether a file using `features` starts with a bundle `require`.
    pub fn requires_bundle(self, features: &FeatureSet) -> bool {
        match self {
            LuaLibImportKind::Always => true,
            LuaLibImportKind::Require => !features.is_empty(),
            LuaLibImportKind::None | LuaLibImportKind::Inline => false,
        }
    }
}

impl FromStr for LuaLibImportKind {
    type Err = LuaLibError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(LuaLibImportKind::None),
            "always" => Ok(LuaLibImportKind::Always),
            "inline" => Ok(LuaLibImportKind::Inline),
            "require" => Ok(LuaLibImportKind::Require),
            _ => Err(LuaLibError::UnknownImportKind(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum LuaLibError {
    #[error("Could not read lualib feature {path}")]
    MissingFeature { feature: LuaLibFeature, path: String },
    #[error("Unknown lualib feature '{0}'")]
    UnknownFeature(String),
    #[error("Unknown lualib import kind '{0}', expected none, always, inline or require")]
    UnknownImportKind(String),
}

/// Where helper sources come from.
pub trait LuaLibSource {
    fn read_feature(&self, feature: LuaLibFeature) -> Option<String>;

    /// Location reported when a feature is missing.
    fn describe(&self, feature: LuaLibFeature) -> String {
        feature.file_name()
    }
}

/// Reads `<dir>/<Feature>.lua`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl LuaLibSource for DirectorySource {
    fn read_feature(&self, feature: LuaLibFeature) -> Option<String> {
        std::fs::read_to_string(self.dir.join(feature.file_name())).ok()
    }

    fn describe(&self, feature: LuaLibFeature) -> String {
        self.dir.join(feature.file_name()).display().to_string()
    }
}

impl LuaLibSource for BTreeMap<LuaLibFeature, String> {
    fn read_feature(&self, feature: LuaLibFeature) -> Option<String> {
        self.get(&feature).cloned()
    }
}

/// Expands `features` through the dependency graph, dependencies first,
/// each feature at most once.
pub fn resolve_load_order(features: &FeatureSet) -> Vec<LuaLibFeature> {
    fn visit(feature: LuaLibFeature, seen: &mut HashSet<LuaLibFeature>, out: &mut Vec<LuaLibFeature>) {
        if !seen.insert(feature) {
            return;
        }
        for &dependency in feature.dependencies() {
            visit(dependency, seen, out);
        }
        out.push(feature);
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for feature in features.iter() {
        visit(feature, &mut seen, &mut out);
    }
    out
}

/// Concatenates helper sources for `features` in load order, one newline
/// after each.
pub fn load_features(features: &FeatureSet, source: &dyn LuaLibSource) -> Result<String, LuaLibError> {
    let mut result = String::new();
    for feature in resolve_load_order(features) {
        let text = source
            .read_feature(feature)
            .ok_or_else(|| LuaLibError::MissingFeature {
                feature,
                path: source.describe(feature),
            })?;
        result.push_str(&text);
        result.push('\n');
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names_round_trip() {
        assert_eq!(LuaLibFeature::ALL.len(), 56);
        for &feature in LuaLibFeature::ALL {
            assert_eq!(feature.name().parse::<LuaLibFeature>().unwrap(), feature);
        }
        assert_eq!(LuaLibFeature::ObjectRest.function_name(), "__TS__ObjectRest");
        assert!("Nope".parse::<LuaLibFeature>().is_err());
    }

    #[test]
    fn test_load_order_puts_dependencies_first() {
        let features: FeatureSet = [LuaLibFeature::Map, LuaLibFeature::Spread].into_iter().collect();
        assert_eq!(
            resolve_load_order(&features),
            vec![
                LuaLibFeature::Symbol,
                LuaLibFeature::InstanceOf,
                LuaLibFeature::Iterator,
                LuaLibFeature::Map,
                LuaLibFeature::Spread,
            ]
        );
    }

    #[test]
    fn test_feature_set_keeps_first_use_order() {
        let mut set = FeatureSet::new();
        assert!(set.insert(LuaLibFeature::ArrayPush));
        assert!(set.insert(LuaLibFeature::ObjectAssign));
        assert!(!set.insert(LuaLibFeature::ArrayPush));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![LuaLibFeature::ArrayPush, LuaLibFeature::ObjectAssign]
        );

        let other: FeatureSet = [LuaLibFeature::ObjectAssign, LuaLibFeature::Symbol].into_iter().collect();
        set.extend(&other);
        assert_eq!(set.len(), 3);
        assert_eq!(set.iter().last(), Some(LuaLibFeature::Symbol));
    }

    #[test]
    fn test_load_features_concatenates_sources() {
        let mut sources = BTreeMap::new();
        sources.insert(LuaLibFeature::ArrayConcat, "function __TS__ArrayConcat() end".to_string());
        sources.insert(LuaLibFeature::ArrayFlat, "function __TS__ArrayFlat() end".to_string());
        let features: FeatureSet = [LuaLibFeature::ArrayFlat].into_iter().collect();
        let text = load_features(&features, &sources).unwrap();
        assert_eq!(
            text,
            "function __TS__ArrayConcat() end\nfunction __TS__ArrayFlat() end\n"
        );
    }

    #[test]
    fn test_missing_feature_is_an_error() {
        let sources: BTreeMap<LuaLibFeature, String> = BTreeMap::new();
        let features: FeatureSet = [LuaLibFeature::TypeOf].into_iter().collect();
        let err = load_features(&features, &sources).unwrap_err();
        assert_eq!(err.to_string(), "Could not read lualib feature TypeOf.lua");
    }

    #[test]
    fn test_import_kind_policy() {
        let empty = FeatureSet::new();
        let used: FeatureSet = [LuaLibFeature::Symbol].into_iter().collect();
        assert!(LuaLibImportKind::Always.requires_bundle(&empty));
        assert!(!LuaLibImportKind::Require.requires_bundle(&empty));
        assert!(LuaLibImportKind::Require.requires_bundle(&used));
        assert!(!LuaLibImportKind::Inline.requires_bundle(&used));
        assert_eq!("Inline".parse::<LuaLibImportKind>().unwrap(), LuaLibImportKind::Inline);
        assert_eq!(LuaLibImportKind::default(), LuaLibImportKind::Inline);
    }
}
