use serde::Serialize;

/// Whether a function expects an implicit leading context (`self`)
/// argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ContextType {
    /// Nothing known (no signatures, or no declaration behind a signature).
    #[default]
    None,
    /// `this: void`, `@noSelf` or `@noSelfInFile`.
    Void,
    NonVoid,
    /// Overloads disagree.
    Mixed,
}

impl ContextType {
    /// Combines two contexts: `None` is the identity, differing values
    /// collapse to `Mixed`.
    pub fn merge(self, other: ContextType) -> ContextType {
        match (self, other) {
            (ContextType::None, b) => b,
            (a, ContextType::None) => a,
            (a, b) if a == b => a,
            _ => ContextType::Mixed,
        }
    }

    pub fn reduce<I: IntoIterator<Item = ContextType>>(contexts: I) -> ContextType {
        contexts.into_iter().fold(ContextType::None, ContextType::merge)
    }

    /// Context a call site passes: everything but `Void` gets an argument.
    pub fn takes_context_argument(self) -> bool {
        self != ContextType::Void
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce() {
        assert_eq!(ContextType::reduce([]), ContextType::None);
        assert_eq!(
            ContextType::reduce([ContextType::None, ContextType::Void, ContextType::Void]),
            ContextType::Void
        );
        assert_eq!(
            ContextType::reduce([ContextType::NonVoid, ContextType::None, ContextType::Void]),
            ContextType::Mixed
        );
        assert_eq!(
            ContextType::reduce([ContextType::Mixed, ContextType::NonVoid]),
            ContextType::Mixed
        );
    }

    #[test]
    fn test_unknown_context_still_passes_argument() {
        assert!(ContextType::None.takes_context_argument());
        assert!(ContextType::NonVoid.takes_context_argument());
        assert!(!ContextType::Void.takes_context_argument());
    }
}
