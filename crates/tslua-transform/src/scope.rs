//! Lexical scopes and symbol identities tracked during lowering.

use std::collections::HashMap;

use bitflags::bitflags;
use tslua_types::SymbolRef;
use tslua_lua_ast::{Identifier, NodeId};

bitflags! {
    /// Kind of a lexical region. Several kinds can be combined into a mask
    /// for [`crate::LuaTransformer::find_scope`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScopeKind: u8 {
        const FILE = 1;
        const FUNCTION = 1 << 1;
        const SWITCH = 1 << 2;
        const LOOP = 1 << 3;
        const CONDITIONAL = 1 << 4;
        const BLOCK = 1 << 5;
        const TRY = 1 << 6;
        const CATCH = 1 << 7;
    }
}

/// A named function defined directly in a scope.
#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    /// Symbol ids referenced anywhere inside the function body.
    pub referenced_symbols: Vec<u32>,
    /// The emitted declaration and the source offset it came from; set
    /// once the declaration statement exists.
    pub definition: Option<(NodeId, u32)>,
}

/// A `local` declaration that hoisting may split.
#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub statement: NodeId,
    pub identifiers: Vec<Identifier>,
    /// Source position stamped on the statement, reused for the assignment
    /// that replaces it.
    pub original: Option<tslua_lua_ast::Position>,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub id: u32,
    /// Symbol id to the offsets it was referenced at while this scope was
    /// open.
    pub referenced_symbols: HashMap<u32, Vec<u32>>,
    pub variable_declarations: Vec<VariableDeclaration>,
    /// Insertion ordered.
    pub function_definitions: Vec<(u32, FunctionDefinition)>,
    pub import_statements: Vec<tslua_lua_ast::Statement>,
    pub loop_continued: bool,
    pub function_returned: bool,
}

impl Scope {
    pub fn new(kind: ScopeKind, id: u32) -> Self {
        Scope {
            kind,
            id,
            referenced_symbols: HashMap::new(),
            variable_declarations: Vec::new(),
            function_definitions: Vec::new(),
            import_statements: Vec::new(),
            loop_continued: false,
            function_returned: false,
        }
    }

    pub fn function_definition_mut(&mut self, symbol_id: u32) -> Option<&mut FunctionDefinition> {
        self.function_definitions
            .iter_mut()
            .find(|(id, _)| *id == symbol_id)
            .map(|(_, definition)| definition)
    }
}

/// What the transformer knows about a symbol it has assigned an id to.
#[derive(Debug, Clone, Copy)]
pub struct SymbolRecord {
    pub symbol: SymbolRef,
    /// File offset of the first reference seen.
    pub first_seen: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_masks() {
        let mask = ScopeKind::FUNCTION | ScopeKind::FILE;
        assert!(ScopeKind::FILE.intersects(mask));
        assert!(ScopeKind::FUNCTION.intersects(mask));
        assert!(!ScopeKind::LOOP.intersects(mask));
        assert!(ScopeKind::SWITCH.intersects(ScopeKind::LOOP | ScopeKind::SWITCH));
        assert_eq!(mask.bits(), 0b11);
    }

    #[test]
    fn test_function_definitions_keep_insertion_order() {
        let mut scope = Scope::new(ScopeKind::FILE, 0);
        for id in [3, 1, 2] {
            scope.function_definitions.push((
                id,
                FunctionDefinition {
                    referenced_symbols: Vec::new(),
                    definition: None,
                },
            ));
        }
        scope.function_definition_mut(1).unwrap().definition = Some((NodeId(9), 40));
        let order: Vec<u32> = scope.function_definitions.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(scope.function_definitions[1].1.definition, Some((NodeId(9), 40)));
    }
}
