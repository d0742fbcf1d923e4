//! Hoisting of functions, variables and imports within a closed scope.
//!
//! TypeScript lets functions and `var`s be used above their declaration;
//! a Lua `local` only exists after its statement. When a scope is popped,
//! declarations whose symbols are referenced too early are moved or split
//! so every reference sees the local.

use tslua_lua_ast::*;

use crate::scope::Scope;
use crate::transformer::LuaTransformer;

impl LuaTransformer<'_> {
    pub(crate) fn perform_hoisting(&self, scope: &Scope, statements: Vec<Statement>) -> Vec<Statement> {
        if self.options.no_hoisting {
            return statements;
        }
        let result = self.hoist_function_definitions(scope, statements);
        let result = self.hoist_variable_declarations(scope, result);
        hoist_import_statements(scope, result)
    }

    /// Whether `symbol_id` is used before its declaration, directly or
    /// through a function defined after that declaration which is itself
    /// hoisted.
    ///
    /// The recursion only follows functions defined strictly after the
    /// symbol's declaration, so positions grow along every chain and
    /// mutually recursive functions terminate.
    pub(crate) fn should_hoist(&self, symbol_id: u32, scope: &Scope) -> bool {
        let Some(record) = self.symbol_info.get(&symbol_id) else {
            return false;
        };
        let Some(declaration) = self.oracle.symbol(record.symbol).first_declaration() else {
            return false;
        };
        if record.first_seen < declaration {
            return true;
        }

        for (function_id, function) in &scope.function_definitions {
            let Some((_, definition)) = function.definition else {
                panic!("function definition for symbol {} was never emitted", function_id);
            };
            if *function_id != symbol_id
                && declaration < definition
                && function.referenced_symbols.contains(&symbol_id)
                && self.should_hoist(*function_id, scope)
            {
                return true;
            }
        }
        false
    }

    fn hoist_function_definitions(&self, scope: &Scope, statements: Vec<Statement>) -> Vec<Statement> {
        let mut result = statements;
        let mut hoisted = Vec::new();
        for (symbol_id, function) in &scope.function_definitions {
            if !self.should_hoist(*symbol_id, scope) {
                continue;
            }
            let Some((statement, _)) = function.definition else {
                continue;
            };
            if let Some(index) = result.iter().position(|s| s.id() == statement) {
                log::debug!("hoisting function definition of symbol {}", symbol_id);
                hoisted.push(result.remove(index));
            }
        }
        hoisted.extend(result);
        hoisted
    }

    fn hoist_variable_declarations(&self, scope: &Scope, statements: Vec<Statement>) -> Vec<Statement> {
        let mut result = statements;
        let mut hoisted_identifiers = Vec::new();

        for declaration in &scope.variable_declarations {
            let hoist = declaration
                .identifiers
                .iter()
                .filter_map(|identifier| identifier.symbol_id)
                .any(|id| self.should_hoist(id, scope));
            if !hoist {
                continue;
            }

            let original = declaration.original;
            let found = replace_statement(&mut result, declaration.statement, |statement| match statement {
                Statement::VariableDeclaration(local) => local.right.map(|right| {
                    let left = local
                        .left
                        .iter()
                        .map(|identifier| clone_identifier(identifier, identifier.meta.position).into())
                        .collect();
                    create_assignment_statement(left, right, original)
                }),
                other => Some(other),
            });
            if !found {
                log::debug!(
                    "declaration of {} is not in this scope's output",
                    declaration.identifiers.iter().map(|i| i.text.as_str()).collect::<Vec<_>>().join(", ")
                );
            }
            hoisted_identifiers.extend(declaration.identifiers.iter().map(|i| clone_identifier(i, None)));
        }

        if !hoisted_identifiers.is_empty() {
            log::debug!("hoisting {} local declarations", hoisted_identifiers.len());
            result.insert(0, create_variable_declaration_statement(hoisted_identifiers, None, None));
        }
        result
    }
}

fn hoist_import_statements(scope: &Scope, statements: Vec<Statement>) -> Vec<Statement> {
    if scope.import_statements.is_empty() {
        return statements;
    }
    let mut result = scope.import_statements.clone();
    result.extend(statements);
    result
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::options::CompilerOptions;
    use crate::testing::{lower, lower_with, render_block};

    #[test]
    fn test_variable_used_before_declaration_is_split() {
        let lowered = lower("function f() { g(); let x = 1; function g() { return x; } }");
        let text = render_block(&lowered.block);
        let declared = text.find("local x, g").expect("hoisted locals");
        let call = text.find("g(nil)").expect("call");
        let assigned = text.find("x = 1").expect("assignment");
        assert!(declared < call && call < assigned, "{}", text);
        assert!(!text.contains("local x = 1"));
    }

    #[test]
    fn test_declaration_order_is_kept_without_forward_references() {
        let lowered = lower("function f() { let a = 1; let b = a; return b; }");
        let text = render_block(&lowered.block);
        assert!(text.contains("    local a = 1\n    local b = a\n    return b\n"), "{}", text);
    }

    #[test]
    fn test_sum_is_hoisted_through_add() {
        let source = "function main() {\n  add();\n  let sum = 0;\n  function add() { sum += 1; }\n  let x = sum;\n}";
        let lowered = lower(source);
        let text = render_block(&lowered.block);
        assert!(text.contains("local sum, add\n"), "{}", text);
        let add = text.find("add = function").expect("add assignment");
        let call = text.find("add(nil)").expect("add call");
        let sum = text.find("sum = 0").expect("sum assignment");
        assert!(add < call && call < sum, "{}", text);
        assert!(text.contains("local x = sum"));
    }

    #[test]
    fn test_mutually_recursive_functions_share_hoisted_variable() {
        let source = "function main() {\n  ping(3);\n  let count = 0;\n  function ping(n: number) { count += 1; if (n > 0) { pong(n - 1); } }\n  function pong(n: number) { count += 1; if (n > 0) { ping(n - 1); } }\n}";
        let lowered = lower(source);
        let text = render_block(&lowered.block);
        assert!(text.contains("local count, ping, pong\n"), "{}", text);
        let ping = text.find("ping = function").expect("ping");
        let pong = text.find("pong = function").expect("pong");
        let call = text.find("ping(nil, 3)").expect("call");
        let count = text.find("count = 0").expect("count");
        assert!(ping < pong && pong < call && call < count, "{}", text);
    }

    #[test]
    fn test_mutual_recursion_hoists_through_each_other() {
        // pong is used inside ping before its own declaration, which hoists
        // pong, then ping through pong, then count through both.
        let source = "function main() {\n  let count = 0;\n  function ping(n: number) { count += 1; if (n > 0) { pong(n - 1); } }\n  function pong(n: number) { count += 1; if (n > 0) { ping(n - 1); } }\n  ping(3);\n}";
        let lowered = lower(source);
        let text = render_block(&lowered.block);
        assert!(text.contains("local count, ping, pong\n"), "{}", text);
        let pong = text.find("pong = function").expect("pong");
        let count = text.find("count = 0").expect("count");
        let call = text.find("ping(nil, 3)").expect("call");
        assert!(pong < count && count < call, "{}", text);
    }

    #[test]
    fn test_no_hoisting_rejects_forward_reference() {
        let options = CompilerOptions {
            no_hoisting: true,
            ..CompilerOptions::default()
        };
        let error = lower_with("function f() { x = 2; let x = 1; }", options).unwrap_err();
        assert_eq!(error.kind, CompileErrorKind::ReferencedBeforeDeclaration("x".to_string()));
    }

    #[test]
    fn test_imports_are_prepended() {
        let lowered = lower("const a = 1;\nimport { b } from './lib';\nexport const c = a + b;");
        let text = render_block(&lowered.block);
        let import = text.find("require(\"lib\")").expect("require");
        let a = text.find("local a = 1").expect("a");
        assert!(import < a, "{}", text);
    }
}
