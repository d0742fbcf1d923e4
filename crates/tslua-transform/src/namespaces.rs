//! Namespaces and enums.
//!
//! A namespace becomes a table plus a `do` block for its body; members it
//! exports are assigned into the table. Enums become a table holding each
//! member and, for non-string values, the reverse mapping.

use swc_common::Span;
use swc_ecma_ast as ast;

use tslua_checker::SymbolKind;
use tslua_lua_ast::*;
use tslua_types::{DirectiveKind, Directives, SymbolRef};

use crate::error::Result;
use crate::scope::ScopeKind;
use crate::transformer::{DeclarationSite, LuaTransformer, NamespaceContext};

/// Whether lowering the body produces any statements. Type-only bodies
/// do not.
fn namespace_has_emitted_body(body: Option<&ast::TsNamespaceBody>) -> bool {
    match body {
        Some(ast::TsNamespaceBody::TsModuleBlock(block)) => block.body.iter().any(|item| match item {
            ast::ModuleItem::Stmt(ast::Stmt::Decl(ast::Decl::TsInterface(_) | ast::Decl::TsTypeAlias(_))) => false,
            ast::ModuleItem::ModuleDecl(ast::ModuleDecl::ExportDecl(export)) => {
                !matches!(export.decl, ast::Decl::TsInterface(_) | ast::Decl::TsTypeAlias(_))
            }
            _ => true,
        }),
        Some(ast::TsNamespaceBody::TsNamespaceDecl(nested)) => {
            !nested.declare && namespace_has_emitted_body(Some(&nested.body))
        }
        None => false,
    }
}

fn namespace_has_exports(body: Option<&ast::TsNamespaceBody>) -> bool {
    match body {
        Some(ast::TsNamespaceBody::TsModuleBlock(block)) => block
            .body
            .iter()
            .any(|item| matches!(item, ast::ModuleItem::ModuleDecl(_))),
        Some(ast::TsNamespaceBody::TsNamespaceDecl(_)) => true,
        None => false,
    }
}

fn enum_member_name(member: &ast::TsEnumMember) -> String {
    match &member.id {
        ast::TsEnumMemberId::Ident(ident) => ident.sym.to_string(),
        ast::TsEnumMemberId::Str(s) => s.value.as_str().unwrap_or("").to_string(),
    }
}

impl LuaTransformer<'_> {
    /// `site` is the span the namespace was declared at: the `export` item
    /// when there is one.
    pub(crate) fn transform_namespace_declaration(&mut self, module: &ast::TsModuleDecl, site: Span) -> Result<Vec<Statement>> {
        if module.declare || module.global {
            return Ok(Vec::new());
        }
        let ast::TsModuleName::Ident(ident) = &module.id else {
            return Ok(Vec::new());
        };
        self.transform_namespace(ident, module.body.as_ref(), site)
    }

    fn transform_namespace(&mut self, ident: &ast::Ident, body: Option<&ast::TsNamespaceBody>, site: Span) -> Result<Vec<Statement>> {
        let symbol = self.oracle.symbol_at(ident);
        let directives = symbol
            .map(|symbol| self.oracle.symbol(symbol).directives.clone())
            .unwrap_or_else(Directives::new);
        if directives.has(DirectiveKind::Phantom) {
            if let Some(ast::TsNamespaceBody::TsModuleBlock(block)) = body {
                return self.transform_module_items(&block.body);
            }
        }

        let mut result = Vec::new();
        let original = self.pos(site);
        let name = self.transform_identifier(ident)?;
        let export_scope = self.identifier_export_scope(&name);
        let emitted_body = namespace_has_emitted_body(body);

        let mergeable = !self.is_module && (self.current_namespace.is_none() || export_scope.is_some());
        let first_declaration = symbol.map_or(true, |symbol| self.is_first_namespace_declaration(symbol, site));
        let declaration_site = DeclarationSite {
            span: Some(site),
            ..DeclarationSite::synthetic()
        };

        if mergeable {
            // N = N or {}
            let existing = self.add_export_to_identifier(clone_identifier(&name, None));
            let value = create_binary_expression(existing, create_table_expression(vec![], None), BinaryOperator::Or, None);
            result.extend(self.create_local_or_exported_or_global_declaration(
                vec![name.clone()],
                Some(vec![value]),
                declaration_site,
                None,
            )?);
        } else if first_declaration {
            result.extend(self.create_local_or_exported_or_global_declaration(
                vec![name.clone()],
                Some(vec![create_table_expression(vec![], None)]),
                declaration_site,
                None,
            )?);
        }

        if let Some(scope) = export_scope {
            if (mergeable || first_declaration) && emitted_body && namespace_has_exports(body) {
                // local N = ____exports.N
                let exported = self.create_exported_identifier(&name, scope).into();
                let local = clone_identifier(&name, None);
                result.push(self.create_hoistable_variable_declaration(local, Some(exported), original));
            }
        }

        let previous = self.current_namespace.replace(NamespaceContext {
            symbol,
            table: clone_identifier(&name, None),
        });
        let lowered = if emitted_body { self.transform_namespace_body(body) } else { Ok(None) };
        self.current_namespace = previous;

        if let Some(statements) = lowered? {
            result.push(create_do_statement(statements, original));
        }
        Ok(result)
    }

    fn transform_namespace_body(&mut self, body: Option<&ast::TsNamespaceBody>) -> Result<Option<Vec<Statement>>> {
        let Some(body) = body else {
            return Ok(None);
        };
        self.push_scope(ScopeKind::BLOCK);
        let statements = match body {
            ast::TsNamespaceBody::TsModuleBlock(block) => self.transform_module_items(&block.body),
            ast::TsNamespaceBody::TsNamespaceDecl(nested) => {
                if nested.declare {
                    Ok(Vec::new())
                } else {
                    self.transform_namespace(&nested.id, Some(&nested.body), nested.span)
                }
            }
        };
        let scope = self.pop_scope();
        Ok(Some(self.perform_hoisting(&scope, statements?)))
    }

    /// Not merged into a class or function, and the earliest namespace
    /// declaration of the symbol.
    fn is_first_namespace_declaration(&self, symbol: SymbolRef, site: Span) -> bool {
        let info = self.oracle.symbol(symbol);
        if info
            .declarations
            .iter()
            .any(|d| matches!(d.kind, SymbolKind::Class | SymbolKind::Function))
        {
            return false;
        }
        let position = self.oracle.offset(site.lo);
        info.declarations
            .iter()
            .filter(|d| d.kind == SymbolKind::Namespace)
            .map(|d| d.pos)
            .min()
            .map_or(true, |first| first == position)
    }

    pub(crate) fn transform_enum_declaration(&mut self, enumeration: &ast::TsEnumDecl, site: Span) -> Result<Vec<Statement>> {
        if enumeration.declare || (enumeration.is_const && !self.options.preserve_const_enums) {
            return Ok(Vec::new());
        }
        let symbol = self.oracle.symbol_at(&enumeration.id);
        let members_only = symbol.map_or(false, |symbol| {
            self.oracle.symbol(symbol).has_directive(DirectiveKind::CompileMembersOnly)
        });
        let declaration_site = DeclarationSite {
            span: Some(site),
            ..DeclarationSite::synthetic()
        };

        let mut result = Vec::new();
        if !members_only {
            let name = self.transform_identifier(&enumeration.id)?;
            result.extend(self.create_local_or_exported_or_global_declaration(
                vec![name],
                Some(vec![create_table_expression(vec![], None)]),
                declaration_site,
                None,
            )?);
        }

        let reference = self.transform_identifier_expression(&enumeration.id)?;
        let export_scope = symbol.and_then(|symbol| self.oracle.symbol(symbol).export_scope);

        for member in &enumeration.members {
            let member_name = enum_member_name(member);
            let original = self.pos(member.span);
            let value = self.transform_enum_member_value(enumeration, symbol, member, &member_name, &reference)?;

            if members_only {
                let identifier = create_identifier(member_name.clone(), original, None, None);
                let site = DeclarationSite {
                    span: Some(member.span),
                    ..DeclarationSite::synthetic()
                };
                result.extend(self.create_local_or_exported_or_global_declaration(
                    vec![identifier],
                    Some(vec![value]),
                    site,
                    export_scope,
                )?);
                continue;
            }

            let key = create_string_literal(member_name.clone(), None);
            let accessor = create_table_index_expression(clone_node(&reference), key, None);
            let reverse = !matches!(value, Expression::StringLiteral(_) | Expression::Nil(_));
            result.push(create_assignment_statement(vec![clone_node(&accessor).into()], vec![value], original));
            if reverse {
                // E[E.member] = "member"
                let target = create_table_index_expression(clone_node(&reference), accessor.into(), None);
                result.push(create_assignment_statement(
                    vec![target.into()],
                    vec![create_string_literal(member_name, None)],
                    original,
                ));
            }
        }
        Ok(result)
    }

    fn transform_enum_member_value(
        &mut self,
        enumeration: &ast::TsEnumDecl,
        symbol: Option<SymbolRef>,
        member: &ast::TsEnumMember,
        name: &str,
        reference: &Expression,
    ) -> Result<Expression> {
        let original = self.pos(member.span);
        if let Some(value) = symbol.and_then(|symbol| self.oracle.enum_member_value(symbol, name)) {
            return Ok(self.create_const_value_literal(value, original));
        }
        let Some(init) = &member.init else {
            return Ok(create_nil_literal(original));
        };

        // a reference to an earlier member of the same enum reads it back
        // from the table
        if let ast::Expr::Ident(ident) = &**init {
            let sibling = self.oracle.symbol_at(ident).filter(|other| {
                let info = self.oracle.symbol(*other);
                info.kind == SymbolKind::EnumMember
                    && info.declarations.iter().any(|d| {
                        enumeration.members.iter().any(|m| self.oracle.offset(m.span.lo) == d.pos)
                    })
            });
            if let Some(sibling) = sibling {
                let other = self.oracle.symbol(sibling).name.clone();
                let key = create_string_literal(other, None);
                return Ok(create_table_index_expression(clone_node(reference), key, original).into());
            }
        }
        self.transform_expression(init)
    }
}

#[cfg(test)]
mod tests {
    use crate::options::CompilerOptions;
    use crate::testing::{lower, lower_with};

    #[test]
    fn test_script_namespace_merges_into_global() {
        let lowered = lower("namespace A {\n    export const x = 1;\n}\n");
        assert_eq!(lowered.text(), "A = A or {}\ndo\n    A[\"x\"] = 1\nend\n");
    }

    #[test]
    fn test_exported_module_namespace_gets_local_alias() {
        let lowered = lower("export namespace N {\n    export const x = 1;\n}\n");
        let text = lowered.text();
        assert!(
            text.contains("____exports[\"N\"] = {}\nlocal N = ____exports[\"N\"]\ndo\n    N[\"x\"] = 1\nend\n"),
            "{}",
            text
        );
    }

    #[test]
    fn test_type_only_namespace_has_no_body() {
        let lowered = lower("namespace T {\n    export interface I { a: number }\n}\n");
        assert_eq!(lowered.text(), "T = T or {}\n");
    }

    #[test]
    fn test_ambient_namespace_is_skipped() {
        let lowered = lower("declare namespace D {\n    const x: number;\n}\n");
        assert_eq!(lowered.text(), "");
    }

    #[test]
    fn test_dotted_namespace_nests() {
        let lowered = lower("namespace A.B {\n    export const x = 1;\n}\n");
        let text = lowered.text();
        assert!(text.starts_with("A = A or {}\ndo\n"), "{}", text);
        assert!(text.contains("    A[\"B\"] = A[\"B\"] or {}\n    local B = A[\"B\"]\n"), "{}", text);
        assert!(text.contains("        B[\"x\"] = 1\n"), "{}", text);
    }

    #[test]
    fn test_phantom_namespace_lowers_body_only() {
        let lowered = lower("/** @phantom */\nnamespace P {\n    var x = 1;\n}\n");
        assert_eq!(lowered.text(), "x = 1\n");
    }

    #[test]
    fn test_enum_members_and_reverse_mapping() {
        let lowered = lower("enum E { A, B = \"b\", C }\n");
        let text = lowered.text();
        assert!(text.starts_with("E = {}\nE[\"A\"] = 0\nE[E[\"A\"]] = \"A\"\nE[\"B\"] = \"b\"\n"), "{}", text);
        assert!(!text.contains("E[E[\"B\"]]"));
    }

    #[test]
    fn test_const_enum_is_elided_unless_preserved() {
        assert_eq!(lower("const enum E { A }\n").text(), "");

        let options = CompilerOptions {
            preserve_const_enums: true,
            ..CompilerOptions::default()
        };
        let lowered = match lower_with("const enum E { A }\n", options) {
            Ok(lowered) => lowered,
            Err(error) => panic!("{}", error),
        };
        assert!(lowered.text().contains("E[\"A\"] = 0\n"));
    }

    #[test]
    fn test_compile_members_only_enum() {
        let lowered = lower("/** @compileMembersOnly */\nenum E { A = 1, B }\n");
        assert_eq!(lowered.text(), "A = 1\nB = 2\n");
    }

    #[test]
    fn test_exported_enum_in_module() {
        let lowered = lower("export enum E { A = 3 }\n");
        let text = lowered.text();
        assert!(text.contains("____exports[\"E\"] = {}\n"), "{}", text);
        assert!(text.contains("____exports[\"E\"][\"A\"] = 3\n"), "{}", text);
    }
}
