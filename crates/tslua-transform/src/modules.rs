//! Imports, exports and require paths.

use std::path::{Component, Path, PathBuf};

use swc_common::Span;
use swc_ecma_ast as ast;

use tslua_lua_ast::*;
use tslua_types::DirectiveKind;

use crate::error::{CompileErrorKind, Result};
use crate::identifiers::fix_invalid_lua_identifier;
use crate::transformer::{DeclarationSite, LuaTransformer};

fn module_export_name(name: &ast::ModuleExportName) -> String {
    match name {
        ast::ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ast::ModuleExportName::Str(s) => s.value.as_str().unwrap_or("").to_string(),
    }
}

fn specifier_text(source: &ast::Str) -> String {
    source.value.as_str().unwrap_or("").to_string()
}

/// Resolves `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Dotted require path of `target` relative to `root`, or `None` when it
/// lies outside `root`.
pub(crate) fn lua_require_path(root: &Path, target: &Path) -> Option<String> {
    let root = normalize(root);
    let target = normalize(target);
    let relative = target.strip_prefix(&root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    let joined = parts.join("/");
    Some(joined.strip_suffix(".json").unwrap_or(&joined).replace('/', "."))
}

impl LuaTransformer<'_> {
    pub(crate) fn transform_module_declaration_item(&mut self, item: &ast::ModuleDecl) -> Result<Vec<Statement>> {
        match item {
            ast::ModuleDecl::Import(import) => self.transform_import_declaration(import),
            ast::ModuleDecl::ExportDecl(export) => self.transform_declaration(&export.decl, Some(export.span)),
            ast::ModuleDecl::ExportNamed(export) => self.transform_named_export(export),
            ast::ModuleDecl::ExportDefaultDecl(export) => self.transform_export_default_declaration(export),
            ast::ModuleDecl::ExportDefaultExpr(export) => {
                let value = self.transform_expression(&export.expr)?;
                Ok(vec![self.create_default_export_assignment(value, self.pos(export.span))])
            }
            ast::ModuleDecl::ExportAll(export) => {
                if export.type_only {
                    return Ok(Vec::new());
                }
                Ok(vec![self.transform_export_all(&export.src, export.span)?])
            }
            ast::ModuleDecl::TsImportEquals(import) => self.transform_import_equals(import),
            ast::ModuleDecl::TsExportAssignment(export) => {
                // export = e
                self.visited_export_equals = true;
                let value = self.transform_expression(&export.expr)?;
                Ok(vec![create_variable_declaration_statement(
                    vec![self.create_exports_identifier()],
                    Some(vec![value]),
                    self.pos(export.span),
                )])
            }
            ast::ModuleDecl::TsNamespaceExport(_) => Ok(Vec::new()),
        }
    }

    /// `require("path")` for a module specifier.
    pub(crate) fn create_module_require(&self, specifier: &str, span: Span) -> Result<Expression> {
        let path = self.resolve_require_path(specifier, span)?;
        let require = create_identifier("require", None, None, None);
        Ok(create_call_expression(
            require.into(),
            vec![create_string_literal(path, None)],
            self.pos(span),
        ))
    }

    fn resolve_require_path(&self, specifier: &str, span: Span) -> Result<String> {
        if self.oracle.module_directives(specifier).has(DirectiveKind::NoResolution) {
            return Ok(specifier.to_string());
        }
        let root = self.options.root_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let directory = match (&self.options.base_url, &self.options.source_path) {
            (Some(base_url), _) if !specifier.starts_with('.') => base_url.clone(),
            (_, Some(source)) => source.parent().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
            _ => root.clone(),
        };
        match lua_require_path(&root, &directory.join(specifier)) {
            Some(path) => {
                log::trace!("require path of {:?} is {:?}", specifier, path);
                Ok(path)
            }
            None => Err(self.error(
                CompileErrorKind::UnresolvableRequirePath {
                    reason: "Module does not exist within --rootDir".to_string(),
                    path: specifier.to_string(),
                },
                span,
            )),
        }
    }

    /// Read by some value and not an extension type.
    fn should_be_imported(&self, local: &ast::Ident) -> bool {
        let Some(symbol) = self.oracle.symbol_at(local) else {
            return false;
        };
        if !self.oracle.is_value_referenced(symbol) {
            return false;
        }
        let directives = self.oracle.type_directives(&self.oracle.type_of_symbol(symbol));
        !directives.has(DirectiveKind::Extension) && !directives.has(DirectiveKind::MetaExtension)
    }

    fn transform_import_declaration(&mut self, import: &ast::ImportDecl) -> Result<Vec<Statement>> {
        if import.type_only {
            return Ok(Vec::new());
        }
        let specifier = specifier_text(&import.src);
        let require = self.create_module_require(&specifier, import.src.span)?;
        let original = self.pos(import.span);

        // import "./module"
        if import.specifiers.is_empty() {
            let statement = create_expression_statement(require, original);
            return Ok(self.defer_imports(vec![statement]));
        }

        let basename = Path::new(&specifier)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| specifier.clone());
        let module_name = format!("____{}", fix_invalid_lua_identifier(&basename));
        let module_table = || -> Expression { create_identifier(module_name.as_str(), None, None, None).into() };

        let mut result = Vec::new();
        let mut uses_module_table = false;
        for import_specifier in &import.specifiers {
            match import_specifier {
                ast::ImportSpecifier::Default(default) => {
                    if !self.should_be_imported(&default.local) {
                        continue;
                    }
                    let local = self.transform_identifier(&default.local)?;
                    let value = create_table_index_expression(module_table(), create_string_literal("default", None), None);
                    result.push(create_variable_declaration_statement(
                        vec![local],
                        Some(vec![value.into()]),
                        self.pos(default.span),
                    ));
                    uses_module_table = true;
                }
                ast::ImportSpecifier::Namespace(namespace) => {
                    let referenced = self
                        .oracle
                        .symbol_at(&namespace.local)
                        .map_or(false, |symbol| self.oracle.is_value_referenced(symbol));
                    if !referenced {
                        continue;
                    }
                    let local = self.transform_identifier(&namespace.local)?;
                    result.push(create_variable_declaration_statement(
                        vec![local],
                        Some(vec![clone_node(&require)]),
                        original,
                    ));
                }
                ast::ImportSpecifier::Named(named) => {
                    if named.is_type_only || !self.should_be_imported(&named.local) {
                        continue;
                    }
                    let imported = match &named.imported {
                        Some(name) => module_export_name(name),
                        None => named.local.sym.to_string(),
                    };
                    let local = self.transform_identifier(&named.local)?;
                    let value = create_table_index_expression(module_table(), create_string_literal(imported, None), None);
                    result.push(create_variable_declaration_statement(
                        vec![local],
                        Some(vec![value.into()]),
                        self.pos(named.span),
                    ));
                    uses_module_table = true;
                }
            }
        }

        if result.is_empty() {
            log::debug!("import of {:?} elided", specifier);
            return Ok(Vec::new());
        }
        if uses_module_table {
            let table = create_identifier(module_name.as_str(), None, None, None);
            result.insert(0, create_variable_declaration_statement(vec![table], Some(vec![require]), original));
        }
        Ok(self.defer_imports(result))
    }

    /// Moves import statements into the current scope's import list, which
    /// hoisting places first. Without hoisting they stay in place.
    fn defer_imports(&mut self, statements: Vec<Statement>) -> Vec<Statement> {
        if self.options.no_hoisting {
            return statements;
        }
        self.peek_scope_mut().import_statements.extend(statements);
        Vec::new()
    }

    /// `import x = require("m")` and `import x = A.B`.
    fn transform_import_equals(&mut self, import: &ast::TsImportEqualsDecl) -> Result<Vec<Statement>> {
        if import.is_type_only {
            return Ok(Vec::new());
        }
        let referenced = self
            .oracle
            .symbol_at(&import.id)
            .map_or(false, |symbol| self.oracle.is_value_referenced(symbol));

        let value = match &import.module_ref {
            ast::TsModuleRef::TsExternalModuleRef(external) => {
                if !referenced && !import.is_export {
                    return Ok(Vec::new());
                }
                self.create_module_require(&specifier_text(&external.expr), external.span)?
            }
            ast::TsModuleRef::TsEntityName(entity) => {
                if !referenced && !import.is_export && self.is_module {
                    return Ok(Vec::new());
                }
                self.transform_entity_name(entity)?
            }
        };

        let name = self.transform_identifier(&import.id)?;
        let original = self.pos(import.span);
        if import.is_export {
            let site = DeclarationSite {
                span: Some(import.span),
                ..DeclarationSite::synthetic()
            };
            return self.create_local_or_exported_or_global_declaration(vec![name], Some(vec![value]), site, None);
        }
        Ok(vec![self.create_hoistable_variable_declaration(name, Some(value), original)])
    }

    fn transform_entity_name(&mut self, entity: &ast::TsEntityName) -> Result<Expression> {
        match entity {
            ast::TsEntityName::Ident(ident) => self.transform_identifier_expression(ident),
            ast::TsEntityName::TsQualifiedName(qualified) => {
                let left = self.transform_entity_name(&qualified.left)?;
                let right = create_string_literal(qualified.right.sym.to_string(), self.pos(qualified.right.span));
                Ok(create_table_index_expression(left, right, self.pos(qualified.right.span)).into())
            }
        }
    }

    fn create_default_export_assignment(&self, value: Expression, original: Option<Position>) -> Statement {
        let target = create_table_index_expression(
            self.create_exports_identifier().into(),
            create_string_literal("default", None),
            None,
        );
        create_assignment_statement(vec![target.into()], vec![value], original)
    }

    fn transform_export_default_declaration(&mut self, export: &ast::ExportDefaultDecl) -> Result<Vec<Statement>> {
        match &export.decl {
            ast::DefaultDecl::Class(class) => {
                self.transform_class_declaration(&class.class, class.ident.as_ref(), export.span, true, true)
            }
            ast::DefaultDecl::Fn(function) => {
                let original = self.pos(export.span);
                match &function.ident {
                    Some(ident) => {
                        // the function keeps its local name and is exported
                        // through it
                        let mut result = self.transform_function_declaration(ident, &function.function, export.span)?;
                        let name = self.transform_identifier(ident)?;
                        result.push(self.create_default_export_assignment(name.into(), original));
                        Ok(result)
                    }
                    None => {
                        let node = ast::Expr::Fn(function.clone());
                        let value = self.transform_function_expression(&node, function)?;
                        Ok(vec![self.create_default_export_assignment(value, original)])
                    }
                }
            }
            ast::DefaultDecl::TsInterfaceDecl(_) => Ok(Vec::new()),
        }
    }

    fn transform_named_export(&mut self, export: &ast::NamedExport) -> Result<Vec<Statement>> {
        if export.type_only {
            return Ok(Vec::new());
        }
        match &export.src {
            Some(source) => self.transform_export_specifiers_from(export, source),
            None => {
                let mut result = Vec::new();
                for specifier in &export.specifiers {
                    if let Some(statement) = self.transform_export_specifier(specifier)? {
                        result.push(statement);
                    }
                }
                Ok(result)
            }
        }
    }

    /// `export { a as b }` assigns `____exports.b = a`.
    fn transform_export_specifier(&mut self, specifier: &ast::ExportSpecifier) -> Result<Option<Statement>> {
        let ast::ExportSpecifier::Named(named) = specifier else {
            return Err(self.error(CompileErrorKind::UnsupportedImportType, export_specifier_span(specifier)));
        };
        if named.is_type_only {
            return Ok(None);
        }
        let ast::ModuleExportName::Ident(local) = &named.orig else {
            return Err(self.error(CompileErrorKind::UnsupportedImportType, named.span));
        };
        let is_value = self
            .oracle
            .symbol_at(local)
            .map_or(true, |symbol| self.oracle.symbol(symbol).kind.is_value());
        if !is_value {
            return Ok(None);
        }

        let exported = named.exported.as_ref().unwrap_or(&named.orig);
        let value = self.transform_identifier_expression(local)?;
        let target = create_table_index_expression(
            self.create_exports_identifier().into(),
            create_string_literal(module_export_name(exported), None),
            None,
        );
        Ok(Some(create_assignment_statement(vec![target.into()], vec![value], self.pos(named.span))))
    }

    /// `export { a as b } from "m"` and `export * as ns from "m"`.
    fn transform_export_specifiers_from(&mut self, export: &ast::NamedExport, source: &ast::Str) -> Result<Vec<Statement>> {
        let specifier = specifier_text(source);
        let require = self.create_module_require(&specifier, source.span)?;
        let module_identifier = create_identifier("____export", None, None, None);
        let mut statements = vec![create_variable_declaration_statement(
            vec![module_identifier.clone()],
            Some(vec![require]),
            None,
        )];

        for export_specifier in &export.specifiers {
            let (imported, exported) = match export_specifier {
                ast::ExportSpecifier::Named(named) if named.is_type_only => continue,
                ast::ExportSpecifier::Named(named) => {
                    let exported = named.exported.as_ref().unwrap_or(&named.orig);
                    (Some(module_export_name(&named.orig)), module_export_name(exported))
                }
                ast::ExportSpecifier::Namespace(namespace) => (None, module_export_name(&namespace.name)),
                ast::ExportSpecifier::Default(default) => (Some("default".to_string()), default.exported.sym.to_string()),
            };
            let value: Expression = match imported {
                Some(imported) => create_table_index_expression(
                    clone_identifier(&module_identifier, None).into(),
                    create_string_literal(imported, None),
                    None,
                )
                .into(),
                None => clone_identifier(&module_identifier, None).into(),
            };
            let target = create_table_index_expression(
                self.create_exports_identifier().into(),
                create_string_literal(exported, None),
                None,
            );
            statements.push(create_assignment_statement(vec![target.into()], vec![value], None));
        }

        if statements.len() == 1 {
            return Ok(Vec::new());
        }
        Ok(vec![create_do_statement(statements, self.pos(export.span))])
    }

    /// `export * from "m"` copies every key of the required module.
    fn transform_export_all(&mut self, source: &ast::Str, span: Span) -> Result<Statement> {
        let require = self.create_module_require(&specifier_text(source), source.span)?;
        let module_identifier = create_identifier("____export", None, None, None);
        let declaration = create_variable_declaration_statement(vec![module_identifier.clone()], Some(vec![require]), None);

        let key = create_identifier("____exportKey", None, None, None);
        let value = create_identifier("____exportValue", None, None, None);
        let target = create_table_index_expression(
            self.create_exports_identifier().into(),
            clone_identifier(&key, None).into(),
            None,
        );
        let body = create_block(
            vec![create_assignment_statement(
                vec![target.into()],
                vec![clone_identifier(&value, None).into()],
                None,
            )],
            None,
        );
        let pairs = create_call_expression(
            create_identifier("pairs", None, None, None).into(),
            vec![clone_identifier(&module_identifier, None).into()],
            None,
        );
        let loop_statement = create_for_in_statement(body, vec![key, value], vec![pairs], None);
        Ok(create_do_statement(vec![declaration, loop_statement], self.pos(span)))
    }
}

fn export_specifier_span(specifier: &ast::ExportSpecifier) -> Span {
    match specifier {
        ast::ExportSpecifier::Named(named) => named.span,
        ast::ExportSpecifier::Namespace(namespace) => namespace.span,
        ast::ExportSpecifier::Default(default) => default.exported.span,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::lua_require_path;
    use crate::error::CompileErrorKind;
    use crate::options::CompilerOptions;
    use crate::testing::{lower, lower_error, lower_with};

    #[test]
    fn test_require_paths() {
        assert_eq!(lua_require_path(Path::new("."), Path::new("./lib/util")), Some("lib.util".to_string()));
        assert_eq!(lua_require_path(Path::new("/src"), Path::new("/src/a/../b/c")), Some("b.c".to_string()));
        assert_eq!(lua_require_path(Path::new("/src"), Path::new("/src/data.json")), Some("data".to_string()));
        assert_eq!(lua_require_path(Path::new("/src"), Path::new("/other/x")), None);
        assert_eq!(lua_require_path(Path::new("."), Path::new("../x")), None);
    }

    #[test]
    fn test_named_imports() {
        let lowered = lower("import { a, b as c } from \"./lib/util\";\nexport const x = [a, c];\n");
        assert_eq!(
            lowered.text(),
            "local ____exports = {}\n\
             local ____util = require(\"lib.util\")\n\
             local a = ____util[\"a\"]\n\
             local c = ____util[\"b\"]\n\
             ____exports[\"x\"] = {a, c}\n\
             return ____exports\n"
        );
    }

    #[test]
    fn test_unreferenced_import_is_elided() {
        let lowered = lower("import { a } from \"./m\";\nexport const y = 1;\n");
        assert!(!lowered.text().contains("require"));
    }

    #[test]
    fn test_side_effect_import() {
        let lowered = lower("import \"./setup\";\nexport {};\n");
        assert!(lowered.text().contains("require(\"setup\")\n"));
    }

    #[test]
    fn test_default_and_namespace_imports() {
        let lowered = lower("import d from \"./d\";\nimport * as m from \"./m\";\nexport const z = [d, m.x];\n");
        let text = lowered.text();
        assert!(text.contains("local ____d = require(\"d\")\nlocal d = ____d[\"default\"]\n"), "{}", text);
        assert!(text.contains("local m = require(\"m\")\n"), "{}", text);
    }

    #[test]
    fn test_no_resolution_keeps_specifier() {
        let source = "/** @noResolution */\ndeclare module \"@scope/pkg\" {\n    export const a: number;\n}\n\
                      import { a } from \"@scope/pkg\";\nexport const b = a;\n";
        assert!(lower(source).text().contains("require(\"@scope/pkg\")"));
    }

    #[test]
    fn test_import_outside_root_dir() {
        let error = lower_error("import { a } from \"../outside\";\nexport const b = a;\n");
        assert!(matches!(error.kind, CompileErrorKind::UnresolvableRequirePath { .. }));
        assert!(error.to_string().contains("Module path: ../outside"));
    }

    #[test]
    fn test_imports_stay_in_place_without_hoisting() {
        let options = CompilerOptions {
            no_hoisting: true,
            ..CompilerOptions::default()
        };
        let lowered = match lower_with("import { a } from \"./m\";\nexport const b = a;\n", options) {
            Ok(lowered) => lowered,
            Err(error) => panic!("{}", error),
        };
        assert!(lowered.text().contains("local ____m = require(\"m\")\nlocal a = ____m[\"a\"]\n"));
    }

    #[test]
    fn test_import_equals() {
        let lowered = lower("import fs = require(\"./fs\");\nexport const r = fs;\n");
        assert!(lowered.text().contains("local fs = require(\"fs\")\n"));

        let lowered = lower("namespace A {\n    export const x = 1;\n}\nimport y = A.x;\nvar z = y;\n");
        assert!(lowered.text().contains("local y = A[\"x\"]\n"), "{}", lowered.text());
    }

    #[test]
    fn test_export_default_and_export_equals() {
        let lowered = lower("export default 42;\n");
        assert!(lowered.text().contains("____exports[\"default\"] = 42\n"));

        let lowered = lower("const v = 1;\nexport = v;\n");
        assert_eq!(lowered.text(), "local v = 1\nlocal ____exports = v\nreturn ____exports\n");
    }

    #[test]
    fn test_export_default_named_function() {
        let lowered = lower("export default function f() {\n    return 1;\n}\n");
        assert!(lowered.text().contains("____exports[\"default\"] = f\n"), "{}", lowered.text());
    }

    #[test]
    fn test_export_specifiers() {
        let lowered = lower("const a = 1;\ninterface I {}\ntype T = number;\nexport { a as b, I, T };\n");
        let text = lowered.text();
        assert!(text.contains("local a = 1\n____exports[\"b\"] = a\n"), "{}", text);
        assert!(!text.contains("\"I\""), "{}", text);
        assert!(!text.contains("\"T\""), "{}", text);

        let lowered = lower("interface I {}\ntype T = number;\nexport { I, T };\n");
        assert_eq!(lowered.text(), "local ____exports = {}\nreturn ____exports\n");
    }

    #[test]
    fn test_export_from() {
        let lowered = lower("export { a as b } from \"./m\";\n");
        assert!(lowered.text().contains(
            "do\n    local ____export = require(\"m\")\n    ____exports[\"b\"] = ____export[\"a\"]\nend\n"
        ));
    }

    #[test]
    fn test_export_all() {
        let lowered = lower("export * from \"./m\";\n");
        assert!(lowered.text().contains(
            "do\n    local ____export = require(\"m\")\n    for ____exportKey, ____exportValue in pairs(____export) do\n        ____exports[____exportKey] = ____exportValue\n    end\nend\n"
        ));
    }
}
