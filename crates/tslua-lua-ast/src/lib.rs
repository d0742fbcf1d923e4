//! Lua output syntax tree
//!
//! The transformer builds this tree bottom-up with the `create_*`
//! functions; a separate printer (not part of this workspace) turns it into
//! Lua source. The tree derives `serde::Serialize` so the CLI can dump it.

pub mod ast;
pub mod create;
pub mod visit;

pub use ast::*;
pub use create::*;
pub use visit::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(text: &str) -> Identifier {
        create_identifier(text, None, None, None)
    }

    #[test]
    fn test_constructors_set_parent() {
        let call = create_call_expression(
            ident("print").into(),
            vec![create_string_literal("hi", None)],
            Some(Position::new(2, 4)),
        );
        let Expression::Call(call) = call else {
            panic!("expected call");
        };
        assert_eq!(call.expression.parent(), Some(call.meta.id));
        assert_eq!(call.params[0].parent(), Some(call.meta.id));
        assert_eq!(call.meta.position, Some(Position::new(2, 4)));

        let block = create_block(vec![create_expression_statement(call.into(), None)], None);
        assert_eq!(block.statements[0].parent(), Some(block.meta.id));
    }

    #[test]
    fn test_if_chain_adopts_nested_branch() {
        let inner = create_if_statement(
            create_boolean_literal(false, None),
            create_block(vec![], None),
            None,
            None,
        );
        let outer = create_if_statement(
            create_boolean_literal(true, None),
            create_block(vec![], None),
            Some(ElseBranch::If(Box::new(inner))),
            None,
        );
        let Some(ElseBranch::If(nested)) = &outer.else_block else {
            panic!("expected elseif");
        };
        assert_eq!(nested.meta.parent, Some(outer.meta.id));
    }

    #[test]
    fn test_clone_node_gets_fresh_id() {
        let original = ident("x");
        let copy = clone_node(&original);
        assert_ne!(original.id(), copy.id());
        assert_eq!(copy.text, "x");
        let positioned = set_node_original(copy, Some(Position::new(1, 1)));
        assert_eq!(positioned.position(), Some(Position::new(1, 1)));
    }

    #[test]
    fn test_function_definition_predicates() {
        let body = create_block(
            vec![create_return_statement(vec![create_numeric_literal(1.0, None)], None)],
            None,
        );
        let function = create_function_expression(
            body,
            vec![],
            false,
            None,
            FunctionExpressionFlags::INLINE,
            None,
        );
        let Expression::Function(f) = &function else {
            panic!("expected function");
        };
        assert!(is_inline_function_expression(f));

        let declaration =
            create_variable_declaration_statement(vec![ident("f")], Some(vec![function]), None);
        assert!(is_function_definition(&declaration));

        let plain = create_variable_declaration_statement(
            vec![ident("a"), ident("b")],
            None,
            None,
        );
        assert!(!is_function_definition(&plain));
    }

    #[test]
    fn test_function_flags() {
        let flags = FunctionExpressionFlags::INLINE | FunctionExpressionFlags::DECLARATION;
        assert!(flags.contains(FunctionExpressionFlags::DECLARATION));
        assert!(!FunctionExpressionFlags::default().contains(FunctionExpressionFlags::INLINE));

        let body = create_block(vec![create_return_statement(vec![ident("x").into()], None)], None);
        let function = create_function_expression(body, vec![], false, None, FunctionExpressionFlags::DECLARATION, None);
        let Expression::Function(f) = &function else {
            panic!("expected function");
        };
        assert!(!is_inline_function_expression(f));
    }

    #[test]
    fn test_simple_expression() {
        let sum = create_binary_expression(
            ident("a").into(),
            create_numeric_literal(1.0, None),
            BinaryOperator::Addition,
            None,
        );
        assert!(is_simple_expression(&sum));
        let call = create_call_expression(ident("f").into(), vec![], None);
        let index = create_table_index_expression(ident("t").into(), call, None);
        assert!(!is_simple_expression(&index.into()));
    }

    #[test]
    fn test_replace_statement_in_nested_block() {
        let target = create_variable_declaration_statement(
            vec![ident("x")],
            Some(vec![create_numeric_literal(1.0, None)]),
            None,
        );
        let target_id = target.id();
        let do_block = create_do_statement(vec![target], None);
        let do_id = do_block.id();
        let mut statements = vec![create_break_statement(None), do_block];

        let replaced = replace_statement(&mut statements, target_id, |old| {
            let Statement::VariableDeclaration(decl) = old else {
                panic!("expected declaration");
            };
            let left = decl.left.into_iter().map(AssignmentLeftHandSide::from).collect();
            Some(create_assignment_statement(left, decl.right.unwrap_or_default(), None))
        });
        assert!(replaced);

        let Statement::Do(d) = &statements[1] else {
            panic!("expected do");
        };
        assert!(matches!(d.statements[0], Statement::Assignment(_)));
        assert_eq!(d.statements[0].parent(), Some(do_id));
    }

    #[test]
    fn test_replace_statement_removes_and_reports_missing() {
        let target = create_variable_declaration_statement(vec![ident("y")], None, None);
        let target_id = target.id();
        let mut statements = vec![target];
        assert!(replace_statement(&mut statements, target_id, |_| None));
        assert!(statements.is_empty());
        assert!(!replace_statement(&mut statements, target_id, |s| Some(s)));
    }

    #[test]
    fn test_replace_statement_inside_called_closure() {
        let target = create_variable_declaration_statement(
            vec![ident("z")],
            Some(vec![create_numeric_literal(2.0, None)]),
            None,
        );
        let target_id = target.id();
        let closure = create_function_expression(
            create_block(vec![target], None),
            vec![],
            false,
            None,
            FunctionExpressionFlags::NONE,
            None,
        );
        let call = create_call_expression(ident("pcall").into(), vec![closure], None);
        let mut statements = vec![create_variable_declaration_statement(
            vec![ident("ok")],
            Some(vec![call]),
            None,
        )];
        assert!(replace_statement(&mut statements, target_id, |_| None));

        let Statement::VariableDeclaration(decl) = &statements[0] else {
            panic!("expected declaration");
        };
        let Some(Expression::Call(call)) = decl.right.as_ref().map(|r| &r[0]) else {
            panic!("expected call");
        };
        let Expression::Function(f) = &call.params[0] else {
            panic!("expected closure");
        };
        assert!(f.body.statements.is_empty());
    }

    #[test]
    fn test_serializes_with_kind_tags() {
        let statement = create_return_statement(vec![create_nil_literal(None)], None);
        let json = serde_json::to_string(&statement).unwrap();
        assert!(json.contains("\"kind\":\"Return\""));
        assert!(json.contains("\"kind\":\"Nil\""));
    }
}
