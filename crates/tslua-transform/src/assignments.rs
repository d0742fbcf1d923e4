//! Assignments, compound assignments and `++`/`--`.
//!
//! As statements these lower to plain Lua assignments. As expressions they
//! are wrapped in an immediately invoked function so the assigned value
//! can be returned; property and element targets cache their object and
//! index first so each is evaluated once.

use swc_common::{Span, Spanned};
use swc_ecma_ast as ast;

use tslua_lua_ast::*;
use tslua_lualib::LuaLibFeature;
use tslua_types::DirectiveKind;

use crate::error::Result;
use crate::transformer::LuaTransformer;

/// Owned expression for the non-pattern side of an assignment.
pub(crate) fn simple_target_expression(target: &ast::SimpleAssignTarget) -> Option<ast::Expr> {
    use ast::SimpleAssignTarget as T;
    Some(match target {
        T::Ident(binding) => ast::Expr::Ident(binding.id.clone()),
        T::Member(member) => ast::Expr::Member(member.clone()),
        T::SuperProp(prop) => ast::Expr::SuperProp(prop.clone()),
        T::Paren(paren) => ast::Expr::Paren(paren.clone()),
        T::OptChain(chain) => ast::Expr::OptChain(chain.clone()),
        T::TsAs(expression) => ast::Expr::TsAs(expression.clone()),
        T::TsSatisfies(expression) => ast::Expr::TsSatisfies(expression.clone()),
        T::TsNonNull(expression) => ast::Expr::TsNonNull(expression.clone()),
        T::TsTypeAssertion(expression) => ast::Expr::TsTypeAssertion(expression.clone()),
        T::TsInstantiation(expression) => ast::Expr::TsInstantiation(expression.clone()),
        T::Invalid(_) => return None,
    })
}

/// Destructuring side of an assignment as a binding pattern.
pub(crate) fn pattern_target(target: &ast::AssignTargetPat) -> Option<ast::Pat> {
    match target {
        ast::AssignTargetPat::Array(array) => Some(ast::Pat::Array(array.clone())),
        ast::AssignTargetPat::Object(object) => Some(ast::Pat::Object(object.clone())),
        ast::AssignTargetPat::Invalid(_) => None,
    }
}

/// Binary operator applied by a compound assignment.
pub(crate) fn compound_operator(operator: ast::AssignOp) -> Option<ast::BinaryOp> {
    use ast::AssignOp as A;
    use ast::BinaryOp as B;
    Some(match operator {
        A::Assign => return None,
        A::AddAssign => B::Add,
        A::SubAssign => B::Sub,
        A::MulAssign => B::Mul,
        A::DivAssign => B::Div,
        A::ModAssign => B::Mod,
        A::ExpAssign => B::Exp,
        A::LShiftAssign => B::LShift,
        A::RShiftAssign => B::RShift,
        A::ZeroFillRShiftAssign => B::ZeroFillRShift,
        A::BitOrAssign => B::BitOr,
        A::BitXorAssign => B::BitXor,
        A::BitAndAssign => B::BitAnd,
        A::AndAssign => B::LogicalAnd,
        A::OrAssign => B::LogicalOr,
        A::NullishAssign => B::NullishCoalescing,
    })
}

fn update_operator(operator: ast::UpdateOp) -> ast::BinaryOp {
    match operator {
        ast::UpdateOp::PlusPlus => ast::BinaryOp::Add,
        ast::UpdateOp::MinusMinus => ast::BinaryOp::Sub,
    }
}

/// Evaluating the expression may have side effects.
pub(crate) fn has_evaluation_effect(expression: &ast::Expr) -> bool {
    !matches!(expression, ast::Expr::Lit(_) | ast::Expr::Ident(_) | ast::Expr::This(_))
}

/// Index of a member target whose object or index must be cached.
enum CachedIndex<'e> {
    Name(String),
    Computed(&'e ast::Expr),
}

fn access_with_effects(target: &ast::Expr) -> Option<(&ast::Expr, CachedIndex<'_>)> {
    let ast::Expr::Member(member) = target else {
        return None;
    };
    match &member.prop {
        ast::MemberProp::Computed(computed)
            if has_evaluation_effect(&member.obj) || has_evaluation_effect(&computed.expr) =>
        {
            Some((&member.obj, CachedIndex::Computed(&computed.expr)))
        }
        ast::MemberProp::Ident(name) if has_evaluation_effect(&member.obj) => {
            Some((&member.obj, CachedIndex::Name(name.sym.to_string())))
        }
        _ => None,
    }
}

impl LuaTransformer<'_> {
    /// Target of an assignment inside a destructuring pattern or loop head.
    pub(crate) fn transform_assignment_target_pat(&mut self, pat: &ast::Pat) -> Result<AssignmentLeftHandSide> {
        match pat {
            ast::Pat::Ident(binding) => {
                let identifier = self.transform_identifier(&binding.id)?;
                Ok(self.add_export_to_assignment_target(identifier))
            }
            ast::Pat::Expr(expression) => self.transform_assignment_left_hand_side(expression),
            ast::Pat::Assign(assign) => self.transform_assignment_target_pat(&assign.left),
            other => Err(self.unsupported("assignment target", "Pattern", other.span())),
        }
    }

    /// Lowers a reference expression that is assigned to.
    pub(crate) fn transform_assignment_left_hand_side(&mut self, target: &ast::Expr) -> Result<AssignmentLeftHandSide> {
        let expression = self.transform_expression(target)?;
        AssignmentLeftHandSide::try_from(expression)
            .map_err(|_| self.unsupported("assignment target", crate::expressions::expression_kind_name(target), target.span()))
    }

    /// `x.length = n` on an explicit array.
    pub(crate) fn is_array_length(&self, target: &ast::Expr) -> bool {
        let ast::Expr::Member(member) = target else {
            return false;
        };
        if crate::access::member_prop_name(&member.prop).as_deref() != Some("length") {
            return false;
        }
        self.oracle.type_of_expr(&member.obj).is_explicit_array()
    }

    /// `target = right` as a statement.
    pub(crate) fn transform_assignment(&mut self, target: &ast::Expr, right: Expression, span: Span) -> Result<Statement> {
        let original = self.pos(span);
        if let (true, ast::Expr::Member(member)) = (self.is_array_length(target), target) {
            let array = self.transform_expression(&member.obj)?;
            let call = self.lualib_call(LuaLibFeature::ArraySetLength, vec![array, right], original);
            return Ok(create_expression_statement(call, original));
        }
        let left = self.transform_assignment_left_hand_side(target)?;
        Ok(create_assignment_statement(vec![left], vec![right], original))
    }

    fn validate_assignment_types(&mut self, target: &ast::Expr, right: &ast::Expr) -> Result<()> {
        let from = self.oracle.type_of_expr(right);
        let to = self.oracle.type_of_expr(target);
        self.validate_function_assignment(right.span(), &from, &to, None)?;

        if let ast::Expr::Member(member) = target {
            if crate::access::member_prop_name(&member.prop).as_deref() == Some("length") {
                let owner = self.oracle.type_of_expr(&member.obj);
                if self.oracle.type_directives(&owner).has(DirectiveKind::LuaTable) {
                    return Err(self.lua_table_error("A LuaTable object's length cannot be re-assigned.", member.span));
                }
            }
        }
        Ok(())
    }

    /// `a = b` and `a op= b` as statements.
    pub(crate) fn transform_assignment_statement(&mut self, assign: &ast::AssignExpr) -> Result<Vec<Statement>> {
        let target = match &assign.left {
            ast::AssignTarget::Pat(pattern) => {
                let Some(pattern) = pattern_target(pattern) else {
                    return Err(self.unsupported("assignment target", "Invalid", assign.left.span()));
                };
                return self.transform_destructuring_assignment(&pattern, &assign.right, assign.span);
            }
            ast::AssignTarget::Simple(simple) => match simple_target_expression(simple) {
                Some(target) => target,
                None => return Err(self.unsupported("assignment target", "Invalid", simple.span())),
            },
        };

        if let Some(operator) = compound_operator(assign.op) {
            let concat = operator == ast::BinaryOp::Add && self.is_string_concat(&target, &assign.right);
            let right = self.transform_expression(&assign.right)?;
            return self.transform_compound_assignment_statement(&target, right, operator, concat, assign.span);
        }

        self.validate_assignment_types(&target, &assign.right)?;
        let right = self.transform_expression(&assign.right)?;
        Ok(vec![self.transform_assignment(&target, right, assign.span)?])
    }

    /// `target op= right` as a statement. An object or index with side
    /// effects is cached in a `do` block first.
    pub(crate) fn transform_compound_assignment_statement(
        &mut self,
        target: &ast::Expr,
        right: Expression,
        operator: ast::BinaryOp,
        concat: bool,
        span: Span,
    ) -> Result<Vec<Statement>> {
        let original = self.pos(span);
        if let Some((object, index)) = access_with_effects(target) {
            let declaration = self.create_object_and_index_declaration(object, index)?;
            let access = self.create_cached_access();
            let right = create_parenthesized_expression(right, None);
            let value = self.transform_binary_operation(access.clone().into(), right, operator, concat, span)?;
            let assignment = create_assignment_statement(vec![access.into()], vec![value], None);
            return Ok(vec![create_do_statement(vec![declaration, assignment], original)]);
        }

        let left = self.transform_expression(target)?;
        let value = self.transform_binary_operation(left, right, operator, concat, span)?;
        Ok(vec![self.transform_assignment(target, value, span)?])
    }

    /// `local ____obj, ____index = obj, index`
    fn create_object_and_index_declaration(&mut self, object: &ast::Expr, index: CachedIndex<'_>) -> Result<Statement> {
        let object_value = self.transform_expression(object)?;
        let index_value = match index {
            CachedIndex::Name(name) => create_string_literal(name, None),
            CachedIndex::Computed(index) => self.transform_element_index(object, index)?,
        };
        Ok(create_variable_declaration_statement(
            vec![
                create_identifier("____obj", None, None, None),
                create_identifier("____index", None, None, None),
            ],
            Some(vec![object_value, index_value]),
            None,
        ))
    }

    /// `____obj[____index]`
    fn create_cached_access(&self) -> TableIndexExpression {
        create_table_index_expression(
            create_identifier("____obj", None, None, None).into(),
            create_identifier("____index", None, None, None).into(),
            None,
        )
    }

    /// `a = b` used as a value.
    pub(crate) fn transform_assignment_expression(&mut self, assign: &ast::AssignExpr) -> Result<Expression> {
        let original = self.pos(assign.span);
        let target = match &assign.left {
            ast::AssignTarget::Pat(pattern) => {
                let Some(pattern) = pattern_target(pattern) else {
                    return Err(self.unsupported("assignment target", "Invalid", assign.left.span()));
                };
                return self.transform_destructuring_assignment_expression(&pattern, &assign.right, assign.span);
            }
            ast::AssignTarget::Simple(simple) => match simple_target_expression(simple) {
                Some(target) => target,
                None => return Err(self.unsupported("assignment target", "Invalid", simple.span())),
            },
        };

        if let Some(operator) = compound_operator(assign.op) {
            let concat = operator == ast::BinaryOp::Add && self.is_string_concat(&target, &assign.right);
            let right = self.transform_expression(&assign.right)?;
            return self.transform_compound_assignment_expression(&target, right, operator, concat, false, assign.span);
        }

        self.validate_assignment_types(&target, &assign.right)?;

        if let (true, ast::Expr::Member(member)) = (self.is_array_length(&target), &target) {
            let array = self.transform_expression(&member.obj)?;
            let right = self.transform_expression(&assign.right)?;
            return Ok(self.lualib_call(LuaLibFeature::ArraySetLength, vec![array, right], original));
        }

        if let ast::Expr::Member(member) = &target {
            let object = self.transform_expression(&member.obj)?;
            let index = match &member.prop {
                ast::MemberProp::Ident(name) => create_string_literal(name.sym.to_string(), None),
                ast::MemberProp::Computed(computed) => self.transform_element_index(&member.obj, &computed.expr)?,
                ast::MemberProp::PrivateName(name) => {
                    return Err(self.unsupported("property access", "PrivateName", name.span))
                }
            };
            let right = self.transform_expression(&assign.right)?;
            return Ok(self.create_indexed_assignment_call(object, index, right, original));
        }

        let right = self.transform_expression(&assign.right)?;
        let left = self.transform_expression(&target)?;
        let assignment = self.transform_assignment(&target, right, assign.span)?;
        Ok(self.create_immediately_invoked_function_expression(vec![assignment], vec![left], original))
    }

    /// `(function(o, i, v) o[i] = v; return v end)(object, index, value)`
    fn create_indexed_assignment_call(
        &self,
        object: Expression,
        index: Expression,
        value: Expression,
        original: Option<Position>,
    ) -> Expression {
        let o = create_identifier("o", None, None, None);
        let i = create_identifier("i", None, None, None);
        let v = create_identifier("v", None, None, None);
        let target = create_table_index_expression(clone_identifier(&o, None).into(), clone_identifier(&i, None).into(), None);
        let body = create_block(
            vec![
                create_assignment_statement(vec![target.into()], vec![clone_identifier(&v, None).into()], None),
                create_return_statement(vec![clone_identifier(&v, None).into()], None),
            ],
            None,
        );
        let function = create_function_expression(body, vec![o, i, v], false, None, FunctionExpressionFlags::NONE, None);
        create_call_expression(
            create_parenthesized_expression(function, None),
            vec![object, index, value],
            original,
        )
    }

    /// `++x`, `x--` and friends used as values.
    pub(crate) fn transform_update_expression(&mut self, update: &ast::UpdateExpr) -> Result<Expression> {
        let one = create_numeric_literal(1.0, None);
        self.transform_compound_assignment_expression(
            &update.arg,
            one,
            update_operator(update.op),
            false,
            !update.prefix,
            update.span,
        )
    }

    /// `x++` and `x += 1` as statements.
    pub(crate) fn transform_update_statement(&mut self, update: &ast::UpdateExpr) -> Result<Vec<Statement>> {
        let one = create_numeric_literal(1.0, None);
        self.transform_compound_assignment_statement(&update.arg, one, update_operator(update.op), false, update.span)
    }

    /// Compound assignment used as a value. Postfix forms return the value
    /// from before the update.
    pub(crate) fn transform_compound_assignment_expression(
        &mut self,
        target: &ast::Expr,
        right: Expression,
        operator: ast::BinaryOp,
        concat: bool,
        postfix: bool,
        span: Span,
    ) -> Result<Expression> {
        let original = self.pos(span);
        let temporary = || create_identifier("____tmp", None, None, None);

        if let Some((object, index)) = access_with_effects(target) {
            let declaration = self.create_object_and_index_declaration(object, index)?;
            let access = self.create_cached_access();
            let right = create_parenthesized_expression(right, None);
            let (temporary_declaration, assignment) = if postfix {
                let declaration = create_variable_declaration_statement(vec![temporary()], Some(vec![access.clone().into()]), None);
                let value = self.transform_binary_operation(temporary().into(), right, operator, concat, span)?;
                (declaration, create_assignment_statement(vec![access.into()], vec![value], None))
            } else {
                let value = self.transform_binary_operation(access.clone().into(), right, operator, concat, span)?;
                let declaration = create_variable_declaration_statement(vec![temporary()], Some(vec![value]), None);
                (declaration, create_assignment_statement(vec![access.into()], vec![temporary().into()], None))
            };
            return Ok(self.create_immediately_invoked_function_expression(
                vec![declaration, temporary_declaration, assignment],
                vec![temporary().into()],
                original,
            ));
        }

        let left = self.transform_expression(target)?;
        if postfix {
            let declaration = create_variable_declaration_statement(vec![temporary()], Some(vec![left]), None);
            let value = self.transform_binary_operation(temporary().into(), right, operator, concat, span)?;
            let assignment = self.transform_assignment(target, value, span)?;
            return Ok(self.create_immediately_invoked_function_expression(
                vec![declaration, assignment],
                vec![temporary().into()],
                original,
            ));
        }

        if matches!(target, ast::Expr::Member(_)) {
            let value = self.transform_binary_operation(left, right, operator, concat, span)?;
            let declaration = create_variable_declaration_statement(vec![temporary()], Some(vec![value]), None);
            let assignment = self.transform_assignment(target, temporary().into(), span)?;
            return Ok(self.create_immediately_invoked_function_expression(
                vec![declaration, assignment],
                vec![temporary().into()],
                original,
            ));
        }

        let value = self.transform_binary_operation(left, right, operator, concat, span)?;
        let assignment = self.transform_assignment(target, value, span)?;
        let result = self.transform_expression(target)?;
        Ok(self.create_immediately_invoked_function_expression(vec![assignment], vec![result], original))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::testing::{lower, lower_error};
    use tslua_lualib::LuaLibFeature;

    #[test]
    fn test_simple_assignment_statement() {
        let text = lower("let a = 1;\na = 2;\ndeclare const o: { x: number };\no.x = 3;").text();
        assert!(text.contains("a = 2\n"), "{}", text);
        assert!(text.contains("o[\"x\"] = 3\n"), "{}", text);
    }

    #[test]
    fn test_array_length_assignment() {
        let lowered = lower("declare const xs: number[];\nxs.length = 2;");
        assert_eq!(lowered.text(), "__TS__ArraySetLength(xs, 2)\n");
        assert!(lowered.features.contains(LuaLibFeature::ArraySetLength));
    }

    #[test]
    fn test_lua_table_length_cannot_be_assigned() {
        let source = "/** @luaTable */\ndeclare class Table { length: number; }\ndeclare const t: Table;\nt.length = 2;";
        let error = lower_error(source);
        assert_eq!(
            error.kind,
            CompileErrorKind::ForbiddenLuaTableUseException("A LuaTable object's length cannot be re-assigned.".to_string())
        );
    }

    #[test]
    fn test_compound_statement_caches_effectful_access() {
        let source = "declare function get(this: void): { x: number };\nget().x += 2;";
        let text = lower(source).text();
        assert_eq!(
            text,
            "do\n    local ____obj, ____index = get(), \"x\"\n    ____obj[____index] = ____obj[____index] + (2)\nend\n"
        );
    }

    #[test]
    fn test_string_compound_concatenates() {
        let text = lower("let s = \"a\";\nlet n = 1;\ns += n;").text();
        assert!(text.contains("s = tostring(s) .. tostring(n)\n"), "{}", text);
    }

    #[test]
    fn test_assignment_expression_forms() {
        let source = "let a = 1;\nlet b = a = 2;\ndeclare const o: { x: number };\nlet c = o.x = 3;";
        let text = lower(source).text();
        assert!(text.contains("local b = (function()\n    a = 2\n    return a\nend)()\n"), "{}", text);
        assert!(
            text.contains("local c = (function(o, i, v)\n    o[i] = v\n    return v\nend)(o, \"x\", 3)\n"),
            "{}",
            text
        );
    }

    #[test]
    fn test_postfix_returns_previous_value() {
        let text = lower("let a = 1;\nlet b = a++;\nlet c = ++a;").text();
        assert!(
            text.contains("local b = (function()\n    local ____tmp = a\n    a = ____tmp + 1\n    return ____tmp\nend)()\n"),
            "{}",
            text
        );
        assert!(text.contains("local c = (function()\n    a = a + 1\n    return a\nend)()\n"), "{}", text);
    }

    #[test]
    fn test_prefix_on_property_uses_temporary() {
        let text = lower("declare const o: { x: number };\nconst y = ++o.x;").text();
        assert!(
            text.contains("local y = (function()\n    local ____tmp = o[\"x\"] + 1\n    o[\"x\"] = ____tmp\n    return ____tmp\nend)()\n"),
            "{}",
            text
        );
    }
}
