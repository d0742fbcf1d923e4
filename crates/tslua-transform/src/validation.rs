//! Function context checks for assignments.
//!
//! A function declared with a `self` parameter cannot be stored where a
//! context-free function is expected and vice versa: the call sites would
//! pass the wrong number of arguments. Every place a value flows into a
//! typed slot (declarations, assignments, arguments, returns, casts) runs
//! through [`LuaTransformer::validate_function_assignment`].

use swc_common::Span;

use tslua_types::{ContextType, Type};

use crate::error::{CompileErrorKind, Result};
use crate::transformer::LuaTransformer;

impl LuaTransformer<'_> {
    /// Rejects assigning a value of type `from` to a slot of type `to` when
    /// their function contexts disagree. `name` names the slot in the error.
    pub(crate) fn validate_function_assignment(
        &mut self,
        span: Span,
        from: &Type,
        to: &Type,
        name: Option<String>,
    ) -> Result<()> {
        if to.is_any() || from == to {
            return Ok(());
        }
        if !self.validated_assignments.insert((from.to_string(), to.to_string())) {
            return Ok(());
        }

        let from_context = self.oracle.function_context_type(from);
        let to_context = self.oracle.function_context_type(to);
        if from_context == ContextType::Mixed || to_context == ContextType::Mixed {
            return Err(self.error(CompileErrorKind::UnsupportedOverloadAssignment(name), span));
        }
        if from_context != to_context && from_context != ContextType::None && to_context != ContextType::None {
            let kind = if to_context == ContextType::Void {
                CompileErrorKind::UnsupportedNoSelfFunctionConversion(name)
            } else {
                CompileErrorKind::UnsupportedSelfFunctionConversion(name)
            };
            return Err(self.error(kind, span));
        }

        match (from.resolved(), to.resolved()) {
            (Type::Tuple(from_members), Type::Tuple(to_members)) => {
                for (from_member, to_member) in from_members.iter().zip(to_members) {
                    self.validate_function_assignment(span, from_member, to_member, name.clone())?;
                }
                return Ok(());
            }
            (Type::Tuple(from_members), _) => {
                if let Some(to_element) = to.element_type() {
                    for from_member in from_members {
                        self.validate_function_assignment(span, from_member, to_element, name.clone())?;
                    }
                }
                return Ok(());
            }
            _ => {}
        }
        if let (Some(from_element), Some(to_element)) = (from.element_type(), to.element_type()) {
            return self.validate_function_assignment(span, from_element, to_element, name);
        }

        for member in self.oracle.member_names(to) {
            let to_member = self.oracle.property_type(to, &member);
            let from_member = self.oracle.property_type(from, &member);
            if from_member.is_any() {
                continue;
            }
            let member_name = match &name {
                Some(name) => format!("{}.{}", name, member),
                None => member.clone(),
            };
            self.validate_function_assignment(span, &from_member, &to_member, Some(member_name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CompileErrorKind;
    use crate::testing::{lower, lower_error};

    #[test]
    fn test_mixed_overload_assignment_is_rejected() {
        let source = "declare function over(this: void, s: string): string;\ndeclare function over(this: {}, n: number): number;\nconst f: (s: string) => string = over;";
        let error = lower_error(source);
        assert_eq!(error.kind, CompileErrorKind::UnsupportedOverloadAssignment(Some("f".to_string())));
    }

    #[test]
    fn test_self_to_no_self_conversion() {
        let source = "declare function withSelf(this: {}, s: string): void;\nconst f: (this: void, s: string) => void = withSelf;";
        let error = lower_error(source);
        assert_eq!(error.kind, CompileErrorKind::UnsupportedNoSelfFunctionConversion(Some("f".to_string())));
    }

    #[test]
    fn test_no_self_to_self_conversion_in_argument() {
        let source = "declare function take(cb: (s: string) => void): void;\ndeclare function plain(this: void, s: string): void;\ntake(plain);";
        let error = lower_error(source);
        assert_eq!(error.kind, CompileErrorKind::UnsupportedSelfFunctionConversion(Some("cb".to_string())));
    }

    #[test]
    fn test_interface_members_are_checked() {
        let source = "interface Handler { run(this: void): void }\ndeclare const methods: { run(): void };\nconst h: Handler = methods;";
        let error = lower_error(source);
        assert_eq!(
            error.kind,
            CompileErrorKind::UnsupportedNoSelfFunctionConversion(Some("h.run".to_string()))
        );
    }

    #[test]
    fn test_matching_contexts_pass() {
        let text = lower("declare function f(this: void, s: string): void;\nconst g: (this: void, s: string) => void = f;").text();
        assert!(text.ends_with("g = f\n"), "{}", text);
    }
}
