//! Explain command - explain diagnostic codes

use anyhow::{anyhow, Result};
use clap::Args;
use tslua_diagnostics::DiagnosticCode;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code to explain (e.g., TL101, TL501)
    pub code: String,
}

struct Explanation {
    code: DiagnosticCode,
    description: &'static str,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [DiagnosticCode],
}

const EXPLANATIONS: &[Explanation] = &[
    Explanation {
        code: DiagnosticCode::ParseError,
        description: "The TypeScript parser could not read the file.",
        example: Some("function f( {"),
        suggestion: Some("Fix the syntax error; nothing is lowered until the file parses."),
        related: &[],
    },
    Explanation {
        code: DiagnosticCode::UnsupportedKind,
        description: "The construct has no Lua lowering. Generators, async functions, labeled \
                      statements, `??` and optional chaining are among them.",
        example: Some("const name = user?.name;"),
        suggestion: Some("Rewrite with an explicit check: `const name = user && user.name;`"),
        related: &[DiagnosticCode::UnsupportedForTarget],
    },
    Explanation {
        code: DiagnosticCode::UnsupportedForTarget,
        description: "The construct needs a Lua feature the configured target lacks. `continue` \
                      lowers to `goto`, which Lua 5.1 does not have.",
        example: Some("for (const x of xs) { if (x) continue; }  // with target = \"5.1\""),
        suggestion: Some("Set `lua.target` to 5.2, 5.3 or JIT, or restructure the loop."),
        related: &[DiagnosticCode::UnsupportedKind],
    },
    Explanation {
        code: DiagnosticCode::UnresolvableRequirePath,
        description: "An import resolves to a file outside the root directory, so no Lua \
                      require path can be formed for it.",
        example: Some("import { x } from \"../../shared\";"),
        suggestion: Some("Move the file under `project.root_dir`, widen the root with --root-dir, \
                          or mark the module `@noResolution`."),
        related: &[DiagnosticCode::UnsupportedImportType],
    },
    Explanation {
        code: DiagnosticCode::InvalidJsonFileContent,
        description: "A JSON module must contain exactly one value.",
        example: None,
        suggestion: Some("Check the file is valid JSON."),
        related: &[],
    },
    Explanation {
        code: DiagnosticCode::ForbiddenForIn,
        description: "for-in over an array iterates keys with `pairs`, which is almost never \
                      what array code means in Lua.",
        example: Some("for (const i in items) { }"),
        suggestion: Some("Use for-of, or a numeric for loop."),
        related: &[],
    },
    Explanation {
        code: DiagnosticCode::InvalidNewExpressionOnExtension,
        description: "Classes marked `@extension` or `@metaExtension` add methods to an existing \
                      table and cannot be constructed.",
        example: Some("/** @extension */ class StringExt {}\nnew StringExt();"),
        suggestion: None,
        related: &[
            DiagnosticCode::InvalidExtendsExtension,
            DiagnosticCode::InvalidExportsExtension,
            DiagnosticCode::InvalidInstanceOfExtension,
        ],
    },
    Explanation {
        code: DiagnosticCode::InvalidExtendsLuaTable,
        description: "`@luaTable` classes map directly onto Lua tables and have no class \
                      machinery to inherit from.",
        example: Some("/** @luaTable */ declare class Table {}\nclass Mine extends Table {}"),
        suggestion: Some("Wrap the table in a field instead of extending it."),
        related: &[DiagnosticCode::ForbiddenLuaTableNonDeclaration, DiagnosticCode::InvalidInstanceOfLuaTable],
    },
    Explanation {
        code: DiagnosticCode::InvalidForRangeCall,
        description: "A `@forRange` function lowers to a numeric for loop and may only appear as \
                      the iterable of a for-of with a plain variable and 2 or 3 numeric arguments.",
        example: Some("for (const i of range(1, 10, 2)) { }"),
        suggestion: None,
        related: &[],
    },
    Explanation {
        code: DiagnosticCode::UnsupportedNoSelfFunctionConversion,
        description: "A function that expects a `self` argument is passed where a plain Lua \
                      function is expected. Lua would shift every argument by one.",
        example: Some("declare function callback(f: (this: void) => void): void;\ncallback(obj.method);"),
        suggestion: Some("Wrap the call: `callback(() => obj.method())`, or declare the method \
                          with `this: void`."),
        related: &[DiagnosticCode::UnsupportedSelfFunctionConversion, DiagnosticCode::UnsupportedOverloadAssignment],
    },
    Explanation {
        code: DiagnosticCode::UnsupportedSelfFunctionConversion,
        description: "A plain function (`this: void`) is passed where a method taking `self` is \
                      expected.",
        example: None,
        suggestion: Some("Wrap it in an arrow function that ignores the receiver."),
        related: &[DiagnosticCode::UnsupportedNoSelfFunctionConversion],
    },
    Explanation {
        code: DiagnosticCode::InvalidAmbientIdentifierName,
        description: "An ambient declaration uses a name that is not a valid Lua identifier. \
                      Local names can be escaped, but ambient ones must already exist in Lua.",
        example: Some("declare const $: any;\n$.ready();"),
        suggestion: Some("Declare it under a Lua-compatible name."),
        related: &[],
    },
    Explanation {
        code: DiagnosticCode::ReferencedBeforeDeclaration,
        description: "With hoisting disabled, a function or variable is used above the line that \
                      declares it. Lua locals are only visible after their declaration.",
        example: Some("f();\nfunction f() {}"),
        suggestion: Some("Move the declaration up, or remove `no_hoisting`."),
        related: &[],
    },
    Explanation {
        code: DiagnosticCode::MissingLuaLibFeature,
        description: "A LuaLib helper source could not be found in the configured directory.",
        example: None,
        suggestion: Some("Point `lua.lualib_dir` (or --lualib-dir) at a directory containing \
                          `<Feature>.lua` files."),
        related: &[],
    },
    Explanation {
        code: DiagnosticCode::UnknownDirective,
        description: "A doc comment tag looks like a directive but is not one the compiler knows.",
        example: Some("/** @noselff */"),
        suggestion: Some("Check the spelling: @noSelf, @noSelfInFile, @tupleReturn, @extension, ..."),
        related: &[DiagnosticCode::DeprecatedDirectiveSyntax],
    },
    Explanation {
        code: DiagnosticCode::DeprecatedDirectiveSyntax,
        description: "Directives written as `!name` still work but the `@name` form is preferred.",
        example: Some("/** !noSelf */"),
        suggestion: Some("Write `/** @noSelf */`."),
        related: &[DiagnosticCode::UnknownDirective],
    },
];

fn codes(related: &[DiagnosticCode]) -> String {
    related.iter().map(|code| code.as_str()).collect::<Vec<_>>().join(", ")
}

pub fn run(args: ExplainArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    let code = DiagnosticCode::from_code_str(args.code.trim())
        .ok_or_else(|| anyhow!("Unknown diagnostic code: {}", args.code))?;
    let explanation = EXPLANATIONS.iter().find(|e| e.code == code);
    let title = code.title();
    let name = code.as_str();

    match format {
        OutputFormat::Text => {
            if use_color {
                println!(
                    "\n{}: {}\n{}",
                    console::style(name).bold().cyan(),
                    console::style(title).bold(),
                    "=".repeat(name.len() + title.len() + 2)
                );
            } else {
                println!("\n{}: {}\n{}", name, title, "=".repeat(name.len() + title.len() + 2));
            }

            let Some(explanation) = explanation else {
                println!("\n{:?} {}.\n", code.category(), code.default_severity());
                return Ok(());
            };

            println!("\n{}\n", explanation.description);

            if let Some(example) = explanation.example {
                if use_color {
                    println!("{}:", console::style("Example").bold());
                } else {
                    println!("Example:");
                }
                for line in example.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if let Some(suggestion) = explanation.suggestion {
                if use_color {
                    println!("{}:", console::style("Suggestion").bold().green());
                } else {
                    println!("Suggestion:");
                }
                for line in suggestion.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if !explanation.related.is_empty() {
                if use_color {
                    println!("{}: {}", console::style("Related").dim(), codes(explanation.related));
                } else {
                    println!("Related: {}", codes(explanation.related));
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "code": name,
                "title": title,
                "category": format!("{:?}", code.category()),
                "severity": code.default_severity().as_str(),
                "description": explanation.map(|e| e.description),
                "example": explanation.and_then(|e| e.example),
                "suggestion": explanation.and_then(|e| e.suggestion),
                "related": explanation.map(|e| e.related.iter().map(|c| c.as_str()).collect::<Vec<_>>()).unwrap_or_default(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_explanations_are_unique() {
        let mut seen = HashSet::new();
        for explanation in EXPLANATIONS {
            assert!(seen.insert(explanation.code), "duplicate {}", explanation.code);
            assert!(!explanation.related.contains(&explanation.code));
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let args = ExplainArgs { code: "tl501".to_string() };
        assert!(run(args, OutputFormat::Json, false).is_ok());
    }

    #[test]
    fn test_unknown_code() {
        let args = ExplainArgs { code: "X999".to_string() };
        assert!(run(args, OutputFormat::Text, false).is_err());
    }

    #[test]
    fn test_code_without_entry_still_explains() {
        let args = ExplainArgs { code: "TL213".to_string() };
        assert!(run(args, OutputFormat::Text, false).is_ok());
    }
}
