//! Diagnostic emitters: rich terminal, JSON lines, and plain text.

use crate::diagnostic::{Diagnostic, Diagnostics, Severity};
use crate::source_cache::SourceCache;
use crate::span::LabelStyle;
use console::Style;
use std::io::Write;

pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()>;

    fn emit_all(&mut self, diagnostics: &Diagnostics, cache: &SourceCache) -> std::io::Result<()> {
        for diag in diagnostics.iter() {
            self.emit(diag, cache)?;
        }
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()>;
}

/// rustc-style output with a source snippet and caret underline.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colored: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, colored: bool) -> Self {
        Self { writer, colored }
    }

    fn style(&self, style: Style) -> Style {
        style.force_styling(self.colored)
    }

    fn severity_style(&self, severity: Severity) -> Style {
        let base = match severity {
            Severity::Error => Style::new().red(),
            Severity::Warning => Style::new().yellow(),
            Severity::Hint => Style::new().blue(),
        };
        self.style(base)
    }

    fn gutter(&self) -> Style {
        self.style(Style::new().cyan())
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let severity = self.severity_style(diagnostic.severity);
        let gutter = self.gutter();
        let header = format!(
            "{}[{}]",
            diagnostic.severity.as_str(),
            diagnostic.code.as_str()
        );

        writeln!(
            self.writer,
            "{}: {}",
            severity.clone().bold().apply_to(header),
            self.style(Style::new().bold()).apply_to(&diagnostic.message)
        )?;

        if let Some(loc) = cache.location(diagnostic.span) {
            writeln!(self.writer, "  {} {}", gutter.apply_to("-->"), loc)?;

            if let Some(file) = cache.get_file(diagnostic.span.file_id) {
                let (line_num, start_col) = file.line_column(diagnostic.span.start);
                if let Some(line_text) = file.line_text(line_num) {
                    let number = line_num.to_string();
                    let pad = " ".repeat(number.len());
                    let indent = (start_col - 1) as usize;
                    let room = line_text.len().saturating_sub(indent).max(1);
                    let carets = "^".repeat((diagnostic.span.len() as usize).clamp(1, room));

                    writeln!(self.writer, "{} {}", pad, gutter.apply_to("|"))?;
                    writeln!(
                        self.writer,
                        "{} {}",
                        gutter.apply_to(format!("{} |", number)),
                        line_text
                    )?;
                    writeln!(
                        self.writer,
                        "{} {} {}{}",
                        pad,
                        gutter.apply_to("|"),
                        " ".repeat(indent),
                        severity.apply_to(carets)
                    )?;
                }
            }
        }

        for label in &diagnostic.labels {
            if let Some(loc) = cache.location(label.span) {
                let style = match label.style {
                    LabelStyle::Primary => severity.clone(),
                    LabelStyle::Secondary => gutter.clone(),
                };
                writeln!(
                    self.writer,
                    "  {}: {} ({})",
                    style.apply_to("note"),
                    label.message,
                    loc
                )?;
            }
        }

        for related in &diagnostic.related {
            match cache.location(related.span) {
                Some(loc) => writeln!(self.writer, "  = related: {} ({})", related.message, loc)?,
                None => writeln!(self.writer, "  = related: {}", related.message)?,
            }
        }

        if let Some(help) = &diagnostic.help {
            writeln!(self.writer, "  {} {}", gutter.apply_to("= help:"), help)?;
        }

        writeln!(self.writer)
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let errors = diagnostics.error_count();
        let warnings = diagnostics.warning_count();
        if errors == 0 && warnings == 0 {
            return Ok(());
        }

        let mut parts = Vec::new();
        if errors > 0 {
            parts.push(format!("{} error{}", errors, if errors == 1 { "" } else { "s" }));
        }
        if warnings > 0 {
            parts.push(format!(
                "{} warning{}",
                warnings,
                if warnings == 1 { "" } else { "s" }
            ));
        }
        let style = if errors > 0 {
            self.severity_style(Severity::Error)
        } else {
            self.severity_style(Severity::Warning)
        };
        writeln!(
            self.writer,
            "{}",
            style.apply_to(format!("{} emitted", parts.join(" and ")))
        )
    }
}

/// One JSON object per line, for editor and CI integration.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let location = cache.location(diagnostic.span).map(|l| {
            serde_json::json!({
                "file": l.file,
                "line": l.line,
                "column": l.column,
            })
        });
        let span = if diagnostic.span.is_dummy() {
            serde_json::Value::Null
        } else {
            serde_json::json!({
                "start": diagnostic.span.start,
                "end": diagnostic.span.end,
            })
        };

        let json = serde_json::json!({
            "code": diagnostic.code.as_str(),
            "title": diagnostic.code.title(),
            "severity": diagnostic.severity.as_str(),
            "message": diagnostic.message,
            "location": location,
            "span": span,
            "help": diagnostic.help,
            "related": diagnostic.related.iter().map(|r| r.message.clone()).collect::<Vec<_>>(),
        });

        serde_json::to_writer(&mut self.writer, &json)?;
        writeln!(self.writer)
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let summary = serde_json::json!({
            "type": "summary",
            "errors": diagnostics.error_count(),
            "warnings": diagnostics.warning_count(),
            "hints": diagnostics.hint_count(),
            "total": diagnostics.len(),
        });
        serde_json::to_writer(&mut self.writer, &summary)?;
        writeln!(self.writer)
    }
}

/// `file:line:col: severity: message [code]`, one per line.
pub struct SimpleEmitter<W: Write> {
    writer: W,
}

impl<W: Write> SimpleEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for SimpleEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        match cache.location(diagnostic.span) {
            Some(loc) => writeln!(
                self.writer,
                "{}: {}: {} [{}]",
                loc,
                diagnostic.severity,
                diagnostic.message,
                diagnostic.code
            ),
            None => writeln!(
                self.writer,
                "{}: {} [{}]",
                diagnostic.severity, diagnostic.message, diagnostic.code
            ),
        }
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{} error(s), {} warning(s)",
            diagnostics.error_count(),
            diagnostics.warning_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::span::Span;

    fn sample() -> (SourceCache, Diagnostic) {
        let mut cache = SourceCache::new();
        let id = cache.add_file("a.ts", "let x = 1;\nswitch (x) {}\n".to_string());
        let diag = Diagnostic::new(
            DiagnosticCode::UnsupportedForTarget,
            "Switch statements is/are not supported for target Lua 5.1.",
        )
        .with_span(Span::new(id, 11, 24))
        .with_help("Select a newer Lua target")
        .build();
        (cache, diag)
    }

    #[test]
    fn test_terminal_plain_output() {
        let (cache, diag) = sample();
        let mut out = Vec::new();
        TerminalEmitter::new(&mut out, false)
            .emit(&diag, &cache)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("error[TL103]: Switch statements"));
        assert!(text.contains("--> a.ts:2:1"));
        assert!(text.contains("2 | switch (x) {}"));
        assert!(text.contains("^^^^^^^^^^^^^"));
        assert!(text.contains("= help: Select a newer Lua target"));
    }

    #[test]
    fn test_json_line() {
        let (cache, diag) = sample();
        let mut out = Vec::new();
        JsonEmitter::new(&mut out).emit(&diag, &cache).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["code"], "TL103");
        assert_eq!(value["location"]["line"], 2);
        assert_eq!(value["span"]["start"], 11);
    }

    #[test]
    fn test_summary_pluralization() {
        let (_, diag) = sample();
        let mut pool = Diagnostics::new();
        pool.push(diag.clone());
        pool.push(diag);
        let mut out = Vec::new();
        TerminalEmitter::new(&mut out, false)
            .emit_summary(&pool)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "2 errors emitted\n");
    }
}
