use super::{Diagnostic, Severity};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn bold(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold_red(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[1;31m{s}\x1b[0m") } else { s.to_string() }
    }

    fn cyan(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[36m{s}\x1b[0m") } else { s.to_string() }
    }

    fn dim(&self, s: &str) -> String {
        if self.use_color { format!("\x1b[2m{s}\x1b[0m") } else { s.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        // "error[LBVM-A001]: message"
        let severity_label = match d.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let head = match d.code {
            Some(code) => format!("{severity_label}[{code}]"),
            None => severity_label.to_string(),
        };
        let head = match d.severity {
            Severity::Error => self.bold_red(&head),
            Severity::Warning => self.bold(&self.cyan(&head)),
        };
        out.push_str(&format!("{}: {}\n", head, self.bold(&d.message)));

        let primary = d.labels.iter().find(|l| l.is_primary);
        if let Some(label) = primary {
            let loc = label.location;
            let file = d.file.as_deref().map(|f| format!("{f}:")).unwrap_or_default();
            out.push_str(&format!("  {} {file}{}:{}\n", self.cyan("-->"), loc.line, loc.column));

            let line_text = d.source.as_deref().and_then(|s| s.lines().nth(loc.line.saturating_sub(1)));
            if let Some(line_text) = line_text {
                let gutter = loc.line.to_string().len();
                let pipe = self.cyan("|");
                let pad = " ".repeat(gutter);

                out.push_str(&format!("{pad} {pipe}\n"));
                let line_num = self.cyan(&format!("{:>gutter$}", loc.line));
                out.push_str(&format!("{line_num} {pipe} {line_text}\n"));

                let start = loc.column.saturating_sub(1);
                let width = if loc.len > 0 { loc.len } else { token_width(line_text, start) };
                let carets = self.bold_red(&"^".repeat(width));
                let indent = " ".repeat(start);
                if label.message.is_empty() {
                    out.push_str(&format!("{pad} {pipe} {indent}{carets}\n"));
                } else {
                    out.push_str(&format!("{pad} {pipe} {indent}{carets} {}\n",
                        self.bold_red(&label.message)));
                }
                out.push_str(&format!("{pad} {pipe}\n"));
            }
        }

        for label in d.labels.iter().filter(|l| !l.is_primary) {
            if !label.message.is_empty() {
                out.push_str(&format!("  {} {} (line {})\n", self.dim("="), label.message, label.location.line));
            }
        }

        for note in &d.notes {
            out.push_str(&format!("  {} note: {}\n", self.dim("="), note));
        }

        if let Some(suggestion) = &d.suggestion {
            out.push_str(&format!("  {} suggestion: {}\n", self.dim("="), suggestion));
        }

        out
    }
}

/// Width of the whitespace-delimited token starting at char `start`.
fn token_width(line: &str, start: usize) -> usize {
    let mut chars = line.chars().skip(start).peekable();
    if chars.peek() == Some(&'"') {
        // a string literal: through the closing quote, or to end of line
        let mut width = 1;
        let mut escaped = false;
        for c in chars.skip(1) {
            width += 1;
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return width,
                _ => {}
            }
        }
        return width;
    }
    chars.take_while(|c| !c.is_whitespace()).count().max(1)
}
