use logos::Logos;

/// Tokens of a single assembly line. Everything that is not a string literal
/// is a bare word: mnemonics, labels, numbers and symbol names alike.
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r";[^\n]*", allow_greedy = true))]
pub enum Token {
    #[regex(r#""([^"\\\n]|\\[^\n])*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len() - 1])
    })]
    Str(String),

    #[regex(r#"[^ \t\r\n";]+"#, |lex| lex.slice().to_string())]
    Word(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence in string literal")]
    InvalidEscape,
    #[error("unexpected input")]
    Unexpected,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} at column {column}: '{snippet}'")]
pub struct LexError {
    /// 1-based column of the offending token.
    pub column: usize,
    pub snippet: String,
    pub kind: LexErrorKind,
}

/// Lex one line into tokens with their byte ranges within the line.
pub fn lex_line(line: &str) -> Result<Vec<(Token, std::ops::Range<usize>)>, LexError> {
    let mut lexer = Token::lexer(line);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                let span = lexer.span();
                let rest = &line[span.start..];
                let kind = if !rest.starts_with('"') {
                    LexErrorKind::Unexpected
                } else if closing_quote(&rest[1..]).is_some() {
                    LexErrorKind::InvalidEscape
                } else {
                    LexErrorKind::UnterminatedString
                };
                return Err(LexError {
                    column: span.start + 1,
                    snippet: line[span].to_string(),
                    kind,
                });
            }
        }
    }

    Ok(tokens)
}

/// Offset of the first unescaped `"` in `s`.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Decode backslash escapes. `None` on an unknown escape.
pub fn unescape(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        out.push(match chars.next()? {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            '\\' => '\\',
            '"' => '"',
            _ => return None,
        });
    }
    Some(out)
}

/// Inverse of [`unescape`], used for listings and the write form of strings.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<Token> {
        lex_line(line).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn lex_instruction_line() {
        assert_eq!(kinds("  ENTER 1 fac"), vec![word("ENTER"), word("1"), word("fac")]);
    }

    #[test]
    fn lex_label_and_symbols_with_punctuation() {
        assert_eq!(kinds("##loop##0:"), vec![word("##loop##0:")]);
        assert_eq!(kinds("PUSHVAR string-ci=?"), vec![word("PUSHVAR"), word("string-ci=?")]);
    }

    #[test]
    fn lex_string_literal_with_escapes() {
        assert_eq!(
            kinds(r#"PUSHSTR "say \"hi\"\n""#),
            vec![word("PUSHSTR"), Token::Str("say \"hi\"\n".to_string())]
        );
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        assert_eq!(kinds("POP ; drop it"), vec![word("POP")]);
        assert_eq!(kinds("; only a comment"), vec![]);
        assert_eq!(
            kinds(r#"PUSHSTR "a;b" ; trailing"#),
            vec![word("PUSHSTR"), Token::Str("a;b".to_string())]
        );
    }

    #[test]
    fn spans_are_line_offsets() {
        let tokens = lex_line("JMP end").unwrap();
        assert_eq!(tokens[1].1, 4..7);
    }

    #[test]
    fn unterminated_string() {
        let err = lex_line(r#"PUSHSTR "abc"#).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.column, 9);
    }

    #[test]
    fn invalid_escape() {
        let err = lex_line(r#"PUSHSTR "a\qb""#).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::InvalidEscape);
    }

    #[test]
    fn escape_inverts_unescape() {
        let raw = "tab\tquote\"slash\\";
        assert_eq!(unescape(&escape(raw)).as_deref(), Some(raw));
    }
}
