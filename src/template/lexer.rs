//! Template scanning and expression tokenizing.
//!
//! Scanning works line by line: `##` lines are dropped, `%` lines become
//! statements, everything else is text with `${...}` interpolations cut out.

use super::TemplateError;

/// A piece of template source after line scanning
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr { src: String, line: usize },
    Stmt { src: String, line: usize },
}

/// Split template source into text, interpolation and statement segments
pub fn scan(name: &str, source: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut text = String::new();

    for (idx, raw_line) in source.split_inclusive('\n').enumerate() {
        let line = idx + 1;
        let trimmed = raw_line.trim_start();

        if trimmed.starts_with("##") {
            continue;
        }

        if let Some(stmt) = trimmed.strip_prefix('%') {
            flush_text(&mut text, &mut segments);
            segments.push(Segment::Stmt {
                src: stmt.trim().to_string(),
                line,
            });
            continue;
        }

        scan_text(name, raw_line, line, &mut text, &mut segments)?;
    }

    flush_text(&mut text, &mut segments);
    Ok(segments)
}

fn flush_text(text: &mut String, segments: &mut Vec<Segment>) {
    if !text.is_empty() {
        segments.push(Segment::Text(std::mem::take(text)));
    }
}

fn scan_text(
    name: &str,
    line_src: &str,
    line: usize,
    text: &mut String,
    segments: &mut Vec<Segment>,
) -> Result<(), TemplateError> {
    let mut rest = line_src;

    while let Some(pos) = rest.find('$') {
        text.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("$${") {
            text.push_str("${");
            rest = after;
        } else if let Some(after) = tail.strip_prefix("${") {
            let end = find_closing_brace(after).ok_or_else(|| TemplateError::Syntax {
                template: name.to_string(),
                line,
                message: "unterminated `${` interpolation".to_string(),
            })?;
            flush_text(text, segments);
            segments.push(Segment::Expr {
                src: after[..end].trim().to_string(),
                line,
            });
            rest = &after[end + 1..];
        } else {
            text.push('$');
            rest = &tail[1..];
        }
    }

    text.push_str(rest);
    Ok(())
}

/// Byte offset of the `}` closing an interpolation, skipping quoted strings
fn find_closing_brace(src: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in src.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '}' => return Some(i),
                '\n' => return None,
                _ => {}
            },
        }
    }

    None
}

/// Expression tokens
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Str(String),
    Dot,
    Comma,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Plus,
    Star,
    EqEq,
    NotEq,
    Eof,
}

/// Tokenizer for a single expression or statement
pub struct Lexer<'a> {
    name: &'a str,
    line: usize,
    input: Vec<char>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(name: &'a str, line: usize, src: &str) -> Self {
        Self {
            name,
            line,
            input: src.chars().collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, message: String) -> TemplateError {
        TemplateError::Syntax {
            template: self.name.to_string(),
            line: self.line,
            message,
        }
    }

    /// Tokenize the whole input, ending with `Token::Eof`
    pub fn tokenize(mut self) -> Result<Vec<Token>, TemplateError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, TemplateError> {
        while matches!(self.current(), Some(ch) if ch.is_whitespace()) {
            self.advance();
        }

        let ch = match self.current() {
            None => return Ok(Token::Eof),
            Some(ch) => ch,
        };

        let two = |lexer: &mut Self, token: Token| -> Result<Token, TemplateError> {
            lexer.advance();
            lexer.advance();
            Ok(token)
        };
        let one = |lexer: &mut Self, token: Token| -> Result<Token, TemplateError> {
            lexer.advance();
            Ok(token)
        };

        match (ch, self.peek()) {
            ('=', Some('=')) => two(self, Token::EqEq),
            ('!', Some('=')) => two(self, Token::NotEq),
            ('.', _) => one(self, Token::Dot),
            (',', _) => one(self, Token::Comma),
            ('(', _) => one(self, Token::LeftParen),
            (')', _) => one(self, Token::RightParen),
            ('[', _) => one(self, Token::LeftBracket),
            (']', _) => one(self, Token::RightBracket),
            ('+', _) => one(self, Token::Plus),
            ('*', _) => one(self, Token::Star),
            ('"', _) | ('\'', _) => self.read_string(ch),
            (c, _) if c.is_ascii_digit() => self.read_int(),
            (c, _) if c.is_alphabetic() || c == '_' => Ok(self.read_ident()),
            (c, _) => Err(self.error(format!("unexpected character '{}'", c))),
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Token, TemplateError> {
        let mut result = String::new();
        self.advance();

        while let Some(ch) = self.current() {
            if ch == quote {
                self.advance();
                return Ok(Token::Str(result));
            }
            if ch == '\\' {
                self.advance();
                match self.current() {
                    Some('n') => result.push('\n'),
                    Some('t') => result.push('\t'),
                    Some(c) => result.push(c),
                    None => break,
                }
                self.advance();
            } else {
                result.push(ch);
                self.advance();
            }
        }

        Err(self.error("unterminated string literal".to_string()))
    }

    fn read_int(&mut self) -> Result<Token, TemplateError> {
        let mut digits = String::new();
        while let Some(ch) = self.current() {
            if !ch.is_ascii_digit() {
                break;
            }
            digits.push(ch);
            self.advance();
        }
        digits
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|_| self.error(format!("integer literal {} is out of range", digits)))
    }

    fn read_ident(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(ch) = self.current() {
            if !(ch.is_alphanumeric() || ch == '_') {
                break;
            }
            ident.push(ch);
            self.advance();
        }
        Token::Ident(ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_segments() {
        let src = "## comment\nhost: ${DOMAIN}\n% if x:\n  port: $${PORT}\n  ## indented comment\n% endif\n";
        let segments = scan("t", src).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Text("host: ".to_string()),
                Segment::Expr {
                    src: "DOMAIN".to_string(),
                    line: 2
                },
                Segment::Text("\n".to_string()),
                Segment::Stmt {
                    src: "if x:".to_string(),
                    line: 3
                },
                Segment::Text("  port: ${PORT}\n".to_string()),
                Segment::Stmt {
                    src: "endif".to_string(),
                    line: 6
                },
            ]
        );
    }

    #[test]
    fn test_scan_brace_inside_string() {
        let segments = scan("t", "${'}' + X} $5").unwrap();
        assert_eq!(
            segments[0],
            Segment::Expr {
                src: "'}' + X".to_string(),
                line: 1
            }
        );
        assert_eq!(segments[1], Segment::Text(" $5".to_string()));
    }

    #[test]
    fn test_scan_unterminated_interpolation() {
        let err = scan("peer.yaml", "a\nb ${DOMAIN\n").unwrap_err();
        match err {
            TemplateError::Syntax { template, line, .. } => {
                assert_eq!(template, "peer.yaml");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_tokenize() {
        let tokens = Lexer::new("t", 1, "ORG.n * 1000 + 'a\\'b' != X[1]")
            .tokenize()
            .unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("ORG".to_string()),
                Token::Dot,
                Token::Ident("n".to_string()),
                Token::Star,
                Token::Int(1000),
                Token::Plus,
                Token::Str("a'b".to_string()),
                Token::NotEq,
                Token::Ident("X".to_string()),
                Token::LeftBracket,
                Token::Int(1),
                Token::RightBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_rejects_unknown_character() {
        assert!(Lexer::new("t", 1, "a ? b").tokenize().is_err());
        assert!(Lexer::new("t", 1, "a - b").tokenize().is_err());
    }
}
