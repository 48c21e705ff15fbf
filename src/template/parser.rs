//! Template syntax tree and the parsers that build it.

use super::lexer::{scan, Lexer, Segment, Token};
use super::TemplateError;
use serde_json::Value;

/// Template body node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Interpolate { expr: Expr, line: usize },
    If {
        cond: Expr,
        line: usize,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    For { var: String, iter: Expr, body: Vec<Node>, line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Mul,
    Eq,
    NotEq,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// Parse template source into a node tree
pub fn parse_template(name: &str, source: &str) -> Result<Vec<Node>, TemplateError> {
    let segments = scan(name, source)?;
    let mut parser = BlockParser {
        name,
        segments,
        position: 0,
    };
    let (nodes, end) = parser.parse_block(&[])?;
    if let Some((keyword, line)) = end {
        return Err(syntax(name, line, format!("unexpected `{}`", keyword)));
    }
    Ok(nodes)
}

fn syntax(name: &str, line: usize, message: String) -> TemplateError {
    TemplateError::Syntax {
        template: name.to_string(),
        line,
        message,
    }
}

/// Split a statement into its keyword and the remainder, without a trailing colon
fn split_statement(src: &str) -> (&str, &str) {
    let src = src.strip_suffix(':').unwrap_or(src).trim_end();
    match src.find(char::is_whitespace) {
        Some(pos) => (&src[..pos], src[pos..].trim()),
        None => (src, ""),
    }
}

struct BlockParser<'a> {
    name: &'a str,
    segments: Vec<Segment>,
    position: usize,
}

/// Block terminator keyword with its line, or `None` at end of input
type BlockEnd = Option<(String, usize)>;

impl<'a> BlockParser<'a> {
    /// Parse nodes until one of `terminators` (or end of input) is reached
    fn parse_block(&mut self, terminators: &[&str]) -> Result<(Vec<Node>, BlockEnd), TemplateError> {
        let mut nodes = Vec::new();

        while self.position < self.segments.len() {
            let segment = self.segments[self.position].clone();
            self.position += 1;

            match segment {
                Segment::Text(text) => nodes.push(Node::Text(text)),
                Segment::Expr { src, line } => {
                    let expr = parse_expression(self.name, line, &src)?;
                    nodes.push(Node::Interpolate { expr, line });
                }
                Segment::Stmt { src, line } => {
                    let (keyword, rest) = split_statement(&src);
                    match keyword {
                        "if" => nodes.push(self.parse_if(rest, line)?),
                        "for" => nodes.push(self.parse_for(rest, line)?),
                        kw if terminators.contains(&kw) => {
                            return Ok((nodes, Some((kw.to_string(), line))));
                        }
                        "else" | "endif" | "endfor" => {
                            return Err(syntax(self.name, line, format!("unexpected `{}`", keyword)));
                        }
                        other => {
                            return Err(syntax(self.name, line, format!("unknown statement `{}`", other)));
                        }
                    }
                }
            }
        }

        Ok((nodes, None))
    }

    fn parse_if(&mut self, cond_src: &str, line: usize) -> Result<Node, TemplateError> {
        let cond = parse_expression(self.name, line, cond_src)?;
        let name = self.name;
        let unclosed = || syntax(name, line, "`if` block is never closed with `endif`".to_string());

        let (then, end) = self.parse_block(&["else", "endif"])?;
        let otherwise = match end {
            None => return Err(unclosed()),
            Some((keyword, _)) if keyword == "else" => match self.parse_block(&["endif"])? {
                (otherwise, Some(_)) => otherwise,
                (_, None) => return Err(unclosed()),
            },
            Some(_) => Vec::new(),
        };

        Ok(Node::If {
            cond,
            line,
            then,
            otherwise,
        })
    }

    fn parse_for(&mut self, header: &str, line: usize) -> Result<Node, TemplateError> {
        let (var, iter_src) = match header.split_once(" in ") {
            Some((var, iter)) => (var.trim(), iter.trim()),
            None => {
                return Err(syntax(self.name, line, "expected `for <name> in <expr>`".to_string()));
            }
        };
        if var.is_empty() || !var.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(syntax(self.name, line, format!("invalid loop variable `{}`", var)));
        }
        let iter = parse_expression(self.name, line, iter_src)?;

        let (body, end) = self.parse_block(&["endfor"])?;
        if end.is_none() {
            return Err(syntax(self.name, line, "`for` block is never closed with `endfor`".to_string()));
        }

        Ok(Node::For {
            var: var.to_string(),
            iter,
            body,
            line,
        })
    }
}

/// Parse a single expression
pub fn parse_expression(name: &str, line: usize, src: &str) -> Result<Expr, TemplateError> {
    if src.trim().is_empty() {
        return Err(syntax(name, line, "empty expression".to_string()));
    }
    let tokens = Lexer::new(name, line, src).tokenize()?;
    let mut parser = ExprParser {
        name,
        line,
        tokens,
        position: 0,
    };
    let expr = parser.parse_not()?;
    match parser.current() {
        Token::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected token {:?}", other))),
    }
}

/// Recursive-descent expression parser, lowest precedence first
struct ExprParser<'a> {
    name: &'a str,
    line: usize,
    tokens: Vec<Token>,
    position: usize,
}

impl<'a> ExprParser<'a> {
    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position + 1).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn error(&self, message: String) -> TemplateError {
        syntax(self.name, self.line, message)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.current(), Token::Ident(id) if id == keyword)
    }

    fn expect(&mut self, expected: Token) -> Result<(), TemplateError> {
        if *self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}, found {:?}", expected, self.current())))
        }
    }

    fn parse_not(&mut self) -> Result<Expr, TemplateError> {
        if self.is_keyword("not") {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, TemplateError> {
        let left = self.parse_additive()?;

        let op = match self.current().clone() {
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::NotEq,
            Token::Ident(id) if id == "in" => BinaryOp::In,
            Token::Ident(id) if id == "not" && matches!(self.peek(), Token::Ident(next) if next == "in") => {
                self.advance();
                BinaryOp::NotIn
            }
            _ => return Ok(left),
        };
        self.advance();

        let right = self.parse_additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_additive(&mut self) -> Result<Expr, TemplateError> {
        let mut left = self.parse_multiplicative()?;
        while *self.current() == Token::Plus {
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(BinaryOp::Add, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, TemplateError> {
        let mut left = self.parse_postfix()?;
        while *self.current() == Token::Star {
            self.advance();
            let right = self.parse_postfix()?;
            left = Expr::Binary(BinaryOp::Mul, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_postfix(&mut self) -> Result<Expr, TemplateError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current().clone() {
                Token::Dot => {
                    self.advance();
                    match self.current().clone() {
                        Token::Ident(attr) => {
                            self.advance();
                            expr = Expr::Attr(Box::new(expr), attr);
                        }
                        other => return Err(self.error(format!("expected attribute name, found {:?}", other))),
                    }
                }
                Token::LeftBracket => {
                    self.advance();
                    let index = self.parse_not()?;
                    self.expect(Token::RightBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, TemplateError> {
        match self.current().clone() {
            Token::Int(i) => {
                self.advance();
                Ok(Expr::Literal(Value::from(i)))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_not()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::Ident(id) => {
                self.advance();
                match id.as_str() {
                    "true" | "True" => return Ok(Expr::Literal(Value::Bool(true))),
                    "false" | "False" => return Ok(Expr::Literal(Value::Bool(false))),
                    "none" | "None" => return Ok(Expr::Literal(Value::Null)),
                    "not" | "in" => {
                        return Err(self.error(format!("unexpected keyword `{}`", id)));
                    }
                    _ => {}
                }
                if *self.current() == Token::LeftParen {
                    self.advance();
                    let args = self.parse_arguments()?;
                    return Ok(Expr::Call(id, args));
                }
                Ok(Expr::Var(id))
            }
            other => Err(self.error(format!("unexpected token {:?}", other))),
        }
    }

    /// Comma-separated call arguments up to `)`
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, TemplateError> {
        let mut items = Vec::new();
        while *self.current() != Token::RightParen {
            items.push(self.parse_not()?);
            if *self.current() == Token::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Token::RightParen)?;
        Ok(items)
    }
}
