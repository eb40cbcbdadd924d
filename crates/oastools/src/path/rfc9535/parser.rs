use crate::error::Error;

use super::lexer::{tokenize, Token};

#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub segments: Vec<Segment>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Child(Vec<Selector>),
    Descendant(Vec<Selector>),
    /// `~` extension: selects the key scalar of the mapping entry whose
    /// value is the current node.
    PropertyName,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    Name(String),
    Wildcard,
    Index(i64),
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },
    Filter(FilterExpr),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterExpr {
    Or(Box<FilterExpr>, Box<FilterExpr>),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Comparison {
        left: Comparable,
        op: CmpOp,
        right: Comparable,
    },
    /// Existence test: true when the query selects at least one node.
    Test(Query),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Comparable {
    Literal(Literal),
    /// A singular query: every segment selects at most one node.
    Query(Query),
    Function(FunctionCall),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub root: QueryRoot,
    pub segments: Vec<Segment>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryRoot {
    Current,
    Root,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub name: FunctionName,
    pub args: Vec<Comparable>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionName {
    Length,
    Count,
    Match,
    Search,
    Value,
}

pub fn parse(expr: &str) -> Result<Path, Error> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        expr,
        tokens,
        pos: 0,
    };

    parser.expect(&Token::Root, "path must start with '$'")?;
    let segments = parser.segments()?;

    if parser.pos != parser.tokens.len() {
        return Err(parser.error("trailing tokens after path"));
    }

    Ok(Path { segments })
}

struct Parser<'a> {
    expr: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: &str) -> Error {
        Error::PathParse {
            expr: self.expr.to_string(),
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, reason: &str) -> Result<(), Error> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    /// Parses segments until a token that cannot start one.
    fn segments(&mut self) -> Result<Vec<Segment>, Error> {
        let mut segments = Vec::new();

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Name(name)) => segments.push(Segment::Child(vec![
                            Selector::Name(name),
                        ])),
                        Some(Token::Star) => {
                            segments.push(Segment::Child(vec![Selector::Wildcard]))
                        }
                        Some(Token::Tilde) => segments.push(Segment::PropertyName),
                        _ => return Err(self.error("expected member name, '*' or '~' after '.'")),
                    }
                }
                Some(Token::DotDot) => {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Name(name)) => segments.push(Segment::Descendant(vec![
                            Selector::Name(name),
                        ])),
                        Some(Token::Star) => {
                            segments.push(Segment::Descendant(vec![Selector::Wildcard]))
                        }
                        Some(Token::LBracket) => {
                            segments.push(Segment::Descendant(self.bracketed()?))
                        }
                        _ => {
                            return Err(
                                self.error("expected member name, '*' or '[' after '..'")
                            )
                        }
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    segments.push(Segment::Child(self.bracketed()?));
                }
                Some(Token::Tilde) => {
                    self.pos += 1;
                    segments.push(Segment::PropertyName);
                }
                _ => break,
            }
        }

        Ok(segments)
    }

    /// Parses a comma-separated selector list up to the closing bracket.
    /// The opening bracket is already consumed.
    fn bracketed(&mut self) -> Result<Vec<Selector>, Error> {
        let mut selectors = Vec::new();

        loop {
            selectors.push(self.selector()?);

            if self.eat(&Token::Comma) {
                continue;
            }

            self.expect(&Token::RBracket, "expected ',' or ']' in selector list")?;
            break;
        }

        Ok(selectors)
    }

    fn selector(&mut self) -> Result<Selector, Error> {
        match self.peek().cloned() {
            Some(Token::Str(name)) => {
                self.pos += 1;
                Ok(Selector::Name(name))
            }
            Some(Token::Star) => {
                self.pos += 1;
                Ok(Selector::Wildcard)
            }
            Some(Token::Question) => {
                self.pos += 1;
                Ok(Selector::Filter(self.logical_or()?))
            }
            Some(Token::Int(value)) => {
                self.pos += 1;
                if self.peek() == Some(&Token::Colon) {
                    self.slice(Some(value))
                } else {
                    Ok(Selector::Index(value))
                }
            }
            Some(Token::Colon) => self.slice(None),
            _ => Err(self.error("expected selector")),
        }
    }

    /// Continues a slice whose optional start was already consumed.
    fn slice(&mut self, start: Option<i64>) -> Result<Selector, Error> {
        self.expect(&Token::Colon, "expected ':' in slice")?;

        let end = match self.peek() {
            Some(Token::Int(value)) => {
                let value = *value;
                self.pos += 1;
                Some(value)
            }
            _ => None,
        };

        let step = if self.eat(&Token::Colon) {
            match self.peek() {
                Some(Token::Int(value)) => {
                    let value = *value;
                    self.pos += 1;
                    Some(value)
                }
                _ => None,
            }
        } else {
            None
        };

        Ok(Selector::Slice { start, end, step })
    }

    fn logical_or(&mut self) -> Result<FilterExpr, Error> {
        let mut left = self.logical_and()?;

        while self.eat(&Token::Or) {
            let right = self.logical_and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn logical_and(&mut self) -> Result<FilterExpr, Error> {
        let mut left = self.basic_expr()?;

        while self.eat(&Token::And) {
            let right = self.basic_expr()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn basic_expr(&mut self) -> Result<FilterExpr, Error> {
        if self.eat(&Token::Bang) {
            return Ok(FilterExpr::Not(Box::new(self.basic_expr()?)));
        }

        if self.eat(&Token::LParen) {
            let inner = self.logical_or()?;
            self.expect(&Token::RParen, "expected ')'")?;
            return Ok(inner);
        }

        let left = self.comparable()?;

        let op = match self.peek() {
            Some(Token::Eq) => Some(CmpOp::Eq),
            Some(Token::Ne) => Some(CmpOp::Ne),
            Some(Token::Lt) => Some(CmpOp::Lt),
            Some(Token::Le) => Some(CmpOp::Le),
            Some(Token::Gt) => Some(CmpOp::Gt),
            Some(Token::Ge) => Some(CmpOp::Ge),
            _ => None,
        };

        match op {
            Some(op) => {
                self.pos += 1;
                let right = self.comparable()?;
                Ok(FilterExpr::Comparison { left, op, right })
            }
            None => match left {
                Comparable::Query(query) => Ok(FilterExpr::Test(query)),
                Comparable::Function(call)
                    if matches!(call.name, FunctionName::Match | FunctionName::Search) =>
                {
                    Ok(FilterExpr::Comparison {
                        left: Comparable::Function(call),
                        op: CmpOp::Eq,
                        right: Comparable::Literal(Literal::Bool(true)),
                    })
                }
                _ => Err(self.error("literal cannot stand alone in a filter")),
            },
        }
    }

    fn comparable(&mut self) -> Result<Comparable, Error> {
        match self.peek().cloned() {
            Some(Token::Str(value)) => {
                self.pos += 1;
                Ok(Comparable::Literal(Literal::Str(value)))
            }
            Some(Token::Int(value)) => {
                self.pos += 1;
                Ok(Comparable::Literal(Literal::Int(value)))
            }
            Some(Token::Float(value)) => {
                self.pos += 1;
                Ok(Comparable::Literal(Literal::Float(value)))
            }
            Some(Token::Name(name)) => match name.as_str() {
                "true" => {
                    self.pos += 1;
                    Ok(Comparable::Literal(Literal::Bool(true)))
                }
                "false" => {
                    self.pos += 1;
                    Ok(Comparable::Literal(Literal::Bool(false)))
                }
                "null" => {
                    self.pos += 1;
                    Ok(Comparable::Literal(Literal::Null))
                }
                "length" | "count" | "match" | "search" | "value" => self.function(&name),
                _ => Err(self.error(&format!("unknown function '{}'", name))),
            },
            Some(Token::Current) => {
                self.pos += 1;
                Ok(Comparable::Query(Query {
                    root: QueryRoot::Current,
                    segments: self.segments()?,
                }))
            }
            Some(Token::Root) => {
                self.pos += 1;
                Ok(Comparable::Query(Query {
                    root: QueryRoot::Root,
                    segments: self.segments()?,
                }))
            }
            _ => Err(self.error("expected literal, query or function call")),
        }
    }

    fn function(&mut self, name: &str) -> Result<Comparable, Error> {
        let name = match name {
            "length" => FunctionName::Length,
            "count" => FunctionName::Count,
            "match" => FunctionName::Match,
            "search" => FunctionName::Search,
            "value" => FunctionName::Value,
            _ => unreachable!(),
        };

        self.pos += 1;
        self.expect(&Token::LParen, "expected '(' after function name")?;

        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.comparable()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "expected ')' after function arguments")?;

        let arity = match name {
            FunctionName::Length | FunctionName::Count | FunctionName::Value => 1,
            FunctionName::Match | FunctionName::Search => 2,
        };
        if args.len() != arity {
            return Err(self.error(&format!(
                "function takes {} argument(s), got {}",
                arity,
                args.len()
            )));
        }

        Ok(Comparable::Function(FunctionCall { name, args }))
    }
}
