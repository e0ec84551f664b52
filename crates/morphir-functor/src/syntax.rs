//! Signature syntax
//!
//! A small ML-style surface for contracts:
//!
//! ```text
//! type t
//! type endpoint = int
//! type shape = Circle of int | Rect of int * int
//! val compare : t -> t -> int
//! include Comparable with type t := t
//! ```
//!
//! Tokens come from `logos`; the grammar is LL(1) and parsed by hand.

use crate::contract::{Constraint, ConstructorSpecification, Contract, Member};
use crate::error::{FunctorError, Result};
use crate::naming::Name;
use crate::types::{Type, BOOL, INT, LIST, STRING};
use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token {
    #[regex(r"\(\*([^*]|\*+[^*)])*\*+\)", allow_greedy = true)]
    Comment,

    #[token("type")]
    Type,
    #[token("val")]
    Val,
    #[token("include")]
    Include,
    #[token("with")]
    With,
    #[token("and")]
    And,
    #[token("of")]
    Of,
    #[token("sig")]
    Sig,
    #[token("end")]
    End,
    #[token("unit")]
    Unit,

    #[token("->")]
    Arrow,
    #[token(":=")]
    ColonEq,
    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
    #[token("|")]
    Bar,
    #[token("*")]
    Star,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,

    #[regex(r"[a-z_][a-zA-Z0-9_']*", priority = 2, callback = |lex| lex.slice().to_string())]
    Lower(String),
    #[regex(r"[A-Z][a-zA-Z0-9_']*", |lex| lex.slice().to_string())]
    Upper(String),
}

impl Token {
    fn describe(&self) -> String {
        let text = match self {
            Token::Lower(s) | Token::Upper(s) => return format!("`{s}`"),
            Token::Comment => "(* *)",
            Token::Type => "type",
            Token::Val => "val",
            Token::Include => "include",
            Token::With => "with",
            Token::And => "and",
            Token::Of => "of",
            Token::Sig => "sig",
            Token::End => "end",
            Token::Unit => "unit",
            Token::Arrow => "->",
            Token::ColonEq => ":=",
            Token::Colon => ":",
            Token::Eq => "=",
            Token::Bar => "|",
            Token::Star => "*",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Dot => ".",
            Token::Comma => ",",
        };
        format!("`{text}`")
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, Range<usize>)>> {
    let mut tokens = Vec::new();
    for (token, span) in Token::lexer(source).spanned() {
        match token {
            Ok(Token::Comment) => {}
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(FunctorError::Syntax {
                    message: format!("unexpected character `{}`", &source[span.clone()]),
                    offset: span.start,
                });
            }
        }
    }
    Ok(tokens)
}

/// Looks up contracts named by `include`.
pub type ContractResolver<'a> = dyn Fn(&Name) -> Option<Contract> + 'a;

enum Part {
    Own(Vec<(Name, Member)>),
    Included(Contract),
}

struct Parser<'a> {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    len: usize,
    resolver: &'a ContractResolver<'a>,
}

impl<'a> Parser<'a> {
    fn new(source: &str, resolver: &'a ContractResolver<'a>) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            len: source.len(),
            resolver,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.len)
    }

    fn error(&self, expected: &str) -> FunctorError {
        let found = self
            .peek()
            .map(Token::describe)
            .unwrap_or_else(|| "end of input".to_string());
        FunctorError::Syntax {
            message: format!("expected {expected}, found {found}"),
            offset: self.offset(),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(what))
        }
    }

    fn lower(&mut self, what: &str) -> Result<Name> {
        match self.peek() {
            Some(Token::Lower(s)) => {
                let name = Name::new(s);
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error(what)),
        }
    }

    fn upper(&mut self, what: &str) -> Result<Name> {
        match self.peek() {
            Some(Token::Upper(s)) => {
                let name = Name::new(s);
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error(what)),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn finish(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }

    fn signature(&mut self) -> Result<Vec<Part>> {
        let wrapped = self.eat(&Token::Sig);
        let mut parts = Vec::new();
        let mut own = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Type) => {
                    self.pos += 1;
                    own.push(self.type_item()?);
                }
                Some(Token::Val) => {
                    self.pos += 1;
                    let name = self.lower("a value name")?;
                    self.expect(Token::Colon, "`:`")?;
                    own.push((name, Member::Value(self.ty()?)));
                }
                Some(Token::Include) => {
                    self.pos += 1;
                    if !own.is_empty() {
                        parts.push(Part::Own(std::mem::take(&mut own)));
                    }
                    parts.push(Part::Included(self.include()?));
                }
                Some(Token::End) if wrapped => {
                    self.pos += 1;
                    break;
                }
                None if !wrapped => break,
                _ => return Err(self.error("`type`, `val` or `include`")),
            }
        }
        if !own.is_empty() {
            parts.push(Part::Own(own));
        }
        self.finish()?;
        Ok(parts)
    }

    fn type_item(&mut self) -> Result<(Name, Member)> {
        let name = self.lower("a type name")?;
        if !self.eat(&Token::Eq) {
            return Ok((name, Member::abstract_type()));
        }
        let starts_variant = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Bar), _) => true,
            (Some(Token::Upper(_)), next) => next != Some(&Token::Dot),
            _ => false,
        };
        if starts_variant {
            Ok((name, Member::variant(self.variant()?)))
        } else {
            Ok((name, Member::manifest(self.ty()?)))
        }
    }

    fn variant(&mut self) -> Result<Vec<ConstructorSpecification>> {
        self.eat(&Token::Bar);
        let mut ctors = vec![self.constructor()?];
        while self.eat(&Token::Bar) {
            ctors.push(self.constructor()?);
        }
        Ok(ctors)
    }

    fn constructor(&mut self) -> Result<ConstructorSpecification> {
        let name = self.upper("a constructor name")?;
        let mut args = Vec::new();
        if self.eat(&Token::Of) {
            args.push(self.atom()?);
            while self.eat(&Token::Star) {
                args.push(self.atom()?);
            }
        }
        Ok(ConstructorSpecification { name, args })
    }

    fn include(&mut self) -> Result<Contract> {
        let offset = self.offset();
        let name = self.upper("a contract name")?;
        let base = (self.resolver)(&name).ok_or(FunctorError::Syntax {
            message: format!("unknown contract `{name}`"),
            offset,
        })?;
        let constraints = if self.peek() == Some(&Token::With) {
            self.constraints()?
        } else {
            Vec::new()
        };
        base.constrain(&constraints)
    }

    fn constraints(&mut self) -> Result<Vec<Constraint>> {
        self.expect(Token::With, "`with`")?;
        let mut constraints = vec![self.constraint()?];
        while self.eat(&Token::And) {
            constraints.push(self.constraint()?);
        }
        Ok(constraints)
    }

    fn constraint(&mut self) -> Result<Constraint> {
        self.expect(Token::Type, "`type`")?;
        let member = self.lower("a type name")?;
        if self.eat(&Token::Eq) {
            Ok(Constraint::Sharing {
                member,
                ty: self.ty()?,
            })
        } else if self.eat(&Token::ColonEq) {
            Ok(Constraint::Substitution {
                member,
                ty: self.ty()?,
            })
        } else {
            Err(self.error("`=` or `:=`"))
        }
    }

    fn ty(&mut self) -> Result<Type> {
        let arg = self.product()?;
        if self.eat(&Token::Arrow) {
            Ok(Type::function(arg, self.ty()?))
        } else {
            Ok(arg)
        }
    }

    fn product(&mut self) -> Result<Type> {
        let mut elements = vec![self.atom()?];
        while self.eat(&Token::Star) {
            elements.push(self.atom()?);
        }
        if elements.len() == 1 {
            Ok(elements.remove(0))
        } else {
            Ok(Type::Tuple(elements))
        }
    }

    fn atom(&mut self) -> Result<Type> {
        match self.peek().cloned() {
            Some(Token::Unit) => {
                self.pos += 1;
                Ok(Type::Unit)
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.ty()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Token::Upper(module)) => {
                self.pos += 1;
                self.expect(Token::Dot, "`.`")?;
                let member = self.lower("a type name")?;
                Ok(Type::projection(module.as_str(), member))
            }
            Some(Token::Lower(name)) => {
                let offset = self.offset();
                self.pos += 1;
                match name.as_str() {
                    LIST => {
                        self.expect(Token::LParen, "`(` after `list`")?;
                        let element = self.ty()?;
                        self.expect(Token::RParen, "`)`")?;
                        Ok(Type::list(element))
                    }
                    INT | BOOL | STRING => Ok(Type::named(name.as_str(), vec![])),
                    _ if self.peek() == Some(&Token::LParen) => Err(FunctorError::Syntax {
                        message: format!("`{name}` takes no type arguments"),
                        offset,
                    }),
                    _ => Ok(Type::local(name.as_str())),
                }
            }
            _ => Err(self.error("a type")),
        }
    }
}

/// Parse a type expression.
pub fn parse_type(source: &str) -> Result<Type> {
    let no_includes = |_: &Name| -> Option<Contract> { None };
    let mut parser = Parser::new(source, &no_includes)?;
    let ty = parser.ty()?;
    parser.finish()?;
    Ok(ty)
}

/// Parse `with type a = T and type b := U` (the leading `with` is optional).
pub fn parse_constraints(source: &str) -> Result<Vec<Constraint>> {
    let no_includes = |_: &Name| -> Option<Contract> { None };
    let mut parser = Parser::new(source, &no_includes)?;
    let mut constraints = vec![];
    parser.eat(&Token::With);
    constraints.push(parser.constraint()?);
    while parser.eat(&Token::And) {
        constraints.push(parser.constraint()?);
    }
    parser.finish()?;
    Ok(constraints)
}

/// Parse a signature, resolving `include`d contracts through `resolver`.
pub fn parse_signature(name: Name, source: &str, resolver: &ContractResolver<'_>) -> Result<Contract> {
    let mut parser = Parser::new(source, resolver)?;
    let mut parts = parser.signature()?;
    if parts.len() <= 1 && parts.iter().all(|part| matches!(part, Part::Own(_))) {
        let members = match parts.pop() {
            Some(Part::Own(members)) => members,
            _ => Vec::new(),
        };
        return Contract::new(name, members);
    }
    let contracts = parts
        .into_iter()
        .map(|part| match part {
            Part::Own(members) => Contract::fragment(name, members),
            Part::Included(contract) => Ok(contract),
        })
        .collect::<Result<Vec<_>>>()?;
    Contract::merge(name, &contracts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("int", "int")]
    #[case("t -> t -> int", "t -> t -> int")]
    #[case("(int -> int) -> int", "(int -> int) -> int")]
    #[case("endpoint * endpoint -> t", "endpoint * endpoint -> t")]
    #[case("list(Endpoint.t)", "list(Endpoint.t)")]
    #[case("unit -> (int)", "unit -> int")]
    #[case("(* the answer *) int", "int")]
    fn test_parse_type(#[case] source: &str, #[case] printed: &str) {
        assert_eq!(parse_type(source).unwrap().to_string(), printed);
    }

    #[rstest]
    #[case("int ->", "expected a type, found end of input")]
    #[case("foo(int)", "`foo` takes no type arguments")]
    #[case("int $", "unexpected character `$`")]
    fn test_parse_type_errors(#[case] source: &str, #[case] message: &str) {
        match parse_type(source) {
            Err(FunctorError::Syntax { message: m, .. }) => assert_eq!(m, message),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_signature_with_variant() {
        let contract = parse_signature(
            Name::new("Intervals"),
            "sig
               type endpoint = int
               type t = Interval of endpoint * endpoint | Empty
               val create : endpoint -> endpoint -> t
             end",
            &|_| None,
        )
        .unwrap();
        assert_eq!(contract.types().len(), 2);
        assert_eq!(
            contract.to_string(),
            "sig\n  type endpoint = int\n  type t = Interval of endpoint * endpoint | Empty\n  val create : endpoint -> endpoint -> t\nend"
        );
    }

    #[test]
    fn test_parse_constraints() {
        let constraints = parse_constraints("with type t := int and type u = Endpoint.t").unwrap();
        assert_eq!(
            constraints,
            vec![
                Constraint::substitution("t", Type::int()),
                Constraint::sharing("u", Type::projection("Endpoint", "t")),
            ]
        );
    }

    #[test]
    fn test_include_needs_a_known_contract() {
        let err = parse_signature(Name::new("X"), "include Missing", &|_| None).unwrap_err();
        assert!(matches!(err, FunctorError::Syntax { offset: 8, .. }));
    }
}
