//! Reader for the textual type expressions used in schema definitions.
//!
//! Grammar:
//!
//! ```text
//! type    := base ("[" "]")*
//! base    := "?" (("extends" | "super") type)?
//!          | name ("<" type ("," type)* ">")?
//! name    := ident ("." ident)*
//! ```
//!
//! Names resolve to primitives first, then to the schema's declared type
//! variables, then to plain references. Nesting of generic arguments and
//! wildcard bounds is limited to [`MAX_DEPTH`] levels.

use thiserror::Error;

use crate::types::{PrimitiveKind, Type, TypeVars, WildcardMode};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct TypeExprError {
    pub offset: usize,
    pub message: String,
}

pub const MAX_DEPTH: usize = 128;

pub fn parse(text: &str, vars: &TypeVars) -> Result<Type, TypeExprError> {
    let mut p = Parser { src: text, pos: 0, depth: 0, vars };
    let ty = p.ty()?;
    p.skip_ws();
    if p.pos != p.src.len() {
        return Err(p.error("unexpected trailing input"));
    }
    Ok(ty)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    vars: &'a TypeVars,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> TypeExprError {
        TypeExprError { offset: self.pos, message: message.into() }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), TypeExprError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{c}`")))
        }
    }

    fn ident(&mut self) -> Result<&'a str, TypeExprError> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(i, c)| {
                let ok = c.is_alphanumeric() || *c == '_' || *c == '$';
                !(ok && !(*i == 0 && c.is_ascii_digit()))
            })
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    /// Dotted name, e.g. `java.util.List`.
    fn name(&mut self) -> Result<String, TypeExprError> {
        let mut out = self.ident()?.to_string();
        while self.rest().starts_with('.') {
            self.pos += 1;
            out.push('.');
            out.push_str(self.ident()?);
        }
        Ok(out)
    }

    fn ty(&mut self) -> Result<Type, TypeExprError> {
        if self.depth == MAX_DEPTH {
            return Err(self.error(format!("type nested deeper than {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        let ty = self.array_of_base();
        self.depth -= 1;
        ty
    }

    fn array_of_base(&mut self) -> Result<Type, TypeExprError> {
        let mut ty = self.base()?;
        while self.eat('[') {
            self.expect(']')?;
            ty = Type::array(ty);
        }
        Ok(ty)
    }

    fn base(&mut self) -> Result<Type, TypeExprError> {
        if self.eat('?') {
            return match self.peek() {
                Some(c) if c.is_alphabetic() => {
                    let start = self.pos;
                    let mode = match self.ident()? {
                        "extends" => WildcardMode::Extends,
                        "super" => WildcardMode::Super,
                        _ => {
                            self.pos = start;
                            return Err(self.error("expected `extends` or `super`"));
                        }
                    };
                    Ok(Type::wildcard(mode, self.ty()?))
                }
                _ => Ok(Type::wildcard(WildcardMode::Extends, Type::named("Object"))),
            };
        }

        let start = self.pos;
        let name = self.name()?;
        if let Some(kind) = PrimitiveKind::from_keyword(&name) {
            return Ok(Type::Primitive(kind));
        }
        let var = self.vars.lookup(&name);

        let mut args = Vec::new();
        if self.eat('<') {
            if var.is_some() {
                self.pos = start;
                return Err(self.error(format!("type variable `{name}` cannot take arguments")));
            }
            loop {
                args.push(self.ty()?);
                if !self.eat(',') {
                    break;
                }
            }
            self.expect('>')?;
        }

        Ok(match var {
            Some(var) => Type::Variable(var),
            None => Type::reference(name, args),
        })
    }
}
