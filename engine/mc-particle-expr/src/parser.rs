//! Recursive-descent parser producing a typed evaluation plan
//!
//! Precedence follows Java, lowest first: `?:`, `||`, `&&`, `== !=`,
//! `< <= > >=`, `+ -`, `* / %`, unary `- !` and casts, postfix accessors.

use crate::builtins::{self, Accessor, Function};
use crate::error::CompileError;
use crate::lexer::{Token, TokenKind, tokenize};
use crate::plan::{ArithOp, CmpOp, Node};
use crate::value::{Scope, ValueKind};

/// Deepest nesting of parentheses, unary operators and ternaries
pub(crate) const MAX_NESTING: usize = 128;

/// Most tokens one formula may contain, end marker included
pub(crate) const MAX_TOKENS: usize = 1024;

/// A plan node together with its static kind
struct Typed {
    node: Node,
    kind: ValueKind,
    /// Offset used when reporting a type error on this operand
    offset: usize,
}

pub(crate) struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    scope: &'s Scope,
    uses_random: bool,
    depth: usize,
}

/// Output of a successful parse
pub(crate) struct Parsed {
    pub root: Node,
    pub kind: ValueKind,
    pub uses_random: bool,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str, scope: &'s Scope) -> Result<Self, CompileError> {
        let tokens = tokenize(source)?;
        if let Some(token) = tokens.get(MAX_TOKENS) {
            return Err(CompileError::TooLong {
                token: token.text(source).to_string(),
                offset: token.offset,
                limit: MAX_TOKENS,
            });
        }
        Ok(Self {
            source,
            tokens,
            pos: 0,
            scope,
            uses_random: false,
            depth: 0,
        })
    }

    pub fn parse(mut self) -> Result<Parsed, CompileError> {
        let expr = self.parse_ternary()?;
        if self.peek().kind != TokenKind::Eof {
            return Err(self.unexpected("operator or end of input"));
        }
        if !expr.kind.is_scalar() {
            return Err(CompileError::TypeMismatch {
                token: self.source.trim().to_string(),
                offset: expr.offset,
                expected: "a number or boolean result",
                found: expr.kind,
            });
        }
        Ok(Parsed {
            root: expr.node,
            kind: expr.kind,
            uses_random: self.uses_random,
        })
    }

    // ---------------------------------------------------------------------
    // Token helpers
    // ---------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        &self.tokens[(self.pos + ahead).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<Token, CompileError> {
        if &self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> CompileError {
        let token = self.peek();
        CompileError::UnexpectedToken {
            token: token.text(self.source).to_string(),
            offset: token.offset,
            expected,
        }
    }

    /// Run `rule` one nesting level deeper, failing past [`MAX_NESTING`]
    fn nested(
        &mut self,
        rule: fn(&mut Self) -> Result<Typed, CompileError>,
    ) -> Result<Typed, CompileError> {
        if self.depth >= MAX_NESTING {
            let token = self.peek();
            return Err(CompileError::TooDeep {
                token: token.text(self.source).to_string(),
                offset: token.offset,
                limit: MAX_NESTING,
            });
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn type_error(&self, at: &Typed, expected: &'static str) -> CompileError {
        CompileError::TypeMismatch {
            token: self.text_at(at.offset),
            offset: at.offset,
            expected,
            found: at.kind,
        }
    }

    /// Text of the token starting at `offset`, for diagnostics
    fn text_at(&self, offset: usize) -> String {
        self.tokens
            .iter()
            .find(|t| t.offset == offset)
            .map_or_else(String::new, |t| t.text(self.source).to_string())
    }

    // ---------------------------------------------------------------------
    // Grammar
    // ---------------------------------------------------------------------

    fn parse_ternary(&mut self) -> Result<Typed, CompileError> {
        self.nested(Self::ternary)
    }

    fn ternary(&mut self) -> Result<Typed, CompileError> {
        let cond = self.parse_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        if cond.kind != ValueKind::Bool {
            return Err(self.type_error(&cond, "boolean condition"));
        }
        let then = self.parse_ternary()?;
        self.expect(&TokenKind::Colon, "`:`")?;
        let otherwise = self.parse_ternary()?;

        let kind = if then.kind.is_numeric() && otherwise.kind.is_numeric() {
            promote(then.kind, otherwise.kind)
        } else if then.kind == otherwise.kind {
            then.kind
        } else {
            return Err(self.type_error(&otherwise, "branch of the same type"));
        };
        let offset = cond.offset;
        Ok(Typed {
            node: Node::Ternary(
                Box::new(cond.node),
                Box::new(coerce(then, kind)),
                Box::new(coerce(otherwise, kind)),
            ),
            kind,
            offset,
        })
    }

    fn parse_or(&mut self) -> Result<Typed, CompileError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = self.logical(left, right, false)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Typed, CompileError> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = self.logical(left, right, true)?;
        }
        Ok(left)
    }

    fn logical(&self, left: Typed, right: Typed, and: bool) -> Result<Typed, CompileError> {
        for operand in [&left, &right] {
            if operand.kind != ValueKind::Bool {
                return Err(self.type_error(operand, "boolean"));
            }
        }
        let offset = left.offset;
        let (l, r) = (Box::new(left.node), Box::new(right.node));
        Ok(Typed {
            node: if and { Node::And(l, r) } else { Node::Or(l, r) },
            kind: ValueKind::Bool,
            offset,
        })
    }

    fn parse_equality(&mut self) -> Result<Typed, CompileError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => CmpOp::Eq,
                TokenKind::Ne => CmpOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = if left.kind == ValueKind::Bool && right.kind == ValueKind::Bool {
                let offset = left.offset;
                Typed {
                    node: Node::BoolEq(op == CmpOp::Eq, Box::new(left.node), Box::new(right.node)),
                    kind: ValueKind::Bool,
                    offset,
                }
            } else {
                self.comparison(op, left, right)?
            };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Typed, CompileError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Ge => CmpOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.comparison(op, left, right)?;
        }
        Ok(left)
    }

    fn comparison(&self, op: CmpOp, left: Typed, right: Typed) -> Result<Typed, CompileError> {
        for operand in [&left, &right] {
            if !operand.kind.is_numeric() {
                return Err(self.type_error(operand, "number"));
            }
        }
        let kind = promote(left.kind, right.kind);
        let offset = left.offset;
        Ok(Typed {
            node: Node::Compare(op, kind, Box::new(left.node), Box::new(right.node)),
            kind: ValueKind::Bool,
            offset,
        })
    }

    fn parse_additive(&mut self) -> Result<Typed, CompileError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.arithmetic(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Typed, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => ArithOp::Mul,
                TokenKind::Slash => ArithOp::Div,
                TokenKind::Percent => ArithOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.arithmetic(op, left, right)?;
        }
        Ok(left)
    }

    fn arithmetic(&self, op: ArithOp, left: Typed, right: Typed) -> Result<Typed, CompileError> {
        for operand in [&left, &right] {
            if !operand.kind.is_numeric() {
                return Err(self.type_error(operand, "number"));
            }
        }
        let kind = promote(left.kind, right.kind);
        let offset = left.offset;
        Ok(Typed {
            node: Node::Arith(op, kind, Box::new(left.node), Box::new(right.node)),
            kind,
            offset,
        })
    }

    fn parse_unary(&mut self) -> Result<Typed, CompileError> {
        self.nested(Self::unary)
    }

    fn unary(&mut self) -> Result<Typed, CompileError> {
        let offset = self.peek().offset;
        if let Some(target) = self.cast_ahead() {
            // `(` type `)`
            self.pos += 3;
            let operand = self.parse_unary()?;
            if !operand.kind.is_numeric() {
                return Err(self.type_error(&operand, "number"));
            }
            return Ok(Typed {
                node: coerce(operand, target),
                kind: target,
                offset,
            });
        }
        match self.peek().kind {
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                if !operand.kind.is_numeric() {
                    return Err(self.type_error(&operand, "number"));
                }
                let kind = operand.kind;
                Ok(Typed {
                    node: Node::Neg(kind, Box::new(operand.node)),
                    kind,
                    offset,
                })
            }
            TokenKind::Plus => {
                self.advance();
                let operand = self.parse_unary()?;
                if !operand.kind.is_numeric() {
                    return Err(self.type_error(&operand, "number"));
                }
                Ok(operand)
            }
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_unary()?;
                if operand.kind != ValueKind::Bool {
                    return Err(self.type_error(&operand, "boolean"));
                }
                Ok(Typed {
                    node: Node::Not(Box::new(operand.node)),
                    kind: ValueKind::Bool,
                    offset,
                })
            }
            _ => self.parse_postfix(),
        }
    }

    /// Kind named by a primitive cast starting at the current token
    fn cast_ahead(&self) -> Option<ValueKind> {
        if self.peek().kind != TokenKind::LParen || self.peek_at(2).kind != TokenKind::RParen {
            return None;
        }
        match &self.peek_at(1).kind {
            TokenKind::Ident(name) => match name.as_str() {
                "double" | "float" => Some(ValueKind::Double),
                "int" | "long" => Some(ValueKind::Int),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_postfix(&mut self) -> Result<Typed, CompileError> {
        let mut expr = self.parse_primary()?;
        while self.peek().kind == TokenKind::Dot {
            self.advance();
            let name_token = self.advance();
            let TokenKind::Ident(name) = &name_token.kind else {
                return Err(CompileError::UnexpectedToken {
                    token: name_token.text(self.source).to_string(),
                    offset: name_token.offset,
                    expected: "accessor name",
                });
            };
            let call = self.peek().kind == TokenKind::LParen;
            let Some(sig) = builtins::accessor(expr.kind, name, call) else {
                return Err(CompileError::UnknownAccessor {
                    token: name.clone(),
                    offset: name_token.offset,
                    kind: expr.kind,
                });
            };
            let args = if call {
                self.parse_call_args(&name_token, sig.params)?
            } else {
                Vec::new()
            };
            if matches!(sig.accessor, Accessor::Draw(_) | Accessor::EntityRandom(_)) {
                self.uses_random = true;
            }
            expr = Typed {
                node: Node::Access(sig.accessor, Box::new(expr.node), args),
                kind: sig.result,
                offset: name_token.offset,
            };
        }
        Ok(expr)
    }

    /// Parse `( arg, ... )` and coerce each argument to its parameter kind
    fn parse_call_args(
        &mut self,
        name_token: &Token,
        params: &[ValueKind],
    ) -> Result<Vec<Node>, CompileError> {
        let args = self.parse_arg_list()?;
        if args.len() != params.len() {
            return Err(CompileError::Arity {
                token: name_token.text(self.source).to_string(),
                offset: name_token.offset,
                expected: params.len(),
                found: args.len(),
            });
        }
        args.into_iter()
            .zip(params)
            .map(|(arg, param)| {
                if !arg.kind.is_numeric() {
                    return Err(self.type_error(&arg, "number"));
                }
                Ok(coerce(arg, *param))
            })
            .collect()
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Typed>, CompileError> {
        self.expect(&TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.parse_ternary()?);
                if self.eat(&TokenKind::Comma) {
                    continue;
                }
                self.expect(&TokenKind::RParen, "`,` or `)`")?;
                break;
            }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Typed, CompileError> {
        let token = self.advance();
        let offset = token.offset;
        match &token.kind {
            TokenKind::Int(v) => Ok(Typed {
                node: Node::Int(*v),
                kind: ValueKind::Int,
                offset,
            }),
            TokenKind::Double(v) => Ok(Typed {
                node: Node::Double(*v),
                kind: ValueKind::Double,
                offset,
            }),
            TokenKind::Slot(index) => {
                let Some(kind) = self.scope.slot_kind(*index) else {
                    return Err(CompileError::SlotOutOfRange {
                        token: token.text(self.source).to_string(),
                        offset,
                        arity: self.scope.arity(),
                    });
                };
                Ok(Typed {
                    node: Node::Slot(*index),
                    kind,
                    offset,
                })
            }
            TokenKind::LParen => {
                let inner = self.parse_ternary()?;
                self.expect(&TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => self.parse_identifier(&token, name),
            _ => Err(CompileError::UnexpectedToken {
                token: token.text(self.source).to_string(),
                offset,
                expected: "expression",
            }),
        }
    }

    fn parse_identifier(&mut self, token: &Token, name: &str) -> Result<Typed, CompileError> {
        let offset = token.offset;
        match name {
            "true" | "false" => {
                return Ok(Typed {
                    node: Node::Bool(name == "true"),
                    kind: ValueKind::Bool,
                    offset,
                });
            }
            // `this.Math.random()` is the same primitive as `Math.random()`
            "this" if self.namespace_ahead() => {
                self.advance();
                let ns = self.advance();
                return self.parse_namespaced(&ns);
            }
            "Math" | "Mth" => return self.parse_namespaced(token),
            _ => {}
        }

        if self.peek().kind == TokenKind::LParen {
            return self.parse_function(token, name);
        }

        match self.scope.lookup(name) {
            Some(slot) => Ok(Typed {
                node: Node::Slot(slot),
                kind: self.scope.slot_kind(slot).unwrap_or(ValueKind::Double),
                offset,
            }),
            None => Err(CompileError::UnknownIdentifier {
                token: name.to_string(),
                offset,
            }),
        }
    }

    /// True when the next tokens are `.Math` / `.Mth`
    fn namespace_ahead(&self) -> bool {
        self.peek().kind == TokenKind::Dot
            && matches!(&self.peek_at(1).kind, TokenKind::Ident(n) if n == "Math" || n == "Mth")
    }

    /// Parse the remainder of `Math.name(...)` / `Math.PI` after `ns`
    fn parse_namespaced(&mut self, ns: &Token) -> Result<Typed, CompileError> {
        self.expect(&TokenKind::Dot, "`.` after namespace")?;
        let member = self.advance();
        let TokenKind::Ident(name) = &member.kind else {
            return Err(CompileError::UnexpectedToken {
                token: member.text(self.source).to_string(),
                offset: member.offset,
                expected: "function name",
            });
        };
        if name == "PI" {
            return Ok(Typed {
                node: Node::Double(std::f64::consts::PI),
                kind: ValueKind::Double,
                offset: ns.offset,
            });
        }
        if self.peek().kind != TokenKind::LParen {
            return Err(CompileError::UnknownIdentifier {
                token: format!("{}.{}", ns.text(self.source), name),
                offset: member.offset,
            });
        }
        self.parse_function(&member, name)
    }

    fn parse_function(&mut self, token: &Token, name: &str) -> Result<Typed, CompileError> {
        let Some(function) = Function::from_name(name) else {
            return Err(CompileError::UnknownFunction {
                token: name.to_string(),
                offset: token.offset,
            });
        };
        let args = self.parse_arg_list()?;
        if args.len() != function.arity() {
            return Err(CompileError::Arity {
                token: name.to_string(),
                offset: token.offset,
                expected: function.arity(),
                found: args.len(),
            });
        }
        for arg in &args {
            if !arg.kind.is_numeric() {
                return Err(self.type_error(arg, "number"));
            }
        }
        if function.uses_random() {
            self.uses_random = true;
        }

        let kinds: Vec<ValueKind> = args.iter().map(|a| a.kind).collect();
        let kind = function.result_kind(&kinds);
        let args = args
            .into_iter()
            .map(|arg| match function {
                // Java's randomInt(n) takes an int bound
                Function::RandomInt => coerce(arg, ValueKind::Int),
                _ if kind == ValueKind::Int => arg.node,
                _ => coerce(arg, ValueKind::Double),
            })
            .collect();

        Ok(Typed {
            node: Node::Call(function, args),
            kind,
            offset: token.offset,
        })
    }
}

/// Binary numeric promotion
fn promote(a: ValueKind, b: ValueKind) -> ValueKind {
    if a == ValueKind::Int && b == ValueKind::Int {
        ValueKind::Int
    } else {
        ValueKind::Double
    }
}

/// Insert a conversion when `expr` is not already of `target` kind
fn coerce(expr: Typed, target: ValueKind) -> Node {
    match (expr.kind, target) {
        (ValueKind::Int, ValueKind::Double) => Node::ToDouble(Box::new(expr.node)),
        (ValueKind::Double, ValueKind::Int) => Node::ToInt(Box::new(expr.node)),
        _ => expr.node,
    }
}
