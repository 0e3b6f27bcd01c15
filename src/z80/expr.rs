//--> Imports <--

use crate::error::{AsmError, Result};

use super::{
	lexer::{Tok, Token},
	symbols::SymbolTable,
};

//--> Structs <--

struct Parser<'a> {
	tokens: &'a [Token],
	pos: usize,
}

//--> Enums <--

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
	Number(i32),
	Symbol(String),
	CurrentAddress,
	Unary(UnaryOp, Box<Expr>),
	Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
	Negate,
	Identity,
	Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
	Or,
	Xor,
	And,
	ShiftLeft,
	ShiftRight,
	Add,
	Subtract,
	Multiply,
	Divide,
	Modulo,
}

/// Outcome of an evaluation: a concrete value, or the names that still need a definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
	Resolved(i32),
	Pending(Vec<String>),
}

//--> Constants <--

// Number of binary precedence levels, see `binary_op`.
const LEVELS: usize = 6;

//--> Functions <--

impl Expr {
	/// Parses a whole operand. Leftover tokens are a syntax error.
	pub fn parse(tokens: &[Token]) -> Result<Expr> {
		if tokens.is_empty() { return Err(AsmError::Syntax(String::from("Missing expression"))) }

		let mut parser = Parser { tokens, pos: 0 };
		let expr = parser.level(0)?;

		match parser.peek() {
			None => Ok(expr),
			Some(token) => Err(AsmError::Syntax(format!("Unexpected {} in expression", token)))
		}
	}

	/// Evaluates against the symbols known so far. `pc` is what `$` stands for.
	pub fn evaluate(&self, symbols: &SymbolTable, pc: u32) -> Result<Value> {
		match self {
			Expr::Number(n) => Ok(Value::Resolved(*n)),
			Expr::CurrentAddress => Ok(Value::Resolved(pc as i32)),
			Expr::Symbol(name) => Ok(match symbols.value(name) {
				Some(v) => Value::Resolved(v),
				None => Value::Pending(vec![name.clone()])
			}),
			Expr::Unary(op, inner) => Ok(match inner.evaluate(symbols, pc)? {
				Value::Resolved(v) => Value::Resolved(match op {
					UnaryOp::Negate => v.wrapping_neg(),
					UnaryOp::Identity => v,
					UnaryOp::Not => !v,
				}),
				pending => pending
			}),
			Expr::Binary(op, left, right) => {
				match (left.evaluate(symbols, pc)?, right.evaluate(symbols, pc)?) {
					(Value::Resolved(l), Value::Resolved(r)) => Ok(Value::Resolved(op.apply(l, r)?)),
					(Value::Pending(mut names), Value::Pending(more)) => {
						for name in more {
							if !names.contains(&name) { names.push(name); }
						}

						Ok(Value::Pending(names))
					},
					(Value::Pending(names), _) | (_, Value::Pending(names)) => Ok(Value::Pending(names))
				}
			}
		}
	}

	/// Evaluates something that has to be known right now, such as an ORG address.
	pub fn evaluate_now(&self, symbols: &SymbolTable, pc: u32) -> Result<i32> {
		match self.evaluate(symbols, pc)? {
			Value::Resolved(v) => Ok(v),
			Value::Pending(names) => Err(AsmError::Undefined(names.join(", ")))
		}
	}
}

// Binary operators by level, loosest first.
fn binary_op(depth: usize, tok: &Tok) -> Option<BinaryOp> {
	match (depth, tok) {
		(0, Tok::Pipe) => Some(BinaryOp::Or),
		(1, Tok::Caret) => Some(BinaryOp::Xor),
		(2, Tok::Ampersand) => Some(BinaryOp::And),
		(3, Tok::ShiftLeft) => Some(BinaryOp::ShiftLeft),
		(3, Tok::ShiftRight) => Some(BinaryOp::ShiftRight),
		(4, Tok::Plus) => Some(BinaryOp::Add),
		(4, Tok::Minus) => Some(BinaryOp::Subtract),
		(5, Tok::Star) => Some(BinaryOp::Multiply),
		(5, Tok::Slash) => Some(BinaryOp::Divide),
		(5, Tok::Percent) => Some(BinaryOp::Modulo),
		_ => None
	}
}

impl BinaryOp {
	fn apply(self, l: i32, r: i32) -> Result<i32> {
		Ok(match self {
			BinaryOp::Or => l | r,
			BinaryOp::Xor => l ^ r,
			BinaryOp::And => l & r,
			BinaryOp::ShiftLeft => u32::try_from(r).ok().and_then(|r| l.checked_shl(r)).unwrap_or(0),
			BinaryOp::ShiftRight => u32::try_from(r).ok().and_then(|r| l.checked_shr(r)).unwrap_or(0),
			BinaryOp::Add => l.wrapping_add(r),
			BinaryOp::Subtract => l.wrapping_sub(r),
			BinaryOp::Multiply => l.wrapping_mul(r),
			BinaryOp::Divide => {
				if r == 0 { return Err(AsmError::DivisionByZero) }
				l.wrapping_div(r)
			},
			BinaryOp::Modulo => {
				if r == 0 { return Err(AsmError::DivisionByZero) }
				l.wrapping_rem(r)
			},
		})
	}
}

impl<'a> Parser<'a> {
	fn peek(&self) -> Option<&'a Token> { self.tokens.get(self.pos) }

	fn next(&mut self) -> Option<&'a Token> {
		let token = self.tokens.get(self.pos);
		if token.is_some() { self.pos += 1; }
		token
	}

	fn level(&mut self, depth: usize) -> Result<Expr> {
		if depth == LEVELS { return self.unary() }

		let mut left = self.level(depth + 1)?;

		'ops: loop {
			let Some(token) = self.peek() else { break 'ops };

			match binary_op(depth, &token.inner) {
				Some(op) => {
					self.pos += 1;
					let right = self.level(depth + 1)?;
					left = Expr::Binary(op, Box::new(left), Box::new(right));
				},
				None => break 'ops
			}
		}

		Ok(left)
	}

	fn unary(&mut self) -> Result<Expr> {
		let op = match self.peek().map(|t| &t.inner) {
			Some(Tok::Minus) => UnaryOp::Negate,
			Some(Tok::Plus) => UnaryOp::Identity,
			Some(Tok::Tilde) => UnaryOp::Not,
			_ => return self.primary()
		};

		self.pos += 1;

		Ok(Expr::Unary(op, Box::new(self.unary()?)))
	}

	fn primary(&mut self) -> Result<Expr> {
		let token = self.next().ok_or_else(|| AsmError::Syntax(String::from("Expression ends too early")))?;

		match &token.inner {
			Tok::Number(n) => Ok(Expr::Number(*n)),
			Tok::Dollar => Ok(Expr::CurrentAddress),
			Tok::Ident(name) => Ok(Expr::Symbol(name.clone())),
			Tok::LParen => {
				let inner = self.level(0)?;

				match self.next() {
					Some(Token { inner: Tok::RParen, .. }) => Ok(inner),
					_ => Err(AsmError::Syntax(String::from("Missing ')' in expression")))
				}
			},
			_ => Err(AsmError::Syntax(format!("Unexpected {} in expression", token)))
		}
	}
}
