//--> Imports <--

use crate::error::{AsmError, Result};

use super::{
	expr::Expr,
	lexer::{Tok, Token},
};

//--> Enums <--

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg {
	B,
	C,
	D,
	E,
	H,
	L,
	A,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegPair {
	BC,
	DE,
	HL,
	SP,
	AF,
	IX,
	IY,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Index {
	IX,
	IY,
}

/// The addressing shape of one operand.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
	Reg(Reg),
	Pair(RegPair),
	// AF'
	ShadowAF,
	Interrupt,
	Refresh,
	// (BC), (DE), (HL), (SP), and (IX)/(IY) without a displacement
	Indirect(RegPair),
	// (IX+d), (IY-d)
	Indexed(Index, Expr),
	// (C) in IN/OUT
	Port,
	// (nn)
	Memory(Expr),
	Immediate(Expr),
}

/// Where an 8-bit register operand lives: the 3-bit register field (6 = (HL)), or an index displacement.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
	Code(u8),
	Indexed(Index, Expr),
}

//--> Functions <--

/// Works out the addressing shape from an operand's tokens.
pub fn classify(tokens: &[Token]) -> Result<Operand> {
	if let [single] = tokens {
		if let Some(op) = single.ident().and_then(register) { return Ok(op) }
	}

	if wrapped_in_parens(tokens) {
		let inner = &tokens[1..tokens.len() - 1];

		if let [single] = inner {
			if let Some(op) = single.ident().and_then(register) {
				return match op {
					Operand::Reg(Reg::C) => Ok(Operand::Port),
					Operand::Pair(pair @ (RegPair::BC | RegPair::DE | RegPair::HL | RegPair::SP | RegPair::IX | RegPair::IY)) => Ok(Operand::Indirect(pair)),
					_ => Err(AsmError::Syntax(format!("({}) is not an addressing mode", single.source)))
				};
			}
		}

		if let [first, sign, ..] = inner {
			if let (Some(index), Tok::Plus | Tok::Minus) = (first.ident().and_then(index_register), &sign.inner) {
				return Ok(Operand::Indexed(index, Expr::parse(&inner[1..])?));
			}
		}

		return Ok(Operand::Memory(Expr::parse(inner)?));
	}

	Ok(Operand::Immediate(Expr::parse(tokens)?))
}

/// Condition code field for JP/JR/CALL/RET, if the operand is a condition name.
pub fn condition(tokens: &[Token]) -> Option<u8> {
	let [single] = tokens else { return None };

	match single.ident()?.to_uppercase().as_str() {
		"NZ" => Some(0),
		"Z" => Some(1),
		"NC" => Some(2),
		"C" => Some(3),
		"PO" => Some(4),
		"PE" => Some(5),
		"P" => Some(6),
		"M" => Some(7),
		_ => None
	}
}

fn register(name: &str) -> Option<Operand> {
	Some(match name.to_uppercase().as_str() {
		"A" => Operand::Reg(Reg::A),
		"B" => Operand::Reg(Reg::B),
		"C" => Operand::Reg(Reg::C),
		"D" => Operand::Reg(Reg::D),
		"E" => Operand::Reg(Reg::E),
		"H" => Operand::Reg(Reg::H),
		"L" => Operand::Reg(Reg::L),
		"I" => Operand::Interrupt,
		"R" => Operand::Refresh,
		"BC" => Operand::Pair(RegPair::BC),
		"DE" => Operand::Pair(RegPair::DE),
		"HL" => Operand::Pair(RegPair::HL),
		"SP" => Operand::Pair(RegPair::SP),
		"AF" => Operand::Pair(RegPair::AF),
		"IX" => Operand::Pair(RegPair::IX),
		"IY" => Operand::Pair(RegPair::IY),
		"AF'" => Operand::ShadowAF,
		_ => return None
	})
}

fn index_register(name: &str) -> Option<Index> {
	match name.to_uppercase().as_str() {
		"IX" => Some(Index::IX),
		"IY" => Some(Index::IY),
		_ => None
	}
}

// True when the first '(' closes on the last token, so "(1+2)*3" is not indirect.
fn wrapped_in_parens(tokens: &[Token]) -> bool {
	let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else { return false };

	if first.inner != Tok::LParen || last.inner != Tok::RParen || tokens.len() < 2 { return false }

	let mut depth: usize = 0;

	for (i, token) in tokens.iter().enumerate() {
		match token.inner {
			Tok::LParen => depth += 1,
			Tok::RParen => {
				depth = depth.saturating_sub(1);
				if depth == 0 && i != tokens.len() - 1 { return false }
			},
			_ => {}
		}
	}

	true
}

impl Reg {
	pub fn code(self) -> u8 {
		match self {
			Reg::B => 0,
			Reg::C => 1,
			Reg::D => 2,
			Reg::E => 3,
			Reg::H => 4,
			Reg::L => 5,
			Reg::A => 7,
		}
	}
}

impl RegPair {
	/// The 2-bit pair field used by LD/INC/DEC/ADD, where SP is 3. HL's slot doubles for IX/IY.
	pub fn code(self) -> Option<u8> {
		match self {
			RegPair::BC => Some(0),
			RegPair::DE => Some(1),
			RegPair::HL | RegPair::IX | RegPair::IY => Some(2),
			RegPair::SP => Some(3),
			RegPair::AF => None,
		}
	}

	/// The 2-bit pair field used by PUSH/POP, where AF is 3.
	pub fn stack_code(self) -> Option<u8> {
		match self {
			RegPair::AF => Some(3),
			RegPair::SP => None,
			other => other.code(),
		}
	}

	pub fn index(self) -> Option<Index> {
		match self {
			RegPair::IX => Some(Index::IX),
			RegPair::IY => Some(Index::IY),
			_ => None
		}
	}
}

impl Index {
	pub fn prefix(self) -> u8 {
		match self {
			Index::IX => 0xdd,
			Index::IY => 0xfd,
		}
	}
}

impl Operand {
	/// The operand as an 8-bit register field, counting (HL) and (IX+d) style memory.
	pub fn slot(&self) -> Option<Slot> {
		match self {
			Operand::Reg(r) => Some(Slot::Code(r.code())),
			Operand::Indirect(RegPair::HL) => Some(Slot::Code(6)),
			Operand::Indirect(pair) => pair.index().map(|index| Slot::Indexed(index, Expr::Number(0))),
			Operand::Indexed(index, expr) => Some(Slot::Indexed(*index, expr.clone())),
			_ => None
		}
	}
}
