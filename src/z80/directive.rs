//--> Imports <--

use tracing::debug;

use crate::error::{AsmError, Result};

use super::{
	expr::{Expr, Value},
	lexer::{Tok, Token, TokenStream},
	memory::RAM_SIZE,
	symbols::{Fixup, FixupTarget, SymbolKind, Width},
	CompilationContext,
	Flow,
};

//--> Enums <--

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
	SetOrigin,
	PutBytes,
	PutWords,
	ReserveSpace,
	DefineConstant,
	End,
}

//--> Functions <--

impl Directive {
	pub fn from_mnemonic(word: &str) -> Option<Directive> {
		match word {
			"ORG" => Some(Directive::SetOrigin),
			"DEFB" | "DB" | "DEFM" | "DM" => Some(Directive::PutBytes),
			"DEFW" | "DW" => Some(Directive::PutWords),
			"DEFS" | "DS" => Some(Directive::ReserveSpace),
			"EQU" => Some(Directive::DefineConstant),
			"END" => Some(Directive::End),
			_ => None
		}
	}
}

/// Runs a directive. Constants are handled by `define_constant`, since they need the line's label.
pub fn apply(ctx: &mut CompilationContext, directive: Directive, operands: &[TokenStream]) -> Result<Flow> {
	match directive {
		Directive::SetOrigin => {
			let [operand] = operands else { return Err(AsmError::InvalidOperands(String::from("ORG"))) };
			let origin = Expr::parse(operand)?.evaluate_now(&ctx.symbols, ctx.line_pc)?;

			if !(0..RAM_SIZE as i32).contains(&origin) { return Err(AsmError::OutOfRange(format!("origin {}", origin))) }

			debug!("origin set to {:04X}", origin);
			ctx.memory.pc = origin as u32;
		},
		Directive::PutBytes => {
			if operands.is_empty() { return Err(AsmError::InvalidOperands(String::from("DEFB"))) }

			for operand in operands {
				match operand.as_slice() {
					[Token { inner: Tok::Str(bytes), .. }] => ctx.emit_all(bytes)?,
					tokens => ctx.emit_expr(&Expr::parse(tokens)?, Width::Byte)?
				}
			}
		},
		Directive::PutWords => {
			if operands.is_empty() { return Err(AsmError::InvalidOperands(String::from("DEFW"))) }

			for operand in operands {
				ctx.emit_expr(&Expr::parse(operand)?, Width::Word)?;
			}
		},
		Directive::ReserveSpace => {
			let (count, fill) = match operands {
				[count] => (count, None),
				[count, fill] => (count, Some(fill)),
				_ => return Err(AsmError::InvalidOperands(String::from("DEFS")))
			};

			let count = Expr::parse(count)?.evaluate_now(&ctx.symbols, ctx.line_pc)?;

			if count < 0 { return Err(AsmError::OutOfRange(format!("space size {}", count))) }

			match fill {
				Some(fill) => {
					let fill = Expr::parse(fill)?.evaluate_now(&ctx.symbols, ctx.line_pc)?;
					let byte = Width::Byte.encode(fill)?;

					for _ in 0..count { ctx.emit_all(&byte)?; }
				},
				None => ctx.memory.skip(count as u32)?
			}
		},
		Directive::DefineConstant => return Err(AsmError::Syntax(String::from("EQU needs a name"))),
		Directive::End => return Ok(Flow::Stop),
	}

	Ok(Flow::Continue)
}

/// `NAME EQU expr`: defines the constant now, or once every name the expression uses is known.
pub fn define_constant(ctx: &mut CompilationContext, name: &str, operands: &[TokenStream]) -> Result<()> {
	let [operand] = operands else { return Err(AsmError::InvalidOperands(String::from("EQU"))) };
	let expr = Expr::parse(operand)?;

	match expr.evaluate(&ctx.symbols, ctx.line_pc)? {
		Value::Resolved(value) => ctx.define(name, value, SymbolKind::Constant),
		Value::Pending(names) => {
			let fixup = Fixup {
				target: FixupTarget::Symbol { name: String::from(name) },
				expr,
				pc: ctx.line_pc,
				line: ctx.line
			};

			for pending in names {
				ctx.symbols.add_fixup(&pending, fixup.clone());
			}

			Ok(())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::z80::lexer::split_line;

	fn run(ctx: &mut CompilationContext, line: &str) -> Result<Flow> {
		let statement = split_line(line)?;
		let mnemonic = statement.mnemonic.unwrap();

		ctx.line_pc = ctx.memory.pc;
		apply(ctx, Directive::from_mnemonic(&mnemonic).unwrap(), &statement.operands)
	}

	#[test]
	fn mnemonics_and_aliases() {
		assert_eq!(Directive::from_mnemonic("DM"), Some(Directive::PutBytes));
		assert_eq!(Directive::from_mnemonic("DS"), Some(Directive::ReserveSpace));
		assert_eq!(Directive::from_mnemonic("LD"), None);
	}

	#[test]
	fn origin_moves_the_cursor_without_writing() {
		let mut ctx = CompilationContext::new(0);
		run(&mut ctx, " org $8000").unwrap();

		assert_eq!(ctx.memory.pc, 0x8000);
		assert_eq!(ctx.memory.range(), None);
	}

	#[test]
	fn origin_needs_a_known_value() {
		let mut ctx = CompilationContext::new(0);

		assert!(matches!(run(&mut ctx, " org later"), Err(AsmError::Undefined(_))));
		assert!(matches!(run(&mut ctx, " org $10000"), Err(AsmError::OutOfRange(_))));
	}

	#[test]
	fn bytes_mix_strings_and_expressions() {
		let mut ctx = CompilationContext::new(0);
		run(&mut ctx, " defm \"Hi\",13,'!'+1,0").unwrap();

		assert_eq!(ctx.memory.slice(0, 4), b"Hi\r\"\0");
		assert_eq!(ctx.memory.pc, 5);
	}

	#[test]
	fn words_are_little_endian() {
		let mut ctx = CompilationContext::new(0);
		run(&mut ctx, " dw $1234,-2").unwrap();

		assert_eq!(ctx.memory.slice(0, 3), &[0x34, 0x12, 0xfe, 0xff]);
	}

	#[test]
	fn space_with_and_without_fill() {
		let mut ctx = CompilationContext::new(0x55);
		run(&mut ctx, " ds 3").unwrap();

		assert_eq!(ctx.memory.pc, 3);
		assert_eq!(ctx.memory.range(), None);

		run(&mut ctx, " ds 2,$AA").unwrap();

		assert_eq!(ctx.memory.pc, 5);
		assert_eq!(ctx.memory.slice(3, 4), &[0xaa, 0xaa]);
	}

	#[test]
	fn space_cannot_run_past_the_top_of_memory() {
		let mut ctx = CompilationContext::new(0);

		assert!(matches!(run(&mut ctx, " ds $7fffffff"), Err(AsmError::AddressOverflow(0x7fffffff))));
		assert_eq!(ctx.memory.pc, 0);

		run(&mut ctx, " org $fff0").unwrap();
		assert!(matches!(run(&mut ctx, " ds $100"), Err(AsmError::AddressOverflow(0x100f0))));
		assert_eq!(ctx.memory.pc, 0xfff0);

		run(&mut ctx, " ds $10").unwrap();
		assert_eq!(ctx.memory.pc, 0x10000);
	}

	#[test]
	fn labels_after_oversized_space_are_never_defined() {
		let err = crate::z80::assemble(" ds $7fffffff\n ds $7fffffff\n ds $7fffffff\n nop\n", &crate::z80::Config::default()).err().unwrap();

		assert_eq!(err.line, 1);
		assert!(matches!(err.error, AsmError::AddressOverflow(_)));

		let err = crate::z80::assemble(" org $fff0\n ds $100\nlbl: end\n", &crate::z80::Config::default()).err().unwrap();

		assert_eq!(err.line, 2);
		assert!(matches!(err.error, AsmError::AddressOverflow(0x100f0)));
	}

	#[test]
	fn end_stops_the_run() {
		let mut ctx = CompilationContext::new(0);

		assert_eq!(run(&mut ctx, " end").unwrap(), Flow::Stop);
	}

	#[test]
	fn constants_wait_for_forward_references() {
		let mut ctx = CompilationContext::new(0);
		define_constant(&mut ctx, "Size", &split_line(" equ Last-First").unwrap().operands).unwrap();

		assert_eq!(ctx.symbols.value("Size"), None);

		ctx.define("First", 0x10, SymbolKind::Label).unwrap();
		assert_eq!(ctx.symbols.value("Size"), None);

		ctx.define("Last", 0x30, SymbolKind::Label).unwrap();
		assert_eq!(ctx.symbols.value("Size"), Some(0x20));
	}
}
