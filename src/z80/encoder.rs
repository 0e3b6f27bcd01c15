//--> Imports <--

use crate::error::{AsmError, Result};

use super::{
	expr::Expr,
	lexer::{Token, TokenStream},
	operand::{classify, condition, Operand, Reg, RegPair, Slot},
	symbols::Width,
	CompilationContext,
};

//--> Constants <--

// Mnemonics that take operands. Implied ones live in `implied`.
const WITH_OPERANDS: [&str; 34] = [
	"LD", "PUSH", "POP", "EX",
	"ADD", "ADC", "SUB", "SBC", "AND", "XOR", "OR", "CP",
	"INC", "DEC",
	"RLC", "RRC", "RL", "RR", "SLA", "SRA", "SLL", "SRL",
	"BIT", "RES", "SET",
	"IM", "RST", "IN", "OUT",
	"JP", "CALL", "RET", "JR", "DJNZ",
];

//--> Functions <--

pub fn is_instruction(mnemonic: &str) -> bool {
	implied(mnemonic).is_some() || WITH_OPERANDS.contains(&mnemonic)
}

/// Encodes one instruction at the context's PC.
pub fn encode(ctx: &mut CompilationContext, mnemonic: &str, operands: &[TokenStream]) -> Result<()> {
	let what = describe(mnemonic, operands);

	if let Some(bytes) = implied(mnemonic) {
		if !operands.is_empty() { return Err(AsmError::InvalidOperands(what)) }
		return ctx.emit_all(bytes);
	}

	// Condition names clash with register C, so these look at the raw tokens.
	if matches!(mnemonic, "JP" | "CALL" | "RET" | "JR" | "DJNZ") {
		return flow(ctx, mnemonic, operands, &what);
	}

	let ops = operands.iter().map(|tokens| classify(tokens)).collect::<Result<Vec<Operand>>>()?;

	match mnemonic {
		"LD" => load(ctx, &ops, &what),
		"PUSH" | "POP" => stack(ctx, mnemonic == "PUSH", &ops, &what),
		"EX" => exchange(ctx, &ops, &what),
		"ADD" | "ADC" | "SUB" | "SBC" | "AND" | "XOR" | "OR" | "CP" => arithmetic(ctx, mnemonic, &ops, &what),
		"INC" | "DEC" => step(ctx, mnemonic == "DEC", &ops, &what),
		"RLC" | "RRC" | "RL" | "RR" | "SLA" | "SRA" | "SLL" | "SRL" => rotate(ctx, mnemonic, &ops, &what),
		"BIT" | "RES" | "SET" => bit(ctx, mnemonic, &ops, &what),
		"IM" => interrupt_mode(ctx, &ops, &what),
		"RST" => restart(ctx, &ops, &what),
		"IN" => input(ctx, &ops, &what),
		"OUT" => output(ctx, &ops, &what),
		_ => Err(AsmError::UnknownMnemonic(String::from(mnemonic)))
	}
}

fn implied(mnemonic: &str) -> Option<&'static [u8]> {
	Some(match mnemonic {
		"NOP" => &[0x00],
		"HALT" => &[0x76],
		"DI" => &[0xf3],
		"EI" => &[0xfb],
		"EXX" => &[0xd9],
		"DAA" => &[0x27],
		"CPL" => &[0x2f],
		"CCF" => &[0x3f],
		"SCF" => &[0x37],
		"RLCA" => &[0x07],
		"RLA" => &[0x17],
		"RRCA" => &[0x0f],
		"RRA" => &[0x1f],
		"NEG" => &[0xed, 0x44],
		"RETI" => &[0xed, 0x4d],
		"RETN" => &[0xed, 0x45],
		"RLD" => &[0xed, 0x6f],
		"RRD" => &[0xed, 0x67],
		"LDI" => &[0xed, 0xa0],
		"LDIR" => &[0xed, 0xb0],
		"LDD" => &[0xed, 0xa8],
		"LDDR" => &[0xed, 0xb8],
		"CPI" => &[0xed, 0xa1],
		"CPIR" => &[0xed, 0xb1],
		"CPD" => &[0xed, 0xa9],
		"CPDR" => &[0xed, 0xb9],
		"INI" => &[0xed, 0xa2],
		"INIR" => &[0xed, 0xb2],
		"IND" => &[0xed, 0xaa],
		"INDR" => &[0xed, 0xba],
		"OUTI" => &[0xed, 0xa3],
		"OTIR" => &[0xed, 0xb3],
		"OUTD" => &[0xed, 0xab],
		"OTDR" => &[0xed, 0xbb],
		_ => return None
	})
}

// "LD A,(IX+2)" style text for error messages.
fn describe(mnemonic: &str, operands: &[TokenStream]) -> String {
	let text = operands.iter()
		.map(|tokens| tokens.iter().map(|t| t.source.as_str()).collect::<String>())
		.collect::<Vec<String>>()
		.join(",");

	if text.is_empty() { String::from(mnemonic) } else { format!("{} {}", mnemonic, text) }
}

fn invalid(what: &str) -> AsmError {
	AsmError::InvalidOperands(String::from(what))
}

fn pair_code(pair: RegPair, what: &str) -> Result<u8> {
	pair.code().ok_or_else(|| invalid(what))
}

// Register field, with indexed memory taking the (HL) slot.
fn slot_code(slot: &Slot) -> u8 {
	match slot {
		Slot::Code(code) => *code,
		Slot::Indexed(..) => 6,
	}
}

fn slot_prefix(ctx: &mut CompilationContext, slot: &Slot) -> Result<()> {
	if let Slot::Indexed(index, _) = slot { ctx.emit(index.prefix())?; }
	Ok(())
}

fn slot_displacement(ctx: &mut CompilationContext, slot: &Slot) -> Result<()> {
	if let Slot::Indexed(_, expr) = slot { ctx.emit_expr(expr, Width::Displacement)?; }
	Ok(())
}

/// prefix, opcode, displacement: the layout shared by every non-CB instruction with an 8-bit slot.
fn emit_with_slot(ctx: &mut CompilationContext, slot: &Slot, opcode: u8) -> Result<()> {
	slot_prefix(ctx, slot)?;
	ctx.emit(opcode)?;
	slot_displacement(ctx, slot)
}

/// CB page: the displacement comes before the opcode when indexed.
fn emit_cb(ctx: &mut CompilationContext, slot: &Slot, opcode: u8) -> Result<()> {
	slot_prefix(ctx, slot)?;
	ctx.emit(0xcb)?;
	slot_displacement(ctx, slot)?;
	ctx.emit(opcode | slot_code(slot))
}

fn load(ctx: &mut CompilationContext, ops: &[Operand], what: &str) -> Result<()> {
	let [dst, src] = ops else { return Err(invalid(what)) };

	if let (Some(to), Some(from)) = (dst.slot(), src.slot()) {
		return match (&to, &from) {
			// LD (HL),(HL) would be HALT
			(Slot::Code(6) | Slot::Indexed(..), Slot::Code(6) | Slot::Indexed(..)) => Err(invalid(what)),
			(Slot::Indexed(..), _) => emit_with_slot(ctx, &to, 0x40 | 6 << 3 | slot_code(&from)),
			_ => emit_with_slot(ctx, &from, 0x40 | slot_code(&to) << 3 | slot_code(&from)),
		};
	}

	if let (Some(to), Operand::Immediate(n)) = (dst.slot(), src) {
		emit_with_slot(ctx, &to, 0x06 | slot_code(&to) << 3)?;
		return ctx.emit_expr(n, Width::Byte);
	}

	match (dst, src) {
		(Operand::Reg(Reg::A), Operand::Indirect(RegPair::BC)) => ctx.emit(0x0a),
		(Operand::Reg(Reg::A), Operand::Indirect(RegPair::DE)) => ctx.emit(0x1a),
		(Operand::Reg(Reg::A), Operand::Memory(nn)) => {
			ctx.emit(0x3a)?;
			ctx.emit_expr(nn, Width::Word)
		},
		(Operand::Indirect(RegPair::BC), Operand::Reg(Reg::A)) => ctx.emit(0x02),
		(Operand::Indirect(RegPair::DE), Operand::Reg(Reg::A)) => ctx.emit(0x12),
		(Operand::Memory(nn), Operand::Reg(Reg::A)) => {
			ctx.emit(0x32)?;
			ctx.emit_expr(nn, Width::Word)
		},
		(Operand::Reg(Reg::A), Operand::Interrupt) => ctx.emit_all(&[0xed, 0x57]),
		(Operand::Reg(Reg::A), Operand::Refresh) => ctx.emit_all(&[0xed, 0x5f]),
		(Operand::Interrupt, Operand::Reg(Reg::A)) => ctx.emit_all(&[0xed, 0x47]),
		(Operand::Refresh, Operand::Reg(Reg::A)) => ctx.emit_all(&[0xed, 0x4f]),
		(Operand::Pair(RegPair::SP), Operand::Pair(from)) => match (from, from.index()) {
			(RegPair::HL, _) => ctx.emit(0xf9),
			(_, Some(index)) => ctx.emit_all(&[index.prefix(), 0xf9]),
			_ => Err(invalid(what))
		},
		(Operand::Pair(pair), Operand::Immediate(nn)) => {
			match pair.index() {
				Some(index) => ctx.emit_all(&[index.prefix(), 0x21])?,
				None => ctx.emit(0x01 | pair_code(*pair, what)? << 4)?
			}

			ctx.emit_expr(nn, Width::Word)
		},
		(Operand::Pair(pair), Operand::Memory(nn)) => {
			match (pair, pair.index()) {
				(RegPair::HL, _) => ctx.emit(0x2a)?,
				(_, Some(index)) => ctx.emit_all(&[index.prefix(), 0x2a])?,
				_ => ctx.emit_all(&[0xed, 0x4b | pair_code(*pair, what)? << 4])?
			}

			ctx.emit_expr(nn, Width::Word)
		},
		(Operand::Memory(nn), Operand::Pair(pair)) => {
			match (pair, pair.index()) {
				(RegPair::HL, _) => ctx.emit(0x22)?,
				(_, Some(index)) => ctx.emit_all(&[index.prefix(), 0x22])?,
				_ => ctx.emit_all(&[0xed, 0x43 | pair_code(*pair, what)? << 4])?
			}

			ctx.emit_expr(nn, Width::Word)
		},
		_ => Err(invalid(what))
	}
}

fn stack(ctx: &mut CompilationContext, push: bool, ops: &[Operand], what: &str) -> Result<()> {
	let [Operand::Pair(pair)] = ops else { return Err(invalid(what)) };
	let base = if push { 0xc5 } else { 0xc1 };

	match pair.index() {
		Some(index) => ctx.emit_all(&[index.prefix(), base | 0x20]),
		None => {
			let code = pair.stack_code().ok_or_else(|| invalid(what))?;
			ctx.emit(base | code << 4)
		}
	}
}

fn exchange(ctx: &mut CompilationContext, ops: &[Operand], what: &str) -> Result<()> {
	match ops {
		[Operand::Pair(RegPair::DE), Operand::Pair(RegPair::HL)] => ctx.emit(0xeb),
		[Operand::Pair(RegPair::AF), Operand::ShadowAF] => ctx.emit(0x08),
		[Operand::Indirect(RegPair::SP), Operand::Pair(RegPair::HL)] => ctx.emit(0xe3),
		[Operand::Indirect(RegPair::SP), Operand::Pair(pair)] => match pair.index() {
			Some(index) => ctx.emit_all(&[index.prefix(), 0xe3]),
			None => Err(invalid(what))
		},
		_ => Err(invalid(what))
	}
}

fn arithmetic(ctx: &mut CompilationContext, mnemonic: &str, ops: &[Operand], what: &str) -> Result<()> {
	let op: u8 = match mnemonic {
		"ADD" => 0,
		"ADC" => 1,
		"SUB" => 2,
		"SBC" => 3,
		"AND" => 4,
		"XOR" => 5,
		"OR" => 6,
		_ => 7,
	};

	match ops {
		[Operand::Pair(dst), Operand::Pair(src)] => wide_arithmetic(ctx, mnemonic, *dst, *src, what),
		[Operand::Reg(Reg::A), src] | [src] => match (src.slot(), src) {
			(Some(slot), _) => emit_with_slot(ctx, &slot, 0x80 | op << 3 | slot_code(&slot)),
			(None, Operand::Immediate(n)) => {
				ctx.emit(0xc6 | op << 3)?;
				ctx.emit_expr(n, Width::Byte)
			},
			_ => Err(invalid(what))
		},
		_ => Err(invalid(what))
	}
}

// ADD HL/IX/IY,rr and ADC/SBC HL,rr. The source may be the destination itself but no other index pair.
fn wide_arithmetic(ctx: &mut CompilationContext, mnemonic: &str, dst: RegPair, src: RegPair, what: &str) -> Result<()> {
	let allowed = matches!(src, RegPair::BC | RegPair::DE | RegPair::SP) || src == dst;

	if !allowed { return Err(invalid(what)) }

	let code = pair_code(src, what)?;

	match (mnemonic, dst, dst.index()) {
		("ADD", _, Some(index)) => ctx.emit_all(&[index.prefix(), 0x09 | code << 4]),
		("ADD", RegPair::HL, None) => ctx.emit(0x09 | code << 4),
		("ADC", RegPair::HL, None) => ctx.emit_all(&[0xed, 0x4a | code << 4]),
		("SBC", RegPair::HL, None) => ctx.emit_all(&[0xed, 0x42 | code << 4]),
		_ => Err(invalid(what))
	}
}

fn step(ctx: &mut CompilationContext, decrement: bool, ops: &[Operand], what: &str) -> Result<()> {
	let [target] = ops else { return Err(invalid(what)) };

	if let Some(slot) = target.slot() {
		let base = if decrement { 0x05 } else { 0x04 };
		return emit_with_slot(ctx, &slot, base | slot_code(&slot) << 3);
	}

	let Operand::Pair(pair) = target else { return Err(invalid(what)) };
	let base = if decrement { 0x0b } else { 0x03 };

	match pair.index() {
		Some(index) => ctx.emit_all(&[index.prefix(), base | 0x20]),
		None => ctx.emit(base | pair_code(*pair, what)? << 4)
	}
}

fn rotate(ctx: &mut CompilationContext, mnemonic: &str, ops: &[Operand], what: &str) -> Result<()> {
	let op: u8 = match mnemonic {
		"RLC" => 0,
		"RRC" => 1,
		"RL" => 2,
		"RR" => 3,
		"SLA" => 4,
		"SRA" => 5,
		"SLL" => 6,
		_ => 7,
	};

	match ops {
		[target] => {
			let slot = target.slot().ok_or_else(|| invalid(what))?;
			emit_cb(ctx, &slot, op << 3)
		},
		_ => Err(invalid(what))
	}
}

fn bit(ctx: &mut CompilationContext, mnemonic: &str, ops: &[Operand], what: &str) -> Result<()> {
	let [Operand::Immediate(number), target] = ops else { return Err(invalid(what)) };
	let slot = target.slot().ok_or_else(|| invalid(what))?;

	let number = number.evaluate_now(&ctx.symbols, ctx.line_pc)?;

	if !(0..=7).contains(&number) { return Err(AsmError::OutOfRange(format!("bit number {}", number))) }

	let base = match mnemonic {
		"BIT" => 0x40,
		"RES" => 0x80,
		_ => 0xc0,
	};

	emit_cb(ctx, &slot, base | (number as u8) << 3)
}

fn interrupt_mode(ctx: &mut CompilationContext, ops: &[Operand], what: &str) -> Result<()> {
	let [Operand::Immediate(mode)] = ops else { return Err(invalid(what)) };

	match mode.evaluate_now(&ctx.symbols, ctx.line_pc)? {
		0 => ctx.emit_all(&[0xed, 0x46]),
		1 => ctx.emit_all(&[0xed, 0x56]),
		2 => ctx.emit_all(&[0xed, 0x5e]),
		other => Err(AsmError::OutOfRange(format!("interrupt mode {}", other)))
	}
}

fn restart(ctx: &mut CompilationContext, ops: &[Operand], what: &str) -> Result<()> {
	let [Operand::Immediate(vector)] = ops else { return Err(invalid(what)) };
	let vector = vector.evaluate_now(&ctx.symbols, ctx.line_pc)?;

	if !(0..=0x38).contains(&vector) || vector % 8 != 0 { return Err(AsmError::OutOfRange(format!("restart vector {:#X}", vector))) }

	ctx.emit(0xc7 | vector as u8)
}

fn input(ctx: &mut CompilationContext, ops: &[Operand], what: &str) -> Result<()> {
	match ops {
		[Operand::Reg(Reg::A), Operand::Memory(port)] => {
			ctx.emit(0xdb)?;
			ctx.emit_expr(port, Width::Byte)
		},
		[Operand::Reg(r), Operand::Port] => ctx.emit_all(&[0xed, 0x40 | r.code() << 3]),
		[Operand::Port] => ctx.emit_all(&[0xed, 0x70]),
		_ => Err(invalid(what))
	}
}

fn output(ctx: &mut CompilationContext, ops: &[Operand], what: &str) -> Result<()> {
	match ops {
		[Operand::Memory(port), Operand::Reg(Reg::A)] => {
			ctx.emit(0xd3)?;
			ctx.emit_expr(port, Width::Byte)
		},
		[Operand::Port, Operand::Reg(r)] => ctx.emit_all(&[0xed, 0x41 | r.code() << 3]),
		_ => Err(invalid(what))
	}
}

fn flow(ctx: &mut CompilationContext, mnemonic: &str, operands: &[TokenStream], what: &str) -> Result<()> {
	let cc = |tokens: &TokenStream| condition(tokens).ok_or_else(|| invalid(what));

	match (mnemonic, operands) {
		("RET", []) => ctx.emit(0xc9),
		("RET", [c]) => ctx.emit(0xc0 | cc(c)? << 3),
		("JP", [target]) => match classify(target)? {
			Operand::Indirect(RegPair::HL) => ctx.emit(0xe9),
			Operand::Indirect(pair) => match pair.index() {
				Some(index) => ctx.emit_all(&[index.prefix(), 0xe9]),
				None => Err(invalid(what))
			},
			Operand::Immediate(nn) => {
				ctx.emit(0xc3)?;
				ctx.emit_expr(&nn, Width::Word)
			},
			_ => Err(invalid(what))
		},
		("JP", [c, target]) => absolute(ctx, 0xc2 | cc(c)? << 3, target),
		("CALL", [target]) => absolute(ctx, 0xcd, target),
		("CALL", [c, target]) => absolute(ctx, 0xc4 | cc(c)? << 3, target),
		("JR", [target]) => relative(ctx, 0x18, target),
		("JR", [c, target]) => match cc(c)? {
			code @ 0..=3 => relative(ctx, 0x20 | code << 3, target),
			_ => Err(invalid(what))
		},
		("DJNZ", [target]) => relative(ctx, 0x10, target),
		_ => Err(invalid(what))
	}
}

fn absolute(ctx: &mut CompilationContext, opcode: u8, target: &[Token]) -> Result<()> {
	let expr = Expr::parse(target)?;

	ctx.emit(opcode)?;
	ctx.emit_expr(&expr, Width::Word)
}

// The offset counts from the byte after the instruction.
fn relative(ctx: &mut CompilationContext, opcode: u8, target: &[Token]) -> Result<()> {
	let expr = Expr::parse(target)?;

	ctx.emit(opcode)?;

	let origin = ctx.memory.pc + 1;
	ctx.emit_expr(&expr, Width::Relative { origin })
}
