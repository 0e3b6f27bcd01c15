//--> Imports <--

use std::{
	fmt,
	ops::Range,
};

use logos::{
	Lexer,
	Logos
};

use crate::{
	error::{AsmError, Result},
	text
};

use super::{
	directive,
	encoder,
};

//--> Type Aliases <--

pub type TokenStream = Vec<Token>;

//--> Structs <--

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
	pub inner: Tok,
	pub span: Range<usize>,
	pub source: String
}

/// One source line split into its parts. `NAME = expr` comes out as label `NAME` with mnemonic `EQU`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statement {
	pub label: Option<String>,
	pub mnemonic: Option<String>,
	pub operands: Vec<TokenStream>,
}

//--> Enums <--

#[derive(Clone, Debug, PartialEq, Logos)]
pub enum Tok {
	#[regex(r"[0-9]+", Tok::decimal)]
	#[regex(r"\$[0-9a-fA-F]+", Tok::hexadecimal)]
	#[regex(r"0[xX][0-9a-fA-F]+", Tok::hexadecimal)]
	#[regex(r"[0-9][0-9a-fA-F]*[hH]", Tok::hexadecimal)]
	#[regex(r"%[01]+", Tok::binary)]
	#[regex(r"0[bB][01]+", Tok::binary)]
	#[regex(r"[01]+[bB]", Tok::binary)]
	#[regex(r"'([^'\\]|\\.)+'", Tok::character)]
	Number(i32),

	#[regex(r#""([^"\\]|\\.)*""#, Tok::string)]
	Str(Vec<u8>),

	#[regex(r"[a-zA-Z_.][a-zA-Z0-9_.]*'?", |l| String::from(l.slice()))]
	Ident(String),

	#[token("$")]
	Dollar,

	#[token("(")]
	LParen,

	#[token(")")]
	RParen,

	#[token(",")]
	Comma,

	#[token(":")]
	Colon,

	#[token("=")]
	Equals,

	#[token("+")]
	Plus,

	#[token("-")]
	Minus,

	#[token("*")]
	Star,

	#[token("/")]
	Slash,

	#[token("%")]
	Percent,

	#[token("&")]
	Ampersand,

	#[token("|")]
	Pipe,

	#[token("^")]
	Caret,

	#[token("~")]
	Tilde,

	#[token("<<")]
	ShiftLeft,

	#[token(">>")]
	ShiftRight,

	#[error]
	#[regex(r"[ \t\r\f]+", logos::skip)]
	#[regex(r";[^\n]*", logos::skip)]
	Error
}

//--> Functions <--

/// Lexes one line. Anything the lexer can't make sense of is a syntax error for the whole line.
pub fn tokenize(line: &str) -> Result<TokenStream> {
	let mut tokens: TokenStream = Vec::new();

	for (token, span) in Tok::lexer(line).spanned() {
		if let Tok::Error = token {
			return Err(AsmError::Syntax(format!("Couldn't lex this text: {}", &line[span])));
		}

		tokens.push(Token::new(token, span.clone(), &line[span]));
	}

	Ok(tokens)
}

/// Splits a line into label, mnemonic and comma separated operands.
pub fn split_line(line: &str) -> Result<Statement> {
	let tokens = tokenize(line)?;
	let mut statement = Statement::default();
	let mut rest: &[Token] = &tokens;

	// Constant definitions: "NAME = expr" or "NAME EQU expr", wherever they start.
	if let [Token { inner: Tok::Ident(name), .. }, second, tail @ ..] = rest {
		let is_equ = match &second.inner {
			Tok::Equals => true,
			Tok::Ident(word) => normalize_mnemonic(word) == "EQU",
			_ => false
		};

		if is_equ {
			statement.label = Some(name.clone());
			statement.mnemonic = Some(String::from("EQU"));
			statement.operands = split_operands(tail)?;
			return Ok(statement);
		}
	}

	match rest {
		[Token { inner: Tok::Ident(name), .. }, Token { inner: Tok::Colon, .. }, tail @ ..] => {
			statement.label = Some(name.clone());
			rest = tail;
		},
		[Token { inner: Tok::Ident(name), span, .. }, tail @ ..] if span.start == 0 && !is_keyword(name) => {
			statement.label = Some(name.clone());
			rest = tail;
		},
		_ => {}
	}

	match rest {
		[] => {},
		[Token { inner: Tok::Ident(word), .. }, tail @ ..] => {
			statement.mnemonic = Some(normalize_mnemonic(word));
			statement.operands = split_operands(tail)?;
		},
		[other, ..] => return Err(AsmError::Syntax(format!("Expected an instruction or directive but got {}", other)))
	}

	Ok(statement)
}

/// Upper-cases a mnemonic and drops the optional leading '.' of directives.
pub fn normalize_mnemonic(word: &str) -> String {
	word.strip_prefix('.').unwrap_or(word).to_uppercase()
}

fn is_keyword(word: &str) -> bool {
	let word = normalize_mnemonic(word);

	encoder::is_instruction(&word) || directive::Directive::from_mnemonic(&word).is_some()
}

fn split_operands(tokens: &[Token]) -> Result<Vec<TokenStream>> {
	let mut operands: Vec<TokenStream> = Vec::new();

	if tokens.is_empty() { return Ok(operands) }

	let mut current: TokenStream = Vec::new();
	let mut depth: usize = 0;

	for token in tokens {
		match token.inner {
			Tok::LParen => depth += 1,
			Tok::RParen => depth = depth.saturating_sub(1),
			Tok::Comma if depth == 0 => {
				if current.is_empty() { return Err(AsmError::Syntax(String::from("Empty operand"))) }

				operands.push(std::mem::take(&mut current));
				continue;
			},
			_ => {}
		}

		current.push(token.clone());
	}

	if current.is_empty() { return Err(AsmError::Syntax(String::from("Empty operand"))) }

	operands.push(current);

	Ok(operands)
}

impl Token {
	pub fn new(inner: Tok, span: Range<usize>, slice: &str) -> Token {
		Token { inner, span, source: String::from(slice) }
	}

	/// The identifier text, if this token is one.
	pub fn ident(&self) -> Option<&str> {
		if let Tok::Ident(name) = &self.inner { Some(name) } else { None }
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match &self.inner {
			Tok::Number(n) => write!(f, "a number {}", n),
			Tok::Str(_) => write!(f, "a string literal {}", self.source),
			Tok::Ident(name) => write!(f, "an identifier '{}'", name),
			Tok::Error => write!(f, "an error"),
			_ => write!(f, "operator '{}'", self.source),
		}
	}
}

impl Tok {
	fn decimal(l: &mut Lexer<Tok>) -> Option<i32> {
		Some(l.slice().parse::<u32>().ok()? as i32)
	}

	fn hexadecimal(l: &mut Lexer<Tok>) -> Option<i32> {
		let slice = l.slice().to_lowercase();

		let digits = if let Some(s) = slice.strip_prefix('$') { s }
		else if let Some(s) = slice.strip_prefix("0x") { s }
		else if let Some(s) = slice.strip_suffix('h') { s }
		else { return None };

		Some(u32::from_str_radix(digits, 16).ok()? as i32)
	}

	fn binary(l: &mut Lexer<Tok>) -> Option<i32> {
		let slice = l.slice().to_lowercase();

		let digits = if let Some(s) = slice.strip_prefix('%') { s }
		else if let Some(s) = slice.strip_prefix("0b") { s }
		else if let Some(s) = slice.strip_suffix('b') { s }
		else { return None };

		Some(u32::from_str_radix(digits, 2).ok()? as i32)
	}

	fn character(l: &mut Lexer<Tok>) -> Option<i32> {
		let s = l.slice().strip_prefix('\'')?.strip_suffix('\'')?;

		Some(i32::from(text::make_ascii_character(s)?))
	}

	fn string(l: &mut Lexer<Tok>) -> Option<Vec<u8>> {
		let s = l.slice().strip_prefix('"')?.strip_suffix('"')?;

		text::make_ascii_string(s)
	}
}
