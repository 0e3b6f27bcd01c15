// Turns string and character literal bodies into the bytes that land in memory.

//--> Functions <--

fn ascii_to_byte(c: char) -> Option<u8> {
	if c.is_ascii() { Some(c as u8) } else { None }
}

fn escape_to_byte(c: char) -> Option<u8> {
	match c {
		'0' => Some(0x00),
		'a' => Some(0x07),
		'b' => Some(0x08),
		't' => Some(0x09),
		'n' => Some(0x0a),
		'v' => Some(0x0b),
		'f' => Some(0x0c),
		'r' => Some(0x0d),
		'e' => Some(0x1b),
		'"' => Some(0x22),
		'\'' => Some(0x27),
		'\\' => Some(0x5c),
		_ => None
	}
}

fn hex_escape(high: char, low: char) -> Option<u8> {
	let mut value_string = String::new();

	value_string.push(high);
	value_string.push(low);

	u8::from_str_radix(&value_string, 16).ok()
}

/// Decodes the body of a `"..."` literal. Returns `None` on non-ASCII text or a broken escape.
pub fn make_ascii_string(s: &str) -> Option<Vec<u8>> {
	let mut chars = s.chars();
	let mut string: Vec<u8> = Vec::new();

	while let Some(c) = chars.next() {
		if c == '\\' {
			match chars.next()? {
				'x' => {
					let high = chars.next()?;
					let low = chars.next()?;

					string.push(hex_escape(high, low)?);
				},
				other => string.push(escape_to_byte(other)?)
			}
		} else { string.push(ascii_to_byte(c)?); }
	}

	Some(string)
}

/// Decodes the body of a `'x'` literal, which must come out to exactly one byte.
pub fn make_ascii_character(s: &str) -> Option<u8> {
	let bytes = make_ascii_string(s)?;

	if bytes.len() == 1 { Some(bytes[0]) } else { None }
}
