//! Two-pass Hack assembler.
//!
//! Pass 1 walks the text and binds every `(LABEL)` to the address of the
//! instruction that follows it. Pass 2 encodes; an `@name` that is neither
//! predefined nor a label becomes a variable, allocated from RAM 16 upward in
//! order of first use.

use std::collections::HashMap;

use crate::error::{AssemblySnafu, CompileResult};
use crate::processor::lexer::MAX_INT;

const VARIABLE_BASE: u16 = 16;
const SCREEN: u16 = 16384;
const KBD: u16 = 24576;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub words: Vec<u16>,
    /// Labels, predefined names and variables with their final values.
    pub symbols: HashMap<String, u16>,
}

impl Assembled {
    /// `.hack` text: one 16-digit binary word per line.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.words.len() * 17);
        for word in &self.words {
            out.push_str(&format!("{word:016b}\n"));
        }
        out
    }
}

enum Line<'a> {
    Label(&'a str),
    Address(&'a str),
    Compute(&'a str),
}

/// Strips comments and whitespace; `None` for lines with nothing left.
fn classify(raw: &str) -> Option<Line<'_>> {
    let text = match raw.find("//") {
        Some(pos) => &raw[..pos],
        None => raw,
    }
    .trim();

    if text.is_empty() {
        None
    } else if let Some(label) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(Line::Label(label.trim()))
    } else if let Some(target) = text.strip_prefix('@') {
        Some(Line::Address(target.trim()))
    } else {
        Some(Line::Compute(text))
    }
}

fn predefined() -> HashMap<String, u16> {
    let mut symbols = HashMap::new();
    for (name, addr) in [
        ("SP", 0),
        ("LCL", 1),
        ("ARG", 2),
        ("THIS", 3),
        ("THAT", 4),
        ("SCREEN", SCREEN),
        ("KBD", KBD),
    ] {
        symbols.insert(name.to_string(), addr);
    }
    for r in 0..16u16 {
        symbols.insert(format!("R{r}"), r);
    }
    symbols
}

fn is_symbol(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| !c.is_ascii_digit() && is_symbol_char(c))
        && chars.all(is_symbol_char)
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | ':')
}

pub fn assemble(src: &str) -> CompileResult<Assembled> {
    let mut symbols = predefined();

    // 1. ── Labels ─────────────────────────────────────────────────────
    let mut rom: u16 = 0;
    for (i, raw) in src.lines().enumerate() {
        match classify(raw) {
            Some(Line::Label(name)) => {
                if !is_symbol(name) {
                    return AssemblySnafu {
                        line: i + 1,
                        message: format!("invalid label `{name}`"),
                    }
                    .fail();
                }
                if symbols.insert(name.to_string(), rom).is_some() {
                    return AssemblySnafu {
                        line: i + 1,
                        message: format!("label `{name}` declared twice"),
                    }
                    .fail();
                }
            }
            Some(_) => {
                rom = rom.checked_add(1).ok_or_else(|| {
                    AssemblySnafu {
                        line: i + 1,
                        message: "program exceeds ROM",
                    }
                    .build()
                })?;
            }
            None => {}
        }
    }

    // 2. ── Encode ─────────────────────────────────────────────────────
    let mut words = Vec::with_capacity(rom as usize);
    let mut next_variable = VARIABLE_BASE;
    for (i, raw) in src.lines().enumerate() {
        let line = i + 1;
        match classify(raw) {
            Some(Line::Address(target)) => {
                let value = if target.starts_with(|c: char| c.is_ascii_digit()) {
                    match target.parse::<u16>() {
                        Ok(v) if v <= MAX_INT => v,
                        _ => {
                            return AssemblySnafu {
                                line,
                                message: format!("constant `{target}` out of range"),
                            }
                            .fail();
                        }
                    }
                } else if let Some(&addr) = symbols.get(target) {
                    addr
                } else if is_symbol(target) {
                    if next_variable >= SCREEN {
                        return AssemblySnafu {
                            line,
                            message: "out of variable space",
                        }
                        .fail();
                    }
                    let addr = next_variable;
                    symbols.insert(target.to_string(), addr);
                    next_variable += 1;
                    addr
                } else {
                    return AssemblySnafu {
                        line,
                        message: format!("invalid symbol `{target}`"),
                    }
                    .fail();
                };
                words.push(value);
            }
            Some(Line::Compute(text)) => words.push(encode_compute(text, line)?),
            Some(Line::Label(_)) | None => {}
        }
    }

    Ok(Assembled { words, symbols })
}

/// `dest=comp;jump` with both `dest=` and `;jump` optional.
fn encode_compute(text: &str, line: usize) -> CompileResult<u16> {
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let (dest, rest) = match text.split_once('=') {
        Some((d, r)) => (d, r),
        None => ("", text.as_str()),
    };
    let (comp, jump) = match rest.split_once(';') {
        Some((c, j)) => (c, j),
        None => (rest, ""),
    };

    let Some(c) = comp_bits(comp) else {
        return AssemblySnafu {
            line,
            message: format!("unknown computation `{comp}`"),
        }
        .fail();
    };
    let Some(d) = dest_bits(dest) else {
        return AssemblySnafu {
            line,
            message: format!("unknown destination `{dest}`"),
        }
        .fail();
    };
    let Some(j) = jump_bits(jump) else {
        return AssemblySnafu {
            line,
            message: format!("unknown jump `{jump}`"),
        }
        .fail();
    };

    Ok(0b111 << 13 | c << 6 | d << 3 | j)
}

/// `a c1..c6`. Commutative spellings map to the same bits.
fn comp_bits(comp: &str) -> Option<u16> {
    let bits = match comp {
        "0" => 0b0101010,
        "1" => 0b0111111,
        "-1" => 0b0111010,
        "D" => 0b0001100,
        "A" => 0b0110000,
        "M" => 0b1110000,
        "!D" => 0b0001101,
        "!A" => 0b0110001,
        "!M" => 0b1110001,
        "-D" => 0b0001111,
        "-A" => 0b0110011,
        "-M" => 0b1110011,
        "D+1" | "1+D" => 0b0011111,
        "A+1" | "1+A" => 0b0110111,
        "M+1" | "1+M" => 0b1110111,
        "D-1" => 0b0001110,
        "A-1" => 0b0110010,
        "M-1" => 0b1110010,
        "D+A" | "A+D" => 0b0000010,
        "D+M" | "M+D" => 0b1000010,
        "D-A" => 0b0010011,
        "D-M" => 0b1010011,
        "A-D" => 0b0000111,
        "M-D" => 0b1000111,
        "D&A" | "A&D" => 0b0000000,
        "D&M" | "M&D" => 0b1000000,
        "D|A" | "A|D" => 0b0010101,
        "D|M" | "M|D" => 0b1010101,
        _ => return None,
    };
    Some(bits)
}

/// Any ordering of the letters A, D, M, each at most once.
fn dest_bits(dest: &str) -> Option<u16> {
    let mut bits = 0;
    for c in dest.chars() {
        let bit = match c {
            'A' => 0b100,
            'D' => 0b010,
            'M' => 0b001,
            _ => return None,
        };
        if bits & bit != 0 {
            return None;
        }
        bits |= bit;
    }
    Some(bits)
}

fn jump_bits(jump: &str) -> Option<u16> {
    let bits = match jump {
        "" => 0b000,
        "JGT" => 0b001,
        "JEQ" => 0b010,
        "JGE" => 0b011,
        "JLT" => 0b100,
        "JNE" => 0b101,
        "JLE" => 0b110,
        "JMP" => 0b111,
        _ => return None,
    };
    Some(bits)
}
