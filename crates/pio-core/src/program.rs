//! Plain-text program hex dumps.
//!
//! One opcode per line as up to four hex digits (an optional `0x` prefix is
//! accepted). Lines starting with `#` are comments; `.program <name>` and
//! `.origin <address>` directives may appear on their own or inside a
//! comment and are kept as metadata.

use std::fmt::Write as _;

use crate::error::{PioError, PioResult};
use crate::memory::INSTRUCTION_MEMORY_WORDS;

/// An assembled PIO program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Program {
    name: Option<String>,
    origin: Option<u8>,
    code: Vec<u16>,
}

impl Program {
    /// Builds a program from its parts.
    #[must_use]
    pub const fn new(name: Option<String>, origin: Option<u8>, code: Vec<u16>) -> Self {
        Self { name, origin, code }
    }

    /// Name from the `.program` directive.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Load address from the `.origin` directive.
    #[must_use]
    pub const fn origin(&self) -> Option<u8> {
        self.origin
    }

    /// Opcodes in program order.
    #[must_use]
    pub fn code(&self) -> &[u16] {
        &self.code
    }

    /// Parses hex-dump text.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::ProgramParse`] for a malformed line or directive and
    /// [`PioError::ProgramTooLarge`] when more than 32 opcodes are present.
    pub fn parse(text: &str) -> PioResult<Self> {
        let mut program = Self::default();
        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let directive = line.strip_prefix('#').map_or(line, str::trim_start);
            if directive.starts_with('.') {
                program.apply_directive(directive, line_no)?;
                continue;
            }
            if line.starts_with('#') {
                continue;
            }
            program.code.push(parse_opcode(line, line_no)?);
        }
        if program.code.len() > INSTRUCTION_MEMORY_WORDS {
            return Err(PioError::ProgramTooLarge {
                len: program.code.len(),
            });
        }
        Ok(program)
    }

    fn apply_directive(&mut self, directive: &str, line: usize) -> PioResult<()> {
        let mut parts = directive.split_whitespace();
        let keyword = parts.next().unwrap_or_default();
        let argument = parts.next();
        match (keyword, argument) {
            (".program", Some(name)) => {
                self.name = Some(name.to_string());
                Ok(())
            }
            (".origin", Some(value)) => {
                let origin = parse_number(value)
                    .filter(|&origin| origin < 32)
                    .ok_or_else(|| PioError::ProgramParse {
                        line,
                        reason: format!("invalid origin `{value}`"),
                    })?;
                self.origin = u8::try_from(origin).ok();
                Ok(())
            }
            (".program" | ".origin", None) => Err(PioError::ProgramParse {
                line,
                reason: format!("`{keyword}` needs an argument"),
            }),
            // Other assembler directives (.wrap, .side_set, ...) are informational.
            _ => Ok(()),
        }
    }

    /// Renders the program in the format accepted by [`Program::parse`].
    #[must_use]
    pub fn to_hex_dump(&self) -> String {
        let mut out = String::new();
        if let Some(name) = &self.name {
            let _ = writeln!(out, "# .program {name}");
        }
        if let Some(origin) = self.origin {
            let _ = writeln!(out, "# .origin {origin}");
        }
        for opcode in &self.code {
            let _ = writeln!(out, "{opcode:04x}");
        }
        out
    }
}

fn parse_number(text: &str) -> Option<u32> {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .map_or_else(|| text.parse().ok(), |hex| u32::from_str_radix(hex, 16).ok())
}

fn parse_opcode(line: &str, line_no: usize) -> PioResult<u16> {
    let digits = line
        .strip_prefix("0x")
        .or_else(|| line.strip_prefix("0X"))
        .unwrap_or(line);
    if digits.is_empty() || digits.len() > 4 {
        return Err(PioError::ProgramParse {
            line: line_no,
            reason: format!("expected up to four hex digits, found `{line}`"),
        });
    }
    u16::from_str_radix(digits, 16).map_err(|_| PioError::ProgramParse {
        line: line_no,
        reason: format!("`{line}` is not a hex opcode"),
    })
}

#[cfg(test)]
mod tests {
    use super::Program;
    use crate::error::PioError;

    const SQUAREWAVE: &str = "\
# .program squarewave
# .origin 0
e081
e101
e000
0001
";

    #[test]
    fn parses_directives_and_opcodes() {
        let program = Program::parse(SQUAREWAVE).expect("valid dump");
        assert_eq!(program.name(), Some("squarewave"));
        assert_eq!(program.origin(), Some(0));
        assert_eq!(program.code(), &[0xe081, 0xe101, 0xe000, 0x0001]);
    }

    #[test]
    fn hex_dump_parses_back() {
        let program = Program::parse(SQUAREWAVE).expect("valid dump");
        assert_eq!(program.to_hex_dump(), SQUAREWAVE);
    }

    #[test]
    fn accepts_bare_directives_prefixes_and_blank_lines() {
        let program =
            Program::parse(".program blink\n.origin 0x1f\n\n0xA042\n# plain comment\n  1\n")
                .expect("valid dump");
        assert_eq!(program.name(), Some("blink"));
        assert_eq!(program.origin(), Some(31));
        assert_eq!(program.code(), &[0xa042, 0x0001]);
    }

    #[test]
    fn reports_line_of_bad_opcode() {
        let err = Program::parse("a042\nzz12\n").expect_err("bad hex");
        assert!(matches!(err, PioError::ProgramParse { line: 2, .. }));
        let err = Program::parse("12345\n").expect_err("too wide");
        assert!(matches!(err, PioError::ProgramParse { line: 1, .. }));
    }

    #[test]
    fn rejects_out_of_range_origin() {
        let err = Program::parse(".origin 32\n").expect_err("origin too big");
        assert!(matches!(err, PioError::ProgramParse { line: 1, .. }));
    }

    #[test]
    fn rejects_programs_longer_than_memory() {
        let text = "a042\n".repeat(33);
        assert_eq!(
            Program::parse(&text),
            Err(PioError::ProgramTooLarge { len: 33 })
        );
    }
}
