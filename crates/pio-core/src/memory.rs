//! Shared 32-word instruction memory of one PIO block.

use crate::error::{PioError, PioResult};
use crate::program::Program;

/// Number of 16-bit instruction slots per PIO block.
pub const INSTRUCTION_MEMORY_WORDS: usize = 32;

/// Instruction memory shared by the four state machines of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionMemory {
    words: [u16; INSTRUCTION_MEMORY_WORDS],
}

impl Default for InstructionMemory {
    fn default() -> Self {
        Self {
            words: [0; INSTRUCTION_MEMORY_WORDS],
        }
    }
}

impl InstructionMemory {
    /// All words, indexed by address.
    #[must_use]
    pub const fn words(&self) -> &[u16; INSTRUCTION_MEMORY_WORDS] {
        &self.words
    }

    /// Word at `address` (taken modulo 32).
    #[must_use]
    pub const fn read(&self, address: usize) -> u16 {
        self.words[address % INSTRUCTION_MEMORY_WORDS]
    }

    /// Stores `opcode` at `address` (taken modulo 32).
    pub fn write(&mut self, address: usize, opcode: u16) {
        self.words[address % INSTRUCTION_MEMORY_WORDS] = opcode;
    }

    /// Copies `program` into memory starting at `origin` (or 0), wrapping past
    /// address 31. The program's own `.origin` directive is metadata only.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::ProgramTooLarge`] when the program has more than 32
    /// words; memory is left untouched.
    pub fn load(&mut self, program: &Program, origin: Option<u8>) -> PioResult<u8> {
        let len = program.code().len();
        if len > INSTRUCTION_MEMORY_WORDS {
            return Err(PioError::ProgramTooLarge { len });
        }
        let origin = origin.unwrap_or(0) & 0x1f;
        for (offset, &opcode) in program.code().iter().enumerate() {
            self.write(usize::from(origin) + offset, opcode);
        }
        log::debug!(
            "loaded program {} ({len} words) at {origin}",
            program.name().unwrap_or("<unnamed>")
        );
        Ok(origin)
    }

    /// Reads the whole memory back as an unnamed program at origin 0.
    #[must_use]
    pub fn snapshot(&self) -> Program {
        Program::new(None, None, self.words.to_vec())
    }

    /// Zeroes all words.
    pub fn unload(&mut self) {
        self.words = [0; INSTRUCTION_MEMORY_WORDS];
    }
}

#[cfg(test)]
mod tests {
    use super::{InstructionMemory, INSTRUCTION_MEMORY_WORDS};
    use crate::error::PioError;
    use crate::program::Program;

    #[test]
    fn load_wraps_past_the_top() {
        let mut memory = InstructionMemory::default();
        let program = Program::new(Some("wrap".into()), None, vec![1, 2, 3, 4]);
        assert_eq!(memory.load(&program, Some(30)), Ok(30));
        assert_eq!(memory.read(30), 1);
        assert_eq!(memory.read(31), 2);
        assert_eq!(memory.read(0), 3);
        assert_eq!(memory.read(1), 4);
    }

    #[test]
    fn origin_directive_does_not_move_the_load() {
        let mut memory = InstructionMemory::default();
        let program = Program::new(None, Some(4), vec![0xa042]);
        assert_eq!(memory.load(&program, None), Ok(0));
        assert_eq!(memory.read(0), 0xa042);
        assert_eq!(memory.read(4), 0);

        assert_eq!(memory.load(&program, Some(9)), Ok(9));
        assert_eq!(memory.read(9), 0xa042);
    }

    #[test]
    fn oversized_program_is_rejected() {
        let mut memory = InstructionMemory::default();
        let program = Program::new(None, None, vec![0xffff; INSTRUCTION_MEMORY_WORDS + 1]);
        assert_eq!(
            memory.load(&program, None),
            Err(PioError::ProgramTooLarge { len: 33 })
        );
        assert!(memory.words().iter().all(|&word| word == 0));
    }

    #[test]
    fn unload_zeroes_memory() {
        let mut memory = InstructionMemory::default();
        memory.write(40, 0x1234);
        assert_eq!(memory.read(8), 0x1234);
        memory.unload();
        assert_eq!(memory.read(8), 0);
    }
}
