//! The fetch-decode-execute loop: registers, program counter, and dispatch
//! over the fourteen opcodes, driven against a [`SegmentStore`].

use std::io::{Read, Write};

use getset::{CopyGetters, Getters};
use log::{log_enabled, trace, Level};

use crate::codec::{decode, Decoded, Opcode, NUM_REGISTERS};
use crate::error::UmError;
use crate::segment::SegmentStore;

/// The eight general-purpose registers. A thin wrapper rather than a bare
/// `[u32; 8]` so register width stays a single, named invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers([u32; NUM_REGISTERS]);

impl Registers {
    fn new() -> Self {
        Self([0; NUM_REGISTERS])
    }

    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        self.0[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: u32) {
        self.0[index] = value;
    }
}

/// Whether the machine is still fetching instructions or has come to rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Halted,
}

/// Holds the eight registers, the program counter, and the segment store.
/// Input and output are generic so tests can drive the engine against
/// in-memory buffers instead of the process's real standard streams.
#[derive(Getters, CopyGetters)]
pub struct Engine<R: Read, W: Write> {
    #[getset(get = "pub")]
    registers: Registers,
    #[getset(get_copy = "pub")]
    pc: u32,
    store: SegmentStore,
    input: R,
    output: W,
}

impl<R: Read, W: Write> Engine<R, W> {
    /// Builds an engine over a store whose segment 0 already holds the
    /// program image (populated by the loader).
    pub fn new(store: SegmentStore, input: R, output: W) -> Self {
        Self {
            registers: Registers::new(),
            pc: 0,
            store,
            input,
            output,
        }
    }

    /// Consumes the engine and returns the output sink, useful in tests
    /// that run a machine against an in-memory `Vec<u8>` and then inspect
    /// what it wrote.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs until HALT (`Ok(())`) or a fatal condition (`Err`).
    pub fn run(&mut self) -> Result<(), UmError> {
        loop {
            if self.step()? == State::Halted {
                return Ok(());
            }
        }
    }

    /// Executes exactly one instruction. Returns `State::Halted` after a
    /// HALT instruction retires; otherwise `State::Running`.
    fn step(&mut self) -> Result<State, UmError> {
        let seg0_len = self.store.length(0)?;
        if self.pc >= seg0_len {
            return Err(UmError::FellOffProgram);
        }

        let word = self.store.get(0, self.pc)?;
        self.pc += 1;

        match decode(word) {
            Decoded::LoadValue(lv) => {
                if log_enabled!(Level::Trace) {
                    trace!("LV r{} <- {}", lv.a, lv.value);
                }
                self.registers.set(lv.a, lv.value);
                Ok(State::Running)
            }
            Decoded::Standard(opcode, regs) => self.execute(opcode, regs),
            Decoded::Unknown => {
                trace!("ignoring unknown opcode at pc={}", self.pc - 1);
                Ok(State::Running)
            }
        }
    }

    fn execute(
        &mut self,
        opcode: Opcode,
        regs: crate::codec::Operands,
    ) -> Result<State, UmError> {
        let (a, b, c) = (regs.a, regs.b, regs.c);
        if log_enabled!(Level::Trace) {
            trace!("{:?} r{} r{} r{}", opcode, a, b, c);
        }

        match opcode {
            Opcode::ConditionalMove => {
                if self.registers.get(c) != 0 {
                    self.registers.set(a, self.registers.get(b));
                }
            }
            Opcode::SegmentedLoad => {
                let value = self.store.get(self.registers.get(b), self.registers.get(c))?;
                self.registers.set(a, value);
            }
            Opcode::SegmentedStore => {
                self.store.set(
                    self.registers.get(a),
                    self.registers.get(b),
                    self.registers.get(c),
                )?;
            }
            Opcode::Add => {
                let sum = self.registers.get(b).wrapping_add(self.registers.get(c));
                self.registers.set(a, sum);
            }
            Opcode::Multiply => {
                let product = self.registers.get(b).wrapping_mul(self.registers.get(c));
                self.registers.set(a, product);
            }
            Opcode::Divide => {
                let divisor = self.registers.get(c);
                if divisor == 0 {
                    panic!("division by zero at pc={}", self.pc - 1);
                }
                self.registers.set(a, self.registers.get(b) / divisor);
            }
            Opcode::Nand => {
                let nand = !(self.registers.get(b) & self.registers.get(c));
                self.registers.set(a, nand);
            }
            Opcode::Halt => return Ok(State::Halted),
            Opcode::Activate => {
                let address = self.store.alloc(self.registers.get(c));
                self.registers.set(b, address);
            }
            Opcode::Inactivate => {
                self.store.free(self.registers.get(c))?;
            }
            Opcode::Output => {
                let byte = (self.registers.get(c) & 0xFF) as u8;
                self.output.write_all(&[byte])?;
            }
            Opcode::Input => {
                let mut byte = [0u8; 1];
                let value = match self.input.read(&mut byte)? {
                    0 => 0xFFFF_FFFF,
                    _ => byte[0] as u32,
                };
                self.registers.set(c, value);
            }
            Opcode::LoadProgram => {
                let b_val = self.registers.get(b);
                if b_val != 0 {
                    self.store.dup_into_zero(b_val)?;
                }
                self.pc = self.registers.get(c);
            }
            Opcode::LoadValue => unreachable!("load-value is decoded separately"),
        }

        Ok(State::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{assemble_load_value, assemble_standard, Opcode as Op};
    use crate::loader::load_image;
    use std::io::Cursor;

    fn engine_from(words: &[u32]) -> Engine<Cursor<Vec<u8>>, Vec<u8>> {
        let mut bytes = Vec::with_capacity(words.len() * 4);
        for w in words {
            bytes.extend_from_slice(&w.to_be_bytes());
        }
        let store = load_image(Cursor::new(bytes)).unwrap();
        Engine::new(store, Cursor::new(Vec::new()), Vec::new())
    }

    #[test]
    fn outputs_two_loaded_values() {
        let words = [
            assemble_load_value(1, b'a' as u32),
            assemble_standard(Op::Output, 0, 0, 1),
            assemble_load_value(1, b'b' as u32),
            assemble_standard(Op::Output, 0, 0, 1),
            assemble_standard(Op::Halt, 0, 0, 0),
        ];
        let mut engine = engine_from(&words);
        engine.run().unwrap();
        assert_eq!(engine.output, b"ab");
    }

    #[test]
    fn add_then_output_digit() {
        let words = [
            assemble_load_value(1, 1),
            assemble_load_value(2, 2),
            assemble_standard(Op::Add, 1, 1, 2),
            assemble_load_value(2, 48),
            assemble_standard(Op::Add, 1, 1, 2),
            assemble_standard(Op::Output, 0, 0, 1),
            assemble_standard(Op::Halt, 0, 0, 0),
        ];
        let mut engine = engine_from(&words);
        engine.run().unwrap();
        assert_eq!(engine.output, b"3");
    }

    #[test]
    fn division_is_unsigned_floor() {
        let words = [
            assemble_load_value(1, 7),
            assemble_load_value(2, 2),
            assemble_standard(Op::Divide, 3, 1, 2),
            assemble_standard(Op::Halt, 0, 0, 0),
        ];
        let mut engine = engine_from(&words);
        engine.run().unwrap();
        assert_eq!(engine.registers.get(3), 3);
    }

    #[test]
    fn nand_is_bitwise_complement_of_and() {
        let words = [
            assemble_load_value(1, 0b1100),
            assemble_load_value(2, 0b1010),
            assemble_standard(Op::Nand, 3, 1, 2),
            assemble_standard(Op::Halt, 0, 0, 0),
        ];
        let mut engine = engine_from(&words);
        engine.run().unwrap();
        assert_eq!(engine.registers.get(3), !(0b1100u32 & 0b1010));
    }

    #[test]
    fn echoes_stdin_to_stdout() {
        let words = {
            let mut w = Vec::new();
            for _ in 0..8 {
                w.push(assemble_standard(Op::Input, 0, 0, 1));
                w.push(assemble_standard(Op::Output, 0, 0, 1));
            }
            w.push(assemble_standard(Op::Halt, 0, 0, 0));
            w
        };
        let mut bytes = Vec::new();
        for w in &words {
            bytes.extend_from_slice(&w.to_be_bytes());
        }
        let store = load_image(Cursor::new(bytes)).unwrap();
        let mut engine = Engine::new(store, Cursor::new(b"abcdefgh".to_vec()), Vec::new());
        engine.run().unwrap();
        assert_eq!(engine.output, b"abcdefgh");
    }

    #[test]
    fn input_at_eof_sets_all_ones() {
        let words = [
            assemble_standard(Op::Input, 0, 0, 1),
            assemble_standard(Op::Halt, 0, 0, 0),
        ];
        let mut engine = engine_from(&words);
        engine.run().unwrap();
        assert_eq!(engine.registers.get(1), 0xFFFF_FFFF);
    }

    #[test]
    fn activate_then_inactivate_then_reactivate_reuses_address() {
        let words = [
            assemble_load_value(1, 4),
            assemble_standard(Op::Activate, 0, 2, 1),
            assemble_standard(Op::Inactivate, 0, 0, 2),
            assemble_standard(Op::Activate, 0, 3, 1),
            assemble_standard(Op::Halt, 0, 0, 0),
        ];
        let mut engine = engine_from(&words);
        engine.run().unwrap();
        assert_eq!(engine.registers.get(2), engine.registers.get(3));
        assert_eq!(engine.output, b"");
    }

    #[test]
    fn sstore_then_sload_round_trips_through_a_segment() {
        let words = [
            assemble_load_value(1, b'S' as u32),
            assemble_load_value(4, 0),
            assemble_load_value(5, 3),
            assemble_standard(Op::Activate, 0, 2, 5),
            assemble_standard(Op::SegmentedStore, 2, 4, 1),
            assemble_standard(Op::SegmentedLoad, 6, 2, 4),
            assemble_standard(Op::Output, 0, 0, 6),
            assemble_standard(Op::Halt, 0, 0, 0),
        ];
        let mut engine = engine_from(&words);
        engine.run().unwrap();
        assert_eq!(engine.output, b"S");
    }

    #[test]
    fn load_program_with_zero_source_is_a_pure_jump() {
        // LOADP r0 r2 r3 with r2 = 0 must not duplicate segment 0; it only
        // sets PC <- r3, jumping straight to HALT and skipping the LV that
        // would otherwise clobber r5.
        let words = [
            assemble_load_value(2, 0),
            assemble_load_value(3, 4),
            assemble_standard(Op::LoadProgram, 0, 2, 3),
            assemble_load_value(5, 0xBAD),
            assemble_standard(Op::Halt, 0, 0, 0),
        ];
        let mut engine = engine_from(&words);
        engine.run().unwrap();
        assert_eq!(engine.registers.get(5), 0);
    }

    #[test]
    fn load_program_duplicates_segment_and_jumps() {
        // Build a target segment containing a single LV+OUT+HALT sequence,
        // activate it, then LOADP into it and confirm it runs in place of
        // the original program.
        let target = [
            assemble_load_value(1, b'Z' as u32),
            assemble_standard(Op::Output, 0, 0, 1),
            assemble_standard(Op::Halt, 0, 0, 0),
        ];
        let mut store = crate::segment::SegmentStore::new();
        let seg0 = [assemble_standard(Op::Halt, 0, 0, 0)];
        let zero = store.alloc(seg0.len() as u32);
        assert_eq!(zero, 0);
        for (i, w) in seg0.iter().enumerate() {
            store.set(0, i as u32, *w).unwrap();
        }
        let target_addr = store.alloc(target.len() as u32);
        for (i, w) in target.iter().enumerate() {
            store.set(target_addr, i as u32, *w).unwrap();
        }

        let mut engine = Engine::new(store, Cursor::new(Vec::new()), Vec::new());
        engine.registers.set(1, target_addr);
        engine.registers.set(2, 0);
        // Manually perform the LOADP r0 r1 r2 effect via the public API.
        engine.step_loadp_for_test(1, 2);
        engine.run().unwrap();
        assert_eq!(engine.output, b"Z");
    }

    #[test]
    fn falling_off_the_program_is_an_error() {
        let words = [assemble_load_value(1, 1)];
        let mut engine = engine_from(&words);
        let err = engine.run().unwrap_err();
        assert!(matches!(err, UmError::FellOffProgram));
    }

    impl<R: Read, W: Write> Engine<R, W> {
        /// Test-only helper exercising the LOADP opcode directly without
        /// hand-assembling it into the image, since it needs registers
        /// populated with an address only known once the store is built.
        #[cfg(test)]
        fn step_loadp_for_test(&mut self, b: usize, c: usize) {
            self.execute(
                Opcode::LoadProgram,
                crate::codec::Operands { a: 0, b, c },
            )
            .unwrap();
        }
    }
}
