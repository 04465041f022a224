//! Pure functions over a single 32-bit instruction word: extracting the
//! opcode and register/value fields, and (for the test fixtures) the
//! reverse direction of assembling a word from its fields.

pub const NUM_REGISTERS: usize = 8;

const OPCODE_LSB: u32 = 28;

const RA_LSB: u32 = 6;
const RB_LSB: u32 = 3;
const RC_LSB: u32 = 0;
const REG_WIDTH: u32 = 3;

const LV_RA_LSB: u32 = 25;
const LV_VALUE_LSB: u32 = 0;
const LV_VALUE_WIDTH: u32 = 25;

#[inline]
fn mask(width: u32) -> u32 {
    (1u32 << width) - 1
}

#[inline]
fn field(word: u32, lsb: u32, width: u32) -> u32 {
    (word >> lsb) & mask(width)
}

/// The fourteen operations a well-formed instruction word can name.
/// Opcodes 14 and 15 never construct an `Opcode`; see [`Opcode::decode`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum Opcode {
    ConditionalMove = 0,
    SegmentedLoad = 1,
    SegmentedStore = 2,
    Add = 3,
    Multiply = 4,
    Divide = 5,
    Nand = 6,
    Halt = 7,
    Activate = 8,
    Inactivate = 9,
    Output = 10,
    Input = 11,
    LoadProgram = 12,
    LoadValue = 13,
}

impl Opcode {
    /// Decodes the top 4 bits of `word`. Returns `None` for 14 and 15,
    /// which name no instruction; the engine treats that as a no-op.
    fn decode(word: u32) -> Option<Opcode> {
        use Opcode::*;
        Some(match field(word, OPCODE_LSB, 4) {
            0 => ConditionalMove,
            1 => SegmentedLoad,
            2 => SegmentedStore,
            3 => Add,
            4 => Multiply,
            5 => Divide,
            6 => Nand,
            7 => Halt,
            8 => Activate,
            9 => Inactivate,
            10 => Output,
            11 => Input,
            12 => LoadProgram,
            13 => LoadValue,
            _ => return None,
        })
    }
}

/// The register operands of a standard-format instruction (opcodes 0..12).
/// Holds operand *indices* (0..7 into the register file), not values —
/// see [`crate::engine::Registers`] for the register file itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Operands {
    pub a: usize,
    pub b: usize,
    pub c: usize,
}

/// The operands of a load-value instruction (opcode 13).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LoadValue {
    pub a: usize,
    pub value: u32,
}

/// The result of decoding one instruction word.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Decoded {
    Standard(Opcode, Operands),
    LoadValue(LoadValue),
    /// Opcode 14 or 15. The engine ignores these.
    Unknown,
}

/// Decodes a single instruction word. Total and infallible: every 32-bit
/// value decodes to something, even if that something is `Unknown`.
pub fn decode(word: u32) -> Decoded {
    match field(word, OPCODE_LSB, 4) {
        13 => Decoded::LoadValue(LoadValue {
            a: field(word, LV_RA_LSB, REG_WIDTH) as usize,
            value: field(word, LV_VALUE_LSB, LV_VALUE_WIDTH),
        }),
        _ => match Opcode::decode(word) {
            Some(opcode) => Decoded::Standard(
                opcode,
                Operands {
                    a: field(word, RA_LSB, REG_WIDTH) as usize,
                    b: field(word, RB_LSB, REG_WIDTH) as usize,
                    c: field(word, RC_LSB, REG_WIDTH) as usize,
                },
            ),
            None => Decoded::Unknown,
        },
    }
}

/// Assembles a standard-format instruction word. Used only by the test
/// fixtures to build `.um` images in-process; the engine never calls this.
pub fn assemble_standard(opcode: Opcode, a: u32, b: u32, c: u32) -> u32 {
    ((opcode as u32) << OPCODE_LSB)
        | ((a & mask(REG_WIDTH)) << RA_LSB)
        | ((b & mask(REG_WIDTH)) << RB_LSB)
        | ((c & mask(REG_WIDTH)) << RC_LSB)
}

/// Assembles a load-value instruction word.
pub fn assemble_load_value(a: u32, value: u32) -> u32 {
    ((Opcode::LoadValue as u32) << OPCODE_LSB)
        | ((a & mask(REG_WIDTH)) << LV_RA_LSB)
        | (value & mask(LV_VALUE_WIDTH))
}
