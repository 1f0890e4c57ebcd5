//! Instruction decoder for Sea16.
//!
//! Opcodes come in two tiers:
//! - `0x00..=0x7F`: eight blocks of sixteen. The high nibble selects a
//!   [`BlockOp`] and the low nibble is its inline operand (a fast-slot
//!   index or a 4-bit immediate).
//! - `0x80..=0xFF`: one [`Op`] per exact byte. A handful of bytes in this
//!   range are unassigned and decode to [`DecodeError::Illegal`].
//!
//! Decoding only classifies the opcode byte. Operand bytes are consumed by
//! the executor while the instruction runs, so the instruction length is
//! never known up front (see `switchlist`).

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Operations in the nibble-block tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockOp {
    /// A := word[fast(n)]
    LoadA,
    /// B := word[fast(n)]
    LoadB,
    /// push word[fast(n)]
    Push,
    /// word[fast(n)] := A
    StoreA,
    /// A := n
    LoadImmA,
    /// B := n
    LoadImmB,
    /// push n
    PushImm,
    /// A := A + n
    AddImm,
}

impl BlockOp {
    /// All block operations in opcode order.
    pub const ALL: [BlockOp; 8] = [
        BlockOp::LoadA,
        BlockOp::LoadB,
        BlockOp::Push,
        BlockOp::StoreA,
        BlockOp::LoadImmA,
        BlockOp::LoadImmB,
        BlockOp::PushImm,
        BlockOp::AddImm,
    ];

    /// Create from the high nibble of an opcode in `0x00..=0x7F`.
    pub fn from_high_nibble(nibble: u8) -> Self {
        Self::ALL[(nibble & 7) as usize]
    }

    /// The opcode byte with a zero low nibble.
    pub fn base(self) -> u8 {
        (self as u8) << 4
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            BlockOp::LoadA => "lda fast",
            BlockOp::LoadB => "ldb fast",
            BlockOp::Push => "push fast",
            BlockOp::StoreA => "sta fast",
            BlockOp::LoadImmA => "lda #n",
            BlockOp::LoadImmB => "ldb #n",
            BlockOp::PushImm => "push #n",
            BlockOp::AddImm => "add #n",
        }
    }
}

macro_rules! exact_ops {
    ($($(#[$doc:meta])* $name:ident = $byte:literal, $mnemonic:literal;)*) => {
        /// Operations in the exact-byte tier. The discriminant is the opcode.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum Op {
            $($(#[$doc])* $name = $byte,)*
        }

        impl Op {
            /// Look up an opcode in `0x80..=0xFF`. Unassigned bytes yield `None`.
            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(Op::$name),)*
                    _ => None,
                }
            }

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Op::$name => $mnemonic,)*
                }
            }
        }
    };
}

exact_ops! {
    LdaNear = 0x80, "lda near";
    LdaFar = 0x81, "lda far";
    LdbNear = 0x82, "ldb near";
    LdbFar = 0x83, "ldb far";
    PushNear = 0x84, "push near";
    PushFar = 0x85, "push far";
    StaNear = 0x86, "sta near";
    StaFar = 0x87, "sta far";

    LdaImm8 = 0x88, "lda #xx";
    LdaImm16 = 0x89, "lda #xxxx";
    LdbImm8 = 0x8a, "ldb #xx";
    LdbImm16 = 0x8b, "ldb #xxxx";
    PushImm8 = 0x8c, "push #xx";
    PushImm16 = 0x8d, "push #xxxx";
    AddImm8 = 0x8e, "add #xx";
    AddImm16 = 0x8f, "add #xxxx";

    LdaAbs = 0x90, "lda abs";
    LdbAbs = 0x91, "ldb abs";
    PushAbs = 0x92, "push abs";
    StaAbs = 0x93, "sta abs";
    BldaAbs = 0x94, "blda abs";
    BldbAbs = 0x95, "bldb abs";
    BpushAbs = 0x96, "bpush abs";
    BstaAbs = 0x97, "bsta abs";

    BldaFar = 0x98, "blda far";
    BldbFar = 0x99, "bldb far";
    BpushFar = 0x9a, "bpush far";
    BstaFar = 0x9b, "bsta far";
    LeaaFar = 0x9c, "leaa far";
    LeabFar = 0x9d, "leab far";
    PeaFar = 0x9e, "pea far";
    /// Unassigned, executes as a no-op.
    Reserved9F = 0x9f, "reserved";

    Deref = 0xa0, "deref";
    PopStore = 0xa1, "popstore";
    Bderef = 0xa2, "bderef";
    BpopStore = 0xa3, "bpopstore";
    Pha = 0xa4, "pha";
    Plb = 0xa5, "plb";
    Unstack8 = 0xa6, "unstack #xx";
    Unstack16 = 0xa7, "unstack #xxxx";
    Call = 0xa8, "call xxxx";
    CallPtr = 0xa9, "callptr";
    /// Call, then reserve a byte count read from the callee's entry.
    CallReserve = 0xaa, "call xxxx, #yy";
    CallPtrReserve = 0xab, "callptr #yy";
    /// Unassigned, executes as a no-op.
    ReservedAC = 0xac, "reserved";
    /// Unassigned, executes as a no-op.
    ReservedAD = 0xad, "reserved";
    Return = 0xae, "return";
    Swap = 0xaf, "swap";

    Ucmplt = 0xb0, "ucmplt";
    Ucmple = 0xb1, "ucmple";
    Ucmpgt = 0xb2, "ucmpgt";
    Ucmpge = 0xb3, "ucmpge";
    Scmplt = 0xb4, "scmplt";
    Scmple = 0xb5, "scmple";
    Scmpgt = 0xb6, "scmpgt";
    Scmpge = 0xb7, "scmpge";
    Cmpeq = 0xb8, "cmpeq";
    Cmpne = 0xb9, "cmpne";
    Not = 0xba, "not";
    Neg = 0xbb, "neg";
    Compl = 0xbc, "compl";
    And = 0xbd, "and";
    Or = 0xbe, "or";
    Xor = 0xbf, "xor";

    Add = 0xc0, "add";
    Dec = 0xc1, "dec";
    Rsub = 0xc2, "rsub";
    Sub = 0xc3, "sub";
    Lshift = 0xc4, "lshift";
    Double = 0xc5, "double";
    Rshift = 0xc6, "rshift";
    Arshift = 0xc7, "arshift";
    Divu = 0xc8, "divu";
    Divs = 0xc9, "divs";
    Modu = 0xca, "modu";
    Mods = 0xcb, "mods";
    Mult = 0xcc, "mult";
    Sloadbf = 0xcd, "sloadbf";
    Uloadbf = 0xce, "uloadbf";
    Storebf = 0xcf, "storebf";

    JumptFwd = 0xd0, "jumpt +xx";
    JumptBack = 0xd1, "jumpt -xx";
    JumptAbs = 0xd2, "jumpt xxxx";
    JumpfFwd = 0xd4, "jumpf +xx";
    JumpfBack = 0xd5, "jumpf -xx";
    JumpfAbs = 0xd6, "jumpf xxxx";
    JumpFwd = 0xd8, "jump +xx";
    JumpBack = 0xd9, "jump -xx";
    JumpAbs = 0xda, "jump xxxx";
    SwitchRange = 0xdc, "switchrange";
    SwitchList = 0xdd, "switchlist";
    In = 0xde, "in";
    Out = 0xdf, "out";

    ExtendA = 0xe0, "extenda";
    ExtendB = 0xe1, "extendb";
    MemCopy = 0xe2, "copy #xxxx";
    MemFill = 0xe3, "fill #xxxx";
    MemCompare = 0xe4, "mcmp #xxxx";
    LdaSp = 0xec, "lda sp";
    StaSp = 0xed, "sta sp";
    Zalloc = 0xee, "zalloc #xx";
    DirectCount = 0xef, "direct count";
}

impl Op {
    /// The opcode byte.
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Unassigned opcodes that are defined to do nothing.
    pub fn is_reserved(self) -> bool {
        matches!(self, Op::Reserved9F | Op::ReservedAC | Op::ReservedAD)
    }
}

/// A decoded opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Nibble-block tier: operation plus its inline 4-bit operand.
    Block { op: BlockOp, nibble: u8 },
    /// Exact-byte tier.
    Exact(Op),
}

impl Opcode {
    /// The byte this opcode was decoded from.
    pub fn byte(self) -> u8 {
        match self {
            Opcode::Block { op, nibble } => op.base() | (nibble & 0x0f),
            Opcode::Exact(op) => op.byte(),
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Block { op, .. } => op.mnemonic(),
            Opcode::Exact(op) => op.mnemonic(),
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::Block { op, nibble } => {
                let name = op.mnemonic();
                match name.strip_suffix("#n") {
                    Some(prefix) => write!(f, "{}#{}", prefix, nibble),
                    None => write!(f, "{} {}", name, nibble),
                }
            }
            Opcode::Exact(op) => f.write_str(op.mnemonic()),
        }
    }
}

/// Pointer steps selected by bits 4-5 of a `direct count` operand.
pub const DIRECT_STEPS: [i16; 4] = [1, 2, -1, -2];

/// What a `direct count` instruction does with the pointer held in its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectMode {
    /// ptr += step
    Adjust,
    /// ptr += step; A := ptr
    AdjustLoad,
    /// A := [ptr]; ptr += step
    LoadAdvance,
    /// [ptr] := A; ptr += step
    StoreAdvance,
}

/// Operand byte of `direct count` (0xEF).
///
/// ```text
///  7 6 | 5 4  | 3 2 1 0
///  mode| step | fast slot
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectCount {
    pub slot: u8,
    pub step: i16,
    pub mode: DirectMode,
}

impl DirectCount {
    pub fn from_operand(byte: u8) -> Self {
        let mode = match byte >> 6 {
            0 => DirectMode::Adjust,
            1 => DirectMode::AdjustLoad,
            2 => DirectMode::LoadAdvance,
            _ => DirectMode::StoreAdvance,
        };
        Self {
            slot: byte & 0x0f,
            step: DIRECT_STEPS[((byte >> 4) & 3) as usize],
            mode,
        }
    }

    #[cfg(test)]
    fn operand(self) -> u8 {
        let step = DIRECT_STEPS
            .iter()
            .position(|&s| s == self.step)
            .unwrap_or(0) as u8;
        (self.mode as u8) << 6 | step << 4 | (self.slot & 0x0f)
    }

    /// Steps of two walk over words, steps of one over bytes.
    pub fn is_word(self) -> bool {
        self.step.unsigned_abs() == 2
    }
}

/// Decode one opcode byte.
pub fn decode(byte: u8) -> Result<Opcode, DecodeError> {
    if byte < 0x80 {
        return Ok(Opcode::Block {
            op: BlockOp::from_high_nibble(byte >> 4),
            nibble: byte & 0x0f,
        });
    }

    Op::from_byte(byte)
        .map(Opcode::Exact)
        .ok_or(DecodeError::Illegal(byte))
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("illegal opcode {0:#04x}")]
    Illegal(u8),
}
