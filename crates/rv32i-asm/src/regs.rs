//! RISC-V 32-bit general-purpose registers.

use alloc::string::ToString;
use core::fmt;

use nom::{
    character::complete::{digit1, one_of},
    combinator::{all_consuming, map_res, opt},
    sequence::preceded,
    IResult,
};

use crate::error::OperandError;

/// Number of general-purpose registers.
pub const GPR_COUNT: usize = 32;

/// RISC-V 32-bit general-purpose register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gpr(u8);

impl Gpr {
    /// The hardwired zero register.
    pub const ZERO: Gpr = Gpr(0);
    /// Conventional link register.
    pub const RA: Gpr = Gpr(1);

    /// Create a new GPR from register number (0-31).
    ///
    /// # Panics
    ///
    /// Panics if the register number is >= 32.
    pub fn new(num: u8) -> Self {
        assert!((num as usize) < GPR_COUNT, "Register number must be < 32");
        Self(num)
    }

    /// Get the register number (0-31).
    pub fn num(&self) -> u8 {
        self.0
    }

    /// Index into a register array.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Parse a register token.
    ///
    /// Accepts `x0`..`x31` (either case of the prefix) or a bare `0`..`31`.
    pub fn parse(token: &str) -> Result<Self, OperandError> {
        match all_consuming(register_number)(token) {
            Ok((_, num)) if (num as usize) < GPR_COUNT => Ok(Gpr(num)),
            _ => Err(OperandError::InvalidRegister {
                token: token.to_string(),
            }),
        }
    }

    /// ABI alias, for human-readable dumps only.
    pub fn abi_name(&self) -> &'static str {
        match self.0 {
            0 => "zero",
            1 => "ra",
            2 => "sp",
            3 => "gp",
            4 => "tp",
            5 => "t0",
            6 => "t1",
            7 => "t2",
            8 => "s0",
            9 => "s1",
            10 => "a0",
            11 => "a1",
            12 => "a2",
            13 => "a3",
            14 => "a4",
            15 => "a5",
            16 => "a6",
            17 => "a7",
            18 => "s2",
            19 => "s3",
            20 => "s4",
            21 => "s5",
            22 => "s6",
            23 => "s7",
            24 => "s8",
            25 => "s9",
            26 => "s10",
            27 => "s11",
            28 => "t3",
            29 => "t4",
            30 => "t5",
            31 => "t6",
            _ => unreachable!(),
        }
    }

    /// All registers in index order.
    pub fn all() -> impl Iterator<Item = Gpr> {
        (0..GPR_COUNT as u8).map(Gpr)
    }
}

/// `x`-prefixed or bare register number; range is checked by the caller.
pub(crate) fn register_number(input: &str) -> IResult<&str, u8> {
    map_res(preceded(opt(one_of("xX")), digit1), |s: &str| {
        s.parse::<u8>()
    })(input)
}

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}
