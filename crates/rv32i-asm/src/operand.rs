//! Literal and operand parsers.

use alloc::string::ToString;

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, digit1, hex_digit1, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::{
    error::OperandError,
    regs::{register_number, Gpr},
};

/// Decoded `offset(base)` memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemOperand {
    pub offset: i32,
    pub base: Gpr,
}

/// Unsigned literal in hex, binary or decimal.
fn unsigned_literal(input: &str) -> IResult<&str, i64> {
    alt((
        map_res(preceded(tag_no_case("0x"), hex_digit1), |s: &str| {
            i64::from_str_radix(s, 16)
        }),
        map_res(
            preceded(
                tag_no_case("0b"),
                take_while1(|c: char| c == '0' || c == '1'),
            ),
            |s: &str| i64::from_str_radix(s, 2),
        ),
        map_res(digit1, |s: &str| s.parse::<i64>()),
    ))(input)
}

/// Integer literal with optional sign.
pub(crate) fn integer(input: &str) -> IResult<&str, i64> {
    map(
        pair(opt(one_of("+-")), unsigned_literal),
        |(sign, value)| if sign == Some('-') { -value } else { value },
    )(input)
}

/// Parse a whole token as an integer literal.
pub fn parse_literal(token: &str) -> Option<i64> {
    all_consuming(integer)(token).ok().map(|(_, value)| value)
}

/// Narrow a literal to a 32-bit pattern.
///
/// Values in `u32` range above `i32::MAX` keep their bit pattern.
pub(crate) fn to_word(value: i64) -> Option<i32> {
    if let Ok(v) = i32::try_from(value) {
        Some(v)
    } else {
        u32::try_from(value).ok().map(|v| v as i32)
    }
}

/// Parse an immediate operand.
pub fn parse_immediate(token: &str) -> Result<i32, OperandError> {
    parse_literal(token)
        .and_then(to_word)
        .ok_or_else(|| OperandError::InvalidImmediate {
            token: token.to_string(),
        })
}

/// `offset(reg)` split into its offset literal and register token.
fn offset_base(input: &str) -> IResult<&str, (i64, &str)> {
    tuple((
        integer,
        delimited(char('('), recognize(register_number), char(')')),
    ))(input)
}

/// Parse a memory operand: `offset(xN)` or a bare integer (base `x0`).
pub fn parse_memory_operand(token: &str) -> Result<MemOperand, OperandError> {
    let invalid = || OperandError::InvalidMemoryOperand {
        token: token.to_string(),
    };

    if let Ok((_, (offset, base))) = all_consuming(offset_base)(token) {
        let offset = to_word(offset).ok_or_else(invalid)?;
        let base = Gpr::parse(base)?;
        return Ok(MemOperand { offset, base });
    }

    let offset = parse_literal(token).and_then(to_word).ok_or_else(invalid)?;
    Ok(MemOperand {
        offset,
        base: Gpr::ZERO,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer() {
        assert_eq!(integer("42"), Ok(("", 42)));
        assert_eq!(integer("-42"), Ok(("", -42)));
        assert_eq!(integer("+7"), Ok(("", 7)));
        assert_eq!(integer("0"), Ok(("", 0)));
        assert_eq!(integer("42(x1)"), Ok(("(x1)", 42)));
    }

    #[test]
    fn test_parse_literal_radixes() {
        assert_eq!(parse_literal("0x1F"), Some(31));
        assert_eq!(parse_literal("0XfF"), Some(255));
        assert_eq!(parse_literal("0b101"), Some(5));
        assert_eq!(parse_literal("0B11"), Some(3));
        assert_eq!(parse_literal("-0x10"), Some(-16));
        assert_eq!(parse_literal("007"), Some(7));
    }

    #[test]
    fn test_parse_literal_invalid() {
        assert_eq!(parse_literal(""), None);
        assert_eq!(parse_literal("-"), None);
        assert_eq!(parse_literal("0x"), None);
        assert_eq!(parse_literal("0b"), None);
        assert_eq!(parse_literal("0b102"), None);
        assert_eq!(parse_literal("12abc"), None);
        assert_eq!(parse_literal("loop"), None);
        assert_eq!(parse_literal("x1"), None);
    }

    #[test]
    fn test_immediate_range() {
        assert_eq!(parse_immediate("2147483647"), Ok(i32::MAX));
        assert_eq!(parse_immediate("-2147483648"), Ok(i32::MIN));
        assert_eq!(parse_immediate("0xFFFFFFFF"), Ok(-1));
        assert_eq!(parse_immediate("0x80000000"), Ok(i32::MIN));
        assert!(parse_immediate("0x100000000").is_err());
        assert!(parse_immediate("-2147483649").is_err());
        assert_eq!(
            parse_immediate("ten"),
            Err(OperandError::InvalidImmediate {
                token: "ten".to_string()
            })
        );
    }

    #[test]
    fn test_memory_operand() {
        assert_eq!(
            parse_memory_operand("4(x2)"),
            Ok(MemOperand {
                offset: 4,
                base: Gpr::new(2)
            })
        );
        assert_eq!(
            parse_memory_operand("-8(X31)"),
            Ok(MemOperand {
                offset: -8,
                base: Gpr::new(31)
            })
        );
        assert_eq!(
            parse_memory_operand("0(5)"),
            Ok(MemOperand {
                offset: 0,
                base: Gpr::new(5)
            })
        );
        assert_eq!(
            parse_memory_operand("100"),
            Ok(MemOperand {
                offset: 100,
                base: Gpr::ZERO
            })
        );
    }

    #[test]
    fn test_memory_operand_bad_register() {
        assert_eq!(
            parse_memory_operand("4(x40)"),
            Err(OperandError::InvalidRegister {
                token: "x40".to_string()
            })
        );
    }

    #[test]
    fn test_memory_operand_malformed() {
        for token in ["(x1)", "4(x1", "4(sp)", "4[x1]", "x1", "4(x1)z", ""] {
            assert_eq!(
                parse_memory_operand(token),
                Err(OperandError::InvalidMemoryOperand {
                    token: token.to_string()
                }),
                "token {:?}",
                token
            );
        }
    }
}
