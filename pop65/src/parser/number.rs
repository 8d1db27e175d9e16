//! Number literal parsing

use crate::error::{AsmError, ErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    Hexadecimal, // $FF
    Binary,      // %11111111
    Octal,       // @377
    Decimal,     // 255
}

impl NumberFormat {
    /// Format selected by a literal's leading prefix character, if any.
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            '$' => Some(NumberFormat::Hexadecimal),
            '%' => Some(NumberFormat::Binary),
            '@' => Some(NumberFormat::Octal),
            _ => None,
        }
    }

    pub fn radix(self) -> u32 {
        match self {
            NumberFormat::Hexadecimal => 16,
            NumberFormat::Binary => 2,
            NumberFormat::Octal => 8,
            NumberFormat::Decimal => 10,
        }
    }

    fn name(self) -> &'static str {
        match self {
            NumberFormat::Hexadecimal => "hexadecimal",
            NumberFormat::Binary => "binary",
            NumberFormat::Octal => "octal",
            NumberFormat::Decimal => "decimal",
        }
    }
}

pub struct NumberParser;

impl NumberParser {
    /// Parse a literal including its prefix, e.g. `$C000`, `%1010`, `@17`, `42`.
    pub fn parse(s: &str) -> Result<u16> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match chars.next().and_then(NumberFormat::from_prefix) {
            Some(format) => Self::parse_digits(chars.as_str(), format),
            None => Self::parse_digits(trimmed, NumberFormat::Decimal),
        }
    }

    /// Parse the digits of a literal (prefix already stripped).
    pub fn parse_digits(digits: &str, format: NumberFormat) -> Result<u16> {
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(format.radix())) {
            return Err(AsmError::new(
                ErrorKind::Lex,
                format!("invalid {} literal '{}'", format.name(), digits),
            ));
        }
        let value = u32::from_str_radix(digits, format.radix()).map_err(|_| {
            AsmError::syntax(format!("{} literal '{}' too large", format.name(), digits))
        })?;
        u16::try_from(value).map_err(|_| {
            AsmError::syntax(format!(
                "{} literal '{}' does not fit in 16 bits",
                format.name(),
                digits
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_formats() {
        assert_eq!(NumberParser::parse("$FF").unwrap(), 255);
        assert_eq!(NumberParser::parse("$ff").unwrap(), 255);
        assert_eq!(NumberParser::parse("$1234").unwrap(), 0x1234);
        assert_eq!(NumberParser::parse("$FfFf").unwrap(), 0xFFFF);
    }

    #[test]
    fn test_binary_and_octal() {
        assert_eq!(NumberParser::parse("%11111111").unwrap(), 255);
        assert_eq!(NumberParser::parse("%10101010").unwrap(), 0xAA);
        assert_eq!(NumberParser::parse("@377").unwrap(), 255);
        assert_eq!(NumberParser::parse("@10").unwrap(), 8);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(NumberParser::parse("255").unwrap(), 255);
        assert_eq!(NumberParser::parse("0").unwrap(), 0);
        assert_eq!(NumberParser::parse("65535").unwrap(), 65535);
    }

    #[test]
    fn test_out_of_range_is_syntax_error() {
        let err = NumberParser::parse("65536").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(NumberParser::parse("$10000").unwrap_err().kind(), ErrorKind::Syntax);
    }

    #[test]
    fn test_malformed_is_lex_error() {
        assert_eq!(NumberParser::parse("$").unwrap_err().kind(), ErrorKind::Lex);
        assert_eq!(NumberParser::parse("%102").unwrap_err().kind(), ErrorKind::Lex);
        assert_eq!(NumberParser::parse("@8").unwrap_err().kind(), ErrorKind::Lex);
        assert_eq!(NumberParser::parse("12ab").unwrap_err().kind(), ErrorKind::Lex);
    }
}
