//! Brazilian taxpayer document (CPF) value object
//!
//! Patients and bank-transaction senders are both identified by CPF, and the
//! reconciliation matcher compares them, so the normalized, validated form
//! lives in the kernel.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from document parsing and validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("CPF must have 11 digits, got {0}")]
    InvalidLength(usize),

    #[error("CPF with all digits equal is invalid")]
    RepeatedDigits,

    #[error("CPF check digits do not match")]
    InvalidCheckDigit,
}

/// A validated CPF, stored as its 11 bare digits
///
/// Parsing accepts punctuated input ("111.444.777-35") and strips everything
/// that is not a digit before validating the mod-11 check digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    /// Parses and validates a CPF from free-form input
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.len() != 11 {
            return Err(DocumentError::InvalidLength(digits.len()));
        }

        let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();

        if values.iter().all(|&d| d == values[0]) {
            return Err(DocumentError::RepeatedDigits);
        }

        if check_digit(&values[..9], 10) != values[9]
            || check_digit(&values[..10], 11) != values[10]
        {
            return Err(DocumentError::InvalidCheckDigit);
        }

        Ok(Self(digits))
    }

    /// The 11 bare digits
    pub fn as_digits(&self) -> &str {
        &self.0
    }

    /// Standard punctuated form, e.g. "111.444.777-35"
    pub fn formatted(&self) -> String {
        format!(
            "{}.{}.{}-{}",
            &self.0[0..3],
            &self.0[3..6],
            &self.0[6..9],
            &self.0[9..11]
        )
    }
}

/// Mod-11 check digit over `digits` with weights starting at `start_weight`
fn check_digit(digits: &[u32], start_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (start_weight - i as u32))
        .sum();
    let rem = sum % 11;
    if rem < 2 {
        0
    } else {
        11 - rem
    }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

impl FromStr for Cpf {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cpf {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cpf> for String {
    fn from(cpf: Cpf) -> String {
        cpf.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpf_parse_valid() {
        let cpf = Cpf::parse("111.444.777-35").unwrap();
        assert_eq!(cpf.as_digits(), "11144477735");
        assert_eq!(cpf.formatted(), "111.444.777-35");

        // Bare digits are accepted too
        assert!(Cpf::parse("52998224725").is_ok());
    }

    #[test]
    fn test_cpf_rejects_bad_length() {
        assert_eq!(
            Cpf::parse("1234567890"),
            Err(DocumentError::InvalidLength(10))
        );
        assert_eq!(Cpf::parse(""), Err(DocumentError::InvalidLength(0)));
    }

    #[test]
    fn test_cpf_rejects_repeated_digits() {
        assert_eq!(
            Cpf::parse("111.111.111-11"),
            Err(DocumentError::RepeatedDigits)
        );
    }

    #[test]
    fn test_cpf_rejects_bad_check_digit() {
        assert_eq!(
            Cpf::parse("111.444.777-36"),
            Err(DocumentError::InvalidCheckDigit)
        );
        assert_eq!(
            Cpf::parse("52998224724"),
            Err(DocumentError::InvalidCheckDigit)
        );
    }

    #[test]
    fn test_cpf_equality_ignores_punctuation() {
        let a = Cpf::parse("111.444.777-35").unwrap();
        let b = Cpf::parse("11144477735").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cpf_serde_roundtrip() {
        let cpf = Cpf::parse("529.982.247-25").unwrap();
        let json = serde_json::to_string(&cpf).unwrap();
        assert_eq!(json, "\"52998224725\"");
        let back: Cpf = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cpf);

        assert!(serde_json::from_str::<Cpf>("\"00000000000\"").is_err());
    }
}
