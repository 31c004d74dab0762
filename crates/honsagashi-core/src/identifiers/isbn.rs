use crate::error::{NdlError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Isbn {
    pub raw: String,
    pub isbn13: String,
    pub isbn10: Option<String>,
}

/// Drops hyphens and blanks the way the thumbnail endpoint expects.
pub fn strip_isbn(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

fn isbn13_checksum(digits: &[u8]) -> u32 {
    digits
        .iter()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d as u32 } else { d as u32 * 3 })
        .sum()
}

impl Isbn {
    pub fn parse(input: &str) -> Result<Self> {
        let stripped = strip_isbn(input);
        let invalid = || NdlError::InvalidIsbn(input.to_string());

        match stripped.len() {
            13 => {
                let digits = stripped
                    .chars()
                    .map(|c| c.to_digit(10).map(|d| d as u8))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(invalid)?;
                if isbn13_checksum(&digits) % 10 != 0 {
                    return Err(invalid());
                }
                let isbn10 = stripped
                    .starts_with("978")
                    .then(|| isbn10_from_body(&digits[3..12]));
                Ok(Self {
                    raw: input.to_string(),
                    isbn13: stripped,
                    isbn10,
                })
            }
            10 => {
                let mut digits = Vec::with_capacity(10);
                for (i, c) in stripped.chars().enumerate() {
                    match c {
                        'X' if i == 9 => digits.push(10),
                        c if c.is_ascii_digit() => digits.push(c as u8 - b'0'),
                        _ => return Err(invalid()),
                    }
                }
                let sum: u32 = digits
                    .iter()
                    .enumerate()
                    .map(|(i, &d)| (10 - i as u32) * d as u32)
                    .sum();
                if sum % 11 != 0 {
                    return Err(invalid());
                }

                let mut d13 = vec![9, 7, 8];
                d13.extend_from_slice(&digits[..9]);
                let check = (10 - isbn13_checksum(&d13) % 10) % 10;
                d13.push(check as u8);

                Ok(Self {
                    raw: input.to_string(),
                    isbn13: d13.iter().map(|d| d.to_string()).collect(),
                    isbn10: Some(stripped),
                })
            }
            _ => Err(invalid()),
        }
    }
}

fn isbn10_from_body(body: &[u8]) -> String {
    let sum: u32 = body
        .iter()
        .enumerate()
        .map(|(i, &d)| (10 - i as u32) * d as u32)
        .sum();
    let check = (11 - sum % 11) % 11;
    let mut s: String = body.iter().map(|d| d.to_string()).collect();
    s.push(if check == 10 {
        'X'
    } else {
        char::from(b'0' + check as u8)
    });
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_isbn13_with_hyphens() {
        let isbn = Isbn::parse("978-4-12-102750-4").unwrap();
        assert_eq!(isbn.isbn13, "9784121027504");
        assert_eq!(isbn.isbn10.as_deref(), Some("4121027507"));
    }

    #[test]
    fn valid_isbn10_converts_to_isbn13() {
        let isbn = Isbn::parse("4121027507").unwrap();
        assert_eq!(isbn.isbn13, "9784121027504");
    }

    #[test]
    fn isbn10_with_x_check() {
        let isbn = Isbn::parse("007462542X").unwrap();
        assert_eq!(isbn.isbn10.as_deref(), Some("007462542X"));
    }

    #[test]
    fn invalid_check_digit() {
        assert!(Isbn::parse("9784121027505").is_err());
        assert!(Isbn::parse("not an isbn").is_err());
    }

    #[test]
    fn strip_removes_hyphens_and_spaces() {
        assert_eq!(strip_isbn("978-4-12 102750-4"), "9784121027504");
    }
}
