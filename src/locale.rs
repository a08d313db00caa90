//! Compact language and country codes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexErrorKind, IndexResult};

fn pack(code: &str, len: usize) -> Option<u16> {
    if code.len() != len {
        return None;
    }
    code.bytes().try_fold(0u16, |acc, b| {
        let b = b.to_ascii_lowercase();
        b.is_ascii_lowercase().then(|| acc * 27 + u16::from(b - b'a' + 1))
    })
}

fn unpack(mut value: u16, len: usize) -> String {
    let mut code = vec![b'?'; len];
    for slot in code.iter_mut().rev() {
        let digit = (value % 27) as u8;
        if digit > 0 {
            *slot = b'a' + digit - 1;
        }
        value /= 27;
    }
    String::from_utf8_lossy(&code).into_owned()
}

/// ISO 639 language, stored as a packed three-letter code. Zero means unknown.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Lang(u16);

impl Lang {
    /// Unknown language.
    pub const NULL: Lang = Lang(0);

    /// Parse a three-letter code such as `eng`.
    pub fn from_code(code: &str) -> IndexResult<Self> {
        pack(code, 3)
            .map(Lang)
            .ok_or_else(|| IndexError::from(IndexErrorKind::InvalidLanguage(code.to_string())))
    }

    /// Restore a language from its packed form.
    pub const fn from_raw(raw: u16) -> Self {
        Lang(raw)
    }

    /// The packed form, as serialized.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Whether the language is unknown.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("nul")
        } else {
            f.write_str(&unpack(self.0, 3))
        }
    }
}

/// ISO 3166 country, stored as a packed two-letter code. Zero means unknown.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Country(u16);

impl Country {
    /// Unknown country.
    pub const NULL: Country = Country(0);

    /// Parse a two-letter code such as `us`.
    pub fn from_code(code: &str) -> IndexResult<Self> {
        pack(code, 2)
            .map(Country)
            .ok_or_else(|| IndexError::from(IndexErrorKind::InvalidCountry(code.to_string())))
    }

    /// Whether the country is unknown.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("nul")
        } else {
            f.write_str(&unpack(self.0, 2))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_pack_and_print() {
        let eng = Lang::from_code("eng").unwrap();
        assert!(!eng.is_null());
        assert_eq!(eng.to_string(), "eng");
        assert_eq!(Lang::from_code("ENG").unwrap(), eng);
        assert_eq!(Lang::from_raw(eng.raw()), eng);
        assert_eq!(Country::from_code("us").unwrap().to_string(), "us");
        assert_eq!(Lang::NULL.to_string(), "nul");
    }

    #[test]
    fn test_bad_codes_rejected() {
        assert!(Lang::from_code("en").is_err());
        assert!(Lang::from_code("e1g").is_err());
        assert!(Country::from_code("usa").is_err());
    }
}
