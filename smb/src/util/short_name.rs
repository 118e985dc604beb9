//! Legacy 8.3 name generation for directory listings.
//!
//! A short name is `<base>~<c1><c2>.<ext>` where the base is at most five
//! characters of the long name, `c1 c2` encode a checksum over the raw bytes of
//! the long name, and the extension is at most three characters.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

const MANGLE_ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_-!@#$%";
const MANGLE_BASE: u32 = MANGLE_ALPHABET.len() as u32;
const MAGIC_CHAR: char = '~';
const MAX_BASE_LEN: usize = 5;
const MAX_EXTENSION_LEN: usize = 3;
const LEADING_DOT_EXTENSION: &str = "___";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShortName {
    name: String,
}

impl ShortName {
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The name as it is written into directory information records.
    pub fn to_utf16le(&self) -> Vec<u8> {
        self.name.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    /// Byte length of [`ShortName::to_utf16le`].
    pub fn utf16_len(&self) -> usize {
        self.name.encode_utf16().count() * 2
    }
}

impl Display for ShortName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

fn mangle_char(value: u32) -> char {
    MANGLE_ALPHABET[(value % MANGLE_BASE) as usize] as char
}

fn checksum(long_name: &str) -> u32 {
    long_name.bytes().map(u32::from).sum::<u32>() % (MANGLE_BASE * MANGLE_BASE)
}

fn upper_without_periods(part: &str, limit: usize) -> String {
    part.chars()
        .filter(|c| *c != '.')
        .take(limit)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Builds the 8.3 alias of `long_name`. `.` and `..` have none.
pub fn mangle(long_name: &str) -> Option<ShortName> {
    if long_name == "." || long_name == ".." {
        return None;
    }

    let (base_part, extension) = match long_name.rfind('.') {
        Some(0) => (&long_name[1..], Some(LEADING_DOT_EXTENSION.to_string())),
        Some(dot) => (&long_name[..dot], Some(upper_without_periods(&long_name[dot + 1..], MAX_EXTENSION_LEN))),
        None => (long_name, None),
    };
    let base = upper_without_periods(base_part, MAX_BASE_LEN);

    let csum = checksum(long_name);
    let mut name = String::with_capacity(MAX_BASE_LEN + 4 + MAX_EXTENSION_LEN);
    name.push_str(&base);
    name.push(MAGIC_CHAR);
    name.push(mangle_char(csum / MANGLE_BASE));
    name.push(mangle_char(csum));
    name.push('.');
    if let Some(extension) = extension {
        name.push_str(&extension);
    }
    Some(ShortName { name })
}
