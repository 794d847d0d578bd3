use crate::shared::dns::wire::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str;

/// A wrapper for domain names. The [`Name`] struct holds valid absolute
/// domain names, folded to lowercase on entry: name comparison in the
/// whole system is case-insensitive and folding once at the boundary
/// keeps every internal comparison a plain equality. [`Name`] implements
/// `AsRef<str>`, so a reference to the inner string can be easily obtained.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Name(String);

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Name {
    const POINTER_BITS: u8 = 0b1100_0000;
    const POINTER_MASK: u16 = 0b0011_1111_1111_1111;
    const MAX_JUMPS: u16 = 15;

    /// Creates a [`Name`] from the passed string, folding it to lowercase.
    /// Relative names are accepted and made absolute. The string must
    /// otherwise be a valid domain name.
    pub fn from_string(s: &str) -> Result<Self, NameErr> {
        let mut name = s.to_ascii_lowercase();
        if !name.ends_with('.') {
            name.push('.');
        }
        validate_name(&name)?;
        Ok(Self(name))
    }

    /// Creates a [`Name`] parsing its binary representation (a series of
    /// length-prefixed labels, possibly ending in a compression pointer).
    /// The number of pointer jumps is bounded to avoid malicious loops.
    pub fn decode_from_buf(buffer: &mut WireBuf) -> Result<Self, NameErr> {
        let mut name_bytes: Vec<u8> = Vec::with_capacity(64);
        let mut pos_after_jump: usize = 0;
        let mut n_jumps: u16 = 0;

        loop {
            let len_byte = check_end(buffer.read_u8())?;
            if len_byte & Self::POINTER_BITS == Self::POINTER_BITS {
                // Compression pointer: jump the cursor to the referenced
                // offset, remembering where to come back after the first one.
                if n_jumps >= Self::MAX_JUMPS {
                    return Err(NameErr::MaxJumps);
                }
                let second_byte = check_end(buffer.read_u8())? as u16;
                if n_jumps == 0 {
                    pos_after_jump = buffer.pos();
                }
                let offset = (((len_byte as u16) << 8) | second_byte) & Self::POINTER_MASK;
                if offset as usize >= buffer.len() {
                    return Err(NameErr::PointerOutOfBounds);
                }
                buffer.seek(offset as usize);
                n_jumps += 1;
                continue;
            }
            if len_byte & Self::POINTER_BITS != 0 {
                // Starting bits 10 or 01 are reserved.
                return Err(NameErr::MalformedLabel("wrong starting bits"));
            }
            if len_byte > 63 {
                return Err(NameErr::LongLabel);
            }
            if len_byte == 0 {
                name_bytes.push(b'.');
                break;
            }
            if !name_bytes.is_empty() {
                name_bytes.push(b'.');
            }
            let label_bytes = check_end(buffer.read_bytes(len_byte as usize))?;
            name_bytes.extend(label_bytes);
            if name_bytes.len() > 255 {
                return Err(NameErr::LongName);
            }
        }

        if pos_after_jump > 0 {
            buffer.seek(pos_after_jump);
        }

        match str::from_utf8(&name_bytes) {
            Err(_) => Err(NameErr::MalformedName("not UTF-8")),
            Ok(name) => {
                let name = name.to_ascii_lowercase();
                validate_name(&name)?;
                Ok(Self(name))
            }
        }
    }

    /// Encode the [`Name`] in its binary representation: length-prefixed
    /// labels closed by a zero byte. Compression is never emitted.
    pub fn encode(&self) -> Vec<u8> {
        debug_assert!(validate_name(&self.0).is_ok());
        let mut vec = Vec::with_capacity(self.0.len() + 1);
        if self.0 != "." {
            for label in self.0.trim_end_matches('.').split('.') {
                vec.push(label.len() as u8);
                vec.extend(label.as_bytes());
            }
        }
        vec.push(0);
        vec
    }

    /// Iterate the labels of the [`Name`], leftmost first. The root
    /// name yields no labels.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.trim_end_matches('.').split('.').filter(|l| !l.is_empty())
    }
}

// Validate the string to check if it's a valid (absolute, lowercase)
// domain name. Both the whole name and single labels are checked.
fn validate_name(name: &str) -> Result<(), NameErr> {
    if name == "." {
        return Ok(());
    }
    if name.len() > 255 {
        return Err(NameErr::LongName);
    }
    if !name.ends_with('.') {
        return Err(NameErr::RelativeName);
    }
    if name.starts_with('.') {
        return Err(NameErr::MalformedName("starts with dot"));
    }
    if name.contains("..") {
        return Err(NameErr::MalformedName("double dot in name"));
    }
    for label in name[..name.len() - 1].split('.') {
        validate_label(label)?;
    }
    Ok(())
}

// Validate a single label: length, edges and allowed characters.
fn validate_label(label: &str) -> Result<(), NameErr> {
    if label.is_empty() {
        return Err(NameErr::MalformedLabel("empty label"));
    }
    if label.len() > 63 {
        return Err(NameErr::LongLabel);
    }
    let first = label.chars().next().unwrap();
    let last = label.chars().last().unwrap();
    if !first.is_ascii_alphanumeric() && first != '_' {
        return Err(NameErr::MalformedLabel("must start with alphanumeric"));
    }
    if !last.is_ascii_alphanumeric() {
        return Err(NameErr::MalformedLabel("must end with alphanumeric"));
    }
    let inner_ok = label.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if !inner_ok {
        return Err(NameErr::MalformedLabel("must contain alphanumeric or '-'"));
    }
    Ok(())
}

fn check_end<T>(opt: Option<T>) -> Result<T, NameErr> {
    match opt {
        None => Err(NameErr::BytesEnd),
        Some(v) => Ok(v),
    }
}

/// Errors returned by the [`Name`] creation and validation processes.
#[derive(Debug, Clone)]
pub enum NameErr {
    BytesEnd,
    MaxJumps,
    PointerOutOfBounds,
    RelativeName,
    LongName,
    LongLabel,
    MalformedName(&'static str),
    MalformedLabel(&'static str),
}
