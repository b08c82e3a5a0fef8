//! Text encodings for string fields and textual header patterns
//!
//! Charsets are named in schemas by their usual labels (`"UTF-8"`,
//! `"ISO-8859-1"`, ...), resolved case-insensitively by [`Charset::for_name`].

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Supported character encodings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize, serde::Deserialize))]
pub enum Charset {
    Ascii,
    Latin1,
    Utf8,
    Utf16Be,
    Utf16Le,
}

impl Default for Charset {
    fn default() -> Self {
        Charset::Utf8
    }
}

/// Text could not be converted to or from bytes in a given charset
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CharsetError {
    /// The bytes are not valid in the charset; `at` is the offending index
    Malformed { charset: Charset, at: usize },
    /// The text holds a character the charset cannot represent
    Unmappable { charset: Charset, ch: char },
}

impl Display for CharsetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CharsetError::Malformed { charset, at } => {
                write!(f, "malformed {} input at byte {}", charset.name(), at)
            }
            CharsetError::Unmappable { charset, ch } => {
                write!(f, "character {:?} cannot be encoded in {}", ch, charset.name())
            }
        }
    }
}

impl Error for CharsetError {}

impl Charset {
    /// Resolves a charset label, ignoring case and the `-`/`_` distinction.
    ///
    /// Returns `None` for labels that do not name a supported charset.
    #[must_use]
    pub fn for_name(name: &str) -> Option<Self> {
        let norm: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "ascii" | "usascii" | "us" => Some(Charset::Ascii),
            "iso88591" | "latin1" | "l1" => Some(Charset::Latin1),
            "utf8" => Some(Charset::Utf8),
            "utf16" | "utf16be" => Some(Charset::Utf16Be),
            "utf16le" => Some(Charset::Utf16Le),
            _ => None,
        }
    }

    /// Canonical label of the charset
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Charset::Ascii => "US-ASCII",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Utf8 => "UTF-8",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Utf16Le => "UTF-16LE",
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<String, CharsetError> {
        match self {
            Charset::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(at) => Err(CharsetError::Malformed { charset: self, at }),
                None => Ok(bytes.iter().map(|&b| b as char).collect()),
            },
            Charset::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
            Charset::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| CharsetError::Malformed {
                    charset: self,
                    at: e.valid_up_to(),
                }),
            Charset::Utf16Be | Charset::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return Err(CharsetError::Malformed {
                        charset: self,
                        at: bytes.len() - 1,
                    });
                }
                let units = bytes.chunks_exact(2).map(|pair| {
                    let pair = [pair[0], pair[1]];
                    if self == Charset::Utf16Be {
                        u16::from_be_bytes(pair)
                    } else {
                        u16::from_le_bytes(pair)
                    }
                });
                let mut out = String::with_capacity(bytes.len() / 2);
                for (ix, ch) in char::decode_utf16(units).enumerate() {
                    match ch {
                        Ok(ch) => out.push(ch),
                        Err(_) => {
                            return Err(CharsetError::Malformed {
                                charset: self,
                                at: ix * 2,
                            })
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    pub fn encode(self, text: &str) -> Result<Vec<u8>, CharsetError> {
        match self {
            Charset::Ascii | Charset::Latin1 => {
                let limit = if self == Charset::Ascii { 0x7f } else { 0xff };
                text.chars()
                    .map(|ch| {
                        if (ch as u32) <= limit {
                            Ok(ch as u32 as u8)
                        } else {
                            Err(CharsetError::Unmappable { charset: self, ch })
                        }
                    })
                    .collect()
            }
            Charset::Utf8 => Ok(text.as_bytes().to_vec()),
            Charset::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            Charset::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
        }
    }
}

impl Display for Charset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
