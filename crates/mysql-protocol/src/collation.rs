//! Charset names, collation indexes and their text encodings.
//!
//! The handshake carries the session collation in a single byte, and each
//! column definition carries its own collation index. [`CharsetMap`] turns
//! a configured charset name into the handshake byte; [`TextEncoding::for_collation`]
//! tells the session how to encode command text and the value decoder how
//! to turn column bytes into text.
//!
//! | Charset | Collation indexes | Encoding |
//! |---------|-------------------|----------|
//! | `big5` | 1, 84 | Big5 |
//! | `latin2` | 2, 9, 21, 27, 77 | ISO-8859-2 |
//! | `latin1` | 5, 8, 15, 31, 47, 48, 49, 94 | Windows-1252 |
//! | `ujis` | 12, 91 | EUC-JP |
//! | `sjis` | 13, 88 | Shift_JIS |
//! | `cp1251` | 14, 23, 50, 51, 52 | Windows-1251 |
//! | `cp1250` | 26, 34, 44, 66, 99 | Windows-1250 |
//! | `gbk` | 28, 87 | GBK |
//! | `binary` | 63 | raw bytes |
//! | `gb18030` | 248, 249, 250 | GB18030 |
//! | `utf8`, `utf8mb4`, `ascii`, others | | UTF-8 |

use std::borrow::Cow;
use std::collections::HashMap;

use encoding_rs::Encoding;

use crate::error::ProtocolError;

/// Collation used when no mapping exists for the requested charset
/// (`utf8_general_ci`).
pub const DEFAULT_COLLATION_INDEX: u16 = 33;

/// The `binary` pseudo-collation: column bytes are not text.
pub const BINARY_COLLATION_INDEX: u16 = 63;

/// How text in a given collation maps to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8 (`utf8`, `utf8mb4`, `ascii` and anything not otherwise known).
    Utf8,
    /// `latin1` (Windows-1252).
    Latin1,
    /// `latin2` (ISO-8859-2).
    Latin2,
    /// `cp1250` (Windows-1250).
    Cp1250,
    /// `cp1251` (Windows-1251).
    Cp1251,
    /// `big5`.
    Big5,
    /// `sjis` (Shift_JIS).
    Sjis,
    /// `ujis` (EUC-JP).
    Ujis,
    /// `gbk`.
    Gbk,
    /// `gb18030`.
    Gb18030,
    /// Not text; decoded as bytes.
    Binary,
}

impl TextEncoding {
    /// Text encoding for a collation index.
    #[must_use]
    pub fn for_collation(index: u16) -> Self {
        match index {
            BINARY_COLLATION_INDEX => Self::Binary,
            1 | 84 => Self::Big5,
            2 | 9 | 21 | 27 | 77 => Self::Latin2,
            5 | 8 | 15 | 31 | 47 | 48 | 49 | 94 => Self::Latin1,
            12 | 91 => Self::Ujis,
            13 | 88 => Self::Sjis,
            14 | 23 | 50 | 51 | 52 => Self::Cp1251,
            26 | 34 | 44 | 66 | 99 => Self::Cp1250,
            28 | 87 => Self::Gbk,
            248..=250 => Self::Gb18030,
            _ => Self::Utf8,
        }
    }

    /// Charset name as the server reports it.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Latin1 => "latin1",
            Self::Latin2 => "latin2",
            Self::Cp1250 => "cp1250",
            Self::Cp1251 => "cp1251",
            Self::Big5 => "big5",
            Self::Sjis => "sjis",
            Self::Ujis => "ujis",
            Self::Gbk => "gbk",
            Self::Gb18030 => "gb18030",
            Self::Binary => "binary",
        }
    }

    /// The `encoding_rs` codec, or `None` where text is passed as UTF-8.
    #[must_use]
    pub fn encoding(self) -> Option<&'static Encoding> {
        match self {
            Self::Utf8 | Self::Binary => None,
            Self::Latin1 => Some(encoding_rs::WINDOWS_1252),
            Self::Latin2 => Some(encoding_rs::ISO_8859_2),
            Self::Cp1250 => Some(encoding_rs::WINDOWS_1250),
            Self::Cp1251 => Some(encoding_rs::WINDOWS_1251),
            Self::Big5 => Some(encoding_rs::BIG5),
            Self::Sjis => Some(encoding_rs::SHIFT_JIS),
            Self::Ujis => Some(encoding_rs::EUC_JP),
            Self::Gbk => Some(encoding_rs::GBK),
            Self::Gb18030 => Some(encoding_rs::GB18030),
        }
    }

    /// Encode `text`, rejecting characters the charset cannot represent.
    ///
    /// `what` names the field in the error.
    pub fn encode<'a>(
        self,
        text: &'a str,
        what: &'static str,
    ) -> Result<Cow<'a, [u8]>, ProtocolError> {
        let Some(encoding) = self.encoding() else {
            return Ok(Cow::Borrowed(text.as_bytes()));
        };
        let (bytes, _, unmappable) = encoding.encode(text);
        if unmappable {
            return Err(ProtocolError::Unmappable {
                what,
                charset: self.name(),
            });
        }
        Ok(bytes)
    }

    /// Decode `raw` as text. `None` if the bytes are not valid in the
    /// charset.
    #[must_use]
    pub fn decode(self, raw: &[u8]) -> Option<Cow<'_, str>> {
        match self.encoding() {
            Some(encoding) => encoding.decode_without_bom_handling_and_without_replacement(raw),
            None => std::str::from_utf8(raw).ok().map(Cow::Borrowed),
        }
    }
}

/// Charset name to default collation index.
///
/// This is configuration data: the map shipped by [`CharsetMap::default`]
/// covers the common server charsets and callers may extend it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharsetMap {
    entries: HashMap<String, u16>,
    fallback: u16,
}

impl Default for CharsetMap {
    fn default() -> Self {
        let entries = [
            ("big5", 1),
            ("latin2", 9),
            ("ascii", 11),
            ("ujis", 12),
            ("sjis", 13),
            ("latin1", 8),
            ("cp1251", 51),
            ("gbk", 28),
            ("utf8", 33),
            ("utf8mb3", 33),
            ("utf8mb4", 45),
            ("binary", 63),
            ("cp1250", 26),
            ("gb18030", 248),
        ]
        .into_iter()
        .map(|(name, index)| (name.to_string(), index))
        .collect();

        Self {
            entries,
            fallback: DEFAULT_COLLATION_INDEX,
        }
    }
}

impl CharsetMap {
    /// An empty map that resolves every name to `fallback`.
    #[must_use]
    pub fn empty(fallback: u16) -> Self {
        Self {
            entries: HashMap::new(),
            fallback,
        }
    }

    /// Add or replace a mapping.
    #[must_use]
    pub fn with(mut self, charset: impl Into<String>, index: u16) -> Self {
        self.entries.insert(charset.into().to_ascii_lowercase(), index);
        self
    }

    /// Collation index for `charset`, or the fallback when unmapped.
    #[must_use]
    pub fn index_of(&self, charset: &str) -> u16 {
        self.entries
            .get(&charset.to_ascii_lowercase())
            .copied()
            .unwrap_or(self.fallback)
    }

    /// Resolve `charset` to the one-byte index sent in the handshake.
    ///
    /// An index above 255 cannot be negotiated and is a configuration error.
    pub fn resolve(&self, charset: &str) -> Result<u8, ProtocolError> {
        let index = self.index_of(charset);
        u8::try_from(index).map_err(|_| ProtocolError::CollationOutOfRange {
            charset: charset.to_string(),
            index,
        })
    }
}
