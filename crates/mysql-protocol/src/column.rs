//! Column definitions sent ahead of every text result set.

use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{read_lenenc_int, read_lenenc_string, write_lenenc_bytes, write_lenenc_int};
use crate::error::ProtocolError;

/// Server column type codes (`MYSQL_TYPE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[non_exhaustive]
pub enum ColumnType {
    /// Legacy `DECIMAL`.
    Decimal = 0x00,
    /// `TINYINT`.
    Tiny = 0x01,
    /// `SMALLINT`.
    Short = 0x02,
    /// `INT`.
    Long = 0x03,
    /// `FLOAT`.
    Float = 0x04,
    /// `DOUBLE`.
    Double = 0x05,
    /// Literal `NULL` column.
    Null = 0x06,
    /// `TIMESTAMP`.
    Timestamp = 0x07,
    /// `BIGINT`.
    LongLong = 0x08,
    /// `MEDIUMINT`.
    Int24 = 0x09,
    /// `DATE`.
    Date = 0x0A,
    /// `TIME`.
    Time = 0x0B,
    /// `DATETIME`.
    DateTime = 0x0C,
    /// `YEAR`.
    Year = 0x0D,
    /// Internal date type.
    NewDate = 0x0E,
    /// `VARCHAR`.
    VarChar = 0x0F,
    /// `BIT(n)`.
    Bit = 0x10,
    /// `TIMESTAMP` with fractional seconds.
    Timestamp2 = 0x11,
    /// `DATETIME` with fractional seconds.
    DateTime2 = 0x12,
    /// `TIME` with fractional seconds.
    Time2 = 0x13,
    /// `JSON`.
    Json = 0xF5,
    /// `DECIMAL`/`NUMERIC`.
    NewDecimal = 0xF6,
    /// `ENUM`.
    Enum = 0xF7,
    /// `SET`.
    Set = 0xF8,
    /// `TINYBLOB`/`TINYTEXT`.
    TinyBlob = 0xF9,
    /// `MEDIUMBLOB`/`MEDIUMTEXT`.
    MediumBlob = 0xFA,
    /// `LONGBLOB`/`LONGTEXT`.
    LongBlob = 0xFB,
    /// `BLOB`/`TEXT`.
    Blob = 0xFC,
    /// `VARCHAR`/`VARBINARY`.
    VarString = 0xFD,
    /// `CHAR`/`BINARY`.
    String = 0xFE,
    /// Spatial types.
    Geometry = 0xFF,
}

impl TryFrom<u8> for ColumnType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x00 => Self::Decimal,
            0x01 => Self::Tiny,
            0x02 => Self::Short,
            0x03 => Self::Long,
            0x04 => Self::Float,
            0x05 => Self::Double,
            0x06 => Self::Null,
            0x07 => Self::Timestamp,
            0x08 => Self::LongLong,
            0x09 => Self::Int24,
            0x0A => Self::Date,
            0x0B => Self::Time,
            0x0C => Self::DateTime,
            0x0D => Self::Year,
            0x0E => Self::NewDate,
            0x0F => Self::VarChar,
            0x10 => Self::Bit,
            0x11 => Self::Timestamp2,
            0x12 => Self::DateTime2,
            0x13 => Self::Time2,
            0xF5 => Self::Json,
            0xF6 => Self::NewDecimal,
            0xF7 => Self::Enum,
            0xF8 => Self::Set,
            0xF9 => Self::TinyBlob,
            0xFA => Self::MediumBlob,
            0xFB => Self::LongBlob,
            0xFC => Self::Blob,
            0xFD => Self::VarString,
            0xFE => Self::String,
            0xFF => Self::Geometry,
            other => return Err(ProtocolError::UnknownColumnType(other)),
        })
    }
}

impl ColumnType {
    /// Whether values of this type are integers.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Tiny | Self::Short | Self::Long | Self::LongLong | Self::Int24 | Self::Year
        )
    }

    /// Whether values of this type are exact decimals.
    #[must_use]
    pub const fn is_decimal(self) -> bool {
        matches!(self, Self::Decimal | Self::NewDecimal)
    }

    /// Whether values of this type are dates or times.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            Self::Timestamp
                | Self::Date
                | Self::Time
                | Self::DateTime
                | Self::NewDate
                | Self::Timestamp2
                | Self::DateTime2
                | Self::Time2
        )
    }

    /// Whether values of this type are character or byte strings.
    #[must_use]
    pub const fn is_string(self) -> bool {
        matches!(
            self,
            Self::VarChar
                | Self::VarString
                | Self::String
                | Self::Enum
                | Self::Set
                | Self::TinyBlob
                | Self::MediumBlob
                | Self::LongBlob
                | Self::Blob
                | Self::Json
                | Self::Geometry
        )
    }

    /// SQL type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Decimal | Self::NewDecimal => "DECIMAL",
            Self::Tiny => "TINYINT",
            Self::Short => "SMALLINT",
            Self::Long => "INT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Null => "NULL",
            Self::Timestamp | Self::Timestamp2 => "TIMESTAMP",
            Self::LongLong => "BIGINT",
            Self::Int24 => "MEDIUMINT",
            Self::Date | Self::NewDate => "DATE",
            Self::Time | Self::Time2 => "TIME",
            Self::DateTime | Self::DateTime2 => "DATETIME",
            Self::Year => "YEAR",
            Self::VarChar | Self::VarString => "VARCHAR",
            Self::Bit => "BIT",
            Self::Json => "JSON",
            Self::Enum => "ENUM",
            Self::Set => "SET",
            Self::TinyBlob => "TINYBLOB",
            Self::MediumBlob => "MEDIUMBLOB",
            Self::LongBlob => "LONGBLOB",
            Self::Blob => "BLOB",
            Self::String => "CHAR",
            Self::Geometry => "GEOMETRY",
        }
    }
}

bitflags! {
    /// Column attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ColumnFlags: u16 {
        /// `NOT NULL`.
        const NOT_NULL = 1;
        /// Part of the primary key.
        const PRIMARY_KEY = 1 << 1;
        /// Part of a unique key.
        const UNIQUE_KEY = 1 << 2;
        /// Part of a non-unique key.
        const MULTIPLE_KEY = 1 << 3;
        /// BLOB or TEXT column.
        const BLOB = 1 << 4;
        /// Unsigned integer.
        const UNSIGNED = 1 << 5;
        /// `ZEROFILL`.
        const ZEROFILL = 1 << 6;
        /// Binary collation.
        const BINARY = 1 << 7;
        /// `ENUM`.
        const ENUM = 1 << 8;
        /// `AUTO_INCREMENT`.
        const AUTO_INCREMENT = 1 << 9;
        /// `TIMESTAMP`.
        const TIMESTAMP = 1 << 10;
        /// `SET`.
        const SET = 1 << 11;
        /// No default value.
        const NO_DEFAULT_VALUE = 1 << 12;
        /// `ON UPDATE NOW()`.
        const ON_UPDATE_NOW = 1 << 13;
        /// Numeric column.
        const NUM = 1 << 15;
    }
}

/// Length of the fixed-width block that follows the name fields.
const FIXED_FIELDS_LEN: u64 = 0x0C;

/// Column definition (`Protocol::ColumnDefinition41`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Schema (database) name.
    pub schema: String,
    /// Table name or alias.
    pub table: String,
    /// Physical table name.
    pub org_table: String,
    /// Column name or alias.
    pub name: String,
    /// Physical column name.
    pub org_name: String,
    /// Collation index of the column's values.
    pub collation: u16,
    /// Maximum display length.
    pub column_length: u32,
    /// Type code.
    pub column_type: ColumnType,
    /// Attribute flags.
    pub flags: ColumnFlags,
    /// Decimal digits.
    pub decimals: u8,
}

impl ColumnDefinition {
    /// Create a definition with the given name and type, other fields empty.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            name: name.into(),
            org_name: String::new(),
            collation: crate::collation::DEFAULT_COLLATION_INDEX,
            column_length: 0,
            column_type,
            flags: ColumnFlags::empty(),
            decimals: 0,
        }
    }

    /// Set the flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ColumnFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the collation index.
    #[must_use]
    pub fn with_collation(mut self, collation: u16) -> Self {
        self.collation = collation;
        self
    }

    /// Whether integer values are unsigned.
    #[must_use]
    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(ColumnFlags::UNSIGNED)
    }

    /// Parse a column definition payload.
    pub fn decode(mut src: Bytes) -> Result<Self, ProtocolError> {
        let _catalog = read_lenenc_string(&mut src, "column catalog")?;
        let schema = read_lenenc_string(&mut src, "column schema")?;
        let table = read_lenenc_string(&mut src, "column table")?;
        let org_table = read_lenenc_string(&mut src, "column org_table")?;
        let name = read_lenenc_string(&mut src, "column name")?;
        let org_name = read_lenenc_string(&mut src, "column org_name")?;

        let fixed_len = read_lenenc_int(&mut src)?.unwrap_or(0);
        if fixed_len < FIXED_FIELDS_LEN {
            return Err(ProtocolError::malformed(
                "column definition",
                format!("fixed-length block is {fixed_len} bytes, expected 12"),
            ));
        }
        // charset + length + type + flags + decimals
        let needed = 2 + 4 + 1 + 2 + 1;
        if src.remaining() < needed {
            return Err(ProtocolError::incomplete(needed, src.remaining()));
        }
        let collation = src.get_u16_le();
        let column_length = src.get_u32_le();
        let column_type = ColumnType::try_from(src.get_u8())?;
        let flags = ColumnFlags::from_bits_retain(src.get_u16_le());
        let decimals = src.get_u8();

        Ok(Self {
            schema,
            table,
            org_table,
            name,
            org_name,
            collation,
            column_length,
            column_type,
            flags,
            decimals,
        })
    }

    /// Encode the definition (server side, used by test servers).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(32 + self.name.len() * 2);
        write_lenenc_bytes(&mut buf, b"def");
        write_lenenc_bytes(&mut buf, self.schema.as_bytes());
        write_lenenc_bytes(&mut buf, self.table.as_bytes());
        write_lenenc_bytes(&mut buf, self.org_table.as_bytes());
        write_lenenc_bytes(&mut buf, self.name.as_bytes());
        write_lenenc_bytes(&mut buf, self.org_name.as_bytes());
        write_lenenc_int(&mut buf, FIXED_FIELDS_LEN);
        buf.put_u16_le(self.collation);
        buf.put_u32_le(self.column_length);
        buf.put_u8(self.column_type as u8);
        buf.put_u16_le(self.flags.bits());
        buf.put_u8(self.decimals);
        buf.put_u16_le(0);
        buf.freeze()
    }
}
