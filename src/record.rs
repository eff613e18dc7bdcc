use core::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::maybestd::{fmt, vec::Vec};

/// The length of an account address in bytes
pub const ADDRESS_LEN: usize = 20;

/// The width in bytes of the widest supported unsigned integer
pub const UINT_LEN: usize = 32;

/// A fixed-length account address
#[derive(PartialEq, PartialOrd, Eq, Ord, Copy, Clone, Hash, Default)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Wraps the given raw bytes as an address
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw address bytes
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Parses an address from hex, with or without a leading `0x`
    pub fn from_hex(hex_str: &str) -> Result<Self, InvalidAddress> {
        let digits = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let mut out = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut out).map_err(|_| InvalidAddress)?;
        Ok(Self(out))
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = InvalidAddress;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() != ADDRESS_LEN {
            return Err(InvalidAddress);
        }
        Ok(Self(value.try_into().unwrap()))
    }
}

impl FromStr for Address {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// An error indicating that an address could not be parsed
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct InvalidAddress;

impl fmt::Display for InvalidAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InvalidAddress")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidAddress {}

/// An unsigned integer of up to 256 bits, stored as a big-endian magnitude.
///
/// Values parse from decimal strings (`"1"`, `"42"`) or `0x`-prefixed hex and
/// display in decimal, so they round-trip through the textual form used by
/// the interchange artifact.
#[derive(PartialEq, PartialOrd, Eq, Ord, Copy, Clone, Hash, Default)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Uint([u8; UINT_LEN]);

impl Uint {
    /// The zero value
    pub const ZERO: Uint = Uint([0u8; UINT_LEN]);

    /// Wraps a big-endian magnitude as an integer
    pub const fn from_be_bytes(bytes: [u8; UINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the value as a zero-padded big-endian array
    pub const fn to_be_bytes(self) -> [u8; UINT_LEN] {
        self.0
    }

    /// Returns the minimal number of bits needed to represent this value.
    /// Zero requires zero bits.
    pub fn bits(&self) -> u32 {
        for (i, byte) in self.0.iter().enumerate() {
            if *byte != 0 {
                return ((UINT_LEN - i) as u32) * 8 - byte.leading_zeros();
            }
        }
        0
    }

    /// Returns true when the value fits in a field of the given bit width
    pub fn fits(&self, bits: u16) -> bool {
        self.bits() <= u32::from(bits)
    }

    fn from_decimal_digits(digits: &str) -> Result<Self, InvalidUint> {
        if digits.is_empty() {
            return Err(InvalidUint);
        }
        let mut out = [0u8; UINT_LEN];
        for ch in digits.bytes() {
            if !ch.is_ascii_digit() {
                return Err(InvalidUint);
            }
            // Multiply the accumulated magnitude by ten and add the new digit,
            // propagating the carry from the least significant byte upward.
            let mut carry = u16::from(ch - b'0');
            for byte in out.iter_mut().rev() {
                let acc = u16::from(*byte) * 10 + carry;
                *byte = acc as u8;
                carry = acc >> 8;
            }
            if carry != 0 {
                return Err(InvalidUint);
            }
        }
        Ok(Self(out))
    }

    fn from_hex_digits(digits: &str) -> Result<Self, InvalidUint> {
        if digits.is_empty() {
            return Err(InvalidUint);
        }
        let mut out = [0u8; UINT_LEN];
        for ch in digits.bytes() {
            let nibble = match ch {
                b'0'..=b'9' => ch - b'0',
                b'a'..=b'f' => ch - b'a' + 10,
                b'A'..=b'F' => ch - b'A' + 10,
                _ => return Err(InvalidUint),
            };
            if out[0] >> 4 != 0 {
                // The next shift would push bits past 256.
                return Err(InvalidUint);
            }
            let mut carry = nibble;
            for byte in out.iter_mut().rev() {
                let next = *byte >> 4;
                *byte = (*byte << 4) | carry;
                carry = next;
            }
        }
        Ok(Self(out))
    }
}

impl From<u8> for Uint {
    fn from(value: u8) -> Self {
        Self::from(u64::from(value))
    }
}

impl From<u16> for Uint {
    fn from(value: u16) -> Self {
        Self::from(u64::from(value))
    }
}

impl From<u32> for Uint {
    fn from(value: u32) -> Self {
        Self::from(u64::from(value))
    }
}

impl From<u64> for Uint {
    fn from(value: u64) -> Self {
        let mut out = [0u8; UINT_LEN];
        out[UINT_LEN - 8..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }
}

impl From<u128> for Uint {
    fn from(value: u128) -> Self {
        let mut out = [0u8; UINT_LEN];
        out[UINT_LEN - 16..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }
}

impl FromStr for Uint {
    type Err = InvalidUint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("0x") {
            Some(digits) => Self::from_hex_digits(digits),
            None => Self::from_decimal_digits(s),
        }
    }
}

impl fmt::Display for Uint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 2^256 needs at most 78 decimal digits.
        let mut buf = [0u8; 78];
        let mut pos = buf.len();
        let mut cur = self.0;
        loop {
            let mut rem = 0u32;
            for byte in cur.iter_mut() {
                let acc = rem * 256 + u32::from(*byte);
                *byte = (acc / 10) as u8;
                rem = acc % 10;
            }
            pos -= 1;
            buf[pos] = b'0' + rem as u8;
            if cur == [0u8; UINT_LEN] {
                break;
            }
        }
        f.write_str(core::str::from_utf8(&buf[pos..]).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for Uint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Uint(0x")?;
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        f.write_str(")")
    }
}

/// An error indicating that an unsigned integer could not be parsed
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct InvalidUint;

impl fmt::Display for InvalidUint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InvalidUint")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvalidUint {}

/// The broad kind of a schema field, used in mismatch diagnostics
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldKind {
    /// A fixed-length account address
    Address,
    /// An unsigned integer
    UnsignedInt,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Address => f.write_str("address"),
            FieldKind::UnsignedInt => f.write_str("uint"),
        }
    }
}

/// The declared type of a single schema field
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldType {
    /// A 20-byte account address, encoded as its raw bytes
    Address,
    /// An unsigned integer, encoded big-endian and zero-padded to `bits` wide.
    /// The width must be a multiple of eight in `8..=256`.
    UnsignedInt {
        /// The declared width of the field in bits
        bits: u16,
    },
}

impl FieldType {
    /// A 64-bit unsigned integer field
    pub const UINT64: FieldType = FieldType::UnsignedInt { bits: 64 };
    /// A 256-bit unsigned integer field
    pub const UINT256: FieldType = FieldType::UnsignedInt { bits: 256 };

    /// Returns the broad kind of this field type
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldType::Address => FieldKind::Address,
            FieldType::UnsignedInt { .. } => FieldKind::UnsignedInt,
        }
    }

    /// Returns the number of bytes a value of this type contributes to an
    /// encoded record
    pub fn encoded_len(&self) -> usize {
        match self {
            FieldType::Address => ADDRESS_LEN,
            FieldType::UnsignedInt { bits } => usize::from(*bits) / 8,
        }
    }
}

/// A runtime field value, checked against the declared field type at encode
/// time
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldValue {
    /// An account address
    Address(Address),
    /// An unsigned integer
    Uint(Uint),
}

impl FieldValue {
    /// Returns the broad kind of this value
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Address(_) => FieldKind::Address,
            FieldValue::Uint(_) => FieldKind::UnsignedInt,
        }
    }
}

impl From<Address> for FieldValue {
    fn from(value: Address) -> Self {
        FieldValue::Address(value)
    }
}

impl From<Uint> for FieldValue {
    fn from(value: Uint) -> Self {
        FieldValue::Uint(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Address(address) => address.fmt(f),
            FieldValue::Uint(value) => value.fmt(f),
        }
    }
}

/// The declared field layout shared by every record committed to one tree.
///
/// Encoding is a canonical concatenation of the fields in declaration order:
/// two engines given the same schema and values produce identical bytes, so
/// leaf hashes are reproducible across platforms.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "borsh", derive(borsh::BorshSerialize))]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Schema {
    fields: Vec<FieldType>,
}

impl Schema {
    /// Creates a schema from the given field types, rejecting empty layouts
    /// and invalid integer widths
    pub fn new(fields: Vec<FieldType>) -> Result<Self, EncodeError> {
        if fields.is_empty() {
            return Err(EncodeError::EmptySchema);
        }
        for field in fields.iter() {
            if let FieldType::UnsignedInt { bits } = field {
                if *bits == 0 || *bits > 256 || *bits % 8 != 0 {
                    return Err(EncodeError::InvalidUintWidth { bits: *bits });
                }
            }
        }
        Ok(Self { fields })
    }

    /// Returns the declared field types
    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    /// Returns the length in bytes of every record encoded with this schema
    pub fn encoded_len(&self) -> usize {
        self.fields.iter().map(FieldType::encoded_len).sum()
    }

    /// Encodes a record into its canonical byte form.
    ///
    /// Addresses contribute their 20 raw bytes; unsigned integers contribute
    /// `bits / 8` big-endian bytes, zero-padded on the left. Fails if the
    /// record's arity or any value's type disagrees with the schema, or if an
    /// integer does not fit its declared width.
    pub fn encode(&self, values: &[FieldValue]) -> Result<Bytes, EncodeError> {
        if values.len() != self.fields.len() {
            return Err(EncodeError::ArityMismatch {
                expected: self.fields.len(),
                got: values.len(),
            });
        }
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        for (index, (field, value)) in self.fields.iter().zip(values.iter()).enumerate() {
            match (field, value) {
                (FieldType::Address, FieldValue::Address(address)) => {
                    buf.put_slice(address.as_ref());
                }
                (FieldType::UnsignedInt { bits }, FieldValue::Uint(value)) => {
                    if !value.fits(*bits) {
                        return Err(EncodeError::UintOutOfRange {
                            index,
                            bits: *bits,
                        });
                    }
                    let be = value.to_be_bytes();
                    buf.put_slice(&be[UINT_LEN - usize::from(*bits) / 8..]);
                }
                (expected, got) => {
                    return Err(EncodeError::TypeMismatch {
                        index,
                        expected: expected.kind(),
                        got: got.kind(),
                    });
                }
            }
        }
        Ok(buf.freeze())
    }
}

#[cfg(feature = "borsh")]
impl borsh::BorshDeserialize for Schema {
    fn deserialize_reader<R: borsh::io::Read>(
        reader: &mut R,
    ) -> borsh::io::Result<Self> {
        let fields: Vec<FieldType> = borsh::BorshDeserialize::deserialize_reader(reader)?;
        Schema::new(fields).map_err(|err| {
            borsh::io::Error::new(
                borsh::io::ErrorKind::InvalidData,
                crate::maybestd::string::ToString::to_string(&err),
            )
        })
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(rename = "Schema")]
        struct RawSchema {
            fields: Vec<FieldType>,
        }

        let raw = RawSchema::deserialize(deserializer)?;
        Schema::new(raw.fields).map_err(|err| {
            serde::de::Error::custom(crate::maybestd::string::ToString::to_string(&err))
        })
    }
}

/// An error that occurred while declaring a schema or encoding a record
/// against one
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum EncodeError {
    /// A schema must declare at least one field
    EmptySchema,
    /// An integer field's declared width is zero, over 256, or not a whole
    /// number of bytes
    InvalidUintWidth {
        /// The rejected width
        bits: u16,
    },
    /// The record has a different number of fields than the schema declares
    ArityMismatch {
        /// The schema's field count
        expected: usize,
        /// The record's field count
        got: usize,
    },
    /// A value's runtime type disagrees with its declared field type
    TypeMismatch {
        /// The position of the offending field
        index: usize,
        /// The declared kind
        expected: FieldKind,
        /// The kind actually supplied
        got: FieldKind,
    },
    /// An integer value does not fit its field's declared width
    UintOutOfRange {
        /// The position of the offending field
        index: usize,
        /// The declared width in bits
        bits: u16,
    },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::EmptySchema => f.write_str("schema declares no fields"),
            EncodeError::InvalidUintWidth { bits } => {
                write!(f, "invalid uint width: {} bits", bits)
            }
            EncodeError::ArityMismatch { expected, got } => {
                write!(f, "schema declares {} fields but record has {}", expected, got)
            }
            EncodeError::TypeMismatch {
                index,
                expected,
                got,
            } => {
                write!(f, "field {}: expected {}, got {}", index, expected, got)
            }
            EncodeError::UintOutOfRange { index, bits } => {
                write!(f, "field {}: value does not fit {} bits", index, bits)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}
