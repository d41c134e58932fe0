//! Document ids and newtype wrappers for type-safe entity references.
//!
//! Every stored document is keyed by an [`ObjectId`]: 12 bytes rendered as 24
//! lowercase hex characters. Use the `define_id!` macro to create wrappers that
//! prevent accidentally mixing ids from different collections.

use core::fmt;
use core::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of raw bytes in an [`ObjectId`].
pub const OBJECT_ID_BYTES: usize = 12;

/// Number of hex characters in the textual form of an [`ObjectId`].
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_BYTES * 2;

/// Errors that can occur when parsing an [`ObjectId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input does not have exactly 24 characters.
    #[error("id must be {OBJECT_ID_HEX_LEN} hex characters (got {0})")]
    Length(usize),
    /// The input contains a non-hex character.
    #[error("id must only contain hex characters")]
    NotHex,
}

/// A 12-byte document id.
///
/// Layout: 4-byte big-endian creation time in seconds, 5 process-unique random
/// bytes, 3-byte big-endian counter.
///
/// ## Examples
///
/// ```
/// use essence_core::ObjectId;
///
/// let id = ObjectId::parse("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
/// assert_eq!(id.to_string(), "65a1f0c2e4b0a1b2c3d4e5f6");
///
/// assert!(ObjectId::parse("not-an-id").is_err());
/// assert!(ObjectId::parse("1").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_BYTES]);

impl ObjectId {
    /// Generate a fresh id.
    #[must_use]
    pub fn generate() -> Self {
        static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
        static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

        let secs = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
        let process = PROCESS_UNIQUE.get_or_init(rand::random);
        let count = COUNTER
            .get_or_init(|| AtomicU32::new(rand::random()))
            .fetch_add(1, Ordering::Relaxed);

        let source = secs
            .to_be_bytes()
            .into_iter()
            .chain(process.iter().copied())
            .chain(count.to_be_bytes().into_iter().skip(1));

        let mut bytes = [0_u8; OBJECT_ID_BYTES];
        for (slot, byte) in bytes.iter_mut().zip(source) {
            *slot = byte;
        }
        Self(bytes)
    }

    /// Parse an id from its 24-character hex form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 24 hex characters.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.len() != OBJECT_ID_HEX_LEN {
            return Err(IdError::Length(s.len()));
        }

        let mut bytes = [0_u8; OBJECT_ID_BYTES];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| match e {
            hex::FromHexError::InvalidHexCharacter { .. } => IdError::NotHex,
            hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
                IdError::Length(s.len())
            }
        })?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn bytes(&self) -> [u8; OBJECT_ID_BYTES] {
        self.0
    }

    /// Seconds since the Unix epoch encoded in the id.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        let [a, b, c, d, ..] = self.0;
        u32::from_be_bytes([a, b, c, d])
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl FromStr for ObjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl ::sqlx::Type<::sqlx::Postgres> for ObjectId {
    fn type_info() -> ::sqlx::postgres::PgTypeInfo {
        <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
        <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for ObjectId {
    fn decode(
        value: ::sqlx::postgres::PgValueRef<'r>,
    ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
        let text = <&str as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(text)?)
    }
}

#[cfg(feature = "postgres")]
impl ::sqlx::Encode<'_, ::sqlx::Postgres> for ObjectId {
    fn encode_by_ref(
        &self,
        buf: &mut ::sqlx::postgres::PgArgumentBuffer,
    ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
        <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.to_string(), buf)
    }
}

/// Macro to define a type-safe id wrapper.
///
/// Creates a newtype wrapper around [`ObjectId`] with:
/// - `Serialize`/`Deserialize` as the 24-character hex string
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - `generate()`, `parse()`, `Display`, `FromStr`, `From<ObjectId>`
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use essence_core::define_id;
/// define_id!(ProductId);
/// define_id!(ReviewId);
///
/// let product = ProductId::generate();
/// let review = ReviewId::parse(&product.to_string()).unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = review;
/// # let _ = review;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name($crate::ObjectId);

        impl $name {
            /// Generate a fresh id.
            #[must_use]
            pub fn generate() -> Self {
                Self($crate::ObjectId::generate())
            }

            /// Parse an id from its 24-character hex form.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is not exactly 24 hex characters.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::IdError> {
                $crate::ObjectId::parse(s).map(Self)
            }

            /// Get the underlying document id.
            #[must_use]
            pub const fn object_id(&self) -> $crate::ObjectId {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$crate::ObjectId> for $name {
            fn from(id: $crate::ObjectId) -> Self {
                Self(id)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <$crate::ObjectId as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <$crate::ObjectId as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <$crate::ObjectId as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <$crate::ObjectId as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Define standard entity IDs
define_id!(ProductId);
define_id!(ReviewId);
define_id!(UserId);
