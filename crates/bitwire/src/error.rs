// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for mapping, encoding and decoding.

use std::fmt;

/// Errors returned by bitwire operations.
///
/// Variants fall into three groups: mapping-time configuration errors
/// (raised synchronously while building conversion plans), document-integrity
/// errors (raised while decoding a byte stream), and contract violations
/// (raised at registration or at the point of misuse). None of them are
/// recoverable; a failed call returns no partial result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Mapping / configuration
    // ========================================================================
    /// No converter claims the type and it has no discoverable members.
    UnserializableType(String),
    /// The type is registered but its members are not discoverable.
    InaccessibleType(String),
    /// A member's version range is empty or inverted (`to <= from`).
    InvalidVersionRange {
        type_name: String,
        member: String,
        from: u16,
        to: u16,
    },
    /// Nullability nests (`Option` directly inside `Option`); it is unwrapped
    /// exactly once per slot.
    NestedNullable(String),
    /// A `TypeId` that was never assigned by the registry.
    UnknownType(u32),
    /// Sub-type serialization requested for a type with no declared key.
    MissingSubTypeKey { base: String, sub: String },
    /// Runtime sub-type not in the closed ordinal table under Index mode.
    UnsupportedSubType { base: String, actual: String },

    // ========================================================================
    // Document integrity (decode time)
    // ========================================================================
    /// Version number on the wire exceeds the converter's highest version.
    UnknownVersion { type_name: String, version: u16 },
    /// Ordinal on the wire has no entry in the sub-type table.
    UnknownSubTypeOrdinal { base: String, ordinal: u32 },
    /// Key on the wire resolved to no registered sub-type.
    UnknownSubTypeKey { base: String, key: String },
    /// Input ended before the value did.
    Truncated { offset: usize },
    /// Payload bytes decoded to an invalid value (bad UTF, bad scalar, ...).
    InvalidData { offset: usize, reason: String },
    /// The stream's versioning header bit disagrees with the reader settings.
    VersioningMismatch { stream_versioned: bool },

    // ========================================================================
    // Contract violations
    // ========================================================================
    /// A converter registered with neither exact types nor a predicate.
    ConverterContract(String),
    /// A value handed to a converter does not match the slot's declared type.
    TypeMismatch { expected: String, found: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Mapping
            Error::UnserializableType(name) => write!(f, "unserializable type: {}", name),
            Error::InaccessibleType(name) => write!(f, "inaccessible type: {}", name),
            Error::InvalidVersionRange {
                type_name,
                member,
                from,
                to,
            } => write!(
                f,
                "invalid version range on {}.{}: {}..{} (to must exceed from)",
                type_name, member, from, to
            ),
            Error::NestedNullable(name) => {
                write!(f, "nested nullable type: {} (unwrapped exactly once)", name)
            }
            Error::UnknownType(id) => write!(f, "unknown type id: #{}", id),
            Error::MissingSubTypeKey { base, sub } => write!(
                f,
                "sub-type {} of {} has no declared key for Key-mode encoding",
                sub, base
            ),
            Error::UnsupportedSubType { base, actual } => write!(
                f,
                "unsupported sub-type: {} is not declared under base {}",
                actual, base
            ),
            // Document integrity
            Error::UnknownVersion { type_name, version } => {
                write!(f, "unknown version {} for type {}", version, type_name)
            }
            Error::UnknownSubTypeOrdinal { base, ordinal } => {
                write!(f, "unknown sub-type ordinal {} under base {}", ordinal, base)
            }
            Error::UnknownSubTypeKey { base, key } => {
                write!(f, "unknown sub-type key {:?} under base {}", key, base)
            }
            Error::Truncated { offset } => {
                write!(f, "truncated stream at byte offset {}", offset)
            }
            Error::InvalidData { offset, reason } => {
                write!(f, "invalid data at byte offset {}: {}", offset, reason)
            }
            Error::VersioningMismatch { stream_versioned } => write!(
                f,
                "stream was written {} versioning but reader settings disagree",
                if *stream_versioned { "with" } else { "without" }
            ),
            // Contract
            Error::ConverterContract(name) => write!(
                f,
                "converter {:?} declares neither exact types nor a predicate",
                name
            ),
            Error::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_offending_type_and_position() {
        let err = Error::UnknownVersion {
            type_name: "Sensor".into(),
            version: 7,
        };
        assert_eq!(err.to_string(), "unknown version 7 for type Sensor");

        let err = Error::Truncated { offset: 42 };
        assert_eq!(err.to_string(), "truncated stream at byte offset 42");

        let err = Error::InvalidVersionRange {
            type_name: "Sensor".into(),
            member: "gain".into(),
            from: 3,
            to: 3,
        };
        assert_eq!(
            err.to_string(),
            "invalid version range on Sensor.gain: 3..3 (to must exceed from)"
        );
    }

    #[test]
    fn test_display_versioning_mismatch_polarity() {
        let with = Error::VersioningMismatch {
            stream_versioned: true,
        };
        assert!(with.to_string().contains("written with versioning"));
        let without = Error::VersioningMismatch {
            stream_versioned: false,
        };
        assert!(without.to_string().contains("written without versioning"));
    }
}
