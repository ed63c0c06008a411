use std::io::{Read, Write};

use crate::core::common::OxiclusterError;

/// Trait for serializing data of type T into a byte stream.
pub trait DataSerializer<T> {
    fn serialize<W: Write>(value: &T, writer: &mut W) -> Result<(), OxiclusterError>;
}

/// Trait for deserializing data of type T from a byte stream.
pub trait DataDeserializer<T> {
    fn deserialize<R: Read>(reader: &mut R) -> Result<T, OxiclusterError>;
}
