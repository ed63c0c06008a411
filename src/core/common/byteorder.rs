//! Little-endian primitive encoding on top of `std::io`.
//!
//! Only the widths the index layout needs are provided: single bytes,
//! 32/64-bit integers and 32-bit floats.

use std::io;

/// Trait for reading little-endian primitives
pub trait ReadBytesExt: io::Read {
    /// Read a u8 value
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read operation fails
    fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Read an i32 value
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read operation fails
    fn read_i32<T: ByteOrder>(&mut self) -> io::Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(T::read_i32(buf))
    }

    /// Read an i64 value
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read operation fails
    fn read_i64<T: ByteOrder>(&mut self) -> io::Result<i64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(T::read_i64(buf))
    }

    /// Read a u64 value
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read operation fails
    fn read_u64<T: ByteOrder>(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(T::read_u64(buf))
    }

    /// Read an f32 value
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read operation fails
    fn read_f32<T: ByteOrder>(&mut self) -> io::Result<f32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(T::read_f32(buf))
    }
}

/// Trait for writing little-endian primitives
pub trait WriteBytesExt: io::Write {
    /// Write a u8 value
    fn write_u8(&mut self, n: u8) -> io::Result<()> {
        self.write_all(&[n])
    }

    /// Write an i32 value
    fn write_i32<T: ByteOrder>(&mut self, n: i32) -> io::Result<()> {
        self.write_all(&T::write_i32(n))
    }

    /// Write an i64 value
    fn write_i64<T: ByteOrder>(&mut self, n: i64) -> io::Result<()> {
        self.write_all(&T::write_i64(n))
    }

    /// Write a u64 value
    fn write_u64<T: ByteOrder>(&mut self, n: u64) -> io::Result<()> {
        self.write_all(&T::write_u64(n))
    }

    /// Write an f32 value
    fn write_f32<T: ByteOrder>(&mut self, n: f32) -> io::Result<()> {
        self.write_all(&T::write_f32(n))
    }
}

impl<R: io::Read + ?Sized> ReadBytesExt for R {}

impl<W: io::Write + ?Sized> WriteBytesExt for W {}

/// Trait defining byte order operations
pub trait ByteOrder {
    fn read_i32(buf: [u8; 4]) -> i32;
    fn read_i64(buf: [u8; 8]) -> i64;
    fn read_u64(buf: [u8; 8]) -> u64;
    fn read_f32(buf: [u8; 4]) -> f32;
    fn write_i32(n: i32) -> [u8; 4];
    fn write_i64(n: i64) -> [u8; 8];
    fn write_u64(n: u64) -> [u8; 8];
    fn write_f32(n: f32) -> [u8; 4];
}

/// Little-endian byte order
pub struct LittleEndian;

impl ByteOrder for LittleEndian {
    #[inline]
    fn read_i32(buf: [u8; 4]) -> i32 {
        i32::from_le_bytes(buf)
    }

    #[inline]
    fn read_i64(buf: [u8; 8]) -> i64 {
        i64::from_le_bytes(buf)
    }

    #[inline]
    fn read_u64(buf: [u8; 8]) -> u64 {
        u64::from_le_bytes(buf)
    }

    #[inline]
    fn read_f32(buf: [u8; 4]) -> f32 {
        f32::from_le_bytes(buf)
    }

    #[inline]
    fn write_i32(n: i32) -> [u8; 4] {
        n.to_le_bytes()
    }

    #[inline]
    fn write_i64(n: i64) -> [u8; 8] {
        n.to_le_bytes()
    }

    #[inline]
    fn write_u64(n: u64) -> [u8; 8] {
        n.to_le_bytes()
    }

    #[inline]
    fn write_f32(n: f32) -> [u8; 4] {
        n.to_le_bytes()
    }
}
