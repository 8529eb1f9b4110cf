//! # Byte Codec
//!
//! Endianness-neutral read and write of integer-like values into byte runs
//! of one to eight bytes. The byte run holds the value in the host's native
//! layout for an unsigned integer of that width: on a little-endian host
//! the low-address byte is the least significant, on a big-endian host the
//! run is taken from the high end of the full-width encoding.
//!
//! The host byte order is probed once at runtime and cached; all widths
//! then slice `to_le_bytes` / `to_be_bytes` accordingly, so the same tree
//! saves to identical YAML on either byte order.

use std::sync::OnceLock;

use crate::error::Error;

/// Widest supported integer storage, in bytes.
pub const MAX_DATA_SIZE: usize = 8;

/// Whether the host stores the most significant byte first.
///
/// Probed once from the in-memory layout of a two-byte integer.
pub fn host_big_endian() -> bool {
    static BIG: OnceLock<bool> = OnceLock::new();
    *BIG.get_or_init(|| {
        let probe: u16 = 0x0102;
        probe.to_ne_bytes()[0] == 0x01
    })
}

fn check_width(width: usize) -> Result<(), Error> {
    if width == 0 || width > MAX_DATA_SIZE {
        return Err(Error::InvalidDataSize);
    }
    Ok(())
}

/// Largest unsigned value representable in `width` bytes.
pub fn uint_max(width: usize) -> Result<u64, Error> {
    check_width(width)?;
    if width == MAX_DATA_SIZE {
        Ok(u64::MAX)
    } else {
        Ok((1u64 << (width * 8)) - 1)
    }
}

/// Largest signed value representable in `width` bytes.
pub fn int_max(width: usize) -> Result<i64, Error> {
    check_width(width)?;
    if width == MAX_DATA_SIZE {
        Ok(i64::MAX)
    } else {
        Ok((1i64 << (width * 8 - 1)) - 1)
    }
}

/// Smallest signed value representable in `width` bytes.
pub fn int_min(width: usize) -> Result<i64, Error> {
    check_width(width)?;
    if width == MAX_DATA_SIZE {
        Ok(i64::MIN)
    } else {
        Ok(-(1i64 << (width * 8 - 1)))
    }
}

/// Write the low `buf.len()` bytes of `value` into `buf` in host layout.
///
/// The buffer length is the storage width; widths outside `1..=8` are
/// rejected with [`Error::InvalidDataSize`].
pub fn write_uint(value: u64, buf: &mut [u8]) -> Result<(), Error> {
    let width = buf.len();
    check_width(width)?;
    if host_big_endian() {
        let bytes = value.to_be_bytes();
        buf.copy_from_slice(&bytes[MAX_DATA_SIZE - width..]);
    } else {
        let bytes = value.to_le_bytes();
        buf.copy_from_slice(&bytes[..width]);
    }
    Ok(())
}

/// Read an unsigned value of width `buf.len()` from `buf` in host layout.
pub fn read_uint(buf: &[u8]) -> Result<u64, Error> {
    let width = buf.len();
    check_width(width)?;
    let mut bytes = [0u8; MAX_DATA_SIZE];
    if host_big_endian() {
        bytes[MAX_DATA_SIZE - width..].copy_from_slice(buf);
        Ok(u64::from_be_bytes(bytes))
    } else {
        bytes[..width].copy_from_slice(buf);
        Ok(u64::from_le_bytes(bytes))
    }
}

/// Sign-extend a raw `width`-byte value to a full signed integer.
///
/// Bits `width * 8 ..= 63` are ORed in when the top bit of the stored
/// window is set.
pub fn sign_extend(raw: u64, width: usize) -> Result<i64, Error> {
    check_width(width)?;
    if width == MAX_DATA_SIZE {
        return Ok(raw as i64);
    }
    let sign_bit = 1u64 << (width * 8 - 1);
    if raw & sign_bit != 0 {
        let mask = !(uint_max(width)?);
        Ok((raw | mask) as i64)
    } else {
        Ok(raw as i64)
    }
}

/// Read a signed value of width `buf.len()` from `buf`, sign-extending.
pub fn read_int(buf: &[u8]) -> Result<i64, Error> {
    let raw = read_uint(buf)?;
    sign_extend(raw, buf.len())
}

/// Write a signed value into `buf`, truncating to the storage width.
pub fn write_int(value: i64, buf: &mut [u8]) -> Result<(), Error> {
    write_uint(value as u64, buf)
}
