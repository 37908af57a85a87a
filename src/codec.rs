//! Binary wire codec for chain entities.
//!
//! Every serializable entity in this crate writes itself through [`ByteWriter`]
//! and reads itself back through [`ByteReader`]. Numeric fields are fixed-width
//! little-endian, counts and lengths use the variable-width unsigned encoding,
//! and byte blobs are length-prefixed. Decoding never panics: a short read or a
//! malformed length produces a [`CodecError`] naming the failing field, and the
//! partially-decoded value must be discarded by the caller.

use tracing::error;

/// Errors produced while decoding wire bytes.
///
/// Each variant carries the field that failed so load-path diagnostics can say
/// exactly where a stored record went bad.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
	#[error("short read while decoding {0}")]
	ShortRead(&'static str),

	#[error("length {len} out of range while decoding {field}")]
	BadLength { field: &'static str, len: u64 },

	#[error("invalid utf-8 while decoding {0}")]
	BadString(&'static str),

	#[error("unknown tag {tag} while decoding {field}")]
	UnknownTag { field: &'static str, tag: u8 },
}

/// Growable little-endian byte sink.
#[derive(Default)]
pub struct ByteWriter {
	buf: Vec<u8>,
}

impl ByteWriter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn bytes(&self) -> &[u8] {
		&self.buf
	}

	pub fn into_bytes(self) -> Vec<u8> {
		self.buf
	}

	pub fn write_u8(&mut self, v: u8) {
		self.buf.push(v);
	}

	pub fn write_u16(&mut self, v: u16) {
		self.buf.extend_from_slice(&v.to_le_bytes());
	}

	pub fn write_u32(&mut self, v: u32) {
		self.buf.extend_from_slice(&v.to_le_bytes());
	}

	pub fn write_u64(&mut self, v: u64) {
		self.buf.extend_from_slice(&v.to_le_bytes());
	}

	pub fn write_bytes(&mut self, bytes: &[u8]) {
		self.buf.extend_from_slice(bytes);
	}

	/// Variable-width unsigned encoding: one byte below 0xfd, then a marker
	/// byte followed by the value as u16/u32/u64.
	pub fn write_var_uint(&mut self, v: u64) {
		if v < 0xfd {
			self.write_u8(v as u8);
		} else if v <= u16::MAX as u64 {
			self.write_u8(0xfd);
			self.write_u16(v as u16);
		} else if v <= u32::MAX as u64 {
			self.write_u8(0xfe);
			self.write_u32(v as u32);
		} else {
			self.write_u8(0xff);
			self.write_u64(v);
		}
	}

	pub fn write_var_bytes(&mut self, bytes: &[u8]) {
		self.write_var_uint(bytes.len() as u64);
		self.write_bytes(bytes);
	}

	pub fn write_var_string(&mut self, s: &str) {
		self.write_var_bytes(s.as_bytes());
	}
}

/// Cursor over a borrowed byte slice.
///
/// Read methods take the name of the field being decoded; on failure they log
/// the field and return the matching [`CodecError`], leaving the cursor where
/// the failure happened.
pub struct ByteReader<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> ByteReader<'a> {
	pub fn new(buf: &'a [u8]) -> Self {
		Self { buf, pos: 0 }
	}

	pub fn remaining(&self) -> usize {
		self.buf.len() - self.pos
	}

	fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], CodecError> {
		if self.remaining() < len {
			error!("deserialize {} error: short read", field);
			return Err(CodecError::ShortRead(field));
		}
		let slice = &self.buf[self.pos..self.pos + len];
		self.pos += len;
		Ok(slice)
	}

	pub fn read_u8(&mut self, field: &'static str) -> Result<u8, CodecError> {
		Ok(self.take(1, field)?[0])
	}

	pub fn read_u16(&mut self, field: &'static str) -> Result<u16, CodecError> {
		let b = self.take(2, field)?;
		Ok(u16::from_le_bytes([b[0], b[1]]))
	}

	pub fn read_u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
		let b = self.take(4, field)?;
		Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
	}

	pub fn read_u64(&mut self, field: &'static str) -> Result<u64, CodecError> {
		let b = self.take(8, field)?;
		Ok(u64::from_le_bytes([
			b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
		]))
	}

	pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], CodecError> {
		let b = self.take(N, field)?;
		let mut out = [0u8; N];
		out.copy_from_slice(b);
		Ok(out)
	}

	pub fn read_var_uint(&mut self, field: &'static str) -> Result<u64, CodecError> {
		let marker = self.read_u8(field)?;
		match marker {
			0xfd => Ok(self.read_u16(field)? as u64),
			0xfe => Ok(self.read_u32(field)? as u64),
			0xff => self.read_u64(field),
			v => Ok(v as u64),
		}
	}

	/// Length-prefixed byte blob. A length that exceeds the remaining input is
	/// rejected before any allocation happens.
	pub fn read_var_bytes(&mut self, field: &'static str) -> Result<Vec<u8>, CodecError> {
		let len = self.read_var_uint(field)?;
		if len > self.remaining() as u64 {
			error!("deserialize {} error: length {} exceeds input", field, len);
			return Err(CodecError::BadLength { field, len });
		}
		Ok(self.take(len as usize, field)?.to_vec())
	}

	pub fn read_var_string(&mut self, field: &'static str) -> Result<String, CodecError> {
		let bytes = self.read_var_bytes(field)?;
		String::from_utf8(bytes).map_err(|_| {
			error!("deserialize {} error: invalid utf-8", field);
			CodecError::BadString(field)
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fixed_width_round_trip() {
		let mut w = ByteWriter::new();
		w.write_u8(0xab);
		w.write_u16(0x1234);
		w.write_u32(0xdead_beef);
		w.write_u64(0x0102_0304_0506_0708);

		let mut r = ByteReader::new(w.bytes());
		assert_eq!(r.read_u8("a").unwrap(), 0xab);
		assert_eq!(r.read_u16("b").unwrap(), 0x1234);
		assert_eq!(r.read_u32("c").unwrap(), 0xdead_beef);
		assert_eq!(r.read_u64("d").unwrap(), 0x0102_0304_0506_0708);
		assert_eq!(r.remaining(), 0);
	}

	#[test]
	fn var_uint_boundaries() {
		for v in [0u64, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000, u64::MAX] {
			let mut w = ByteWriter::new();
			w.write_var_uint(v);
			let mut r = ByteReader::new(w.bytes());
			assert_eq!(r.read_var_uint("v").unwrap(), v, "value {v:#x}");
			assert_eq!(r.remaining(), 0);
		}
	}

	#[test]
	fn var_uint_width_is_minimal() {
		let mut w = ByteWriter::new();
		w.write_var_uint(0xfc);
		assert_eq!(w.bytes().len(), 1);

		let mut w = ByteWriter::new();
		w.write_var_uint(0xfd);
		assert_eq!(w.bytes().len(), 3);

		let mut w = ByteWriter::new();
		w.write_var_uint(0x1_0000);
		assert_eq!(w.bytes().len(), 5);
	}

	#[test]
	fn var_string_round_trip() {
		let mut w = ByteWriter::new();
		w.write_var_string("XQd1cQ8aPkXKueY3sVeAMs6NFZ7GE6d5kP");
		let mut r = ByteReader::new(w.bytes());
		assert_eq!(
			r.read_var_string("addr").unwrap(),
			"XQd1cQ8aPkXKueY3sVeAMs6NFZ7GE6d5kP"
		);
	}

	#[test]
	fn short_read_names_the_field() {
		let mut r = ByteReader::new(&[0x01, 0x02]);
		let err = r.read_u32("output lock").unwrap_err();
		assert_eq!(err, CodecError::ShortRead("output lock"));
	}

	#[test]
	fn oversized_blob_length_is_rejected() {
		// Claims 0xffff bytes but carries only two.
		let mut r = ByteReader::new(&[0xfd, 0xff, 0xff, 0x00, 0x00]);
		let err = r.read_var_bytes("payload").unwrap_err();
		assert!(matches!(err, CodecError::BadLength { field: "payload", .. }));
	}
}
