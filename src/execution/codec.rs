//! Fixed- and variable-width field packing for instruction payloads.
//!
//! Payloads carry no schema: every adapter family reads its fields in a fixed order, so the codec
//! only checks lengths. Integers are big-endian, addresses are 20 raw bytes.

use alloy_primitives::{Address, FixedBytes, U256};

use crate::execution::errors::ExecutionError;

/// Width of a 32-byte integer slot.
pub const WORD: usize = 32;
/// Width of an address.
pub const ADDRESS: usize = 20;

/// Sequential reader over a payload.
///
/// Every read fails with `ExecutionError::Decode` when the buffer is shorter than the field.
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ExecutionError> {
        if self.remaining() < len {
            return Err(ExecutionError::Decode(format!(
                "Expected {} bytes at offset {}, found {}",
                len,
                self.offset,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_u256(&mut self) -> Result<U256, ExecutionError> {
        Ok(U256::from_be_slice(self.read_bytes(WORD)?))
    }

    pub fn read_address(&mut self) -> Result<Address, ExecutionError> {
        Ok(Address::from_slice(self.read_bytes(ADDRESS)?))
    }

    pub fn read_word(&mut self) -> Result<FixedBytes<32>, ExecutionError> {
        Ok(FixedBytes::<32>::from_slice(self.read_bytes(WORD)?))
    }

    pub fn read_selector(&mut self) -> Result<FixedBytes<4>, ExecutionError> {
        Ok(FixedBytes::<4>::from_slice(self.read_bytes(4)?))
    }

    pub fn read_u8(&mut self) -> Result<u8, ExecutionError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads an unsigned big-endian integer of `width` bytes (at most 8).
    pub fn read_uint(&mut self, width: usize) -> Result<u64, ExecutionError> {
        if width > 8 {
            return Err(ExecutionError::Decode(format!("Integer width {} exceeds 8 bytes", width)));
        }
        Ok(self
            .read_bytes(width)?
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
    }

    /// Reads a byte string prefixed with its 2-byte length.
    pub fn read_prefixed_bytes(&mut self) -> Result<&'a [u8], ExecutionError> {
        let len = self.read_uint(2)? as usize;
        self.read_bytes(len)
    }

    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.offset..];
        self.offset = self.data.len();
        rest
    }

    /// Fails unless the whole buffer has been consumed.
    pub fn finish(&self) -> Result<(), ExecutionError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ExecutionError::Decode(format!(
                "{} unexpected trailing bytes at offset {}",
                self.remaining(),
                self.offset
            )))
        }
    }
}

/// Builder for payloads, the inverse of `PayloadReader`.
#[derive(Debug, Default, Clone)]
pub struct PayloadWriter {
    data: Vec<u8>,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u256(mut self, value: U256) -> Self {
        self.data
            .extend_from_slice(&value.to_be_bytes::<32>());
        self
    }

    pub fn address(mut self, address: Address) -> Self {
        self.data
            .extend_from_slice(address.as_slice());
        self
    }

    pub fn word(mut self, word: FixedBytes<32>) -> Self {
        self.data.extend_from_slice(word.as_slice());
        self
    }

    pub fn selector(mut self, selector: FixedBytes<4>) -> Self {
        self.data
            .extend_from_slice(selector.as_slice());
        self
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.data.push(value);
        self
    }

    /// Appends the low `width` bytes of `value`, failing if the value does not fit.
    pub fn uint(mut self, value: u64, width: usize) -> Result<Self, ExecutionError> {
        if width < 8 && value >> (width * 8) != 0 {
            return Err(ExecutionError::InvalidInput(format!(
                "Value {} does not fit in {} bytes",
                value, width
            )));
        }
        let bytes = value.to_be_bytes();
        self.data
            .extend_from_slice(&bytes[8 - width.min(8)..]);
        Ok(self)
    }

    pub fn prefixed_bytes(self, bytes: &[u8]) -> Result<Self, ExecutionError> {
        let mut writer = self.uint(bytes.len() as u64, 2)?;
        writer.data.extend_from_slice(bytes);
        Ok(writer)
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// Returns a copy of `payload` whose leading amount-in slot holds `amount`.
///
/// Decoding the result gives the same instruction as decoding `payload` with an amount override.
pub fn splice_amount_in(payload: &[u8], amount: U256) -> Result<Vec<u8>, ExecutionError> {
    if payload.len() < WORD {
        return Err(ExecutionError::Decode(format!(
            "Payload of {} bytes has no amount-in slot",
            payload.len()
        )));
    }
    let mut spliced = payload.to_vec();
    spliced[..WORD].copy_from_slice(&amount.to_be_bytes::<32>());
    Ok(spliced)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_reader_fields() {
        let payload = hex::decode(concat!(
            // amount
            "0000000000000000000000000000000000000000000000000000000000989680",
            // address
            "c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
            // fee tier
            "0001f4",
            // hop count
            "02",
        ))
        .unwrap();
        let mut reader = PayloadReader::new(&payload);
        assert_eq!(reader.read_u256().unwrap(), U256::from(10_000_000u64));
        assert_eq!(
            reader.read_address().unwrap(),
            Address::from_str("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2").unwrap()
        );
        assert_eq!(reader.read_uint(3).unwrap(), 500);
        assert_eq!(reader.read_u8().unwrap(), 2);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_short_buffer_is_a_decode_error() {
        let payload = [0u8; 31];
        let mut reader = PayloadReader::new(&payload);
        assert_eq!(
            reader.read_u256(),
            Err(ExecutionError::Decode("Expected 32 bytes at offset 0, found 31".to_string()))
        );
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let payload = [0u8; 3];
        let mut reader = PayloadReader::new(&payload);
        reader.read_u8().unwrap();
        assert!(matches!(reader.finish(), Err(ExecutionError::Decode(_))));
    }

    #[test]
    fn test_writer_uint_width() {
        let payload = PayloadWriter::new()
            .uint(500, 3)
            .unwrap()
            .build();
        assert_eq!(hex::encode(payload), "0001f4");
        assert!(PayloadWriter::new()
            .uint(1 << 24, 3)
            .is_err());
    }

    #[test]
    fn test_prefixed_bytes() {
        let payload = PayloadWriter::new()
            .prefixed_bytes(b"hi")
            .unwrap()
            .build();
        assert_eq!(hex::encode(&payload), "00026869");
        let mut reader = PayloadReader::new(&payload);
        assert_eq!(reader.read_prefixed_bytes().unwrap(), b"hi");
    }

    #[test]
    fn test_splice_amount_in() {
        let payload = PayloadWriter::new()
            .u256(U256::ZERO)
            .u256(U256::from(7u64))
            .build();
        let spliced = splice_amount_in(&payload, U256::from(42u64)).unwrap();
        let mut reader = PayloadReader::new(&spliced);
        assert_eq!(reader.read_u256().unwrap(), U256::from(42u64));
        assert_eq!(reader.read_u256().unwrap(), U256::from(7u64));
        assert!(splice_amount_in(&[0u8; 10], U256::ZERO).is_err());
    }
}
