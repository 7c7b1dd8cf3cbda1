//! Buffered byte channel underneath the codec.
//!
//! [`BinWriter`] and [`BinReader`] wrap an arbitrary byte sink/source with a
//! fixed-capacity scratch buffer. Writes buffer-or-bypass: a single value
//! larger than the whole buffer flushes what is pending and goes straight to
//! the sink. Reads compact the unread remainder to the front of the buffer
//! and refill from the source, looping over partial reads; only a 0-byte
//! read surfaces as [`CodecError::EndOfStream`].
//!
//! All multi-byte values are little-endian. Big-endian hosts are rejected at
//! channel construction rather than silently producing foreign bytes.

use std::io::{Read, Write};

use crate::wire::{EnumerableType, SerializedType};
use crate::{CodecError, Result};

/// Default scratch buffer capacity for both channel directions.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Smallest usable capacity; large enough for any fixed-width payload.
const MIN_BUFFER_CAPACITY: usize = 64;

fn check_host_endianness() -> Result<()> {
    if cfg!(target_endian = "big") {
        return Err(CodecError::BigEndianHost);
    }
    Ok(())
}

/// Buffered little-endian writer over an arbitrary byte sink.
pub struct BinWriter<'a> {
    sink: &'a mut dyn Write,
    buf: Box<[u8]>,
    pos: usize,
    closed: bool,
}

impl<'a> BinWriter<'a> {
    pub fn new(sink: &'a mut dyn Write) -> Result<Self> {
        Self::with_capacity(sink, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(sink: &'a mut dyn Write, capacity: usize) -> Result<Self> {
        check_host_endianness()?;
        let capacity = capacity.max(MIN_BUFFER_CAPACITY);
        Ok(BinWriter {
            sink,
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            closed: false,
        })
    }

    /// Appends raw bytes, flushing first when the write would overflow the
    /// buffer. Oversized writes bypass the buffer entirely.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.buf.len() {
            self.flush()?;
            self.sink.write_all(bytes)?;
            return Ok(());
        }
        if self.pos + bytes.len() > self.buf.len() {
            self.flush()?;
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    /// Writes the filled portion of the buffer to the sink and resets it.
    pub fn flush(&mut self) -> Result<()> {
        if self.pos > 0 {
            self.sink.write_all(&self.buf[..self.pos])?;
            self.pos = 0;
        }
        Ok(())
    }

    /// Flushes pending bytes and the sink itself. Safe to call twice; the
    /// second call is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.flush()?;
        self.sink.flush()?;
        self.closed = true;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_tag(&mut self, tag: SerializedType) -> Result<()> {
        self.write_u8(tag as u8)
    }

    pub fn write_marker(&mut self, marker: EnumerableType) -> Result<()> {
        self.write_u8(marker as u8)
    }

    /// Writes a length-prefixed string: i32 UTF-16 code-unit count followed
    /// by the 2-byte little-endian code units. No terminator; a zero count
    /// is valid and distinct from the `Null` tag.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let mut bytes = Vec::with_capacity(value.len() * 2);
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let units = bytes.len() / 2;
        if units > i32::MAX as usize {
            return Err(CodecError::Encode(format!(
                "String of {} UTF-16 code units exceeds the wire length field",
                units
            )));
        }
        self.write_i32(units as i32)?;
        self.write_bytes(&bytes)
    }
}

impl Drop for BinWriter<'_> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.flush();
        }
    }
}

/// Buffered little-endian reader over an arbitrary byte source.
pub struct BinReader<'a> {
    source: &'a mut dyn Read,
    buf: Box<[u8]>,
    start: usize,
    end: usize,
}

impl<'a> BinReader<'a> {
    pub fn new(source: &'a mut dyn Read) -> Result<Self> {
        Self::with_capacity(source, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(source: &'a mut dyn Read, capacity: usize) -> Result<Self> {
        check_host_endianness()?;
        let capacity = capacity.max(MIN_BUFFER_CAPACITY);
        Ok(BinReader {
            source,
            buf: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            end: 0,
        })
    }

    fn available(&self) -> usize {
        self.end - self.start
    }

    /// Ensures at least `need` unread bytes are buffered, compacting the
    /// unread remainder to the front and refilling from the source.
    /// `need` must not exceed the buffer capacity.
    fn fill(&mut self, need: usize) -> Result<()> {
        debug_assert!(need <= self.buf.len());
        if self.available() >= need {
            return Ok(());
        }
        if self.start > 0 {
            self.buf.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        while self.end < need {
            let n = self.source.read(&mut self.buf[self.end..])?;
            if n == 0 {
                return Err(CodecError::EndOfStream);
            }
            self.end += n;
        }
        Ok(())
    }

    /// Reads exactly `out.len()` bytes or fails with `EndOfStream`.
    /// Requests larger than the buffer drain it and then read from the
    /// source directly.
    pub fn read_bytes_into(&mut self, out: &mut [u8]) -> Result<()> {
        if out.len() <= self.buf.len() {
            self.fill(out.len())?;
            out.copy_from_slice(&self.buf[self.start..self.start + out.len()]);
            self.start += out.len();
            return Ok(());
        }
        let buffered = self.available();
        out[..buffered].copy_from_slice(&self.buf[self.start..self.end]);
        self.start = 0;
        self.end = 0;
        let mut filled = buffered;
        while filled < out.len() {
            let n = self.source.read(&mut out[filled..])?;
            if n == 0 {
                return Err(CodecError::EndOfStream);
            }
            filled += n;
        }
        Ok(())
    }

    /// Discards exactly `count` bytes from the stream.
    pub fn skip_bytes(&mut self, count: usize) -> Result<()> {
        let mut remaining = count;
        while remaining > 0 {
            let take = remaining.min(self.buf.len());
            self.fill(take)?;
            self.start += take;
            remaining -= take;
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.fill(1)?;
        let value = self.buf[self.start];
        self.start += 1;
        Ok(value)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut bytes = [0u8; 2];
        self.read_bytes_into(&mut bytes)?;
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let mut bytes = [0u8; 2];
        self.read_bytes_into(&mut bytes)?;
        Ok(i16::from_le_bytes(bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        self.read_bytes_into(&mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut bytes = [0u8; 4];
        self.read_bytes_into(&mut bytes)?;
        Ok(i32::from_le_bytes(bytes))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        self.read_bytes_into(&mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let mut bytes = [0u8; 8];
        self.read_bytes_into(&mut bytes)?;
        Ok(i64::from_le_bytes(bytes))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let mut bytes = [0u8; 4];
        self.read_bytes_into(&mut bytes)?;
        Ok(f32::from_le_bytes(bytes))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let mut bytes = [0u8; 8];
        self.read_bytes_into(&mut bytes)?;
        Ok(f64::from_le_bytes(bytes))
    }

    pub fn read_tag(&mut self) -> Result<SerializedType> {
        SerializedType::try_from(self.read_u8()?)
    }

    pub fn read_marker(&mut self) -> Result<EnumerableType> {
        EnumerableType::try_from(self.read_u8()?)
    }

    /// Reads an i32 element count, rejecting negative values.
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(CodecError::Decode(format!(
                "Negative element count: {}",
                count
            )));
        }
        Ok(count as usize)
    }

    /// Reads a length-prefixed string. A zero count returns an empty string
    /// without touching the source. Counts larger than the buffer stream in
    /// buffer-sized chunks; a trailing partial code unit is `EndOfStream`.
    pub fn read_string(&mut self) -> Result<String> {
        let count = self.read_i32()?;
        if count == 0 {
            return Ok(String::new());
        }
        if count < 0 {
            return Err(CodecError::Decode(format!(
                "Negative string length: {}",
                count
            )));
        }
        let count = count as usize;
        let mut units: Vec<u16> = Vec::with_capacity(count.min(crate::LIST_CAPACITY));
        let units_per_chunk = self.buf.len() / 2;
        let mut remaining = count;
        while remaining > 0 {
            let take = remaining.min(units_per_chunk);
            self.fill(take * 2)?;
            for chunk in self.buf[self.start..self.start + take * 2].chunks_exact(2) {
                units.push(u16::from_le_bytes([chunk[0], chunk[1]]));
            }
            self.start += take * 2;
            remaining -= take;
        }
        String::from_utf16(&units)
            .map_err(|e| CodecError::Decode(format!("Invalid UTF-16 string payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_bypasses_buffer_for_oversized_values() {
        let mut sink = Vec::new();
        {
            let mut writer = BinWriter::with_capacity(&mut sink, 64).unwrap();
            writer.write_u8(1).unwrap();
            let big = vec![7u8; 300];
            writer.write_bytes(&big).unwrap();
            writer.close().unwrap();
        }
        assert_eq!(sink.len(), 301);
        assert_eq!(sink[0], 1);
        assert!(sink[1..].iter().all(|&b| b == 7));
    }

    #[test]
    fn read_refills_across_chunked_source() {
        // A source that returns one byte per read call.
        struct OneByte(Vec<u8>, usize);
        impl Read for OneByte {
            fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
                if self.1 >= self.0.len() || out.is_empty() {
                    return Ok(0);
                }
                out[0] = self.0[self.1];
                self.1 += 1;
                Ok(1)
            }
        }
        let mut source = OneByte(0x0403_0201u32.to_le_bytes().to_vec(), 0);
        let mut reader = BinReader::with_capacity(&mut source, 64).unwrap();
        assert_eq!(reader.read_u32().unwrap(), 0x0403_0201);
        assert!(matches!(reader.read_u8(), Err(CodecError::EndOfStream)));
    }

    #[test]
    fn string_roundtrip_through_slow_path() {
        let text: String = std::iter::repeat('x').take(5000).collect();
        let mut sink = Vec::new();
        {
            let mut writer = BinWriter::with_capacity(&mut sink, 64).unwrap();
            writer.write_string(&text).unwrap();
            writer.close().unwrap();
        }
        let mut source = &sink[..];
        let mut reader = BinReader::with_capacity(&mut source, 64).unwrap();
        assert_eq!(reader.read_string().unwrap(), text);
    }

    #[test]
    fn empty_string_reads_no_payload() {
        let mut sink = Vec::new();
        {
            let mut writer = BinWriter::new(&mut sink).unwrap();
            writer.write_string("").unwrap();
            writer.close().unwrap();
        }
        assert_eq!(sink, vec![0, 0, 0, 0]);
        let mut source = &sink[..];
        let mut reader = BinReader::new(&mut source).unwrap();
        assert_eq!(reader.read_string().unwrap(), "");
    }

    #[test]
    fn truncated_string_is_end_of_stream() {
        let mut sink = Vec::new();
        {
            let mut writer = BinWriter::new(&mut sink).unwrap();
            writer.write_string("hello").unwrap();
            writer.close().unwrap();
        }
        sink.truncate(sink.len() - 1); // drop half a code unit
        let mut source = &sink[..];
        let mut reader = BinReader::new(&mut source).unwrap();
        assert!(matches!(
            reader.read_string(),
            Err(CodecError::EndOfStream)
        ));
    }

    #[test]
    fn close_twice_is_noop() {
        let mut sink = Vec::new();
        let mut writer = BinWriter::new(&mut sink).unwrap();
        writer.write_u8(9).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
    }
}
