use super::stream::StreamWrite;

/// Little-endian binary encoder appending to a borrowed buffer.
///
/// Keys and object boundaries are not written; arrays carry a `u32` length
/// prefix and strings a `u32` byte-length prefix.
pub struct ByteWriter<'b> {
    buffer: &'b mut Vec<u8>,
}

impl<'b> ByteWriter<'b> {
    pub fn new(buffer: &'b mut Vec<u8>) -> Self {
        Self { buffer }
    }

    pub fn bytes_written(&self) -> usize {
        self.buffer.len()
    }

    fn write_len(&mut self, len: usize) {
        let Ok(len) = u32::try_from(len) else {
            panic!("Length {} does not fit a u32 length prefix", len);
        };
        self.write_u32(len);
    }
}

impl StreamWrite for ByteWriter<'_> {
    fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn write_str(&mut self, value: &str) {
        self.write_len(value.len());
        self.buffer.extend_from_slice(value.as_bytes());
    }

    fn array_begin(&mut self, len: usize) {
        self.write_len(len);
    }

    fn array_next(&mut self) {}

    fn array_end(&mut self) {}

    fn object_begin(&mut self) {}

    fn object_next(&mut self, _key: &str) {}

    fn object_end(&mut self) {}
}
