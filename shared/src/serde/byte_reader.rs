use super::{error::SerdeErr, stream::StreamRead};

/// Decoder for the format produced by [`ByteWriter`](super::ByteWriter).
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    cursor: usize,
    arrays: Vec<u32>,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            cursor: 0,
            arrays: Vec::new(),
        }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], SerdeErr> {
        let slice = self.take_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], SerdeErr> {
        if self.remaining() < len {
            return Err(SerdeErr::UnexpectedEnd {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes: &'a [u8] = self.bytes;
        let slice = &bytes[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }
}

impl StreamRead for ByteReader<'_> {
    fn read_bool(&mut self) -> Result<bool, SerdeErr> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerdeErr::OutOfRange {
                value: other.to_string(),
                target: "bool",
            }),
        }
    }

    fn read_u8(&mut self) -> Result<u8, SerdeErr> {
        Ok(self.take::<1>()?[0])
    }

    fn read_u32(&mut self) -> Result<u32, SerdeErr> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn read_i32(&mut self) -> Result<i32, SerdeErr> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn read_u64(&mut self) -> Result<u64, SerdeErr> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn read_i64(&mut self) -> Result<i64, SerdeErr> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    fn read_f32(&mut self) -> Result<f32, SerdeErr> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    fn read_f64(&mut self) -> Result<f64, SerdeErr> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    fn read_string(&mut self) -> Result<String, SerdeErr> {
        let len = self.read_u32()? as usize;
        let bytes = self.take_slice(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerdeErr::InvalidUtf8)
    }

    fn array_begin(&mut self) -> Result<(), SerdeErr> {
        let len = self.read_u32()?;
        self.arrays.push(len);
        Ok(())
    }

    fn array_next(&mut self) -> Result<bool, SerdeErr> {
        let Some(remaining) = self.arrays.last_mut() else {
            return Err(SerdeErr::Structure {
                context: "array_next called outside of an array",
            });
        };
        if *remaining == 0 {
            return Ok(false);
        }
        *remaining -= 1;
        Ok(true)
    }

    fn array_end(&mut self) -> Result<(), SerdeErr> {
        match self.arrays.pop() {
            Some(0) => Ok(()),
            Some(_) => Err(SerdeErr::Structure {
                context: "array ended before all elements were read",
            }),
            None => Err(SerdeErr::Structure {
                context: "array_end called outside of an array",
            }),
        }
    }

    fn object_begin(&mut self) -> Result<(), SerdeErr> {
        Ok(())
    }

    fn object_next(&mut self, _key: &str) -> Result<(), SerdeErr> {
        Ok(())
    }

    fn try_object_next(&mut self, _key: &str) -> Result<bool, SerdeErr> {
        Err(SerdeErr::Unsupported {
            operation: "try_object_next",
        })
    }

    fn object_end(&mut self) -> Result<(), SerdeErr> {
        Ok(())
    }
}
