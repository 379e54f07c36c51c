use super::error::SerdeErr;

/// Streaming encoder every concrete encoding implements.
///
/// Arrays are written as `array_begin(len)`, then `array_next()` before each
/// element, then `array_end()`. Objects are written as `object_begin()`, then
/// `object_next(key)` before each field, then `object_end()`. Positional
/// encodings are free to ignore keys.
pub trait StreamWrite {
    fn write_bool(&mut self, value: bool);
    fn write_u8(&mut self, value: u8);
    fn write_u32(&mut self, value: u32);
    fn write_i32(&mut self, value: i32);
    fn write_u64(&mut self, value: u64);
    fn write_i64(&mut self, value: i64);
    fn write_f32(&mut self, value: f32);
    fn write_f64(&mut self, value: f64);
    fn write_str(&mut self, value: &str);

    fn array_begin(&mut self, len: usize);
    fn array_next(&mut self);
    fn array_end(&mut self);

    fn object_begin(&mut self);
    fn object_next(&mut self, key: &str);
    fn object_end(&mut self);
}

/// Streaming decoder mirroring [`StreamWrite`].
///
/// Arrays are read as `array_begin()`, then `while array_next()? { .. }`,
/// then `array_end()`.
pub trait StreamRead {
    fn read_bool(&mut self) -> Result<bool, SerdeErr>;
    fn read_u8(&mut self) -> Result<u8, SerdeErr>;
    fn read_u32(&mut self) -> Result<u32, SerdeErr>;
    fn read_i32(&mut self) -> Result<i32, SerdeErr>;
    fn read_u64(&mut self) -> Result<u64, SerdeErr>;
    fn read_i64(&mut self) -> Result<i64, SerdeErr>;
    fn read_f32(&mut self) -> Result<f32, SerdeErr>;
    fn read_f64(&mut self) -> Result<f64, SerdeErr>;
    fn read_string(&mut self) -> Result<String, SerdeErr>;

    fn array_begin(&mut self) -> Result<(), SerdeErr>;
    /// Advances to the next element, `false` once the array is exhausted
    fn array_next(&mut self) -> Result<bool, SerdeErr>;
    fn array_end(&mut self) -> Result<(), SerdeErr>;

    fn object_begin(&mut self) -> Result<(), SerdeErr>;
    fn object_next(&mut self, key: &str) -> Result<(), SerdeErr>;
    /// Like `object_next`, but reports an absent key instead of failing.
    /// Only self-describing encodings can answer this.
    fn try_object_next(&mut self, key: &str) -> Result<bool, SerdeErr>;
    fn object_end(&mut self) -> Result<(), SerdeErr>;
}
