use crate::storage::handle::Handle;

use super::{
    error::SerdeErr,
    stream::{StreamRead, StreamWrite},
};

/// A value that can be written to any [`StreamWrite`] and read back from the
/// matching [`StreamRead`].
pub trait Serde: Sized {
    fn ser<W: StreamWrite + ?Sized>(&self, writer: &mut W);
    fn de<R: StreamRead + ?Sized>(reader: &mut R) -> Result<Self, SerdeErr>;
}

macro_rules! impl_serde_scalar {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl Serde for $ty {
                fn ser<W: StreamWrite + ?Sized>(&self, writer: &mut W) {
                    writer.$write(*self);
                }

                fn de<R: StreamRead + ?Sized>(reader: &mut R) -> Result<Self, SerdeErr> {
                    reader.$read()
                }
            }
        )*
    };
}

impl_serde_scalar! {
    bool => write_bool, read_bool;
    u8 => write_u8, read_u8;
    u32 => write_u32, read_u32;
    i32 => write_i32, read_i32;
    u64 => write_u64, read_u64;
    i64 => write_i64, read_i64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

impl Serde for String {
    fn ser<W: StreamWrite + ?Sized>(&self, writer: &mut W) {
        writer.write_str(self);
    }

    fn de<R: StreamRead + ?Sized>(reader: &mut R) -> Result<Self, SerdeErr> {
        reader.read_string()
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser<W: StreamWrite + ?Sized>(&self, writer: &mut W) {
        writer.array_begin(self.len());
        for item in self {
            writer.array_next();
            item.ser(writer);
        }
        writer.array_end();
    }

    fn de<R: StreamRead + ?Sized>(reader: &mut R) -> Result<Self, SerdeErr> {
        let mut output = Vec::new();
        reader.array_begin()?;
        while reader.array_next()? {
            output.push(T::de(reader)?);
        }
        reader.array_end()?;
        Ok(output)
    }
}

// Encoded as an array of zero or one elements
impl<T: Serde> Serde for Option<T> {
    fn ser<W: StreamWrite + ?Sized>(&self, writer: &mut W) {
        match self {
            Some(value) => {
                writer.array_begin(1);
                writer.array_next();
                value.ser(writer);
            }
            None => writer.array_begin(0),
        }
        writer.array_end();
    }

    fn de<R: StreamRead + ?Sized>(reader: &mut R) -> Result<Self, SerdeErr> {
        reader.array_begin()?;
        let value = if reader.array_next()? {
            Some(T::de(reader)?)
        } else {
            None
        };
        reader.array_end()?;
        Ok(value)
    }
}

impl<T> Serde for Handle<T> {
    fn ser<W: StreamWrite + ?Sized>(&self, writer: &mut W) {
        writer.object_begin();
        writer.object_next("index");
        writer.write_u32(self.index());
        writer.object_next("gen");
        writer.write_u32(self.generation());
        writer.object_end();
    }

    fn de<R: StreamRead + ?Sized>(reader: &mut R) -> Result<Self, SerdeErr> {
        reader.object_begin()?;
        reader.object_next("index")?;
        let index = reader.read_u32()?;
        reader.object_next("gen")?;
        let generation = reader.read_u32()?;
        reader.object_end()?;
        Ok(Handle::new(index, generation))
    }
}
