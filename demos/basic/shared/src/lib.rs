use std::time::Duration;

use replica_shared::{Replicate, Serde, SerdeErr, StreamRead, StreamWrite, SyncMode};

pub const SERVER_ADDRESS: &str = "127.0.0.1:14191";
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// A named character walking along a line
#[derive(Clone, Debug, Default)]
pub struct Character {
    pub x: u32,
    pub y: u32,
    pub name: String,
}

impl Character {
    pub fn new(x: u32, y: u32, name: &str) -> Self {
        Self {
            x,
            y,
            name: name.to_string(),
        }
    }
}

impl Replicate for Character {
    fn type_name() -> &'static str {
        "Character"
    }

    fn write<W: StreamWrite + ?Sized>(&self, writer: &mut W, mode: SyncMode) {
        writer.object_begin();
        writer.object_next("x");
        self.x.ser(writer);
        writer.object_next("y");
        self.y.ser(writer);
        // the name never changes after creation
        if mode == SyncMode::Full {
            writer.object_next("name");
            self.name.ser(writer);
        }
        writer.object_end();
    }

    fn read<R: StreamRead + ?Sized>(
        &mut self,
        reader: &mut R,
        mode: SyncMode,
    ) -> Result<(), SerdeErr> {
        reader.object_begin()?;
        reader.object_next("x")?;
        self.x = u32::de(reader)?;
        reader.object_next("y")?;
        self.y = u32::de(reader)?;
        if mode == SyncMode::Full {
            reader.object_next("name")?;
            self.name = String::de(reader)?;
        }
        reader.object_end()
    }
}
