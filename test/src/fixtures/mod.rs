//! Entity types shared by the end-to-end tests

use replica_client::ClientWorld;
use replica_server::{
    shared::{DeltaSet, Replicate, Serde, SerdeErr, StreamRead, StreamWrite, SyncMode},
    ServerWorld, StorageConfig,
};

/// A plain value entity, written whole in both modes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Replicate for Position {
    fn type_name() -> &'static str {
        "Position"
    }

    fn write<W: StreamWrite + ?Sized>(&self, writer: &mut W, _mode: SyncMode) {
        writer.object_begin();
        writer.object_next("x");
        self.x.ser(writer);
        writer.object_next("y");
        self.y.ser(writer);
        writer.object_end();
    }

    fn read<R: StreamRead + ?Sized>(
        &mut self,
        reader: &mut R,
        _mode: SyncMode,
    ) -> Result<(), SerdeErr> {
        reader.object_begin()?;
        reader.object_next("x")?;
        self.x = f32::de(reader)?;
        reader.object_next("y")?;
        self.y = f32::de(reader)?;
        reader.object_end()
    }
}

/// An entity carrying a delta-tracked set. Counts how often its changes were
/// replicated.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    pub name: String,
    pub members: DeltaSet<u32>,
    pub replications: u32,
}

impl Roster {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn member_list(&self) -> Vec<u32> {
        self.members.iter().copied().collect()
    }
}

impl Replicate for Roster {
    fn type_name() -> &'static str {
        "Roster"
    }

    fn write<W: StreamWrite + ?Sized>(&self, writer: &mut W, mode: SyncMode) {
        writer.object_begin();
        writer.object_next("name");
        self.name.ser(writer);
        writer.object_next("members");
        self.members.write(writer, mode);
        writer.object_end();
    }

    fn read<R: StreamRead + ?Sized>(
        &mut self,
        reader: &mut R,
        mode: SyncMode,
    ) -> Result<(), SerdeErr> {
        reader.object_begin()?;
        reader.object_next("name")?;
        self.name = String::de(reader)?;
        reader.object_next("members")?;
        self.members.read(reader, mode)?;
        reader.object_end()
    }

    fn post_update(&mut self) {
        self.replications += 1;
    }

    fn end_tick(&mut self) {
        self.members.flush();
    }
}

/// Registers the fixture types on a server, `Position` first
pub fn register_server_protocol(world: &mut ServerWorld, position: StorageConfig, roster: StorageConfig) {
    world.register::<Position>(position);
    world.register::<Roster>(roster);
}

/// Registers the fixture types on a client in the server's order
pub fn register_client_protocol(world: &mut ClientWorld) {
    world.register::<Position>();
    world.register::<Roster>();
}
