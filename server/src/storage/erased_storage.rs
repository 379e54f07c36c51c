use std::any::Any;

use replica_shared::{
    EntityTable, JsonReader, JsonWriter, MessageHeader, MessageType, ReceiveError, Replicate,
    SerdeErr, StorageId, StreamRead, StreamWrite, SyncMode,
};

use crate::{
    connections::Connections,
    events::ServerEvents,
    storage::{
        server_storage::{ServerRecord, ServerStorage},
        storage_config::StorageConfig,
    },
    ClientKey,
};

/// Type-erased view of a [`ServerStorage`], one per registered entity type.
/// The world dispatches messages and housekeeping through it.
pub(crate) trait ErasedStorage {
    fn id(&self) -> StorageId;
    fn type_name(&self) -> &'static str;
    fn config(&self) -> &StorageConfig;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn end_tick(&mut self);

    fn receive(
        &mut self,
        sender: ClientKey,
        header: &MessageHeader,
        payload: &[u8],
        connections: &mut Connections,
        events: &mut ServerEvents,
    ) -> Result<(), ReceiveError>;

    fn remove_client(&mut self, client: ClientKey);

    /// Writes every slot in index order, dead slots included
    fn write_snapshot(&self, writer: &mut JsonWriter);

    /// Decodes this storage's records without touching the live table
    fn decode_snapshot(&self, reader: &mut JsonReader<'_>) -> Result<Box<dyn Any>, SerdeErr>;

    /// Replaces the live table with one produced by `decode_snapshot`,
    /// telling observers of the replaced entities that they are gone
    fn install_snapshot(&mut self, decoded: Box<dyn Any>, connections: &mut Connections);
}

impl<T: Replicate> ErasedStorage for ServerStorage<T> {
    fn id(&self) -> StorageId {
        ServerStorage::id(self)
    }

    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn config(&self) -> &StorageConfig {
        ServerStorage::config(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn end_tick(&mut self) {
        ServerStorage::end_tick(self);
    }

    fn receive(
        &mut self,
        sender: ClientKey,
        header: &MessageHeader,
        payload: &[u8],
        connections: &mut Connections,
        events: &mut ServerEvents,
    ) -> Result<(), ReceiveError> {
        ServerStorage::receive(self, sender, header, payload, connections, events)
    }

    fn remove_client(&mut self, client: ClientKey) {
        ServerStorage::remove_client(self, client);
    }

    fn write_snapshot(&self, writer: &mut JsonWriter) {
        writer.array_begin(self.table.slot_count());
        for slot in self.table.slots() {
            writer.array_next();
            writer.object_begin();
            writer.object_next("gen");
            writer.write_u32(slot.generation);
            match slot.value {
                Some(record) => {
                    writer.object_next("entity");
                    record.entity.write(writer, SyncMode::Full);
                }
                None => {
                    writer.object_next("dead");
                    writer.write_bool(true);
                }
            }
            writer.object_end();
        }
        writer.array_end();
    }

    fn decode_snapshot(&self, reader: &mut JsonReader<'_>) -> Result<Box<dyn Any>, SerdeErr> {
        let mut table: EntityTable<ServerRecord<T>> = EntityTable::new();

        reader.array_begin()?;
        while reader.array_next()? {
            reader.object_begin()?;
            reader.object_next("gen")?;
            let generation = reader.read_u32()?;
            let dead = if reader.try_object_next("dead")? {
                reader.read_bool()?
            } else {
                false
            };
            let record = if dead {
                None
            } else {
                reader.object_next("entity")?;
                let mut entity = T::default();
                entity.read(reader, SyncMode::Full)?;
                Some(ServerRecord::new(entity, None))
            };
            reader.object_end()?;
            table.restore_slot(generation, record);
        }
        reader.array_end()?;

        Ok(Box::new(table))
    }

    fn install_snapshot(&mut self, decoded: Box<dyn Any>, connections: &mut Connections) {
        let Ok(table) = decoded.downcast::<EntityTable<ServerRecord<T>>>() else {
            panic!(
                "Snapshot table handed to storage `{}` was decoded for another type",
                T::type_name()
            );
        };

        for (index, generation, record) in self.table.iter() {
            let header = MessageHeader::new(self.id(), MessageType::Destroy, index, generation);
            for client in &record.observers {
                connections.send_notice(*client, header);
            }
        }
        self.table = *table;
    }
}
