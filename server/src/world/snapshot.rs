use std::any::Any;

use log::{debug, info};
use serde_json::Value;

use replica_shared::{JsonReader, JsonWriter, StreamRead, StreamWrite};

use crate::{ServerWorld, SnapshotError};

impl ServerWorld {
    /// Writes every permanent storage into one JSON document keyed by entity
    /// type name. Each storage is an array of slot records in slot order:
    /// `{"gen": G, "entity": ...}` for live slots and `{"gen": G, "dead": true}`
    /// for free ones.
    pub fn save_snapshot(&self) -> Value {
        let mut writer = JsonWriter::new();
        writer.object_begin();
        for storage in &self.storages {
            if !storage.config().permanent {
                continue;
            }
            writer.object_next(storage.type_name());
            storage.write_snapshot(&mut writer);
        }
        writer.object_end();
        writer.into_value()
    }

    /// Rebuilds every permanent storage present in the document, restoring
    /// generations and free slots. Observers and authorities are dropped;
    /// clients observing replaced entities are sent `Destroy`. Storages absent
    /// from the document are left untouched.
    ///
    /// Nothing changes unless the whole document decodes.
    pub fn load_snapshot(&mut self, snapshot: &Value) -> Result<(), SnapshotError> {
        let mut reader = JsonReader::new(snapshot);
        reader.object_begin().map_err(SnapshotError::Document)?;

        let mut decoded: Vec<(usize, Box<dyn Any>)> = Vec::new();
        for (position, storage) in self.storages.iter().enumerate() {
            let name = storage.type_name();
            if !storage.config().permanent {
                continue;
            }
            let present = reader
                .try_object_next(name)
                .map_err(SnapshotError::Document)?;
            if !present {
                debug!("Snapshot has no records for `{}`, leaving it as is", name);
                continue;
            }
            let table = storage
                .decode_snapshot(&mut reader)
                .map_err(|source| SnapshotError::Storage {
                    storage: name,
                    source,
                })?;
            decoded.push((position, table));
        }
        reader.object_end().map_err(SnapshotError::Document)?;

        for (position, table) in decoded {
            self.storages[position].install_snapshot(table, &mut self.connections);
        }
        info!("Loaded snapshot");
        Ok(())
    }
}
