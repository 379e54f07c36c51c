use crate::{connection::error::ConnectionError, types::StorageId};

/// Bytes taken by the length prefix in front of every message
pub const LENGTH_PREFIX_BYTES: usize = 4;
/// Bytes of a message body before its payload: storage id, type, index and
/// generation
pub const HEADER_BYTES: usize = 13;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    Create,
    Update,
    Destroy,
}

impl MessageType {
    pub fn to_u8(self) -> u8 {
        match self {
            MessageType::Create => 0,
            MessageType::Update => 1,
            MessageType::Destroy => 2,
        }
    }

    pub fn from_u8(value: u8) -> Result<Self, ConnectionError> {
        match value {
            0 => Ok(MessageType::Create),
            1 => Ok(MessageType::Update),
            2 => Ok(MessageType::Destroy),
            _ => Err(ConnectionError::InvalidMessageType { value }),
        }
    }

    /// Whether messages of this type carry an entity payload
    pub fn has_payload(self) -> bool {
        !matches!(self, MessageType::Destroy)
    }
}

/// Fixed part of a message body.
///
/// On the wire a message is `[length][storage id][type][index][generation]`
/// followed by the payload, with every integer little-endian and `length`
/// counting every byte after itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageHeader {
    pub storage_id: StorageId,
    pub message_type: MessageType,
    pub index: u32,
    pub generation: u32,
}

impl MessageHeader {
    pub fn new(
        storage_id: StorageId,
        message_type: MessageType,
        index: u32,
        generation: u32,
    ) -> Self {
        Self {
            storage_id,
            message_type,
            index,
            generation,
        }
    }

    pub fn write(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.storage_id.to_u32().to_le_bytes());
        buffer.push(self.message_type.to_u8());
        buffer.extend_from_slice(&self.index.to_le_bytes());
        buffer.extend_from_slice(&self.generation.to_le_bytes());
    }

    /// Parses the header at the front of a message body, returning it along
    /// with the payload that follows
    pub fn read(body: &[u8]) -> Result<(Self, &[u8]), ConnectionError> {
        if body.len() < HEADER_BYTES {
            return Err(ConnectionError::InvalidLength {
                length: body.len() as i64,
                minimum: HEADER_BYTES,
            });
        }

        let storage_id = StorageId::new(u32_at(body, 0));
        let message_type = MessageType::from_u8(body[4])?;
        let index = u32_at(body, 5);
        let generation = u32_at(body, 9);

        Ok((
            Self::new(storage_id, message_type, index, generation),
            &body[HEADER_BYTES..],
        ))
    }
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}
