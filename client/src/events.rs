use std::{any::TypeId, collections::HashMap, marker::PhantomData, mem, vec::IntoIter};

use replica_shared::{Handle, Replicate};

use crate::ReplicaClientError;

/// Why the client stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// The server closed the stream
    PeerClosed,
    /// The server sent something that could not be framed or applied
    ProtocolFault,
    /// Buffered requests could not be delivered
    SendFailed,
    /// The application requested an exit
    Exit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum MirrorAction {
    Create,
    Update,
    Destroy,
}

/// Changes applied to the mirror, plus the reason the client stopped if it
/// did. Drained with [`ClientWorld::take_events`](crate::ClientWorld::take_events).
pub struct ClientEvents {
    disconnection: Option<DisconnectReason>,
    errors: Vec<ReplicaClientError>,
    entities: HashMap<(TypeId, MirrorAction), Vec<(u32, u32)>>,
    empty: bool,
}

impl Default for ClientEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientEvents {
    pub(crate) fn new() -> Self {
        Self {
            disconnection: None,
            errors: Vec::new(),
            entities: HashMap::new(),
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: ClientEvent>(&mut self) -> V::Iter {
        V::iter(self)
    }

    pub fn has<V: ClientEvent>(&self) -> bool {
        V::has(self)
    }

    pub(crate) fn push_disconnection(&mut self, reason: DisconnectReason) {
        self.disconnection = Some(reason);
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, error: ReplicaClientError) {
        self.errors.push(error);
        self.empty = false;
    }

    pub(crate) fn push_create<T: Replicate>(&mut self, handle: Handle<T>) {
        self.push_entity::<T>(MirrorAction::Create, handle);
    }

    pub(crate) fn push_update<T: Replicate>(&mut self, handle: Handle<T>) {
        self.push_entity::<T>(MirrorAction::Update, handle);
    }

    pub(crate) fn push_destroy<T: Replicate>(&mut self, handle: Handle<T>) {
        self.push_entity::<T>(MirrorAction::Destroy, handle);
    }

    fn push_entity<T: Replicate>(&mut self, action: MirrorAction, handle: Handle<T>) {
        self.entities
            .entry((TypeId::of::<T>(), action))
            .or_default()
            .push((handle.index(), handle.generation()));
        self.empty = false;
    }

    fn take_entities<T: Replicate>(&mut self, action: MirrorAction) -> IntoIter<Handle<T>> {
        let list: Vec<Handle<T>> = self
            .entities
            .remove(&(TypeId::of::<T>(), action))
            .unwrap_or_default()
            .into_iter()
            .map(|(index, generation)| Handle::new(index, generation))
            .collect();
        list.into_iter()
    }

    fn has_entities<T: Replicate>(&self, action: MirrorAction) -> bool {
        self.entities.contains_key(&(TypeId::of::<T>(), action))
    }
}

// Event Trait
pub trait ClientEvent {
    type Iter;

    fn iter(events: &mut ClientEvents) -> Self::Iter;

    fn has(events: &ClientEvents) -> bool;
}

// DisconnectEvent
pub struct DisconnectEvent;
impl ClientEvent for DisconnectEvent {
    type Iter = std::option::IntoIter<DisconnectReason>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        events.disconnection.take().into_iter()
    }

    fn has(events: &ClientEvents) -> bool {
        events.disconnection.is_some()
    }
}

// ErrorEvent
pub struct ErrorEvent;
impl ClientEvent for ErrorEvent {
    type Iter = IntoIter<ReplicaClientError>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        mem::take(&mut events.errors).into_iter()
    }

    fn has(events: &ClientEvents) -> bool {
        !events.errors.is_empty()
    }
}

/// The server started replicating an entity to this client
pub struct CreateEntityEvent<T: Replicate> {
    phantom_t: PhantomData<T>,
}
impl<T: Replicate> ClientEvent for CreateEntityEvent<T> {
    type Iter = IntoIter<Handle<T>>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        events.take_entities(MirrorAction::Create)
    }

    fn has(events: &ClientEvents) -> bool {
        events.has_entities::<T>(MirrorAction::Create)
    }
}

pub struct UpdateEntityEvent<T: Replicate> {
    phantom_t: PhantomData<T>,
}
impl<T: Replicate> ClientEvent for UpdateEntityEvent<T> {
    type Iter = IntoIter<Handle<T>>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        events.take_entities(MirrorAction::Update)
    }

    fn has(events: &ClientEvents) -> bool {
        events.has_entities::<T>(MirrorAction::Update)
    }
}

/// The mirrored entity was removed. The handle is already stale.
pub struct DestroyEntityEvent<T: Replicate> {
    phantom_t: PhantomData<T>,
}
impl<T: Replicate> ClientEvent for DestroyEntityEvent<T> {
    type Iter = IntoIter<Handle<T>>;

    fn iter(events: &mut ClientEvents) -> Self::Iter {
        events.take_entities(MirrorAction::Destroy)
    }

    fn has(events: &ClientEvents) -> bool {
        events.has_entities::<T>(MirrorAction::Destroy)
    }
}
