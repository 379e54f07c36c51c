use std::{any::TypeId, collections::HashMap, marker::PhantomData, vec::IntoIter};

use log::warn;

use replica_shared::{Handle, Replicate};

use crate::{ClientKey, ReplicaServerError};

/// Why a client stopped being connected
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// The client closed its stream
    PeerClosed,
    /// The client sent something that could not be framed or decoded
    ProtocolFault,
    /// Buffered output could not be delivered
    SendFailed,
    /// The application called `disconnect_client`
    Kicked,
    /// The server is exiting
    ServerShutdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum EntityAction {
    Create,
    Update,
    Destroy,
}

/// Everything that happened during one or more ticks, drained with
/// [`ServerWorld::take_events`](crate::ServerWorld::take_events)
pub struct ServerEvents {
    connections: Vec<ClientKey>,
    disconnections: Vec<(ClientKey, DisconnectReason)>,
    errors: Vec<ReplicaServerError>,
    entities: HashMap<(TypeId, EntityAction), Vec<(ClientKey, u32, u32)>>,
    empty: bool,
}

impl Default for ServerEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerEvents {
    pub(crate) fn new() -> Self {
        Self {
            connections: Vec::new(),
            disconnections: Vec::new(),
            errors: Vec::new(),
            entities: HashMap::new(),
            empty: true,
        }
    }

    // Public

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn read<V: ServerEvent>(&mut self) -> V::Iter {
        V::iter(self)
    }

    pub fn has<V: ServerEvent>(&self) -> bool {
        V::has(self)
    }

    // Crate-public

    pub(crate) fn push_connection(&mut self, client: ClientKey) {
        self.connections.push(client);
        self.empty = false;
    }

    pub(crate) fn push_disconnection(&mut self, client: ClientKey, reason: DisconnectReason) {
        self.disconnections.push((client, reason));
        self.empty = false;
    }

    pub(crate) fn push_error(&mut self, error: ReplicaServerError) {
        self.errors.push(error);
        self.empty = false;
    }

    pub(crate) fn push_create<T: Replicate>(&mut self, client: ClientKey, handle: Handle<T>) {
        self.push_entity::<T>(EntityAction::Create, client, handle);
    }

    pub(crate) fn push_update<T: Replicate>(&mut self, client: ClientKey, handle: Handle<T>) {
        self.push_entity::<T>(EntityAction::Update, client, handle);
    }

    pub(crate) fn push_destroy<T: Replicate>(&mut self, client: ClientKey, handle: Handle<T>) {
        self.push_entity::<T>(EntityAction::Destroy, client, handle);
    }

    fn push_entity<T: Replicate>(
        &mut self,
        action: EntityAction,
        client: ClientKey,
        handle: Handle<T>,
    ) {
        self.entities
            .entry((TypeId::of::<T>(), action))
            .or_default()
            .push((client, handle.index(), handle.generation()));
        self.empty = false;
    }

    fn take_entities<T: Replicate>(&mut self, action: EntityAction) -> IntoIter<(ClientKey, Handle<T>)> {
        let list: Vec<(ClientKey, Handle<T>)> = self
            .entities
            .remove(&(TypeId::of::<T>(), action))
            .unwrap_or_default()
            .into_iter()
            .map(|(client, index, generation)| (client, Handle::new(index, generation)))
            .collect();
        list.into_iter()
    }

    fn has_entities<T: Replicate>(&self, action: EntityAction) -> bool {
        self.entities
            .contains_key(&(TypeId::of::<T>(), action))
    }
}

impl Drop for ServerEvents {
    fn drop(&mut self) {
        if !self.entities.is_empty() {
            warn!("Dropped Server Entity Event(s)! Make sure to handle these through `events.read::<CreateEntityEvent<T>>()` and friends, and note that this may be an attack vector.");
        }
    }
}

// Event Trait
pub trait ServerEvent {
    type Iter;

    fn iter(events: &mut ServerEvents) -> Self::Iter;

    fn has(events: &ServerEvents) -> bool;
}

// ConnectEvent
pub struct ConnectEvent;
impl ServerEvent for ConnectEvent {
    type Iter = IntoIter<ClientKey>;

    fn iter(events: &mut ServerEvents) -> Self::Iter {
        let list = std::mem::take(&mut events.connections);
        IntoIterator::into_iter(list)
    }

    fn has(events: &ServerEvents) -> bool {
        !events.connections.is_empty()
    }
}

// DisconnectEvent
pub struct DisconnectEvent;
impl ServerEvent for DisconnectEvent {
    type Iter = IntoIter<(ClientKey, DisconnectReason)>;

    fn iter(events: &mut ServerEvents) -> Self::Iter {
        let list = std::mem::take(&mut events.disconnections);
        IntoIterator::into_iter(list)
    }

    fn has(events: &ServerEvents) -> bool {
        !events.disconnections.is_empty()
    }
}

// ErrorEvent
pub struct ErrorEvent;
impl ServerEvent for ErrorEvent {
    type Iter = IntoIter<ReplicaServerError>;

    fn iter(events: &mut ServerEvents) -> Self::Iter {
        let list = std::mem::take(&mut events.errors);
        IntoIterator::into_iter(list)
    }

    fn has(events: &ServerEvents) -> bool {
        !events.errors.is_empty()
    }
}

/// A client-originated `Create` the server accepted
pub struct CreateEntityEvent<T: Replicate> {
    phantom_t: PhantomData<T>,
}
impl<T: Replicate> ServerEvent for CreateEntityEvent<T> {
    type Iter = IntoIter<(ClientKey, Handle<T>)>;

    fn iter(events: &mut ServerEvents) -> Self::Iter {
        events.take_entities(EntityAction::Create)
    }

    fn has(events: &ServerEvents) -> bool {
        events.has_entities::<T>(EntityAction::Create)
    }
}

/// A client-originated `Update` the server applied
pub struct UpdateEntityEvent<T: Replicate> {
    phantom_t: PhantomData<T>,
}
impl<T: Replicate> ServerEvent for UpdateEntityEvent<T> {
    type Iter = IntoIter<(ClientKey, Handle<T>)>;

    fn iter(events: &mut ServerEvents) -> Self::Iter {
        events.take_entities(EntityAction::Update)
    }

    fn has(events: &ServerEvents) -> bool {
        events.has_entities::<T>(EntityAction::Update)
    }
}

/// A client-originated `Destroy` the server applied. The handle is already
/// stale when the event is read.
pub struct DestroyEntityEvent<T: Replicate> {
    phantom_t: PhantomData<T>,
}
impl<T: Replicate> ServerEvent for DestroyEntityEvent<T> {
    type Iter = IntoIter<(ClientKey, Handle<T>)>;

    fn iter(events: &mut ServerEvents) -> Self::Iter {
        events.take_entities(EntityAction::Destroy)
    }

    fn has(events: &ServerEvents) -> bool {
        events.has_entities::<T>(EntityAction::Destroy)
    }
}
