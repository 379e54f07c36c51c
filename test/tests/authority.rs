use std::io::Write;

use replica_client::CreateEntityEvent as MirrorCreated;
use replica_server::{
    ConnectEvent, CreateEntityEvent, CreatePolicy, DestroyEntityEvent, DisconnectEvent,
    DisconnectReason, ReplicaServerError, StorageConfig, UpdateEntityEvent,
};
use replica_test::{exchange_packets, init_logging, Position, TestServer};

fn open_server(policy: CreatePolicy) -> TestServer {
    TestServer::with_storages(StorageConfig::default().with_policy(policy), StorageConfig::default())
}

#[test]
fn server_only_storage_ignores_client_creates() {
    init_logging();
    let mut server = open_server(CreatePolicy::ServerOnly);
    let (key, mut client) = server.connect();

    client.request_create(&Position::new(1.0, 1.0)).unwrap();
    exchange_packets(&mut server, &mut [&mut client]);

    assert!(server.world.storage::<Position>().is_empty());
    assert!(client.storage::<Position>().is_empty());
    assert!(server.world.client_exists(key));
}

#[test]
fn any_client_may_create_and_gains_authority() {
    let mut server = open_server(CreatePolicy::AnyClient);
    let (key, mut client) = server.connect();

    client.request_create(&Position::new(4.0, 2.0)).unwrap();
    assert!(client.storage::<Position>().is_empty());
    exchange_packets(&mut server, &mut [&mut client]);

    let mut events = server.world.take_events();
    let created: Vec<_> = events.read::<CreateEntityEvent<Position>>().collect();
    assert_eq!(created.len(), 1);
    let (creator, handle) = created[0];
    assert_eq!(creator, key);

    let storage = server.world.storage::<Position>();
    assert_eq!(storage.entity(handle), &Position::new(4.0, 2.0));
    assert_eq!(storage.authority(handle), Some(key));
    assert!(storage.is_observer(handle, key));

    // the originator's mirror only appears with the server's echo
    let mut mirror_events = client.take_events();
    assert_eq!(mirror_events.read::<MirrorCreated<Position>>().collect::<Vec<_>>(), vec![handle]);
    assert_eq!(client.storage::<Position>().entity(handle), &Position::new(4.0, 2.0));
}

#[test]
fn authenticated_policy_checks_the_flag() {
    let mut server = open_server(CreatePolicy::AuthenticatedClients);
    let (key, mut client) = server.connect();

    client.request_create(&Position::default()).unwrap();
    exchange_packets(&mut server, &mut [&mut client]);
    assert!(server.world.storage::<Position>().is_empty());

    server.world.set_authenticated(key, true).unwrap();
    assert!(server.world.is_authenticated(key));
    client.request_create(&Position::default()).unwrap();
    exchange_packets(&mut server, &mut [&mut client]);
    assert_eq!(server.world.storage::<Position>().len(), 1);
}

#[test]
fn authority_updates_are_applied_and_fanned_out() {
    let mut server = open_server(CreatePolicy::ServerOnly);
    let (writer_key, mut writer) = server.connect();
    let (reader_key, mut reader) = server.connect();

    let mut storage = server.world.storage_mut::<Position>();
    let (handle, _) = storage.create(Position::new(0.0, 0.0));
    storage.set_authority(handle, Some(writer_key));
    storage.add_observer(handle, writer_key);
    storage.add_observer(handle, reader_key);
    exchange_packets(&mut server, &mut [&mut writer, &mut reader]);

    writer.request_update(handle, &Position::new(9.0, 9.0)).unwrap();
    assert_eq!(writer.storage::<Position>().entity(handle), &Position::new(0.0, 0.0));
    exchange_packets(&mut server, &mut [&mut writer, &mut reader]);

    assert!(server.world.take_events().has::<UpdateEntityEvent<Position>>());
    assert_eq!(server.world.storage::<Position>().entity(handle), &Position::new(9.0, 9.0));
    assert_eq!(reader.storage::<Position>().entity(handle), &Position::new(9.0, 9.0));
    assert_eq!(writer.storage::<Position>().entity(handle), &Position::new(9.0, 9.0));
}

#[test]
fn non_authority_mutations_change_nothing() {
    let mut server = open_server(CreatePolicy::ServerOnly);
    let (owner_key, mut owner) = server.connect();
    let (other_key, mut other) = server.connect();

    let mut storage = server.world.storage_mut::<Position>();
    let (handle, _) = storage.create(Position::new(1.0, 1.0));
    storage.set_authority(handle, Some(owner_key));
    storage.add_observer(handle, other_key);
    exchange_packets(&mut server, &mut [&mut owner, &mut other]);

    other.request_update(handle, &Position::new(6.0, 6.0)).unwrap();
    other.request_destroy(handle).unwrap();
    exchange_packets(&mut server, &mut [&mut owner, &mut other]);

    let mut events = server.world.take_events();
    assert!(!events.has::<UpdateEntityEvent<Position>>());
    assert!(!events.has::<DestroyEntityEvent<Position>>());
    assert_eq!(server.world.storage::<Position>().entity(handle), &Position::new(1.0, 1.0));
    assert_eq!(other.storage::<Position>().entity(handle), &Position::new(1.0, 1.0));
    assert!(server.world.client_exists(other_key));
    assert!(other.is_running());
}

#[test]
fn authority_may_destroy() {
    let mut server = open_server(CreatePolicy::AnyClient);
    let (key, mut client) = server.connect();

    client.request_create(&Position::default()).unwrap();
    exchange_packets(&mut server, &mut [&mut client]);
    let handle = server.world.storage::<Position>().handles()[0];
    server.world.take_events().read::<CreateEntityEvent<Position>>().for_each(drop);

    client.request_destroy(handle).unwrap();
    exchange_packets(&mut server, &mut [&mut client]);

    let destroyed: Vec<_> = server
        .world
        .take_events()
        .read::<DestroyEntityEvent<Position>>()
        .collect();
    assert_eq!(destroyed, vec![(key, handle)]);
    assert!(!server.world.storage::<Position>().alive(handle));
    assert!(!client.storage::<Position>().alive(handle));
}

#[test]
fn disconnecting_returns_authority_to_the_server() {
    let mut server = open_server(CreatePolicy::AnyClient);
    let (key, mut client) = server.connect();

    client.request_create(&Position::default()).unwrap();
    exchange_packets(&mut server, &mut [&mut client]);
    let handle = server.world.storage::<Position>().handles()[0];

    server.world.disconnect_client(key).unwrap();
    assert!(!server.world.client_exists(key));

    let storage = server.world.storage::<Position>();
    assert_eq!(storage.authority(handle), None);
    assert_eq!(storage.observers(handle).count(), 0);
    assert!(server.world.disconnect_client(key).is_err());
}

#[test]
fn truncated_authority_update_leaves_the_entity_untouched() {
    let mut server = open_server(CreatePolicy::ServerOnly);
    let (reader_key, mut reader) = server.connect();

    let mut rogue = server.connector().connect();
    server.world.tick();
    let rogue_key = server.world.take_events().read::<ConnectEvent>().next().unwrap();

    let mut storage = server.world.storage_mut::<Position>();
    let (handle, _) = storage.create(Position::new(1.0, 1.0));
    storage.set_authority(handle, Some(rogue_key));
    storage.add_observer(handle, reader_key);
    exchange_packets(&mut server, &mut [&mut reader]);

    // an Update for storage 0 carrying only `x`
    let mut frame = Vec::new();
    frame.extend_from_slice(&17i32.to_le_bytes());
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame.push(1);
    frame.extend_from_slice(&handle.index().to_le_bytes());
    frame.extend_from_slice(&handle.generation().to_le_bytes());
    frame.extend_from_slice(&99.0f32.to_le_bytes());
    rogue.write_all(&frame).unwrap();
    exchange_packets(&mut server, &mut [&mut reader]);

    let mut events = server.world.take_events();
    assert_eq!(
        events.read::<DisconnectEvent>().collect::<Vec<_>>(),
        vec![(rogue_key, DisconnectReason::ProtocolFault)]
    );
    assert!(!events.has::<UpdateEntityEvent<Position>>());

    let storage = server.world.storage::<Position>();
    assert_eq!(storage.entity(handle), &Position::new(1.0, 1.0));
    assert_eq!(storage.authority(handle), None);
    assert_eq!(reader.storage::<Position>().entity(handle), storage.entity(handle));
}

#[test]
fn departed_keys_cannot_be_granted_anything() {
    let mut server = open_server(CreatePolicy::ServerOnly);
    let (departed, mut leaving) = server.connect();

    leaving.request_exit();
    leaving.tick();
    server.world.tick();
    assert!(!server.world.client_exists(departed));

    let mut storage = server.world.storage_mut::<Position>();
    let (handle, _) = storage.create(Position::new(1.0, 1.0));
    assert!(matches!(
        storage.try_set_authority(handle, Some(departed)),
        Err(ReplicaServerError::UnknownClient { client }) if client == departed
    ));
    assert!(matches!(
        storage.try_add_observer(handle, departed),
        Err(ReplicaServerError::UnknownClient { .. })
    ));
    assert_eq!(storage.authority(handle), None);
    assert_eq!(storage.observers(handle).count(), 0);

    // the recycled key starts with nothing
    let (newcomer_key, mut newcomer) = server.connect();
    assert_eq!(newcomer_key, departed);
    newcomer.request_update(handle, &Position::new(42.0, 42.0)).unwrap();
    exchange_packets(&mut server, &mut [&mut newcomer]);

    assert_eq!(server.world.storage::<Position>().entity(handle), &Position::new(1.0, 1.0));
    assert!(!newcomer.storage::<Position>().alive(handle));
}

#[test]
#[should_panic]
fn granting_authority_to_an_unknown_key_panics() {
    let mut server = open_server(CreatePolicy::ServerOnly);
    let (departed, _) = server.connect();
    server.world.disconnect_client(departed).unwrap();

    let mut storage = server.world.storage_mut::<Position>();
    let (handle, _) = storage.create(Position::default());
    storage.set_authority(handle, Some(departed));
}
