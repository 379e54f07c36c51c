use std::io::Write;

use replica_client::{DisconnectEvent as ClientDisconnectEvent, DisconnectReason as ClientReason};
use replica_server::{
    ConnectEvent, CreateEntityEvent, CreatePolicy, DisconnectEvent, DisconnectReason, ErrorEvent,
    ServerConfig, StorageConfig,
};
use replica_test::{exchange_packets, init_logging, Position, TestServer};

fn capped_server(cap: usize) -> TestServer {
    let config = ServerConfig {
        max_messages_per_tick: cap,
        ..ServerConfig::default()
    };
    TestServer::with_config(
        config,
        StorageConfig::default().with_policy(CreatePolicy::AnyClient),
        StorageConfig::default(),
    )
}

#[test]
fn message_cap_defers_the_rest_to_later_ticks() {
    init_logging();
    let cap = 4;
    let extra = 3;
    let mut server = capped_server(cap);
    let (_, mut client) = server.connect();

    for value in 0u8..7 {
        client.request_create(&Position::new(f32::from(value), 0.0)).unwrap();
    }
    client.tick();

    server.world.tick();
    assert_eq!(server.world.storage::<Position>().len(), cap);
    let mut created: Vec<_> = server
        .world
        .take_events()
        .read::<CreateEntityEvent<Position>>()
        .collect();

    server.world.tick();
    assert_eq!(server.world.storage::<Position>().len(), cap + extra);
    created.extend(server.world.take_events().read::<CreateEntityEvent<Position>>());

    // applied in the order the client sent them
    let storage = server.world.storage::<Position>();
    let values: Vec<f32> = created
        .iter()
        .map(|(_, handle)| storage.entity(*handle).x)
        .collect();
    assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn a_faulty_client_is_dropped_alone() {
    let mut server = TestServer::new();
    let (good_key, mut good) = server.connect();

    let mut rogue = server.connector().connect();
    server.world.tick();
    let rogue_key = server.world.take_events().read::<ConnectEvent>().next().unwrap();

    // length prefix of -1
    rogue.write_all(&[0xff, 0xff, 0xff, 0xff]).unwrap();

    let mut storage = server.world.storage_mut::<Position>();
    let (handle, _) = storage.create(Position::new(1.0, 0.0));
    storage.add_observer(handle, good_key);
    storage.add_observer(handle, rogue_key);
    exchange_packets(&mut server, &mut [&mut good]);

    let mut events = server.world.take_events();
    assert_eq!(
        events.read::<DisconnectEvent>().collect::<Vec<_>>(),
        vec![(rogue_key, DisconnectReason::ProtocolFault)]
    );
    assert_eq!(events.read::<ErrorEvent>().count(), 1);

    assert!(!server.world.client_exists(rogue_key));
    assert!(server.world.client_exists(good_key));
    assert_eq!(server.world.storage::<Position>().observers(handle).collect::<Vec<_>>(), vec![good_key]);
    assert!(good.storage::<Position>().alive(handle));
    assert!(good.is_running());
}

#[test]
fn unknown_storage_id_is_a_fault() {
    let mut server = TestServer::new();
    let mut rogue = server.connector().connect();
    server.world.tick();
    let rogue_key = server.world.take_events().read::<ConnectEvent>().next().unwrap();

    let mut frame = Vec::new();
    frame.extend_from_slice(&13i32.to_le_bytes());
    frame.extend_from_slice(&99u32.to_le_bytes());
    frame.push(2);
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame.extend_from_slice(&0u32.to_le_bytes());
    rogue.write_all(&frame).unwrap();
    server.world.tick();

    assert!(!server.world.client_exists(rogue_key));
}

#[test]
fn client_keys_are_recycled() {
    let mut server = TestServer::new();
    let (first, mut first_client) = server.connect();
    let (second, _second_client) = server.connect();
    assert_ne!(first, second);
    assert_eq!(server.world.client_count(), 2);

    first_client.request_exit();
    assert!(!first_client.tick());
    server.world.tick();
    let mut events = server.world.take_events();
    assert_eq!(
        events.read::<DisconnectEvent>().collect::<Vec<_>>(),
        vec![(first, DisconnectReason::PeerClosed)]
    );

    let (third, _third_client) = server.connect();
    assert_eq!(third, first);
    assert_eq!(server.world.client_keys(), vec![first, second]);
}

#[test]
fn exit_disconnects_everyone_and_stops() {
    let mut server = TestServer::new();
    let (key, mut client) = server.connect();
    assert!(server.world.is_running());

    server.world.request_exit();
    assert!(!server.world.tick());
    assert!(!server.world.is_running());
    assert!(!server.world.tick());

    let mut events = server.world.take_events();
    assert_eq!(
        events.read::<DisconnectEvent>().collect::<Vec<_>>(),
        vec![(key, DisconnectReason::ServerShutdown)]
    );
    assert_eq!(server.world.client_count(), 0);

    // new connections are no longer accepted
    let _late = server.connector().connect();
    server.world.tick();
    assert!(!server.world.take_events().has::<ConnectEvent>());

    assert!(!client.tick());
    assert_eq!(
        client.take_events().read::<ClientDisconnectEvent>().collect::<Vec<_>>(),
        vec![ClientReason::PeerClosed]
    );
    assert!(client.request_create(&Position::default()).is_err());
}

#[test]
fn client_stops_on_a_malformed_server_message() {
    use replica_client::{ClientConfig, ClientWorld, ErrorEvent as ClientErrorEvent};
    use replica_server::transport::local_stream_pair;

    let (client_end, mut server_end) = local_stream_pair();
    let mut client = ClientWorld::new(client_end, ClientConfig::default());
    replica_test::register_client_protocol(&mut client);
    assert!(client.tick());

    // a Create for storage 0 whose payload is one byte short
    let mut frame = Vec::new();
    frame.extend_from_slice(&16i32.to_le_bytes());
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame.push(0);
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame.extend_from_slice(&[0, 0, 0]);
    server_end.write_all(&frame).unwrap();

    assert!(!client.tick());
    assert!(!client.is_running());
    let mut events = client.take_events();
    assert_eq!(events.read::<ClientErrorEvent>().count(), 1);
    assert_eq!(
        events.read::<ClientDisconnectEvent>().collect::<Vec<_>>(),
        vec![ClientReason::ProtocolFault]
    );
    assert!(client.storage::<Position>().is_empty());
}
