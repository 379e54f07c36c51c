use serde_json::json;

use replica_server::{shared::Handle, StorageConfig};
use replica_test::{exchange_packets, init_logging, Position, Roster, TestServer};

fn populated() -> (TestServer, Vec<Handle<Position>>) {
    let mut server = TestServer::new();
    let mut storage = server.world.storage_mut::<Position>();
    let handles: Vec<_> = (0u8..3)
        .map(|value| storage.create(Position::new(f32::from(value), 0.5)).0)
        .collect();
    storage.destroy(handles[1]);
    (server, handles)
}

#[test]
fn dead_slots_are_written_without_payload() {
    init_logging();
    let (server, _) = populated();

    let snapshot = server.world.save_snapshot();
    assert_eq!(
        snapshot["Position"],
        json!([
            { "gen": 0, "entity": { "x": 0.0, "y": 0.5 } },
            { "gen": 1, "dead": true },
            { "gen": 0, "entity": { "x": 2.0, "y": 0.5 } }
        ])
    );
    assert_eq!(snapshot["Roster"], json!([]));
}

#[test]
fn save_load_save_is_identical() {
    let (server, handles) = populated();
    let snapshot = server.world.save_snapshot();

    let mut restored = TestServer::new();
    restored.world.load_snapshot(&snapshot).unwrap();
    assert_eq!(restored.world.save_snapshot(), snapshot);

    let mut storage = restored.world.storage_mut::<Position>();
    assert_eq!(storage.len(), 2);
    assert!(storage.alive(handles[0]));
    assert!(!storage.alive(handles[1]));
    assert_eq!(storage.entity(handles[2]), &Position::new(2.0, 0.5));

    let (reused, _) = storage.create(Position::default());
    assert_eq!(reused.index(), handles[1].index());
    assert!(reused.generation() > handles[1].generation());
}

#[test]
fn impermanent_storages_are_left_out() {
    let mut server = TestServer::with_storages(StorageConfig::default(), StorageConfig::default().impermanent());
    server.world.storage_mut::<Roster>().create(Roster::new("scratch"));

    let snapshot = server.world.save_snapshot();
    assert!(snapshot.get("Roster").is_none());
    assert!(snapshot.get("Position").is_some());

    let mut other = TestServer::with_storages(StorageConfig::default(), StorageConfig::default().impermanent());
    other.world.storage_mut::<Roster>().create(Roster::new("kept"));
    other.world.load_snapshot(&snapshot).unwrap();
    assert_eq!(other.world.storage::<Roster>().len(), 1);
}

#[test]
fn malformed_snapshot_changes_nothing() {
    let (mut server, handles) = populated();
    let before = server.world.save_snapshot();

    let broken = json!({
        "Roster": [],
        "Position": [ { "gen": 0, "entity": { "x": "far" } } ]
    });
    assert!(server.world.load_snapshot(&broken).is_err());
    assert!(server.world.load_snapshot(&json!([1, 2])).is_err());

    assert_eq!(server.world.save_snapshot(), before);
    assert!(server.world.storage::<Position>().alive(handles[0]));
}

#[test]
fn loading_drops_observers_and_their_mirrors() {
    let (mut server, handles) = populated();
    let snapshot = server.world.save_snapshot();
    let (key, mut client) = server.connect();

    server.world.storage_mut::<Position>().add_observer(handles[0], key);
    exchange_packets(&mut server, &mut [&mut client]);
    assert!(client.storage::<Position>().alive(handles[0]));

    server.world.load_snapshot(&snapshot).unwrap();
    exchange_packets(&mut server, &mut [&mut client]);

    assert!(client.storage::<Position>().is_empty());
    let storage = server.world.storage::<Position>();
    assert!(storage.alive(handles[0]));
    assert_eq!(storage.observers(handles[0]).count(), 0);
}
