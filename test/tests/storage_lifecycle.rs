use std::collections::BTreeSet;

use replica_server::shared::Handle;
use replica_test::{init_logging, Position, TestServer};

#[test]
fn destroyed_handles_are_no_longer_alive() {
    init_logging();
    let mut server = TestServer::new();
    let mut storage = server.world.storage_mut::<Position>();

    let (first, _) = storage.create(Position::new(1.0, 1.0));
    let (second, _) = storage.create(Position::new(2.0, 2.0));
    assert!(storage.alive(first));
    assert!(storage.alive(second));

    let removed = storage.destroy(first);
    assert_eq!(removed, Position::new(1.0, 1.0));
    assert!(!storage.alive(first));
    assert!(storage.get(first).is_none());
    assert!(storage.try_destroy(first).is_err());
    assert_eq!(storage.entity(second), &Position::new(2.0, 2.0));
}

#[test]
fn recreating_reuses_the_slot_with_a_newer_generation() {
    let mut server = TestServer::new();
    let mut storage = server.world.storage_mut::<Position>();

    let (original, _) = storage.create(Position::default());
    storage.destroy(original);
    let (reused, _) = storage.create(Position::new(5.0, 0.0));

    assert_eq!(reused.index(), original.index());
    assert!(reused.generation() > original.generation());
    assert!(!storage.alive(original));
    assert!(storage.alive(reused));
}

#[test]
#[should_panic(expected = "Stale handle")]
fn stale_handle_access_panics() {
    let mut server = TestServer::new();
    let mut storage = server.world.storage_mut::<Position>();
    let (handle, _) = storage.create(Position::default());
    storage.destroy(handle);

    storage.entity(handle);
}

#[test]
fn dense_count_tracks_live_entities() {
    let mut server = TestServer::new();
    let mut storage = server.world.storage_mut::<Position>();

    let handles: Vec<Handle<Position>> = (0u8..10)
        .map(|value| storage.create(Position::new(f32::from(value), 0.0)).0)
        .collect();

    let mut live: BTreeSet<u8> = (0..10).collect();
    for (value, handle) in handles.iter().enumerate().filter(|(value, _)| value % 3 == 0) {
        storage.destroy(*handle);
        live.remove(&(value as u8));

        assert_eq!(storage.len(), live.len());
        let remaining: BTreeSet<u8> = storage.iter().map(|(_, position)| position.x as u8).collect();
        assert_eq!(remaining, live);
    }
}

#[test]
fn run_can_destroy_the_visited_entity() {
    let mut server = TestServer::new();
    let mut storage = server.world.storage_mut::<Position>();
    for value in 0u8..=254 {
        storage.create(Position::new(f32::from(value), 0.0));
    }

    let mut visited = Vec::new();
    storage.run(|entity| {
        let value = entity.get().x as u32;
        visited.push(value);
        if value % 2 == 1 {
            entity.destroy();
            assert!(entity.is_destroyed());
        }
    });

    visited.sort_unstable();
    assert_eq!(visited, (0..=254).collect::<Vec<u32>>());

    let mut live: Vec<u32> = storage.iter().map(|(_, position)| position.x as u32).collect();
    live.sort_unstable();
    assert_eq!(live, (0..=254).filter(|value| value % 2 == 0).collect::<Vec<u32>>());
}

#[test]
fn registering_a_type_twice_is_an_error() {
    let mut server = TestServer::new();
    let result = server
        .world
        .try_register::<Position>(Default::default());
    assert!(result.is_err());
    assert!(server.world.try_storage::<Position>().is_ok());
}
