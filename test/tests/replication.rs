use replica_client::{CreateEntityEvent, DestroyEntityEvent, UpdateEntityEvent};
use replica_test::{exchange_packets, init_logging, Position, Roster, TestServer};

#[test]
fn observer_receives_create_update_and_destroy() {
    init_logging();
    let mut server = TestServer::new();
    let (key, mut client) = server.connect();

    let mut storage = server.world.storage_mut::<Position>();
    let (handle, _) = storage.create(Position::new(1.0, 2.0));
    assert!(storage.add_observer(handle, key));
    assert!(!storage.add_observer(handle, key));
    exchange_packets(&mut server, &mut [&mut client]);

    let mut events = client.take_events();
    assert_eq!(events.read::<CreateEntityEvent<Position>>().collect::<Vec<_>>(), vec![handle]);
    assert_eq!(client.storage::<Position>().get(handle), Some(&Position::new(1.0, 2.0)));

    let mut storage = server.world.storage_mut::<Position>();
    storage.entity_mut(handle).x = 7.0;
    storage.update_observers(handle);
    exchange_packets(&mut server, &mut [&mut client]);

    assert!(client.take_events().has::<UpdateEntityEvent<Position>>());
    assert_eq!(client.storage::<Position>().entity(handle).x, 7.0);

    server.world.storage_mut::<Position>().destroy(handle);
    exchange_packets(&mut server, &mut [&mut client]);

    assert!(client.take_events().has::<DestroyEntityEvent<Position>>());
    assert!(!client.storage::<Position>().alive(handle));
    assert!(client.storage::<Position>().is_empty());
}

#[test]
fn only_observers_receive_entities() {
    let mut server = TestServer::new();
    let (watcher, mut watching) = server.connect();
    let (_, mut ignored) = server.connect();

    let mut storage = server.world.storage_mut::<Position>();
    let (handle, _) = storage.create(Position::new(3.0, 3.0));
    storage.add_observer(handle, watcher);
    exchange_packets(&mut server, &mut [&mut watching, &mut ignored]);

    assert!(watching.storage::<Position>().alive(handle));
    assert!(ignored.storage::<Position>().is_empty());
}

#[test]
fn removing_an_observer_destroys_its_mirror() {
    let mut server = TestServer::new();
    let (key, mut client) = server.connect();

    let mut storage = server.world.storage_mut::<Position>();
    let (handle, _) = storage.create(Position::default());
    storage.add_observer(handle, key);
    exchange_packets(&mut server, &mut [&mut client]);
    assert!(client.storage::<Position>().alive(handle));

    let mut storage = server.world.storage_mut::<Position>();
    assert!(storage.remove_observer(handle, key));
    assert!(!storage.remove_observer(handle, key));
    assert!(storage.alive(handle));
    exchange_packets(&mut server, &mut [&mut client]);

    assert!(!client.storage::<Position>().alive(handle));
}

#[test]
fn set_changes_reach_new_and_established_observers() {
    let mut server = TestServer::new();
    let (early, mut early_client) = server.connect();
    let (late, mut late_client) = server.connect();

    let mut storage = server.world.storage_mut::<Roster>();
    let (handle, roster) = storage.create(Roster::new("crew"));
    for member in [1, 2, 3] {
        roster.members.insert(member);
    }
    storage.add_observer(handle, early);
    exchange_packets(&mut server, &mut [&mut early_client, &mut late_client]);
    assert_eq!(early_client.storage::<Roster>().entity(handle).member_list(), vec![1, 2, 3]);

    // the housekeeping of the ticks above flushed the initial additions
    let mut storage = server.world.storage_mut::<Roster>();
    let roster = storage.entity_mut(handle);
    assert!(!roster.members.has_changes());
    roster.members.remove(&1);
    roster.members.remove(&3);
    roster.members.insert(4);
    roster.members.insert(3);
    assert_eq!(roster.members.removed(), &[1, 3]);
    assert_eq!(roster.members.added(), &[4, 3]);

    storage.update_observers(handle);
    storage.add_observer(handle, late);
    assert_eq!(storage.entity(handle).replications, 1);
    exchange_packets(&mut server, &mut [&mut early_client, &mut late_client]);

    assert_eq!(early_client.storage::<Roster>().entity(handle).member_list(), vec![2, 3, 4]);
    assert_eq!(late_client.storage::<Roster>().entity(handle).member_list(), vec![2, 3, 4]);
    assert_eq!(late_client.storage::<Roster>().entity(handle).name, "crew");
}

#[test]
fn run_replicates_through_the_visited_entity() {
    let mut server = TestServer::new();
    let (key, mut client) = server.connect();

    let mut storage = server.world.storage_mut::<Position>();
    for value in 0u8..4 {
        let (handle, _) = storage.create(Position::new(f32::from(value), 0.0));
        storage.add_observer(handle, key);
    }
    exchange_packets(&mut server, &mut [&mut client]);
    assert_eq!(client.storage::<Position>().len(), 4);

    server.world.storage_mut::<Position>().run(|entity| {
        if entity.get().x >= 2.0 {
            entity.destroy();
        } else {
            entity.get_mut().y = 1.0;
            entity.update_observers();
        }
    });
    exchange_packets(&mut server, &mut [&mut client]);

    let mirror = client.storage::<Position>();
    assert_eq!(mirror.len(), 2);
    assert!(mirror.iter().all(|(_, position)| position.x < 2.0 && position.y == 1.0));
}
