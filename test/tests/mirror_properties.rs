use proptest::prelude::*;

use replica_server::shared::Handle;
use replica_test::{exchange_packets, Position, TestServer};

#[derive(Clone, Debug)]
enum Op {
    Create(u8),
    Destroy(usize),
    Move(usize, u8),
    Exchange,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u8>().prop_map(Op::Create),
        2 => any::<usize>().prop_map(Op::Destroy),
        2 => (any::<usize>(), any::<u8>()).prop_map(|(pick, x)| Op::Move(pick, x)),
        1 => Just(Op::Exchange),
    ]
}

proptest! {
    #[test]
    fn mirror_matches_observed_entities(ops in proptest::collection::vec(op(), 1..60)) {
        let mut server = TestServer::new();
        let (key, mut client) = server.connect();
        let mut live: Vec<Handle<Position>> = Vec::new();

        for op in ops {
            let mut storage = server.world.storage_mut::<Position>();
            match op {
                Op::Create(x) => {
                    let (handle, _) = storage.create(Position::new(f32::from(x), 0.0));
                    storage.add_observer(handle, key);
                    live.push(handle);
                }
                Op::Destroy(pick) if !live.is_empty() => {
                    let handle = live.swap_remove(pick % live.len());
                    storage.destroy(handle);
                }
                Op::Move(pick, x) if !live.is_empty() => {
                    let handle = live[pick % live.len()];
                    storage.entity_mut(handle).y = f32::from(x);
                    storage.update_observers(handle);
                }
                Op::Exchange => exchange_packets(&mut server, &mut [&mut client]),
                _ => {}
            }
        }
        exchange_packets(&mut server, &mut [&mut client]);

        let storage = server.world.storage::<Position>();
        let mirror = client.storage::<Position>();
        prop_assert_eq!(mirror.len(), storage.len());
        for (handle, position) in storage.iter() {
            prop_assert_eq!(mirror.get(handle), Some(position));
        }
    }
}
