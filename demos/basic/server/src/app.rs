use std::{io, net::SocketAddr};

use log::{info, trace, warn};

use replica_basic_demo_shared::{Character, SERVER_ADDRESS};
use replica_server::{
    transport::TcpListenerTransport, ClientKey, ConnectEvent, CreateEntityEvent, CreatePolicy,
    DestroyEntityEvent, DisconnectEvent, ErrorEvent, ServerConfig, ServerWorld, StorageConfig,
    UpdateEntityEvent,
};

const WALK_WIDTH: u32 = 40;
const SNAPSHOT_INTERVAL: u32 = 200;

pub struct App {
    world: ServerWorld,
    tick_count: u32,
}

impl App {
    pub fn new() -> io::Result<Self> {
        info!("Basic Replica Server Demo started");

        let address: SocketAddr = SERVER_ADDRESS
            .parse()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        let listener = TcpListenerTransport::bind(address)?;
        let mut world = ServerWorld::new(listener, ServerConfig::default());
        world.register::<Character>(StorageConfig::default().with_policy(CreatePolicy::AnyClient));

        Ok(Self {
            world,
            tick_count: 0,
        })
    }

    /// Runs one tick. Returns `false` once the server has stopped.
    pub fn update(&mut self) -> bool {
        if !self.world.tick() {
            return false;
        }
        self.tick_count = self.tick_count.wrapping_add(1);

        let mut events = self.world.take_events();
        for client in events.read::<ConnectEvent>() {
            info!("Client {} connected", client);
            self.welcome(client);
        }
        for (client, reason) in events.read::<DisconnectEvent>() {
            info!("Client {} disconnected: {:?}", client, reason);
        }
        for (creator, handle) in events.read::<CreateEntityEvent<Character>>() {
            let clients = self.world.client_keys();
            let mut storage = self.world.storage_mut::<Character>();
            info!("Client {} created `{}`", creator, storage.entity(handle).name);
            for client in clients {
                if client != creator {
                    storage.add_observer(handle, client);
                }
            }
        }
        for (client, handle) in events.read::<UpdateEntityEvent<Character>>() {
            trace!("Client {} moved {:?}", client, handle);
        }
        for (client, handle) in events.read::<DestroyEntityEvent<Character>>() {
            info!("Client {} destroyed {:?}", client, handle);
        }
        for error in events.read::<ErrorEvent>() {
            warn!("Server Error: {}", error);
        }

        self.walk_bots();

        if self.tick_count % SNAPSHOT_INTERVAL == 0 {
            let snapshot = self.world.save_snapshot();
            info!("World snapshot: {}", snapshot);
        }
        true
    }

    /// Gives the client a bot of its own and shows it every existing
    /// character
    fn welcome(&mut self, client: ClientKey) {
        let others: Vec<ClientKey> = self
            .world
            .client_keys()
            .into_iter()
            .filter(|other| *other != client)
            .collect();
        let mut storage = self.world.storage_mut::<Character>();
        let name = format!("Bot {}", client);
        let (bot, _) = storage.create(Character::new(0, client.to_u32(), &name));

        for handle in storage.handles() {
            storage.add_observer(handle, client);
        }
        for other in others {
            storage.add_observer(bot, other);
        }
    }

    fn walk_bots(&mut self) {
        self.world.storage_mut::<Character>().run(|entity| {
            if entity.authority().is_some() {
                return;
            }
            let character = entity.get_mut();
            character.x = (character.x + 1) % WALK_WIDTH;
            entity.update_observers();
        });
    }
}
