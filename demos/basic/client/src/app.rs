use std::{io, net::SocketAddr};

use log::{info, warn};

use replica_basic_demo_shared::{Character, SERVER_ADDRESS};
use replica_client::{
    shared::Handle, transport::connect_tcp, ClientConfig, ClientWorld, CreateEntityEvent,
    DestroyEntityEvent, DisconnectEvent, ErrorEvent, UpdateEntityEvent,
};

const PLAYER_NAME: &str = "charlie";
const MOVE_INTERVAL: u32 = 10;

pub struct App {
    world: ClientWorld,
    player: Option<Handle<Character>>,
    tick_count: u32,
}

impl App {
    pub fn new() -> io::Result<Self> {
        info!("Basic Replica Client Demo started");

        let address: SocketAddr = SERVER_ADDRESS
            .parse()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        let stream = connect_tcp(address)?;
        let mut world = ClientWorld::new(stream, ClientConfig::default());
        world.register::<Character>();

        if let Err(error) = world.request_create(&Character::new(0, 0, PLAYER_NAME)) {
            warn!("Could not request a character: {}", error);
        }

        Ok(Self {
            world,
            player: None,
            tick_count: 0,
        })
    }

    /// Runs one tick. Returns `false` once the client has stopped.
    pub fn update(&mut self) -> bool {
        let running = self.world.tick();
        self.tick_count = self.tick_count.wrapping_add(1);

        let mut events = self.world.take_events();
        for handle in events.read::<CreateEntityEvent<Character>>() {
            let character = self.world.storage::<Character>().entity(handle);
            info!("Now seeing `{}` at ({}, {})", character.name, character.x, character.y);
            if self.player.is_none() && character.name == PLAYER_NAME {
                self.player = Some(handle);
            }
        }
        for handle in events.read::<UpdateEntityEvent<Character>>() {
            let character = self.world.storage::<Character>().entity(handle);
            info!("`{}` moved to ({}, {})", character.name, character.x, character.y);
        }
        for handle in events.read::<DestroyEntityEvent<Character>>() {
            info!("Lost sight of {:?}", handle);
            if self.player == Some(handle) {
                self.player = None;
            }
        }
        for error in events.read::<ErrorEvent>() {
            warn!("Client Error: {}", error);
        }
        for reason in events.read::<DisconnectEvent>() {
            info!("Client disconnected: {:?}", reason);
        }
        if !running {
            return false;
        }

        if self.tick_count % MOVE_INTERVAL == 0 {
            self.move_player();
        }
        true
    }

    fn move_player(&mut self) {
        let Some(handle) = self.player else {
            return;
        };
        let Some(character) = self.world.storage::<Character>().get(handle) else {
            return;
        };

        let mut moved = character.clone();
        moved.y += 1;
        if let Err(error) = self.world.request_update(handle, &moved) {
            warn!("Could not move: {}", error);
        }
    }
}
