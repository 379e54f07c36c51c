use std::{io, thread};

use replica_basic_demo_shared::TICK_INTERVAL;

mod app;
use app::App;

fn main() -> io::Result<()> {
    env_logger::init();

    let mut app = App::new()?;
    while app.update() {
        thread::sleep(TICK_INTERVAL);
    }
    Ok(())
}
