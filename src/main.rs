/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::entity::FrameInput;
use sim::event::GameEvent;
use sim::save;
use sim::step;
use sim::timestep::FixedTimestep;
use sim::world::World;
use ui::input::{InputState, KEYS_QUIT, KEY_LOAD, KEY_SAVE};
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "tileworld.log";

/// Status messages stay up this long.
const MESSAGE_SECONDS: u32 = 2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = GameConfig::load();

    let mut world = World::new(config.rules(), config.maps_dir.clone()).map_err(|e| {
        error!(error = %e, "could not load the first level");
        e
    })?;

    let mut renderer = Renderer::new();
    renderer.init()?;

    let result = game_loop(&mut world, &mut renderer, &config);

    // Restore the terminal before any error is reported.
    let cleanup = renderer.cleanup();
    if let Err(e) = &result {
        error!(error = %e, "game loop aborted");
    }
    info!(level = world.level.name(), tick = world.tick, "exit");

    result?;
    cleanup?;
    Ok(())
}

/// Logs go to a file; stdout belongs to the terminal renderer.
/// `RUST_LOG` overrides the default `info` filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file = match File::create(LOG_FILE) {
        Ok(f) => f,
        Err(_) => return,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .init();
}

fn game_loop(
    world: &mut World,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut clock = FixedTimestep::new(
        config.timing.ticks_per_second,
        config.timing.max_catch_up_ticks,
    );
    let message_ticks = config.timing.ticks_per_second * MESSAGE_SECONDS;
    let mut last_frame = Instant::now();

    // One-shot actions survive frames that run zero ticks.
    let mut pending = FrameInput::default();

    info!(level = world.level.name(), tick_ms = ?clock.step(), "game started");

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() || kb.any_pressed(&KEYS_QUIT) {
            break;
        }
        if kb.was_pressed(KEY_SAVE) {
            match save::save_to(world, &config.save_file) {
                Ok(()) => world.set_message("Game saved", message_ticks),
                Err(e) => {
                    warn!(error = %e, "save failed");
                    world.set_message(format!("Save failed: {e}"), message_ticks);
                }
            }
        }
        if kb.was_pressed(KEY_LOAD) {
            match save::load_from(world, &config.save_file) {
                Ok(()) => world.set_message("Game loaded", message_ticks),
                Err(e) => {
                    warn!(error = %e, "load failed");
                    world.set_message(format!("Load failed: {e}"), message_ticks);
                }
            }
        }

        pending = merge_input(pending, kb.frame_input());

        let now = Instant::now();
        let ticks = clock.accumulate(now - last_frame);
        last_frame = now;

        for _ in 0..ticks {
            match step::advance(world, pending) {
                Ok(events) => announce(world, &events, message_ticks),
                Err(e) => {
                    error!(error = %e, "level transition failed");
                    world.set_message(format!("Level failed to load: {e}"), message_ticks);
                }
            }
            pending.consume_edges();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Movement follows what is held now; presses accumulate until a tick runs.
fn merge_input(pending: FrameInput, fresh: FrameInput) -> FrameInput {
    FrameInput {
        cycle_slot: pending.cycle_slot || fresh.cycle_slot,
        use_item: pending.use_item || fresh.use_item,
        ..fresh
    }
}

fn announce(world: &mut World, events: &[GameEvent], ticks: u32) {
    for event in events {
        let msg = match event {
            GameEvent::ChestOpened { x, y } => {
                debug!(x, y, "chest opened");
                "Chest opened".to_string()
            }
            GameEvent::DoorOpened { x, y } => {
                debug!(x, y, "door opened");
                "The door swings open".to_string()
            }
            GameEvent::DoorLocked => "The door is locked. Select a key".to_string(),
            GameEvent::FinalDoor => "This is the last door".to_string(),
            GameEvent::LevelChanged { level } => format!("Entered {}", level.title()),
            GameEvent::ItemUsed { item } => format!("Used {}", item.name()),
            GameEvent::PlayerDefeated => "You were defeated".to_string(),
            GameEvent::EnemyHit { id, health } => {
                debug!(id, health, "enemy hit");
                continue;
            }
            GameEvent::EnemyDied { id } | GameEvent::EnemyRemoved { id } => {
                debug!(id, ?event, "enemy lifecycle");
                continue;
            }
            GameEvent::PlayerHit { by, health } => {
                debug!(by, health, "player hit");
                continue;
            }
        };
        world.set_message(msg, ticks);
    }
}
