#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Lightkeep session.
//!
//! The driver loads (or synthesizes) a terrain grid, stages a small
//! battlefield through the editor workflow, drafts the gates into a wave,
//! buys one tower mid-game through the store workflow, and then runs the
//! simulation clock, printing a summary of everything the observer saw.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use lightkeep_core::{
    geometry::Point, Command, Event, ItemBlueprint, Observer, TerrainGrid, TerrainKind, TowerKind,
    WarriorKind, CELL_SIZE,
};
use lightkeep_system_placement::{CreatorWorkflow, Intent, StoreWorkflow};
use lightkeep_world::{self as world, query, World};

/// Command-line arguments accepted by the headless driver.
#[derive(Debug, Parser)]
#[command(name = "lightkeep", about = "Headless Lightkeep simulation driver")]
struct Args {
    /// Terrain file to load; omitted means an all-grass map.
    #[arg(long)]
    map: Option<PathBuf>,
    /// Map width in cells.
    #[arg(long, default_value_t = 12)]
    width: u32,
    /// Map height in cells.
    #[arg(long, default_value_t = 8)]
    height: u32,
    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// Fixed timestep in milliseconds.
    #[arg(long, default_value_t = 50)]
    step_ms: u64,
    /// Ambient light target every cell relaxes toward.
    #[arg(long, default_value_t = 10.0)]
    ambient: f32,
    /// Credits available to the in-game store.
    #[arg(long, default_value_t = 200)]
    credits: u32,
}

#[derive(Debug, Default)]
struct EventTally {
    towers_created: u32,
    gates_created: u32,
    warriors_created: u32,
    warriors_removed: u32,
    bullets_fired: u32,
}

struct TallyObserver {
    tally: Rc<RefCell<EventTally>>,
}

impl Observer for TallyObserver {
    fn handle(&mut self, events: &[Event]) {
        let mut tally = self.tally.borrow_mut();
        for event in events {
            match event {
                Event::TowerCreated { .. } => tally.towers_created += 1,
                Event::GateCreated { .. } => tally.gates_created += 1,
                Event::WarriorCreated { .. } => tally.warriors_created += 1,
                Event::WarriorRemoved { .. } => tally.warriors_removed += 1,
                Event::BulletCreated { .. } => tally.bullets_fired += 1,
                _ => {}
            }
        }
    }
}

fn drive_editor(world: &mut World, editor: &mut CreatorWorkflow, intent: Intent) {
    let mut commands = Vec::new();
    editor.handle(intent, |point| query::item_at(world, point), &mut commands);
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    editor.observe(&events);
}

fn drive_store(world: &mut World, store: &mut StoreWorkflow, intent: Intent) {
    let mut commands = Vec::new();
    store.handle(intent, &mut commands);
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    store.observe(&events);
}

fn place(world: &mut World, editor: &mut CreatorWorkflow, blueprint: ItemBlueprint, at: Point) {
    drive_editor(world, editor, Intent::StorePick { blueprint, price: 0 });
    drive_editor(world, editor, Intent::PointerMoved { at });
    drive_editor(world, editor, Intent::MapPrimary { at });
    if editor.previewing() {
        tracing::warn!(?blueprint, x = at.x(), y = at.y(), "placement rejected");
        drive_editor(world, editor, Intent::MapSecondary { at });
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let grid = match &args.map {
        Some(path) => lightkeep_map_format::load(path, args.width, args.height)
            .with_context(|| format!("loading map {}", path.display()))?,
        None => TerrainGrid::filled(args.width, args.height, TerrainKind::Grass),
    };

    let mut world = World::from_terrain(&grid);
    let tally = Rc::new(RefCell::new(EventTally::default()));
    world.register(Box::new(TallyObserver {
        tally: tally.clone(),
    }));

    let map_width = args.width as f32 * CELL_SIZE;
    let map_height = args.height as f32 * CELL_SIZE;
    let mid_y = map_height / 2.0;

    // Stage the battlefield the way the editor would.
    let mut editor = CreatorWorkflow::new();
    place(
        &mut world,
        &mut editor,
        ItemBlueprint::Tower(TowerKind::Fortress),
        Point::new(map_width - 2.5 * CELL_SIZE, mid_y),
    );
    place(
        &mut world,
        &mut editor,
        ItemBlueprint::Tower(TowerKind::Energy),
        Point::new(map_width / 2.0, mid_y - 2.0 * CELL_SIZE),
    );
    let gate_positions = [
        Point::new(1.5 * CELL_SIZE, mid_y - 1.5 * CELL_SIZE),
        Point::new(1.5 * CELL_SIZE, mid_y + 1.5 * CELL_SIZE),
    ];
    for at in gate_positions {
        place(&mut world, &mut editor, ItemBlueprint::Gate, at);
    }

    // Draft every placed gate into the first wave.
    for at in gate_positions {
        drive_editor(&mut world, &mut editor, Intent::MapPrimary { at });
    }
    drive_editor(&mut world, &mut editor, Intent::StartNewWave);
    drive_editor(&mut world, &mut editor, Intent::RequestGatesForWave);
    let wave = editor.take_wave().context("wave draft was not completed")?;

    let mut events = Vec::new();
    for (index, gate) in wave.gates().iter().enumerate() {
        let kind = if index % 2 == 0 {
            WarriorKind::Soldier
        } else {
            WarriorKind::Adamant
        };
        world::apply(&mut world, Command::SpawnWarrior { gate: *gate, kind }, &mut events);
    }

    // One mid-game purchase through the store.
    let mut store = StoreWorkflow::new(args.credits);
    let shop_spot = Point::new(map_width / 2.0, mid_y + 2.0 * CELL_SIZE);
    drive_store(
        &mut world,
        &mut store,
        Intent::StorePick {
            blueprint: ItemBlueprint::Tower(TowerKind::Light),
            price: 75,
        },
    );
    drive_store(&mut world, &mut store, Intent::PointerMoved { at: shop_spot });
    drive_store(&mut world, &mut store, Intent::MapPrimary { at: shop_spot });

    // Run the clock.
    let dt = Duration::from_millis(args.step_ms);
    for _ in 0..args.ticks {
        let mut tick_events = Vec::new();
        world::apply(
            &mut world,
            Command::Tick {
                dt,
                ambient_light: args.ambient,
            },
            &mut tick_events,
        );
    }

    let (width, height) = query::dimensions(&world);
    let tally = tally.borrow();
    println!("simulated {} ticks on a {width}x{height} map", args.ticks);
    println!(
        "towers placed: {} (store credits left: {})",
        tally.towers_created,
        store.credits()
    );
    println!("gates placed: {}", tally.gates_created);
    println!(
        "warriors: {} spawned, {} fell, {} still marching",
        tally.warriors_created,
        tally.warriors_removed,
        query::warriors(&world).len()
    );
    println!("bullets fired: {}", tally.bullets_fired);
    println!("fortress health: {:.0}", query::fortress_health(&world));
    println!(
        "adamant warrior on the field: {}",
        query::adamant_is_coming(&world)
    );
    println!("total light: {:.1}", query::total_light(&world));

    Ok(())
}
