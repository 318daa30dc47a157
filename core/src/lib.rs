#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Lightkeep engine.
//!
//! This crate defines the message surface that connects input adapters, the
//! authoritative map, and the placement workflows. Adapters submit [`Command`]
//! values describing desired mutations, the map executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values in emission
//! order to every registered [`Observer`]. Observers react to events — never
//! to raw engine state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod entities;
pub mod geometry;

pub use entities::{
    Bullet, BulletId, Gate, GateId, ItemBlueprint, ItemHandle, MapItem, PreviewItem, Tower,
    TowerAttack, TowerId, TowerKind, Warrior, WarriorId, WarriorKind, BULLET_SIDE, BULLET_SPEED,
    GATE_SIDE,
};

use geometry::{Point, Polygon};

/// Side length of a single square map cell in world units.
pub const CELL_SIZE: f32 = 30.0;

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Maps a world-space point to the cell containing it, or `None` for points
/// left of or above the grid origin.
#[must_use]
pub fn cell_at(point: Point) -> Option<CellCoord> {
    if point.x() < 0.0 || point.y() < 0.0 {
        return None;
    }
    let column = (point.x() / CELL_SIZE) as u32;
    let row = (point.y() / CELL_SIZE) as u32;
    Some(CellCoord::new(column, row))
}

/// Builds the square polygon covering the provided cell.
#[must_use]
pub fn cell_shape(cell: CellCoord) -> Polygon {
    let center = Point::new(
        cell.column() as f32 * CELL_SIZE + CELL_SIZE / 2.0,
        cell.row() as f32 * CELL_SIZE + CELL_SIZE / 2.0,
    );
    Polygon::square(center, CELL_SIZE)
}

/// Terrain classes a cell may carry, determining passability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Impassable water.
    Water,
    /// Impassable forest.
    Forest,
    /// Passable road.
    Road,
    /// Passable grass.
    Grass,
}

impl TerrainKind {
    /// Reports whether items may stand on this terrain.
    #[must_use]
    pub const fn passable(self) -> bool {
        matches!(self, Self::Road | Self::Grass)
    }

    /// Canonical map-file token for the terrain kind.
    #[must_use]
    pub const fn token(self) -> char {
        match self {
            Self::Water => 'W',
            Self::Forest => 'F',
            Self::Road => 'R',
            Self::Grass => 'G',
        }
    }

    /// Parses a map-file token; each kind accepts two spellings.
    #[must_use]
    pub const fn from_token(token: char) -> Option<Self> {
        match token {
            'W' | '~' => Some(Self::Water),
            'F' | '|' => Some(Self::Forest),
            'R' | '.' => Some(Self::Road),
            'G' | ',' => Some(Self::Grass),
            _ => None,
        }
    }
}

/// Cosmetic tile variant derived from a cell's 8-neighborhood.
///
/// The variant is a bitmask of the cardinal neighbors that share the center
/// cell's terrain (north = 1, east = 2, south = 4, west = 8). It never
/// affects passability or any other simulation behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderClass(u8);

impl RenderClass {
    /// Creates a render class from its raw bitmask.
    #[must_use]
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bitmask of matching cardinal neighbors.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Derives a cell's render class from its Moore neighborhood.
///
/// The neighborhood is enumerated clockwise starting north, with the center
/// cell last: N, NE, E, SE, S, SW, W, NW, center.
#[must_use]
pub fn render_class(neighborhood: &[TerrainKind; 9]) -> RenderClass {
    let center = neighborhood[8];
    let mut bits = 0u8;
    if neighborhood[0] == center {
        bits |= 1;
    }
    if neighborhood[2] == center {
        bits |= 2;
    }
    if neighborhood[4] == center {
        bits |= 4;
    }
    if neighborhood[6] == center {
        bits |= 8;
    }
    RenderClass::new(bits)
}

/// Rectangular terrain layout delivered by the map loader.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    cells: Vec<TerrainKind>,
}

impl TerrainGrid {
    /// Creates a grid with every cell set to the provided terrain.
    #[must_use]
    pub fn filled(width: u32, height: u32, kind: TerrainKind) -> Self {
        let capacity = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![kind; capacity],
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Terrain stored at the provided cell, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<TerrainKind> {
        self.index(cell).map(|index| self.cells[index])
    }

    /// Replaces the terrain at the provided cell; out-of-grid writes are
    /// ignored.
    pub fn set(&mut self, cell: CellCoord, kind: TerrainKind) {
        if let Some(index) = self.index(cell) {
            self.cells[index] = kind;
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.width && cell.row() < self.height {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.width).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Commands that express all permissible map mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
        /// Light value every cell relaxes toward during this tick.
        ambient_light: f32,
    },
    /// Installs a new preview item, replacing any existing one.
    BeginPreview {
        /// Candidate item to track outside the committed collections.
        item: PreviewItem,
    },
    /// Moves the preview item so it follows the pointer.
    MovePreview {
        /// New center for the preview item's shape.
        to: Point,
    },
    /// Discards the preview item without committing it.
    CancelPreview,
    /// Attempts to commit the preview item into its permanent collection.
    ///
    /// An invalid placement is silently rejected and the preview remains.
    CommitPreview,
    /// Replaces the terrain of a single cell, bypassing placement checks.
    EditTerrain {
        /// Cell whose terrain is replaced.
        cell: CellCoord,
        /// Terrain kind the cell changes to.
        kind: TerrainKind,
    },
    /// Toggles an already-placed item's membership in the chosen set.
    ToggleSelection {
        /// Tower or gate to toggle; other handles are ignored.
        item: ItemHandle,
    },
    /// Spawns a wave warrior at the provided gate.
    SpawnWarrior {
        /// Gate the warrior emerges from.
        gate: GateId,
        /// Kind of warrior to spawn.
        kind: WarriorKind,
    },
    /// Removes an existing tower from the map.
    RemoveTower {
        /// Identifier of the tower targeted for removal.
        tower: TowerId,
    },
}

/// Lifecycle events broadcast by the map after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a tower joined the committed collection.
    TowerCreated {
        /// The tower exactly as committed.
        tower: Tower,
    },
    /// Confirms that a tower left the committed collection.
    TowerRemoved {
        /// Identifier of the removed tower.
        tower: TowerId,
    },
    /// Confirms that a gate joined the committed collection.
    GateCreated {
        /// The gate exactly as committed.
        gate: Gate,
    },
    /// Confirms that a gate left the committed collection.
    GateRemoved {
        /// Identifier of the removed gate.
        gate: GateId,
    },
    /// Confirms that a warrior joined the committed collection.
    WarriorCreated {
        /// The warrior exactly as committed.
        warrior: Warrior,
    },
    /// Confirms that a warrior left the committed collection.
    WarriorRemoved {
        /// Identifier of the removed warrior.
        warrior: WarriorId,
    },
    /// Confirms that a bullet joined the committed collection.
    BulletCreated {
        /// The bullet exactly as committed.
        bullet: Bullet,
    },
    /// Confirms that a bullet left the committed collection.
    BulletRemoved {
        /// Identifier of the removed bullet.
        bullet: BulletId,
    },
    /// Confirms that a preview item was installed.
    PreviewCreated {
        /// The installed preview item.
        item: PreviewItem,
    },
    /// Confirms that the preview item was discarded or committed.
    PreviewRemoved {
        /// The preview item that left the slot.
        item: PreviewItem,
    },
    /// Confirms that a cell's terrain was replaced.
    TerrainChanged {
        /// Cell whose terrain changed.
        cell: CellCoord,
        /// Terrain kind the cell changed to.
        kind: TerrainKind,
    },
    /// Confirms that an item's selection flag flipped.
    SelectionChanged {
        /// Item whose flag changed.
        item: ItemHandle,
        /// New value of the selection flag.
        selected: bool,
    },
    /// Reports damage dealt to a tower.
    TowerDamaged {
        /// Tower that was struck.
        tower: TowerId,
        /// Amount of health removed.
        amount: f32,
    },
    /// Reports damage dealt to a warrior.
    WarriorDamaged {
        /// Warrior that was struck.
        warrior: WarriorId,
        /// Amount of health removed.
        amount: f32,
    },
    /// Reports a burst of light injected into a cell by a light tower.
    LightEmitted {
        /// Cell receiving the light.
        cell: CellCoord,
        /// Light quantity added to the cell's pending impulse.
        amount: f32,
    },
}

/// Receiver for the engine's event broadcast.
///
/// The map calls [`Observer::handle`] with events in emission order after
/// every tick and after every direct mutation. Observers must not mutate
/// engine state from within the callback.
pub trait Observer {
    /// Reacts to a batch of events emitted by a single command.
    fn handle(&mut self, events: &[Event]);
}
