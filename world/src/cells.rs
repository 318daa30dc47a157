//! A single grid tile: terrain, light state, adjacency, and transient
//! occupants.

use serde::{Deserialize, Serialize};

use lightkeep_core::{CellCoord, ItemHandle, RenderClass, TerrainKind};

use crate::lighting::Lighting;

/// One tile of the map, owned exclusively by the map at a fixed coordinate.
///
/// Adjacency is stored as indices into the map's cell vector rather than as
/// references, so replacing a cell only requires reconnecting indices. The
/// occupant list is rebuilt from scratch every tick and is never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Cell {
    coord: CellCoord,
    kind: TerrainKind,
    render_class: RenderClass,
    lighting: Lighting,
    adjacent: Vec<usize>,
    #[serde(skip)]
    occupants: Vec<ItemHandle>,
}

impl Cell {
    /// Creates a fresh cell with default lighting and no adjacency.
    pub(crate) fn new(coord: CellCoord, kind: TerrainKind) -> Self {
        Self {
            coord,
            kind,
            render_class: RenderClass::default(),
            lighting: Lighting::default(),
            adjacent: Vec::new(),
            occupants: Vec::new(),
        }
    }

    pub(crate) fn coord(&self) -> CellCoord {
        self.coord
    }

    pub(crate) fn kind(&self) -> TerrainKind {
        self.kind
    }

    pub(crate) fn passable(&self) -> bool {
        self.kind.passable()
    }

    pub(crate) fn render_class(&self) -> RenderClass {
        self.render_class
    }

    pub(crate) fn set_render_class(&mut self, render_class: RenderClass) {
        self.render_class = render_class;
    }

    pub(crate) fn adjacent(&self) -> &[usize] {
        &self.adjacent
    }

    pub(crate) fn set_adjacent(&mut self, adjacent: Vec<usize>) {
        self.adjacent = adjacent;
    }

    /// Clears the transient occupant list; must run before any
    /// entity-to-cell assignment in the same tick.
    pub(crate) fn tick_init(&mut self) {
        self.occupants.clear();
    }

    /// Registers an entity overlapping this cell for the current tick.
    /// The engine guarantees a single assignment per entity per tick, so no
    /// deduplication happens here.
    pub(crate) fn add_occupant(&mut self, item: ItemHandle) {
        self.occupants.push(item);
    }

    pub(crate) fn occupants(&self) -> &[ItemHandle] {
        &self.occupants
    }

    /// Advances lighting for the tick and returns the quantum to distribute
    /// among the adjacent cells. Isolated cells relax but emit nothing.
    pub(crate) fn tick(&mut self, ambient: f32, dt: f32) -> f32 {
        self.lighting.change_to(ambient, dt);
        if self.adjacent.is_empty() {
            return 0.0;
        }
        self.lighting.emit(dt)
    }

    /// Queues light to be consumed on this cell's next tick.
    pub(crate) fn add_light_impulse(&mut self, amount: f32) {
        self.lighting.add_impulse(amount);
    }

    /// Light currently stored in the cell.
    pub(crate) fn light_value(&self) -> f32 {
        self.lighting.value()
    }

    /// Stored light plus the impulse still in flight toward this cell.
    pub(crate) fn light_total(&self) -> f32 {
        self.lighting.total()
    }
}
