//! Flat entity state types shared between the engine and its observers.
//!
//! Every placeable or mobile thing is a plain struct over a common
//! capability surface ([`MapItem`]) rather than a hierarchy: towers, gates,
//! warriors, and bullets each carry their shape, their liveness, and the
//! handful of per-kind statistics the engine needs to drive them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Polygon};
use crate::CellCoord;

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GateId(u32);

impl GateId {
    /// Creates a new gate identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a warrior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WarriorId(u32);

impl WarriorId {
    /// Creates a new warrior identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a bullet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BulletId(u32);

impl BulletId {
    /// Creates a new bullet identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Reference to a committed item of any kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemHandle {
    /// A committed tower.
    Tower(TowerId),
    /// A committed gate.
    Gate(GateId),
    /// A committed warrior.
    Warrior(WarriorId),
    /// A committed bullet.
    Bullet(BulletId),
}

/// Common capability surface shared by all placeable and mobile items.
pub trait MapItem {
    /// Shape occupied by the item in world units.
    fn shape(&self) -> &Polygon;

    /// Reports whether the item should remain in the simulation.
    fn is_alive(&self) -> bool;
}

/// Types of towers that can be constructed on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerKind {
    /// Offensive tower with a strong, slow attack.
    Energy,
    /// Tower that attacks and floods its surroundings with light.
    Light,
    /// Passive blocking tower with no attack.
    Just,
    /// The player's stronghold; losing it ends the game.
    Fortress,
}

/// Attack parameters shared by the armed tower kinds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerAttack {
    /// Damage dealt by a single bullet.
    pub damage: f32,
    /// Maximum distance to a target, measured between shape centers.
    pub range: f32,
    /// Time the tower must recharge between shots.
    pub recharge: Duration,
}

impl TowerKind {
    /// Full health assigned to a freshly constructed tower of this kind.
    #[must_use]
    pub const fn max_health(self) -> f32 {
        match self {
            Self::Energy | Self::Light => 100.0,
            Self::Just => 150.0,
            Self::Fortress => 300.0,
        }
    }

    /// Side length of the tower's square footprint in world units.
    #[must_use]
    pub const fn side(self) -> f32 {
        match self {
            Self::Energy | Self::Light | Self::Just => 50.0,
            Self::Fortress => 60.0,
        }
    }

    /// Attack parameters for the kind, or `None` for passive towers.
    #[must_use]
    pub const fn attack(self) -> Option<TowerAttack> {
        match self {
            Self::Energy => Some(TowerAttack {
                damage: 25.0,
                range: 120.0,
                recharge: Duration::from_millis(1500),
            }),
            Self::Light => Some(TowerAttack {
                damage: 15.0,
                range: 150.0,
                recharge: Duration::from_millis(1000),
            }),
            Self::Just | Self::Fortress => None,
        }
    }
}

/// A committed tower standing on the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tower {
    id: TowerId,
    kind: TowerKind,
    shape: Polygon,
    health: f32,
    time_to_attack: Duration,
    selected: bool,
    #[serde(skip)]
    occupied: Vec<CellCoord>,
}

impl Tower {
    /// Creates a new tower of the given kind centered on the provided point.
    #[must_use]
    pub fn new(id: TowerId, kind: TowerKind, center: Point) -> Self {
        Self {
            id,
            kind,
            shape: Polygon::square(center, kind.side()),
            health: kind.max_health(),
            time_to_attack: Duration::ZERO,
            selected: false,
            occupied: Vec::new(),
        }
    }

    /// Identifier allocated to the tower by the engine.
    #[must_use]
    pub const fn id(&self) -> TowerId {
        self.id
    }

    /// Kind of tower that was constructed.
    #[must_use]
    pub const fn kind(&self) -> TowerKind {
        self.kind
    }

    /// Remaining health of the tower.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Reports whether the tower is the fortress.
    #[must_use]
    pub fn is_fortress(&self) -> bool {
        self.kind == TowerKind::Fortress
    }

    /// Reports whether the tower is part of the editor's chosen set.
    #[must_use]
    pub const fn selected(&self) -> bool {
        self.selected
    }

    /// Updates the tower's selection flag.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Subtracts the provided amount from the tower's health.
    pub fn apply_damage(&mut self, amount: f32) {
        self.health -= amount;
    }

    /// Clears the per-tick occupancy bookkeeping.
    pub fn tick_init(&mut self) {
        self.occupied.clear();
    }

    /// Records a cell the tower overlaps this tick.
    pub fn add_cell(&mut self, cell: CellCoord) {
        self.occupied.push(cell);
    }

    /// Cells the tower was assigned to during the current tick.
    #[must_use]
    pub fn occupied(&self) -> &[CellCoord] {
        &self.occupied
    }

    /// Advances the recharge timer by the elapsed time.
    pub fn tick_recharge(&mut self, dt: Duration) {
        self.time_to_attack = self.time_to_attack.saturating_sub(dt);
    }

    /// Reports whether the recharge timer has elapsed.
    #[must_use]
    pub fn ready_to_fire(&self) -> bool {
        self.time_to_attack.is_zero()
    }

    /// Restarts the recharge timer after a shot.
    pub fn begin_recharge(&mut self, recharge: Duration) {
        self.time_to_attack = recharge;
    }

    /// Remaining time until the tower may fire again.
    #[must_use]
    pub const fn time_to_attack(&self) -> Duration {
        self.time_to_attack
    }
}

impl MapItem for Tower {
    fn shape(&self) -> &Polygon {
        &self.shape
    }

    fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// A committed gate through which wave warriors enter the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    id: GateId,
    shape: Polygon,
    selected: bool,
}

/// Side length of a gate's square footprint, matching a single cell.
pub const GATE_SIDE: f32 = 30.0;

impl Gate {
    /// Creates a new gate centered on the provided point.
    #[must_use]
    pub fn new(id: GateId, center: Point) -> Self {
        Self {
            id,
            shape: Polygon::square(center, GATE_SIDE),
            selected: false,
        }
    }

    /// Identifier allocated to the gate by the engine.
    #[must_use]
    pub const fn id(&self) -> GateId {
        self.id
    }

    /// Reports whether the gate is part of the editor's chosen set.
    #[must_use]
    pub const fn selected(&self) -> bool {
        self.selected
    }

    /// Updates the gate's selection flag.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl MapItem for Gate {
    fn shape(&self) -> &Polygon {
        &self.shape
    }

    fn is_alive(&self) -> bool {
        true
    }
}

/// Types of warriors that assault the fortress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarriorKind {
    /// Common fast-moving attacker.
    Soldier,
    /// Slow, heavily armored attacker that hits hard.
    Adamant,
}

impl WarriorKind {
    /// Full health assigned to a freshly spawned warrior of this kind.
    #[must_use]
    pub const fn max_health(self) -> f32 {
        match self {
            Self::Soldier => 50.0,
            Self::Adamant => 200.0,
        }
    }

    /// Movement speed in world units per second.
    #[must_use]
    pub const fn speed(self) -> f32 {
        match self {
            Self::Soldier => 40.0,
            Self::Adamant => 25.0,
        }
    }

    /// Damage dealt by a single strike against the fortress.
    #[must_use]
    pub const fn strike_damage(self) -> f32 {
        match self {
            Self::Soldier => 5.0,
            Self::Adamant => 20.0,
        }
    }

    /// Pause between successive strikes.
    #[must_use]
    pub const fn strike_period(self) -> Duration {
        Duration::from_secs(1)
    }

    /// Side length of the warrior's square footprint in world units.
    #[must_use]
    pub const fn side(self) -> f32 {
        match self {
            Self::Soldier => 20.0,
            Self::Adamant => 26.0,
        }
    }
}

/// A committed warrior marching across the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Warrior {
    id: WarriorId,
    kind: WarriorKind,
    shape: Polygon,
    health: f32,
    strike_cooldown: Duration,
    #[serde(skip)]
    occupied: Vec<CellCoord>,
}

impl Warrior {
    /// Creates a new warrior of the given kind centered on the provided point.
    #[must_use]
    pub fn new(id: WarriorId, kind: WarriorKind, center: Point) -> Self {
        Self {
            id,
            kind,
            shape: Polygon::square(center, kind.side()),
            health: kind.max_health(),
            strike_cooldown: Duration::ZERO,
            occupied: Vec::new(),
        }
    }

    /// Identifier allocated to the warrior by the engine.
    #[must_use]
    pub const fn id(&self) -> WarriorId {
        self.id
    }

    /// Kind of warrior that was spawned.
    #[must_use]
    pub const fn kind(&self) -> WarriorKind {
        self.kind
    }

    /// Remaining health of the warrior.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Subtracts the provided amount from the warrior's health.
    pub fn apply_damage(&mut self, amount: f32) {
        self.health -= amount;
    }

    /// Clears the per-tick occupancy bookkeeping.
    pub fn tick_init(&mut self) {
        self.occupied.clear();
    }

    /// Records a cell the warrior overlaps this tick.
    pub fn add_cell(&mut self, cell: CellCoord) {
        self.occupied.push(cell);
    }

    /// Cells the warrior was assigned to during the current tick.
    #[must_use]
    pub fn occupied(&self) -> &[CellCoord] {
        &self.occupied
    }

    /// Advances the strike cooldown by the elapsed time.
    pub fn tick_cooldown(&mut self, dt: Duration) {
        self.strike_cooldown = self.strike_cooldown.saturating_sub(dt);
    }

    /// Reports whether the warrior may strike this tick.
    #[must_use]
    pub fn ready_to_strike(&self) -> bool {
        self.strike_cooldown.is_zero()
    }

    /// Restarts the strike cooldown after an attack.
    pub fn begin_strike_cooldown(&mut self) {
        self.strike_cooldown = self.kind.strike_period();
    }

    /// Replaces the warrior's shape after a movement step.
    pub fn set_shape(&mut self, shape: Polygon) {
        self.shape = shape;
    }
}

impl MapItem for Warrior {
    fn shape(&self) -> &Polygon {
        &self.shape
    }

    fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// Side length of a bullet's square footprint in world units.
pub const BULLET_SIDE: f32 = 6.0;

/// Flight speed of bullets in world units per second.
pub const BULLET_SPEED: f32 = 240.0;

/// A bullet in flight toward a captured destination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    id: BulletId,
    shape: Polygon,
    target: WarriorId,
    destination: Point,
    damage: f32,
    alive: bool,
    #[serde(skip)]
    occupied: Vec<CellCoord>,
}

impl Bullet {
    /// Creates a new bullet flying from `origin` toward `destination`.
    #[must_use]
    pub fn new(
        id: BulletId,
        origin: Point,
        target: WarriorId,
        destination: Point,
        damage: f32,
    ) -> Self {
        Self {
            id,
            shape: Polygon::square(origin, BULLET_SIDE),
            target,
            destination,
            damage,
            alive: true,
            occupied: Vec::new(),
        }
    }

    /// Identifier allocated to the bullet by the engine.
    #[must_use]
    pub const fn id(&self) -> BulletId {
        self.id
    }

    /// Warrior the bullet was fired at.
    #[must_use]
    pub const fn target(&self) -> WarriorId {
        self.target
    }

    /// Point the bullet is flying toward.
    #[must_use]
    pub const fn destination(&self) -> Point {
        self.destination
    }

    /// Damage the bullet deals on arrival.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }

    /// Clears the per-tick occupancy bookkeeping.
    pub fn tick_init(&mut self) {
        self.occupied.clear();
    }

    /// Records a cell the bullet overlaps this tick.
    pub fn add_cell(&mut self, cell: CellCoord) {
        self.occupied.push(cell);
    }

    /// Cells the bullet was assigned to during the current tick.
    #[must_use]
    pub fn occupied(&self) -> &[CellCoord] {
        &self.occupied
    }

    /// Advances the bullet toward its destination by at most `max_step`.
    pub fn advance(&mut self, max_step: f32) {
        let next = self.shape.center().step_towards(self.destination, max_step);
        self.shape = self.shape.centered_at(next);
    }

    /// Reports whether the bullet has reached its destination.
    #[must_use]
    pub fn arrived(&self) -> bool {
        self.shape.center() == self.destination
    }

    /// Marks the bullet as spent.
    pub fn kill(&mut self) {
        self.alive = false;
    }
}

impl MapItem for Bullet {
    fn shape(&self) -> &Polygon {
        &self.shape
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Blueprint describing which kind of item a preview will commit into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemBlueprint {
    /// A tower of the given kind.
    Tower(TowerKind),
    /// A gate.
    Gate,
    /// A warrior of the given kind.
    Warrior(WarriorKind),
}

impl ItemBlueprint {
    /// Side length of the footprint the blueprint commits into.
    #[must_use]
    pub const fn side(self) -> f32 {
        match self {
            Self::Tower(kind) => kind.side(),
            Self::Gate => GATE_SIDE,
            Self::Warrior(kind) => kind.side(),
        }
    }

    /// Reports whether the blueprint produces a warrior, which relaxes the
    /// placement collision rules around gates.
    #[must_use]
    pub const fn is_warrior(self) -> bool {
        matches!(self, Self::Warrior(_))
    }
}

/// An uncommitted candidate item that follows the pointer until it is
/// committed into the appropriate collection or cancelled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreviewItem {
    blueprint: ItemBlueprint,
    shape: Polygon,
}

impl PreviewItem {
    /// Creates a preview for the blueprint centered on the provided point.
    #[must_use]
    pub fn new(blueprint: ItemBlueprint, center: Point) -> Self {
        Self {
            blueprint,
            shape: Polygon::square(center, blueprint.side()),
        }
    }

    /// Blueprint the preview will commit into.
    #[must_use]
    pub const fn blueprint(&self) -> ItemBlueprint {
        self.blueprint
    }

    /// Moves the preview so its center follows the pointer.
    pub fn move_to(&mut self, center: Point) {
        self.shape = self.shape.centered_at(center);
    }
}

impl MapItem for PreviewItem {
    fn shape(&self) -> &Polygon {
        &self.shape
    }

    fn is_alive(&self) -> bool {
        true
    }
}
