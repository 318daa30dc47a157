//! Per-tick behavior for the mobile and armed items the map owns.
//!
//! Every update runs against [`Sight`], a snapshot captured before the
//! update phase begins, so no item observes another item's same-tick
//! mutation. Cross-item effects travel exclusively through the returned
//! events, which the map applies after the phase completes. Each item also
//! polices its own liveness: a dead item emits its removal event instead of
//! acting.

use std::time::Duration;

use lightkeep_core::{
    geometry::{Point, Polygon},
    Bullet, Event, MapItem, Tower, TowerId, TowerKind, Warrior, WarriorId, BULLET_SPEED,
};

use crate::cells::Cell;
use crate::IdAllocator;

/// Light injected per second into each cell a light tower occupies.
const LIGHT_TOWER_GLOW: f32 = 2.0;

/// Pre-update view of the world captured once per tick.
#[derive(Clone, Debug)]
pub(crate) struct Sight {
    warriors: Vec<(WarriorId, Point)>,
    fortress: Option<FortressSight>,
}

#[derive(Clone, Debug)]
struct FortressSight {
    id: TowerId,
    shape: Polygon,
}

impl Sight {
    pub(crate) fn capture(warriors: &[Warrior], fortress: Option<&Tower>) -> Self {
        Self {
            warriors: warriors
                .iter()
                .filter(|warrior| warrior.is_alive())
                .map(|warrior| (warrior.id(), warrior.shape().center()))
                .collect(),
            fortress: fortress.map(|tower| FortressSight {
                id: tower.id(),
                shape: tower.shape().clone(),
            }),
        }
    }

    fn nearest_warrior(&self, origin: Point, range: f32) -> Option<(WarriorId, Point)> {
        self.warriors
            .iter()
            .copied()
            .filter(|(_, center)| origin.distance_to(*center) <= range)
            .min_by(|(_, a), (_, b)| {
                origin
                    .distance_to(*a)
                    .total_cmp(&origin.distance_to(*b))
            })
    }
}

pub(crate) fn warrior_tick(
    warrior: &mut Warrior,
    dt: Duration,
    sight: &Sight,
    cells: &[Cell],
    width: u32,
    height: u32,
    events: &mut Vec<Event>,
) {
    if !warrior.is_alive() {
        events.push(Event::WarriorRemoved {
            warrior: warrior.id(),
        });
        return;
    }

    warrior.tick_cooldown(dt);

    let Some(fortress) = sight.fortress.as_ref() else {
        return;
    };

    if warrior.shape().intersects(&fortress.shape) {
        if warrior.ready_to_strike() {
            events.push(Event::TowerDamaged {
                tower: fortress.id,
                amount: warrior.kind().strike_damage(),
            });
            warrior.begin_strike_cooldown();
        }
        return;
    }

    let step = warrior.kind().speed() * dt.as_secs_f32();
    let next_center = warrior
        .shape()
        .center()
        .step_towards(fortress.shape.center(), step);
    let next_shape = warrior.shape().centered_at(next_center);
    if footprint_passable(width, height, cells, &next_shape) {
        warrior.set_shape(next_shape);
    }
}

pub(crate) fn tower_tick(
    tower: &mut Tower,
    dt: Duration,
    sight: &Sight,
    ids: &mut IdAllocator,
    events: &mut Vec<Event>,
) {
    if !tower.is_alive() {
        events.push(Event::TowerRemoved { tower: tower.id() });
        return;
    }

    if tower.kind() == TowerKind::Light {
        let glow = LIGHT_TOWER_GLOW * dt.as_secs_f32();
        for &cell in tower.occupied() {
            events.push(Event::LightEmitted { cell, amount: glow });
        }
    }

    let Some(attack) = tower.kind().attack() else {
        return;
    };

    tower.tick_recharge(dt);
    if !tower.ready_to_fire() {
        return;
    }

    let origin = tower.shape().center();
    let Some((target, destination)) = sight.nearest_warrior(origin, attack.range) else {
        return;
    };

    events.push(Event::BulletCreated {
        bullet: Bullet::new(ids.next_bullet(), origin, target, destination, attack.damage),
    });
    tower.begin_recharge(attack.recharge);
}

pub(crate) fn bullet_tick(bullet: &mut Bullet, dt: Duration, events: &mut Vec<Event>) {
    if !bullet.is_alive() {
        events.push(Event::BulletRemoved {
            bullet: bullet.id(),
        });
        return;
    }

    bullet.advance(BULLET_SPEED * dt.as_secs_f32());
    if bullet.arrived() {
        bullet.kill();
        events.push(Event::WarriorDamaged {
            warrior: bullet.target(),
            amount: bullet.damage(),
        });
        events.push(Event::BulletRemoved {
            bullet: bullet.id(),
        });
    }
}

pub(crate) fn footprint_passable(
    width: u32,
    height: u32,
    cells: &[Cell],
    shape: &Polygon,
) -> bool {
    crate::occupied_cell_coords(width, height, shape)
        .into_iter()
        .all(|coord| {
            crate::cell_index_of(width, height, coord)
                .map_or(true, |index| cells[index].passable())
        })
}
