#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure placement and selection workflows that translate input intents into
//! engine commands.
//!
//! Two controllers share the same two-phase preview machine — `Idle` until a
//! candidate is picked, `Previewing` while the ghost follows the pointer,
//! back to `Idle` on commit or cancel. [`CreatorWorkflow`] drives the
//! pre-game map editor (terrain painting, free placement, gate selection for
//! wave drafts); [`StoreWorkflow`] drives in-game purchasing against a
//! credit purse. Neither controller touches the map directly: both emit
//! [`Command`] batches and learn the outcome by observing the event stream,
//! so an invalid commit simply leaves the preview standing.
//!
//! The driving loop is expected to route every emitted command through the
//! map and feed the resulting events back via `observe` before delivering
//! the next intent.

use lightkeep_core::{
    cell_at, geometry::Point, Command, Event, GateId, ItemBlueprint, ItemHandle, PreviewItem,
    TerrainKind, TowerId,
};

/// Domain-level input intents produced by the device adapter.
///
/// This set is closed: the workflows accept nothing else, and anything a
/// device produces must be translated into one of these before it reaches
/// the core.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Intent {
    /// The player picked an item in the store panel.
    StorePick {
        /// Blueprint of the picked item.
        blueprint: ItemBlueprint,
        /// Price quoted by the store; ignored by the creator editor.
        price: u32,
    },
    /// Primary (placing) click on the map surface.
    MapPrimary {
        /// World-space position of the click.
        at: Point,
    },
    /// Secondary (cancelling) click on the map surface.
    MapSecondary {
        /// World-space position of the click.
        at: Point,
    },
    /// The pointer moved across the map surface.
    PointerMoved {
        /// World-space position of the pointer.
        at: Point,
    },
    /// The player picked a terrain kind to paint with.
    ChooseTerrain {
        /// Terrain kind subsequent primary clicks paint.
        kind: TerrainKind,
    },
    /// The player opened a new wave draft.
    StartNewWave,
    /// The player asked for the chosen gates to be handed to the wave draft.
    RequestGatesForWave,
}

/// Gates designated for a wave, collected through the editor's chosen set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WaveDraft {
    gates: Vec<GateId>,
}

impl WaveDraft {
    /// Gates handed to the draft in selection order.
    #[must_use]
    pub fn gates(&self) -> &[GateId] {
        &self.gates
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Selection {
    Idle,
    Terrain(TerrainKind),
    Item(ItemBlueprint),
}

/// Editor-mode workflow: free placement, terrain painting, and gate
/// selection for wave drafts.
#[derive(Debug)]
pub struct CreatorWorkflow {
    selection: Selection,
    pending_commit: bool,
    chosen: Vec<ItemHandle>,
    draft: Option<WaveDraft>,
    completed: Option<WaveDraft>,
}

impl Default for CreatorWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl CreatorWorkflow {
    /// Creates an idle editor workflow.
    #[must_use]
    pub fn new() -> Self {
        Self {
            selection: Selection::Idle,
            pending_commit: false,
            chosen: Vec::new(),
            draft: None,
            completed: None,
        }
    }

    /// Translates an input intent into engine commands.
    ///
    /// The `item_at` closure should mirror the semantics of the map's
    /// `query::item_at` helper so the workflow can identify the clicked
    /// tower or gate when nothing is selected.
    pub fn handle<F>(&mut self, intent: Intent, mut item_at: F, out: &mut Vec<Command>)
    where
        F: FnMut(Point) -> Option<ItemHandle>,
    {
        match intent {
            Intent::StorePick { blueprint, .. } => {
                self.cancel_preview(out);
                self.selection = Selection::Item(blueprint);
                out.push(Command::BeginPreview {
                    item: PreviewItem::new(blueprint, Point::ZERO),
                });
            }
            Intent::PointerMoved { at } => {
                if matches!(self.selection, Selection::Item(_)) {
                    out.push(Command::MovePreview { to: at });
                }
            }
            Intent::MapPrimary { at } => match self.selection {
                Selection::Item(_) => {
                    self.pending_commit = true;
                    out.push(Command::CommitPreview);
                }
                Selection::Terrain(kind) => {
                    // Terrain stays selected so the player can keep painting.
                    if let Some(cell) = cell_at(at) {
                        out.push(Command::EditTerrain { cell, kind });
                    }
                }
                Selection::Idle => {
                    if let Some(handle) = item_at(at) {
                        if matches!(handle, ItemHandle::Tower(_) | ItemHandle::Gate(_)) {
                            self.toggle_chosen(handle);
                            out.push(Command::ToggleSelection { item: handle });
                        }
                    }
                }
            },
            Intent::MapSecondary { .. } => {
                self.cancel_preview(out);
            }
            Intent::ChooseTerrain { kind } => {
                self.cancel_preview(out);
                self.selection = Selection::Terrain(kind);
            }
            Intent::StartNewWave => {
                self.draft = Some(WaveDraft::default());
            }
            Intent::RequestGatesForWave => {
                if let Some(mut draft) = self.draft.take() {
                    draft.gates = self
                        .chosen
                        .iter()
                        .filter_map(|handle| match handle {
                            ItemHandle::Gate(gate) => Some(*gate),
                            _ => None,
                        })
                        .collect();
                    for handle in self.chosen.drain(..) {
                        out.push(Command::ToggleSelection { item: handle });
                    }
                    self.completed = Some(draft);
                }
            }
        }
    }

    /// Consumes map events to learn whether an issued commit succeeded.
    pub fn observe(&mut self, events: &[Event]) {
        for event in events {
            if matches!(event, Event::PreviewRemoved { .. }) && self.pending_commit {
                self.pending_commit = false;
                self.selection = Selection::Idle;
            }
        }
    }

    /// Takes the most recently completed wave draft, if one is ready.
    #[must_use]
    pub fn take_wave(&mut self) -> Option<WaveDraft> {
        self.completed.take()
    }

    /// Reports whether a candidate item is currently being previewed.
    #[must_use]
    pub fn previewing(&self) -> bool {
        matches!(self.selection, Selection::Item(_))
    }

    /// Items currently toggled into the chosen set.
    #[must_use]
    pub fn chosen(&self) -> &[ItemHandle] {
        &self.chosen
    }

    fn cancel_preview(&mut self, out: &mut Vec<Command>) {
        if matches!(self.selection, Selection::Item(_)) {
            out.push(Command::CancelPreview);
        }
        self.pending_commit = false;
        self.selection = Selection::Idle;
    }

    fn toggle_chosen(&mut self, handle: ItemHandle) {
        if let Some(position) = self.chosen.iter().position(|chosen| *chosen == handle) {
            let _ = self.chosen.remove(position);
        } else {
            self.chosen.push(handle);
        }
    }
}

/// In-game purchasing workflow: the preview machine plus a credit purse.
///
/// The price of a purchase is only deducted once the matching commit is
/// confirmed through the event stream, and the store closes for good when
/// the fortress it learned about from `TowerCreated` falls.
#[derive(Debug)]
pub struct StoreWorkflow {
    selection: Option<ItemBlueprint>,
    price: u32,
    pending_commit: bool,
    credits: u32,
    fortress: Option<TowerId>,
    halted: bool,
}

impl StoreWorkflow {
    /// Creates a store workflow holding the provided starting credits.
    #[must_use]
    pub fn new(credits: u32) -> Self {
        Self {
            selection: None,
            price: 0,
            pending_commit: false,
            credits,
            fortress: None,
            halted: false,
        }
    }

    /// Credits remaining in the purse.
    #[must_use]
    pub const fn credits(&self) -> u32 {
        self.credits
    }

    /// Reports whether the store stopped trading because the fortress fell.
    #[must_use]
    pub const fn halted(&self) -> bool {
        self.halted
    }

    /// Translates an input intent into engine commands.
    pub fn handle(&mut self, intent: Intent, out: &mut Vec<Command>) {
        match intent {
            Intent::StorePick { blueprint, price } => {
                if self.halted {
                    return;
                }
                self.cancel_preview(out);
                self.selection = Some(blueprint);
                self.price = price;
                out.push(Command::BeginPreview {
                    item: PreviewItem::new(blueprint, Point::ZERO),
                });
            }
            Intent::PointerMoved { at } => {
                if self.selection.is_some() {
                    out.push(Command::MovePreview { to: at });
                }
            }
            Intent::MapPrimary { .. } => {
                if self.selection.is_some() && self.price <= self.credits {
                    self.pending_commit = true;
                    out.push(Command::CommitPreview);
                }
            }
            Intent::MapSecondary { .. } => {
                self.cancel_preview(out);
            }
            Intent::ChooseTerrain { .. }
            | Intent::StartNewWave
            | Intent::RequestGatesForWave => {
                // Editor-only intents carry no meaning while playing.
            }
        }
    }

    /// Consumes map events to settle purchases and watch the fortress.
    pub fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::TowerCreated { tower } if tower.is_fortress() => {
                    self.fortress = Some(tower.id());
                }
                Event::TowerRemoved { tower } if Some(*tower) == self.fortress => {
                    self.halted = true;
                }
                Event::PreviewRemoved { .. } if self.pending_commit => {
                    self.pending_commit = false;
                    self.credits = self.credits.saturating_sub(self.price);
                    self.selection = None;
                    self.price = 0;
                }
                _ => {}
            }
        }
    }

    fn cancel_preview(&mut self, out: &mut Vec<Command>) {
        if self.selection.is_some() {
            out.push(Command::CancelPreview);
        }
        self.pending_commit = false;
        self.selection = None;
        self.price = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightkeep_core::TowerKind;

    #[test]
    fn creator_pick_replaces_any_existing_preview() {
        let mut workflow = CreatorWorkflow::new();
        let mut out = Vec::new();
        workflow.handle(
            Intent::StorePick {
                blueprint: ItemBlueprint::Gate,
                price: 0,
            },
            |_| None,
            &mut out,
        );
        workflow.handle(
            Intent::StorePick {
                blueprint: ItemBlueprint::Tower(TowerKind::Energy),
                price: 0,
            },
            |_| None,
            &mut out,
        );

        assert_eq!(
            out.iter()
                .filter(|command| matches!(command, Command::CancelPreview))
                .count(),
            1
        );
        assert_eq!(
            out.iter()
                .filter(|command| matches!(command, Command::BeginPreview { .. }))
                .count(),
            2
        );
        assert!(workflow.previewing());
    }

    #[test]
    fn pointer_motion_without_a_preview_is_silent() {
        let mut workflow = CreatorWorkflow::new();
        let mut out = Vec::new();
        workflow.handle(
            Intent::PointerMoved {
                at: Point::new(10.0, 10.0),
            },
            |_| None,
            &mut out,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn terrain_selection_survives_painting_clicks() {
        let mut workflow = CreatorWorkflow::new();
        let mut out = Vec::new();
        workflow.handle(
            Intent::ChooseTerrain {
                kind: TerrainKind::Water,
            },
            |_| None,
            &mut out,
        );
        workflow.handle(
            Intent::MapPrimary {
                at: Point::new(10.0, 40.0),
            },
            |_| None,
            &mut out,
        );
        workflow.handle(
            Intent::MapPrimary {
                at: Point::new(70.0, 40.0),
            },
            |_| None,
            &mut out,
        );

        let edits: Vec<_> = out
            .iter()
            .filter_map(|command| match command {
                Command::EditTerrain { cell, kind } => Some((*cell, *kind)),
                _ => None,
            })
            .collect();
        assert_eq!(
            edits,
            vec![
                (lightkeep_core::CellCoord::new(0, 1), TerrainKind::Water),
                (lightkeep_core::CellCoord::new(2, 1), TerrainKind::Water),
            ]
        );
    }

    #[test]
    fn store_refuses_commit_it_cannot_afford() {
        let mut workflow = StoreWorkflow::new(10);
        let mut out = Vec::new();
        workflow.handle(
            Intent::StorePick {
                blueprint: ItemBlueprint::Tower(TowerKind::Energy),
                price: 50,
            },
            &mut out,
        );
        workflow.handle(
            Intent::MapPrimary {
                at: Point::new(45.0, 45.0),
            },
            &mut out,
        );

        assert!(
            !out.iter()
                .any(|command| matches!(command, Command::CommitPreview)),
            "commit should not be attempted beyond the balance"
        );
        assert_eq!(workflow.credits(), 10);
    }
}
