//! Per-cell light state with target-seeking relaxation and diffusion.
//!
//! Each tick a cell consumes the impulse its neighbors sent on the previous
//! tick, relaxes toward the ambient target by a bounded step, and sheds a
//! quantum that the map splits evenly across its neighbors. Diffusion moves
//! light around without creating or destroying it, so with a constant
//! ambient target the total across the map converges to
//! `ambient * cell_count`. The explicit first-order scheme stays stable as
//! long as the driving loop keeps `dt` small.

use serde::{Deserialize, Serialize};

const RELAX_RATE: f32 = 4.0;
const EMIT_RATE: f32 = 0.8;

/// Light state carried by a single cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Lighting {
    value: f32,
    impulse: f32,
}

impl Lighting {
    /// Consumes the pending impulse and relaxes the value toward `target`.
    pub(crate) fn change_to(&mut self, target: f32, dt: f32) {
        self.value += self.impulse;
        self.impulse = 0.0;
        let blend = (RELAX_RATE * dt).min(1.0);
        self.value += (target - self.value) * blend;
    }

    /// Sheds a quantum of the stored light and returns it for distribution.
    pub(crate) fn emit(&mut self, dt: f32) -> f32 {
        let quantum = self.value * (EMIT_RATE * dt).min(1.0);
        self.value -= quantum;
        quantum
    }

    /// Queues light to be consumed on this cell's next tick.
    pub(crate) fn add_impulse(&mut self, amount: f32) {
        self.impulse += amount;
    }

    /// Light currently stored in the cell.
    pub(crate) fn value(&self) -> f32 {
        self.value
    }

    /// Stored light plus the impulse still in flight toward this cell.
    pub(crate) fn total(&self) -> f32 {
        self.value + self.impulse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relaxation_approaches_the_target() {
        let mut lighting = Lighting::default();
        let mut previous_gap = 10.0_f32;
        for _ in 0..50 {
            lighting.change_to(10.0, 0.05);
            let gap = (10.0 - lighting.value()).abs();
            assert!(gap <= previous_gap);
            previous_gap = gap;
        }
        assert!(previous_gap < 0.1);
    }

    #[test]
    fn large_dt_never_overshoots() {
        let mut lighting = Lighting::default();
        lighting.change_to(5.0, 100.0);
        assert_eq!(lighting.value(), 5.0);
    }

    #[test]
    fn emission_is_subtracted_from_the_value() {
        let mut lighting = Lighting::default();
        lighting.change_to(8.0, 100.0);
        let before = lighting.value();
        let quantum = lighting.emit(0.1);
        assert!(quantum > 0.0);
        assert!((before - lighting.value() - quantum).abs() < 1e-6);
    }

    #[test]
    fn impulse_is_consumed_on_the_next_tick() {
        let mut lighting = Lighting::default();
        lighting.add_impulse(3.0);
        assert_eq!(lighting.value(), 0.0);
        assert_eq!(lighting.total(), 3.0);
        lighting.change_to(0.0, 0.0);
        assert_eq!(lighting.value(), 3.0);
    }
}
