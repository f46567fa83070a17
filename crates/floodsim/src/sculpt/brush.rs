//! Brush operators applied to one sculpt layer.
//!
//! Brushes only ever write the current layer. The other layers enter as a
//! per-cell sum (`others`) so that the composite `layer + others` can be
//! floored (Remove) or levelled (Flatten).

use serde::{Deserialize, Serialize};

use crate::grid::AffectedCell;

/// Falloff applied to the brush amount by normalised radial distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Profile {
    /// `cos(weight * π/2)`: full strength at the centre, zero at the rim.
    #[default]
    Cosine,
    /// Full strength everywhere under the brush.
    Constant,
}

impl Profile {
    pub fn modulate(self, weight: f32) -> f32 {
        match self {
            Profile::Cosine => (weight * std::f32::consts::FRAC_PI_2).cos(),
            Profile::Constant => 1.0,
        }
    }
}

/// Sculpting operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Brush {
    Add,
    Remove,
    Flatten,
}

/// Per-vertex outcome of a brush stroke, in composite displacement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplacementChange {
    pub id: usize,
    pub old_displacement: f32,
    pub new_displacement: f32,
}

impl Brush {
    /// Apply the brush to `layer`.
    ///
    /// `others[i]` is the sum of every other layer at cell `i`.
    pub fn apply(
        self,
        layer: &mut [f32],
        others: &[f32],
        affected: &[AffectedCell],
        amount: f32,
        profile: Profile,
    ) -> Vec<DisplacementChange> {
        match self {
            Brush::Add => stroke(layer, others, affected, |curr, _other, m| curr + amount * m, profile),
            Brush::Remove => stroke(
                layer,
                others,
                affected,
                // Composite may not go below zero
                |curr, other, m| (curr - amount * m).max(-other),
                profile,
            ),
            Brush::Flatten => flatten(layer, others, affected, profile),
        }
    }
}

fn stroke<F>(
    layer: &mut [f32],
    others: &[f32],
    affected: &[AffectedCell],
    op: F,
    profile: Profile,
) -> Vec<DisplacementChange>
where
    F: Fn(f32, f32, f32) -> f32,
{
    affected
        .iter()
        .map(|cell| {
            let id = cell.id;
            let other = others[id];
            let old_displacement = layer[id] + other;
            layer[id] = op(layer[id], other, profile.modulate(cell.weight));
            DisplacementChange {
                id,
                old_displacement,
                new_displacement: layer[id] + other,
            }
        })
        .collect()
}

fn flatten(
    layer: &mut [f32],
    others: &[f32],
    affected: &[AffectedCell],
    profile: Profile,
) -> Vec<DisplacementChange> {
    if affected.is_empty() {
        return Vec::new();
    }
    let average = affected
        .iter()
        .map(|cell| layer[cell.id] + others[cell.id])
        .sum::<f32>()
        / affected.len() as f32;

    affected
        .iter()
        .map(|cell| {
            let id = cell.id;
            let other = others[id];
            let curr = layer[id] + other;
            let modulator = profile.modulate(cell.weight);
            let target = modulator * average + (1.0 - modulator) * curr;
            layer[id] = target - other;
            DisplacementChange {
                id,
                old_displacement: curr,
                new_displacement: target,
            }
        })
        .collect()
}
