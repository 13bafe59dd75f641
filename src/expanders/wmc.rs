/*
*	Copyright (C) 2025 Kendall Tauser
*
*	This program is free software; you can redistribute it and/or modify
*	it under the terms of the GNU General Public License as published by
*	the Free Software Foundation; either version 2 of the License, or
*	(at your option) any later version.
*
*	This program is distributed in the hope that it will be useful,
*	but WITHOUT ANY WARRANTY; without even the implied warranty of
*	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
*	GNU General Public License for more details.
*
*	You should have received a copy of the GNU General Public License along
*	with this program; if not, write to the Free Software Foundation, Inc.,
*	51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.
 */

use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

use crate::{
    errors::GqlFuzzerError,
    expanders::Expander,
    grammar::{Grammar, NodeId, Tree, INFINITE_DEPTH},
};

/// A depth-weighted expander is a slightly less naive expander that samples
/// alternatives with weights skewed toward the ones closest to a terminal
/// derivation, as priced by the reference-depth analyzer. Alternatives with
/// no terminating derivation get no weight at all unless nothing else is
/// available.
pub struct DepthWeightedExpander {
    rng: ChaCha8Rng,
}

impl DepthWeightedExpander {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Expander for DepthWeightedExpander {
    fn init(_grammar: &Grammar, seed: u64) -> Result<Self, GqlFuzzerError>
    where
        Self: Sized,
    {
        Ok(Self::new(seed))
    }

    fn choose_alternative(&mut self, tree: &Tree, alternatives: &[NodeId]) -> usize {
        let weights: Vec<f64> = alternatives
            .iter()
            .map(|alt| {
                let depth = tree.node(*alt).ref_depth;
                if depth == INFINITE_DEPTH {
                    0.0
                } else {
                    1.0 / (1.0 + depth as f64)
                }
            })
            .collect();

        let total: f64 = weights.iter().sum();
        if total == 0.0 {
            // Every alternative prices infinite; nothing to prefer.
            return self.rng.random_range(0..alternatives.len());
        }

        let sample = self.rng.random::<f64>() * total;

        let mut idx = alternatives.len() - 1;
        let mut cumsum = 0.0;
        for (i, weight) in weights.iter().enumerate() {
            cumsum += *weight;
            if sample <= cumsum {
                idx = i;
                break;
            }
        }

        idx
    }
}

#[cfg(test)]
use crate::grammar::NodeKind;

#[test]
fn test_weighting_prefers_shallow_alternatives() {
    let mut tree = Tree::new();
    let shallow = tree.alloc(NodeKind::TerminalSymbol);
    let deep = tree.alloc(NodeKind::Group);
    tree.node_mut(shallow).ref_depth = 0;
    tree.node_mut(deep).ref_depth = 9;

    let mut expander = DepthWeightedExpander::new(0);
    let alternatives = [deep, shallow];

    let mut shallow_hits = 0;
    for _ in 0..1000 {
        if expander.choose_alternative(&tree, &alternatives) == 1 {
            shallow_hits += 1;
        }
    }

    // Weight 1.0 vs 0.1: the terminal alternative should dominate.
    assert!(shallow_hits > 700);
}

#[test]
fn test_all_infinite_falls_back_to_uniform() {
    let mut tree = Tree::new();
    let a = tree.alloc(NodeKind::Group);
    let b = tree.alloc(NodeKind::Group);
    tree.node_mut(a).ref_depth = INFINITE_DEPTH;
    tree.node_mut(b).ref_depth = INFINITE_DEPTH;

    let mut expander = DepthWeightedExpander::new(0);
    let alternatives = [a, b];

    let mut seen = [false; 2];
    for _ in 0..64 {
        seen[expander.choose_alternative(&tree, &alternatives)] = true;
    }
    assert!(seen[0] && seen[1]);
}

#[test]
fn test_infinite_alternative_never_chosen_when_finite_exists() {
    let mut tree = Tree::new();
    let finite = tree.alloc(NodeKind::TerminalSymbol);
    let infinite = tree.alloc(NodeKind::Group);
    tree.node_mut(finite).ref_depth = 3;
    tree.node_mut(infinite).ref_depth = INFINITE_DEPTH;

    let mut expander = DepthWeightedExpander::new(7);
    let alternatives = [infinite, finite];

    for _ in 0..256 {
        assert_eq!(1, expander.choose_alternative(&tree, &alternatives));
    }
}
