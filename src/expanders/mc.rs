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
    grammar::{Grammar, NodeId, Tree},
};

/// A Monte-Carlo expander is a naive expander that selects alternatives
/// uniformly at random. Paired with the revisit bound this is usually good
/// enough, but on heavily recursive grammars it restarts a lot more than
/// the weighted one.
pub struct MonteCarloExpander {
    rng: ChaCha8Rng,
}

impl MonteCarloExpander {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Expander for MonteCarloExpander {
    fn init(_grammar: &Grammar, seed: u64) -> Result<Self, GqlFuzzerError>
    where
        Self: Sized,
    {
        Ok(Self::new(seed))
    }

    fn choose_alternative(&mut self, _tree: &Tree, alternatives: &[NodeId]) -> usize {
        self.rng.random_range(0..alternatives.len())
    }
}

#[test]
fn test_choose_alternative_stays_in_bounds_and_covers_all() {
    let mut expander = MonteCarloExpander::new(0);
    let tree = Tree::new();
    let alternatives = [0, 1, 2, 3];

    let mut seen = [false; 4];
    for _ in 0..256 {
        let idx = expander.choose_alternative(&tree, &alternatives);
        assert!(idx < alternatives.len());
        seen[idx] = true;
    }
    assert!(seen.iter().all(|s| *s));
}

#[test]
fn test_same_seed_same_choices() {
    let tree = Tree::new();
    let alternatives = [0, 1, 2, 3, 4, 5, 6, 7];

    let mut a = MonteCarloExpander::new(42);
    let mut b = MonteCarloExpander::new(42);
    for _ in 0..64 {
        assert_eq!(
            a.choose_alternative(&tree, &alternatives),
            b.choose_alternative(&tree, &alternatives)
        );
    }
}
