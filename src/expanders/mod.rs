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

use std::fmt::Display;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    errors::GqlFuzzerError,
    grammar::{Grammar, NodeId, Tree},
};

pub mod mc;
pub mod wmc;

/// An expander decides which alternative of an `alt` node the derivation
/// takes when the engine is not in shortest-path mode. Keeping this behind
/// a trait lets us swap selection policies without touching the traversal
/// itself.
pub trait Expander {
    /// Expanders may need to look at the grammar up front; the depth
    /// weighted one, for example, only makes sense when reference depths
    /// have been computed for it to read.
    fn init(grammar: &Grammar, seed: u64) -> Result<Self, GqlFuzzerError>
    where
        Self: Sized;

    /// Pick one of the alternatives. `alternatives` is never empty.
    fn choose_alternative(&mut self, tree: &Tree, alternatives: &[NodeId]) -> usize;
}

/// Enumeration of all supported expanders, for the CLI and the config
/// file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
pub enum ExpanderWrapper {
    #[default]
    #[serde(alias = "montecarlo")]
    MonteCarlo,
    #[serde(alias = "depth-weighted")]
    DepthWeighted,
}

impl ExpanderWrapper {
    pub fn build(
        &self,
        grammar: &Grammar,
        seed: u64,
    ) -> Result<Box<dyn Expander>, GqlFuzzerError> {
        match self {
            Self::MonteCarlo => Ok(Box::new(mc::MonteCarloExpander::init(grammar, seed)?)),
            Self::DepthWeighted => Ok(Box::new(wmc::DepthWeightedExpander::init(grammar, seed)?)),
        }
    }
}

impl Display for ExpanderWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MonteCarlo => write!(f, "monte-carlo"),
            Self::DepthWeighted => write!(f, "depth-weighted"),
        }
    }
}
