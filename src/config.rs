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

use std::fs;

use serde::{Deserialize, Serialize};

use crate::{
    errors::GqlFuzzerError, expanders::ExpanderWrapper, generator::RecursionStrategy,
};

/// Parameters for one generation run. The CLI builds one of these from its
/// flags, or loads it wholesale from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Name of the rule every derivation starts from.
    #[serde(rename = "start", default = "default_start_rule")]
    pub start_rule: String,

    /// Number of strings to emit.
    #[serde(rename = "count", default = "default_count")]
    pub count: usize,

    /// Active-visit bound per node before the recursion strategy kicks in.
    #[serde(rename = "max_revisit", default = "default_max_revisit")]
    pub max_revisit: u32,

    /// Seed for the structural random stream (alternative choices, opt
    /// coins, repeat counts).
    #[serde(rename = "seed", default)]
    pub seed: u64,

    /// Recovery strategy once the revisit bound is exceeded.
    #[serde(rename = "strategy", default)]
    pub strategy: RecursionStrategy,

    /// Alternative-selection policy.
    #[serde(rename = "expander", default)]
    pub expander: ExpanderWrapper,

    /// Toggle fanning the emissions out across a thread pool, one grammar
    /// clone per worker.
    #[serde(rename = "parallel", default)]
    pub parallel: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            start_rule: default_start_rule(),
            count: default_count(),
            max_revisit: default_max_revisit(),
            seed: 0,
            strategy: RecursionStrategy::default(),
            expander: ExpanderWrapper::default(),
            parallel: false,
        }
    }
}

impl GenerationConfig {
    pub fn from_file(path: &str) -> Result<Self, GqlFuzzerError> {
        let raw = fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Same configuration with a different seed; the parallel fan-out hands
    /// each worker one of these.
    pub fn with_seed(&self, seed: u64) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }
}

fn default_start_rule() -> String {
    "GQL-program".into()
}

fn default_count() -> usize {
    1
}

fn default_max_revisit() -> u32 {
    6
}

#[test]
fn test_defaults() {
    let config = GenerationConfig::default();
    assert_eq!("GQL-program", config.start_rule);
    assert_eq!(1, config.count);
    assert_eq!(6, config.max_revisit);
    assert_eq!(0, config.seed);
    assert_eq!(RecursionStrategy::ShortestPath, config.strategy);
    assert_eq!(ExpanderWrapper::MonteCarlo, config.expander);
    assert!(!config.parallel);
}

#[test]
fn test_json_roundtrip_and_partial_files() {
    let config = GenerationConfig {
        start_rule: "value expression".into(),
        count: 20,
        max_revisit: 3,
        seed: 7,
        strategy: RecursionStrategy::Restart,
        expander: ExpanderWrapper::DepthWeighted,
        parallel: true,
    };

    let raw = serde_json::to_string(&config).unwrap();
    let back: GenerationConfig = serde_json::from_str(&raw).unwrap();
    assert_eq!(config.start_rule, back.start_rule);
    assert_eq!(config.count, back.count);
    assert_eq!(config.strategy, back.strategy);
    assert_eq!(config.expander, back.expander);

    // Missing fields fall back to the defaults.
    let partial: GenerationConfig = serde_json::from_str(r#"{"count": 3}"#).unwrap();
    assert_eq!(3, partial.count);
    assert_eq!("GQL-program", partial.start_rule);
    assert_eq!(6, partial.max_revisit);
}
