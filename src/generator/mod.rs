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
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use serde::{Deserialize, Serialize};

use crate::{
    config::GenerationConfig,
    errors::GqlFuzzerError,
    expanders::Expander,
    grammar::{Grammar, NodeId, NodeKind},
};

pub mod intrinsics;

/// What to do when a node's active-visit count passes the revisit bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
pub enum RecursionStrategy {
    /// Switch the subtree to shortest-path alternative selection, steered
    /// by the reference-depth analyzer. Never restarts.
    #[default]
    #[serde(alias = "shortest-path")]
    ShortestPath,
    /// Abandon the attempt and restart from the start rule. Simpler, and
    /// terminates eventually for any start rule with finite reference
    /// depth.
    #[serde(alias = "restart")]
    Restart,
}

impl Display for RecursionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShortestPath => write!(f, "shortest-path"),
            Self::Restart => write!(f, "restart"),
        }
    }
}

/// The derivation engine. Owns a normalized grammar and produces one random
/// sentential form per [`Generator::generate`] call.
///
/// Expansion is a plain recursive walk. Entering a node increments its
/// visit count and leaving decrements it, on every return path, so an
/// abandoned attempt unwinds to all-zero counters by itself. When a count
/// passes `max_revisit` the configured [`RecursionStrategy`] kicks in.
pub struct Generator {
    grammar: Grammar,
    max_revisit: u32,
    strategy: RecursionStrategy,
    expander: Box<dyn Expander>,
    rng: ChaCha8Rng,
}

impl Generator {
    /// Build an engine for one grammar. The reference-depth analyzer runs
    /// here when the chosen strategy or policy needs it, which also
    /// surfaces unknown-rule errors before any derivation starts.
    pub fn new(
        mut grammar: Grammar,
        start_rule: &str,
        config: &GenerationConfig,
    ) -> Result<Self, GqlFuzzerError> {
        if !grammar.rules.contains(start_rule) {
            return Err(GqlFuzzerError::UnknownRule(start_rule.to_string()));
        }

        if config.strategy == RecursionStrategy::ShortestPath
            || config.expander == crate::expanders::ExpanderWrapper::DepthWeighted
        {
            grammar.analyze_depth(start_rule)?;
        }

        let expander = config.expander.build(&grammar, config.seed)?;

        Ok(Self {
            grammar,
            max_revisit: config.max_revisit,
            strategy: config.strategy,
            expander,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Produce one random derivation of the start rule. Under the restart
    /// strategy this loops until an attempt stays inside the revisit
    /// bound, logging one line per restart.
    pub fn generate(&mut self, start_rule: &str) -> Result<String, GqlFuzzerError> {
        let start = self
            .grammar
            .rules
            .get(start_rule)
            .ok_or_else(|| GqlFuzzerError::UnknownRule(start_rule.to_string()))?;

        loop {
            match self.expand(start, false) {
                Ok(s) => return Ok(s),
                Err(GqlFuzzerError::RecursionExceeded { kind, id }) => {
                    log::debug!(
                        "recursion level exceeded at {}({}), restarting {}",
                        kind,
                        id,
                        start_rule
                    );
                    self.check_counters_unwound();
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn expand(&mut self, n: NodeId, shortest_path: bool) -> Result<String, GqlFuzzerError> {
        self.grammar.tree.node_mut(n).cnt += 1;
        let result = self.expand_visited(n, shortest_path);
        self.grammar.tree.node_mut(n).cnt -= 1;
        result
    }

    fn expand_visited(
        &mut self,
        n: NodeId,
        mut shortest_path: bool,
    ) -> Result<String, GqlFuzzerError> {
        if self.grammar.tree.node(n).cnt > self.max_revisit {
            match self.strategy {
                RecursionStrategy::Restart => {
                    let node = self.grammar.tree.node(n);
                    return Err(GqlFuzzerError::RecursionExceeded {
                        kind: node.kind.label().to_string(),
                        id: node.id,
                    });
                }
                RecursionStrategy::ShortestPath => shortest_path = true,
            }
        }

        match self.grammar.tree.node(n).kind.clone() {
            NodeKind::Bnf => self.expand_reference(n, shortest_path),
            NodeKind::Alt => self.expand_alt(n, shortest_path),
            NodeKind::Opt => self.expand_opt(n, shortest_path),
            NodeKind::Group => self.expand_children(n, shortest_path),
            NodeKind::Repeat => self.expand_repeat(n, shortest_path),
            NodeKind::TerminalSymbol => Ok(self.grammar.tree.node(n).value.clone()),
            NodeKind::Kw => Ok(format!(" {} ", self.grammar.tree.node(n).value)),
            NodeKind::Fn(intrinsic) => intrinsic.emit(&mut self.rng),
            // Anything else in the canonical tree contributes nothing to
            // the sentence.
            _ => Ok(String::new()),
        }
    }

    /// Resolve a `BNF` reference through the rule table and expand the
    /// body it points at. A reference to a name the table does not know is
    /// fatal.
    fn expand_reference(
        &mut self,
        n: NodeId,
        shortest_path: bool,
    ) -> Result<String, GqlFuzzerError> {
        let name = self.grammar.tree.node(n).name.clone();
        let body = self
            .grammar
            .rules
            .get(&name)
            .ok_or(GqlFuzzerError::UnknownRule(name))?;
        self.expand(body, shortest_path)
    }

    fn expand_alt(&mut self, n: NodeId, shortest_path: bool) -> Result<String, GqlFuzzerError> {
        let children = self.grammar.tree.node(n).children.clone();
        if children.is_empty() {
            return Err(GqlFuzzerError::Grammar(format!(
                "alt with no alternatives: {:?}",
                self.grammar.tree.node(n)
            )));
        }

        let idx = if shortest_path {
            let mut best = 0;
            for (i, child) in children.iter().enumerate() {
                if self.grammar.tree.node(*child).ref_depth
                    < self.grammar.tree.node(children[best]).ref_depth
                {
                    best = i;
                }
            }
            best
        } else {
            self.expander
                .choose_alternative(&self.grammar.tree, &children)
        };

        self.expand(children[idx], shortest_path)
    }

    fn expand_opt(&mut self, n: NodeId, shortest_path: bool) -> Result<String, GqlFuzzerError> {
        if self.rng.random_range(0..2) == 1 {
            self.expand_children(n, shortest_path)
        } else {
            Ok(String::new())
        }
    }

    fn expand_children(
        &mut self,
        n: NodeId,
        shortest_path: bool,
    ) -> Result<String, GqlFuzzerError> {
        let mut result = String::new();
        for child in self.grammar.tree.node(n).children.clone() {
            result.push_str(&self.expand(child, shortest_path)?);
        }
        Ok(result)
    }

    fn expand_repeat(&mut self, n: NodeId, shortest_path: bool) -> Result<String, GqlFuzzerError> {
        let mut result = String::new();
        let cnt = self.rng.random_range(0..5);
        for _ in 0..cnt {
            result.push_str(&self.expand_children(n, shortest_path)?);
        }
        Ok(result)
    }

    /// Scoped increment/decrement should leave nothing behind after an
    /// abandoned attempt; cheap to double-check while debugging.
    fn check_counters_unwound(&self) {
        #[cfg(debug_assertions)]
        {
            if let Ok(root) = self.grammar.tree.root() {
                for id in self.grammar.tree.preorder(root) {
                    debug_assert_eq!(
                        0,
                        self.grammar.tree.node(id).cnt,
                        "cnt for {:?} not zero after unwind",
                        self.grammar.tree.node(id)
                    );
                }
            }
        }
    }
}

#[cfg(test)]
use crate::expanders::ExpanderWrapper;

#[cfg(test)]
fn generator_for(xml: &str, start: &str, config: GenerationConfig) -> Generator {
    let grammar = Grammar::from_reader(xml.as_bytes()).unwrap();
    Generator::new(grammar, start, &config).unwrap()
}

#[cfg(test)]
fn seeded(seed: u64, strategy: RecursionStrategy) -> GenerationConfig {
    GenerationConfig {
        seed,
        strategy,
        ..GenerationConfig::default()
    }
}

#[test]
fn test_single_terminal_rule() {
    let xml = r#"<grammar><BNFdef name="S"><rhs><terminalsymbol>a</terminalsymbol></rhs></BNFdef></grammar>"#;
    for strategy in [RecursionStrategy::ShortestPath, RecursionStrategy::Restart] {
        let mut g = generator_for(xml, "S", seeded(0, strategy));
        assert_eq!("a", g.generate("S").unwrap());
    }
}

#[test]
fn test_alt_only_produces_listed_alternatives() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs>
            <alt><terminalsymbol>a</terminalsymbol></alt>
            <alt><terminalsymbol>b</terminalsymbol></alt>
        </rhs></BNFdef>
    </grammar>"#;

    let mut g = generator_for(xml, "S", seeded(0, RecursionStrategy::ShortestPath));
    let mut seen_a = false;
    let mut seen_b = false;
    for _ in 0..64 {
        let s = g.generate("S").unwrap();
        match s.as_str() {
            "a" => seen_a = true,
            "b" => seen_b = true,
            other => panic!("unexpected derivation: {:?}", other),
        }
    }
    assert!(seen_a && seen_b);
}

#[test]
fn test_repeat_emits_zero_to_four_copies() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><terminalsymbol>x</terminalsymbol><repeat/></rhs></BNFdef>
    </grammar>"#;

    let mut g = generator_for(xml, "S", seeded(0, RecursionStrategy::ShortestPath));
    for _ in 0..128 {
        let s = g.generate("S").unwrap();
        assert!(s.len() <= 4, "got {:?}", s);
        assert!(s.chars().all(|c| c == 'x'));
    }
}

#[test]
fn test_opt_flips_a_fair_coin() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><opt><terminalsymbol>q</terminalsymbol></opt></rhs></BNFdef>
    </grammar>"#;

    let mut g = generator_for(xml, "S", seeded(0, RecursionStrategy::ShortestPath));
    let mut present = 0;
    let total = 512;
    for _ in 0..total {
        match g.generate("S").unwrap().as_str() {
            "q" => present += 1,
            "" => {}
            other => panic!("unexpected derivation: {:?}", other),
        }
    }
    // Fair coin; allow generous slack around half.
    assert!(present > total / 4 && present < 3 * total / 4);
}

#[test]
fn test_kw_is_padded_with_spaces() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><kw>SELECT</kw><terminalsymbol>a</terminalsymbol></rhs></BNFdef>
    </grammar>"#;

    let mut g = generator_for(xml, "S", seeded(0, RecursionStrategy::ShortestPath));
    assert_eq!(" SELECT a", g.generate("S").unwrap());
}

#[test]
fn test_left_recursive_grammar_terminates() {
    // S := S 'a' | 'b'
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs>
            <alt><BNF name="S"/><terminalsymbol>a</terminalsymbol></alt>
            <alt><terminalsymbol>b</terminalsymbol></alt>
        </rhs></BNFdef>
    </grammar>"#;

    for strategy in [RecursionStrategy::ShortestPath, RecursionStrategy::Restart] {
        for seed in 0..16 {
            let mut g = generator_for(xml, "S", seeded(seed, strategy));
            let s = g.generate("S").unwrap();
            assert!(s.starts_with('b'), "got {:?}", s);
            assert!(s[1..].chars().all(|c| c == 'a'), "got {:?}", s);
        }
    }
}

#[test]
fn test_intrinsic_rules_resolve_through_references() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><BNF name="whitespace"/><BNF name="newline"/></rhs></BNFdef>
    </grammar>"#;

    let mut g = generator_for(xml, "S", seeded(0, RecursionStrategy::ShortestPath));
    assert_eq!(" \n", g.generate("S").unwrap());
}

#[test]
fn test_unknown_start_rule_is_fatal() {
    let xml = r#"<grammar><BNFdef name="S"><rhs><terminalsymbol>a</terminalsymbol></rhs></BNFdef></grammar>"#;
    let grammar = Grammar::from_reader(xml.as_bytes()).unwrap();
    assert!(Generator::new(grammar, "missing", &GenerationConfig::default()).is_err());
}

#[test]
fn test_unknown_reference_fails_loudly() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><BNF name="nowhere"/></rhs></BNFdef>
    </grammar>"#;
    let grammar = Grammar::from_reader(xml.as_bytes()).unwrap();

    // The shortest-path strategy trips over the missing rule during depth
    // analysis; the restart strategy only notices during expansion.
    assert!(Generator::new(
        grammar.clone(),
        "S",
        &seeded(0, RecursionStrategy::ShortestPath)
    )
    .is_err());

    let mut g =
        Generator::new(grammar, "S", &seeded(0, RecursionStrategy::Restart)).unwrap();
    match g.generate("S") {
        Err(GqlFuzzerError::UnknownRule(name)) => assert_eq!("nowhere", name),
        other => panic!("expected unknown rule error, got {:?}", other),
    }
}

#[test]
fn test_depth_weighted_policy_terminates_on_recursive_grammar() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs>
            <alt><BNF name="S"/><BNF name="S"/><terminalsymbol>a</terminalsymbol></alt>
            <alt><terminalsymbol>b</terminalsymbol></alt>
        </rhs></BNFdef>
    </grammar>"#;

    let config = GenerationConfig {
        expander: ExpanderWrapper::DepthWeighted,
        strategy: RecursionStrategy::ShortestPath,
        ..GenerationConfig::default()
    };
    let mut g = generator_for(xml, "S", config);
    for _ in 0..16 {
        let s = g.generate("S").unwrap();
        assert!(!s.is_empty());
        assert!(s.chars().all(|c| c == 'a' || c == 'b'));
    }
}

#[test]
fn test_random_grammars_generate_and_price_alts_consistently() {
    use crate::grammar::{NodeKind, INFINITE_DEPTH};

    for seed in 0..20 {
        let xml = crate::grammar::random_grammar_xml(seed);
        let mut grammar = Grammar::from_reader(xml.as_bytes()).unwrap();
        grammar.analyze_depth("R0").unwrap();

        // Every alt prices at the minimum of its alternatives, and a
        // finite alt has a finite way out.
        let root = grammar.tree.root().unwrap();
        for id in grammar.tree.preorder(root) {
            if grammar.tree.node(id).kind != NodeKind::Alt {
                continue;
            }
            let depths: Vec<u32> = grammar
                .tree
                .node(id)
                .children
                .iter()
                .map(|c| grammar.tree.node(*c).ref_depth)
                .collect();
            assert_eq!(
                depths.iter().copied().min().unwrap(),
                grammar.tree.node(id).ref_depth,
                "seed {}",
                seed
            );
            if grammar.tree.node(id).ref_depth < INFINITE_DEPTH {
                assert!(depths.iter().any(|d| *d < INFINITE_DEPTH), "seed {}", seed);
            }
        }

        // Every rule in these grammars has a terminal alternative, so both
        // strategies must terminate with a derivation.
        for strategy in [RecursionStrategy::ShortestPath, RecursionStrategy::Restart] {
            let mut g = generator_for(&xml, "R0", seeded(seed, strategy));
            for _ in 0..4 {
                g.generate("R0").unwrap();
            }
        }
    }
}

#[test]
fn test_restart_strategy_unwinds_counters() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs>
            <alt><BNF name="S"/><terminalsymbol>a</terminalsymbol></alt>
            <alt><terminalsymbol>b</terminalsymbol></alt>
        </rhs></BNFdef>
    </grammar>"#;

    let mut g = generator_for(xml, "S", seeded(3, RecursionStrategy::Restart));
    for _ in 0..32 {
        g.generate("S").unwrap();
        g.check_counters_unwound();
    }
}
