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

use std::{fs::File, io::BufReader, path::Path};

use crate::errors::GqlFuzzerError;

pub mod depth;
pub mod loader;
pub mod node;
pub mod normalize;
pub mod rules;

pub use node::{Intrinsic, Node, NodeId, NodeKind, Tree, INFINITE_DEPTH};
pub use rules::RuleTable;

/// A loaded, normalized grammar: the canonical node tree plus the rule
/// table indexing it. This is the unit the derivation engine borrows (and
/// the unit to clone when fanning out parallel derivations, since the
/// engine scribbles visit counts into the tree).
#[derive(Clone)]
pub struct Grammar {
    pub tree: Tree,
    pub rules: RuleTable,
}

impl Grammar {
    /// Load the XML document, run the normalization pipeline and build the
    /// rule table. The returned grammar is directly executable.
    pub fn from_reader(input: impl std::io::BufRead) -> Result<Self, GqlFuzzerError> {
        let mut tree = loader::BnfLoader::load(input)?;
        normalize::normalize(&mut tree)?;
        let rules = RuleTable::build(&mut tree)?;
        Ok(Self { tree, rules })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GqlFuzzerError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Run the reference-depth analyzer rooted at the given start rule.
    /// Fatal when the start rule (or any rule it references) is unknown.
    pub fn analyze_depth(&mut self, start_rule: &str) -> Result<u32, GqlFuzzerError> {
        depth::DepthAnalyzer::new(&self.rules).analyze(&mut self.tree, start_rule)
    }

    pub fn fingerprint(&self) -> String {
        self.rules.fingerprint(&self.tree)
    }
}

/// Build a random but structurally valid grammar document: a handful of
/// rules, each with one or more alternatives, cross-references (cycles
/// included) and the occasional opt/repeat/seeTheRules. Every rule keeps a
/// purely terminal alternative, so every reference depth stays finite.
#[cfg(test)]
pub(crate) fn random_grammar_xml(seed: u64) -> String {
    use rand::Rng;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n_rules = rng.random_range(2..7);

    let mut xml = String::from("<grammar>");
    for rule in 0..n_rules {
        xml.push_str(&format!("<BNFdef name=\"R{}\"><rhs>", rule));

        let n_alts = rng.random_range(1..4);
        for alt in 0..n_alts {
            if n_alts > 1 {
                xml.push_str("<alt>");
            }

            let terminal_only = alt == n_alts - 1;
            let n_items = rng.random_range(1..4);
            for item in 0..n_items {
                match rng.random_range(0..5) {
                    0 if !terminal_only => {
                        xml.push_str(&format!(
                            "<BNF name=\"R{}\"/>",
                            rng.random_range(0..n_rules)
                        ));
                    }
                    1 => xml.push_str("<kw>KW</kw>"),
                    2 if item > 0 => xml.push_str("<repeat/>"),
                    3 => xml.push_str("<opt><terminalsymbol>o</terminalsymbol></opt>"),
                    _ => xml.push_str(&format!(
                        "<terminalsymbol>t{}</terminalsymbol>",
                        rng.random_range(0..10)
                    )),
                }
                if rng.random_range(0..8) == 0 {
                    xml.push_str("<seeTheRules/>");
                }
            }

            if n_alts > 1 {
                xml.push_str("</alt>");
            }
        }

        xml.push_str("</rhs></BNFdef>");
    }
    xml.push_str("</grammar>");
    xml
}

#[test]
fn test_grammar_pipeline_end_to_end() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><BNF name="T"/></rhs></BNFdef>
        <BNFdef name="T"><rhs><terminalsymbol>t</terminalsymbol></rhs></BNFdef>
    </grammar>"#;

    let mut grammar = Grammar::from_reader(xml.as_bytes()).unwrap();
    assert!(grammar.rules.contains("S"));
    assert!(grammar.rules.contains("T"));
    assert!(grammar.rules.contains("newline"));

    assert_eq!(1, grammar.analyze_depth("S").unwrap());
    assert_eq!(64, grammar.fingerprint().len());
}
