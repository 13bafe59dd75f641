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

use std::collections::HashMap;
use std::io::Write;

use sha2::{Digest, Sha256};

use crate::{
    errors::GqlFuzzerError,
    grammar::node::{Intrinsic, NodeId, NodeKind, Tree},
};

/// Maps rule names to the body node of their definition. The tree owns the
/// nodes; the table only holds arena indices into it.
///
/// After the grammar's own definitions are indexed, the fixed set of
/// intrinsic rules is installed on top, overriding any same-named entry.
/// Their bodies are synthesized `fn` nodes appended to the arena.
#[derive(Clone)]
pub struct RuleTable {
    rules: HashMap<String, NodeId>,
}

impl RuleTable {
    pub fn build(tree: &mut Tree) -> Result<Self, GqlFuzzerError> {
        let mut rules = HashMap::new();

        let root = tree.root()?;
        for node in tree.preorder(root) {
            if tree.node(node).kind != NodeKind::BnfDef {
                continue;
            }

            let body = *tree.node(node).children.first().ok_or_else(|| {
                GqlFuzzerError::Grammar(format!(
                    "BNFdef with no right-hand side: {:?}",
                    tree.node(node)
                ))
            })?;
            rules.insert(tree.node(node).name.clone(), body);
        }

        for (name, intrinsic) in Intrinsic::ALL {
            let node = tree.alloc(NodeKind::Fn(intrinsic));
            tree.node_mut(node).name = name.to_string();
            rules.insert(name.to_string(), node);
        }

        Ok(Self { rules })
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.rules.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Deterministic digest of the rule set: every rule name plus the dump
    /// of its body subtree, hashed in name order. Two loads of the same
    /// grammar document fingerprint identically, which is what makes the
    /// value worth logging before a long fuzzing run.
    pub fn fingerprint(&self, tree: &Tree) -> String {
        let mut hash = Sha256::new();

        let mut names: Vec<&String> = self.rules.keys().collect();
        names.sort();

        for name in names {
            let _ = hash.write(name.as_bytes());
            let _ = hash.write(tree.dump(self.rules[name]).as_bytes());
        }

        hex::encode(hash.finalize())
    }
}

#[cfg(test)]
use crate::grammar::{loader::BnfLoader, normalize::normalize};

#[cfg(test)]
fn table_for(xml: &str) -> (Tree, RuleTable) {
    let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
    normalize(&mut tree).unwrap();
    let rules = RuleTable::build(&mut tree).unwrap();
    (tree, rules)
}

#[test]
fn test_build_indexes_definitions_and_intrinsics() {
    let (tree, rules) = table_for(
        r#"<grammar>
        <BNFdef name="S"><rhs><terminalsymbol>a</terminalsymbol></rhs></BNFdef>
    </grammar>"#,
    );

    let body = rules.get("S").unwrap();
    assert_eq!(NodeKind::TerminalSymbol, tree.node(body).kind);

    // One grammar rule plus the fixed intrinsic set.
    assert_eq!(1 + Intrinsic::ALL.len(), rules.len());
    assert!(rules.contains("whitespace"));
    assert!(rules.contains("accent quoted character sequence"));
    assert!(!rules.contains("no such rule"));
}

#[test]
fn test_intrinsics_override_grammar_rules() {
    let (tree, rules) = table_for(
        r#"<grammar>
        <BNFdef name="whitespace"><rhs><terminalsymbol>W</terminalsymbol></rhs></BNFdef>
    </grammar>"#,
    );

    let body = rules.get("whitespace").unwrap();
    assert_eq!(
        NodeKind::Fn(Intrinsic::Whitespace),
        tree.node(body).kind
    );
}

#[test]
fn test_fingerprint_is_stable_across_loads() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><BNF name="T"/></rhs></BNFdef>
        <BNFdef name="T"><rhs><terminalsymbol>t</terminalsymbol></rhs></BNFdef>
    </grammar>"#;

    let (tree_a, rules_a) = table_for(xml);
    let (tree_b, rules_b) = table_for(xml);
    assert_eq!(rules_a.fingerprint(&tree_a), rules_b.fingerprint(&tree_b));

    let (tree_c, rules_c) = table_for(
        r#"<grammar>
        <BNFdef name="S"><rhs><terminalsymbol>s</terminalsymbol></rhs></BNFdef>
    </grammar>"#,
    );
    assert_ne!(rules_a.fingerprint(&tree_a), rules_c.fingerprint(&tree_c));
}
