/*
*	Copyright (C) 2026 Kendall Tauser
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

use std::collections::HashSet;

use crate::{
    errors::GqlFuzzerError,
    grammar::node::{NodeId, NodeKind, Tree, INFINITE_DEPTH},
    grammar::rules::RuleTable,
};

/// Computes, per node, the minimum number of rule expansions separating it
/// from a purely terminal derivation, and stores it in `Node::ref_depth`.
///
/// Terminals, keywords and intrinsics sit at depth 0. A `BNF` reference
/// costs one expansion on top of its resolved body. Sequencing constructs
/// (`group`, `repeat`, `opt`) need all children to terminate, so they take
/// the max; an `alt` needs only one alternative, so it takes the min.
/// Re-entering a node already on the traversal stack prices that edge at
/// [`INFINITE_DEPTH`] without condemning the node itself, which is what lets
/// left-recursive rules keep a finite depth through their terminating
/// alternatives.
///
/// Only nodes reachable from the start rule's body are touched; everything
/// else keeps the default depth of 0, which is fine because derivations
/// rooted elsewhere never consult them.
pub struct DepthAnalyzer<'a> {
    rules: &'a RuleTable,
}

impl<'a> DepthAnalyzer<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self { rules }
    }

    pub fn analyze(&self, tree: &mut Tree, start_rule: &str) -> Result<u32, GqlFuzzerError> {
        let start = self
            .rules
            .get(start_rule)
            .ok_or_else(|| GqlFuzzerError::UnknownRule(start_rule.to_string()))?;

        let mut on_stack = HashSet::new();
        self.depth_of(tree, start, &mut on_stack)
    }

    fn depth_of(
        &self,
        tree: &mut Tree,
        n: NodeId,
        on_stack: &mut HashSet<NodeId>,
    ) -> Result<u32, GqlFuzzerError> {
        // A previously computed positive depth is final.
        if tree.node(n).ref_depth > 0 {
            return Ok(tree.node(n).ref_depth);
        }

        if on_stack.contains(&n) {
            return Ok(INFINITE_DEPTH);
        }
        on_stack.insert(n);

        let depth = match tree.node(n).kind.clone() {
            NodeKind::TerminalSymbol | NodeKind::Kw | NodeKind::Fn(_) => 0,
            NodeKind::Bnf => {
                let name = tree.node(n).name.clone();
                let body = self
                    .rules
                    .get(&name)
                    .ok_or(GqlFuzzerError::UnknownRule(name))?;
                saturating_add_one(self.depth_of(tree, body, on_stack)?)
            }
            NodeKind::Alt => {
                let mut min = INFINITE_DEPTH;
                for child in tree.node(n).children.clone() {
                    min = min.min(self.depth_of(tree, child, on_stack)?);
                }
                min
            }
            // Everything that sequences its children, plus the structural
            // kinds a body can still carry, terminates only when all of its
            // children do.
            _ => {
                let mut max = 0;
                for child in tree.node(n).children.clone() {
                    max = max.max(self.depth_of(tree, child, on_stack)?);
                }
                max
            }
        };

        on_stack.remove(&n);
        tree.node_mut(n).ref_depth = depth;
        Ok(depth)
    }
}

fn saturating_add_one(depth: u32) -> u32 {
    if depth == INFINITE_DEPTH {
        INFINITE_DEPTH
    } else {
        depth.saturating_add(1)
    }
}

#[cfg(test)]
use crate::grammar::{loader::BnfLoader, normalize::normalize};

#[cfg(test)]
fn analyzed(xml: &str, start: &str) -> (Tree, RuleTable, u32) {
    let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
    normalize(&mut tree).unwrap();
    let rules = RuleTable::build(&mut tree).unwrap();
    let depth = DepthAnalyzer::new(&rules).analyze(&mut tree, start).unwrap();
    (tree, rules, depth)
}

#[test]
fn test_terminal_rule_has_depth_zero() {
    let (_, _, depth) = analyzed(
        r#"<grammar>
        <BNFdef name="S"><rhs><terminalsymbol>a</terminalsymbol></rhs></BNFdef>
    </grammar>"#,
        "S",
    );
    assert_eq!(0, depth);
}

#[test]
fn test_reference_adds_one_expansion() {
    let (_, _, depth) = analyzed(
        r#"<grammar>
        <BNFdef name="S"><rhs><BNF name="T"/></rhs></BNFdef>
        <BNFdef name="T"><rhs><BNF name="U"/></rhs></BNFdef>
        <BNFdef name="U"><rhs><terminalsymbol>u</terminalsymbol></rhs></BNFdef>
    </grammar>"#,
        "S",
    );
    // S body is a BNF(T): 1 + (1 + 0).
    assert_eq!(2, depth);
}

#[test]
fn test_alt_takes_minimum_over_alternatives() {
    let (tree, rules, depth) = analyzed(
        r#"<grammar>
        <BNFdef name="S"><rhs>
            <alt><BNF name="Deep"/></alt>
            <alt><terminalsymbol>b</terminalsymbol></alt>
        </rhs></BNFdef>
        <BNFdef name="Deep"><rhs><BNF name="Deeper"/></rhs></BNFdef>
        <BNFdef name="Deeper"><rhs><terminalsymbol>d</terminalsymbol></rhs></BNFdef>
    </grammar>"#,
        "S",
    );
    assert_eq!(0, depth);

    let alt = rules.get("S").unwrap();
    assert_eq!(NodeKind::Alt, tree.node(alt).kind);
    let child_min = tree
        .node(alt)
        .children
        .iter()
        .map(|c| tree.node(*c).ref_depth)
        .min()
        .unwrap();
    assert_eq!(child_min, tree.node(alt).ref_depth);
    assert!(tree
        .node(alt)
        .children
        .iter()
        .any(|c| tree.node(*c).ref_depth < INFINITE_DEPTH));
}

#[test]
fn test_left_recursive_rule_keeps_finite_depth() {
    // S := S 'a' | 'b'
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs>
            <alt><BNF name="S"/><terminalsymbol>a</terminalsymbol></alt>
            <alt><terminalsymbol>b</terminalsymbol></alt>
        </rhs></BNFdef>
    </grammar>"#;
    let (mut tree, rules, depth) = analyzed(xml, "S");
    assert_eq!(0, depth);

    // A reference to S prices at one expansion through the 'b' alternative.
    let probe = tree.alloc(NodeKind::Bnf);
    tree.node_mut(probe).name = "S".into();
    let via_ref = DepthAnalyzer::new(&rules)
        .depth_of(&mut tree, probe, &mut HashSet::new())
        .unwrap();
    assert_eq!(1, via_ref);
}

#[test]
fn test_unterminating_rule_is_infinite() {
    // S := S 'a' with no terminating alternative.
    let (_, _, depth) = analyzed(
        r#"<grammar>
        <BNFdef name="S"><rhs><BNF name="S"/><terminalsymbol>a</terminalsymbol></rhs></BNFdef>
    </grammar>"#,
        "S",
    );
    assert_eq!(INFINITE_DEPTH, depth);
}

#[test]
fn test_unknown_reference_is_fatal() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><BNF name="missing"/></rhs></BNFdef>
    </grammar>"#;
    let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
    normalize(&mut tree).unwrap();
    let rules = RuleTable::build(&mut tree).unwrap();
    assert!(DepthAnalyzer::new(&rules).analyze(&mut tree, "S").is_err());

    assert!(DepthAnalyzer::new(&rules).analyze(&mut tree, "no such start").is_err());
}
