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

use crate::{
    errors::GqlFuzzerError,
    grammar::node::{NodeId, NodeKind, Tree},
};

/// Rewrites the raw tree into the canonical, directly-executable form used
/// by the derivation engine: `strip-see-the-rules`, `lift-repeat`,
/// `flatten-alt`, `condense-rhs`, `assign-id`, strictly in that order.
pub fn normalize(tree: &mut Tree) -> Result<(), GqlFuzzerError> {
    let root = tree.root()?;
    strip_see_the_rules(tree, root);
    lift_repeat(tree, root);
    flatten_alt(tree, root)?;
    condense_rhs(tree, root)?;
    assign_id(tree, root);
    Ok(())
}

/// Pipeline variant used by the k-path walk: `rhs` condensation is not
/// needed there, and every rule body is tagged with its defining rule's
/// name so paths stay attributable.
pub fn normalize_for_kpaths(tree: &mut Tree) -> Result<(), GqlFuzzerError> {
    let root = tree.root()?;
    strip_see_the_rules(tree, root);
    lift_repeat(tree, root);
    flatten_alt(tree, root)?;
    assign_id(tree, root);
    name_rhs(tree, root);
    Ok(())
}

/// Remove every `seeTheRules` stub in place, depth-first on the children
/// that stay.
pub fn strip_see_the_rules(tree: &mut Tree, n: NodeId) {
    let children = tree.node(n).children.clone();
    let mut to_remove = vec![];

    for child in children {
        if tree.node(child).kind == NodeKind::SeeTheRules {
            to_remove.push(child);
        } else {
            strip_see_the_rules(tree, child);
        }
    }

    tree.node_mut(n)
        .children
        .retain(|c| !to_remove.contains(c));
}

/// Reparent each `repeat`'s immediately preceding sibling under it, so the
/// repeat carries its own operand. Recursion into non-repeat children
/// happens before the removals are applied. A `repeat` with nothing to its
/// left is a grammar error; the node stays and will expand to nothing.
pub fn lift_repeat(tree: &mut Tree, n: NodeId) {
    let children = tree.node(n).children.clone();
    let mut prev: Option<NodeId> = None;
    let mut to_remove = vec![];

    for child in children {
        if tree.node(child).kind == NodeKind::Repeat {
            match prev {
                Some(operand) => {
                    tree.node_mut(child).children.push(operand);
                    tree.node_mut(operand).parent = Some(child);
                    to_remove.push(operand);
                }
                None => {
                    log::error!(
                        "repeat node without a preceding sibling under {:?}",
                        tree.node(n)
                    );
                }
            }
        } else {
            lift_repeat(tree, child);
        }
        prev = Some(child);
    }

    tree.node_mut(n)
        .children
        .retain(|c| !to_remove.contains(c));
}

/// Collapse sibling `alt` runs into a single `alt` node. Alternatives with
/// more than one child keep their concatenation by being retagged `group`;
/// single-child alternatives inline the child. Recursion happens first, and
/// an `alt` mixed with non-`alt` siblings is fatal.
pub fn flatten_alt(tree: &mut Tree, n: NodeId) -> Result<(), GqlFuzzerError> {
    for child in tree.node(n).children.clone() {
        flatten_alt(tree, child)?;
    }

    let children = tree.node(n).children.clone();
    if children.len() <= 1 || tree.node(children[0]).kind != NodeKind::Alt {
        return Ok(());
    }

    let merged = tree.alloc(NodeKind::Alt);
    tree.node_mut(merged).parent = Some(n);

    for child in children {
        if tree.node(child).kind != NodeKind::Alt {
            return Err(GqlFuzzerError::Grammar(format!(
                "alt mixed with other nodes: {:?} under {:?}",
                tree.node(child),
                tree.node(n)
            )));
        }

        match tree.node(child).children.len() {
            0 => {
                return Err(GqlFuzzerError::Grammar(format!(
                    "alt with no alternatives: {:?}",
                    tree.node(child)
                )))
            }
            1 => {
                let only = tree.node(child).children[0];
                tree.node_mut(only).parent = Some(merged);
                tree.node_mut(merged).children.push(only);
            }
            _ => {
                tree.node_mut(child).kind = NodeKind::Group;
                tree.node_mut(child).parent = Some(merged);
                tree.node_mut(merged).children.push(child);
            }
        }
    }

    tree.node_mut(n).children = vec![merged];
    Ok(())
}

/// Remove `rhs` as a runtime kind: a one-child `rhs` is replaced by that
/// child, a wider one is retagged `group`.
pub fn condense_rhs(tree: &mut Tree, root: NodeId) -> Result<(), GqlFuzzerError> {
    for def in tree.node(root).children.clone() {
        match tree.node(def).kind {
            NodeKind::BnfDef => {}
            NodeKind::Other(_) => continue,
            _ => {
                return Err(GqlFuzzerError::Grammar(format!(
                    "expecting BNFdef, found {:?}",
                    tree.node(def)
                )))
            }
        }

        let rhs = *tree.node(def).children.first().ok_or_else(|| {
            GqlFuzzerError::Grammar(format!("BNFdef with no right-hand side: {:?}", tree.node(def)))
        })?;

        if tree.node(rhs).children.len() == 1 {
            let body = tree.node(rhs).children[0];
            tree.node_mut(body).parent = Some(def);
            tree.node_mut(def).children[0] = body;
        } else {
            tree.node_mut(rhs).kind = NodeKind::Group;
        }
    }

    Ok(())
}

/// Pre-order traversal assigning consecutive ids in `[0, N)`.
pub fn assign_id(tree: &mut Tree, root: NodeId) {
    for (next_id, node) in tree.preorder(root).into_iter().enumerate() {
        tree.node_mut(node).id = next_id;
    }
}

/// Propagate each `BNFdef`'s name onto its body child.
pub fn name_rhs(tree: &mut Tree, root: NodeId) {
    for node in tree.preorder(root) {
        if tree.node(node).kind == NodeKind::BnfDef {
            let name = tree.node(node).name.clone();
            if let Some(body) = tree.node(node).children.first().copied() {
                tree.node_mut(body).name = name;
            }
        }
    }
}

#[cfg(test)]
use crate::grammar::loader::BnfLoader;

#[test]
fn test_strip_see_the_rules_removes_all_stubs() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><seeTheRules/><terminalsymbol>a</terminalsymbol><seeTheRules/></rhs></BNFdef>
    </grammar>"#;
    let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
    normalize(&mut tree).unwrap();

    for id in tree.preorder(tree.root().unwrap()) {
        assert_ne!(NodeKind::SeeTheRules, tree.node(id).kind);
        assert_ne!(NodeKind::Rhs, tree.node(id).kind);
    }
}

#[test]
fn test_lift_repeat_moves_left_sibling_under_repeat() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><terminalsymbol>x</terminalsymbol><repeat/></rhs></BNFdef>
    </grammar>"#;
    let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
    normalize(&mut tree).unwrap();

    let root = tree.root().unwrap();
    let def = tree.node(root).children[0];
    // The rhs condensed into the repeat itself, which now owns the operand.
    let repeat = tree.node(def).children[0];
    assert_eq!(NodeKind::Repeat, tree.node(repeat).kind);
    assert_eq!(1, tree.node(repeat).children.len());

    let operand = tree.node(repeat).children[0];
    assert_eq!(NodeKind::TerminalSymbol, tree.node(operand).kind);
    assert_eq!("x", tree.node(operand).value);
}

#[test]
fn test_flatten_alt_merges_siblings_and_wraps_wide_alternatives() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs>
            <alt><terminalsymbol>a</terminalsymbol></alt>
            <alt><kw>AND</kw><terminalsymbol>b</terminalsymbol></alt>
        </rhs></BNFdef>
    </grammar>"#;
    let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
    normalize(&mut tree).unwrap();

    let root = tree.root().unwrap();
    let def = tree.node(root).children[0];
    let alt = tree.node(def).children[0];
    assert_eq!(NodeKind::Alt, tree.node(alt).kind);
    assert_eq!(2, tree.node(alt).children.len());

    // Single-child alternative was inlined.
    let first = tree.node(alt).children[0];
    assert_eq!(NodeKind::TerminalSymbol, tree.node(first).kind);

    // Multi-child alternative kept concatenation as a group.
    let second = tree.node(alt).children[1];
    assert_eq!(NodeKind::Group, tree.node(second).kind);
    assert_eq!(2, tree.node(second).children.len());
}

#[test]
fn test_flatten_alt_rejects_mixed_siblings() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs>
            <alt><terminalsymbol>a</terminalsymbol></alt>
            <terminalsymbol>b</terminalsymbol>
        </rhs></BNFdef>
    </grammar>"#;
    let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
    assert!(normalize(&mut tree).is_err());
}

#[test]
fn test_condense_rhs_inlines_single_child() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><terminalsymbol>a</terminalsymbol></rhs></BNFdef>
        <BNFdef name="T"><rhs><terminalsymbol>b</terminalsymbol><terminalsymbol>c</terminalsymbol></rhs></BNFdef>
    </grammar>"#;
    let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
    normalize(&mut tree).unwrap();

    let root = tree.root().unwrap();

    let s = tree.node(root).children[0];
    assert_eq!(
        NodeKind::TerminalSymbol,
        tree.node(tree.node(s).children[0]).kind
    );

    let t = tree.node(root).children[1];
    assert_eq!(NodeKind::Group, tree.node(tree.node(t).children[0]).kind);
}

#[test]
fn test_assign_id_is_contiguous_and_unique() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs>
            <alt><BNF name="T"/></alt>
            <alt><terminalsymbol>a</terminalsymbol><repeat/></alt>
        </rhs></BNFdef>
        <BNFdef name="T"><rhs><opt><kw>MATCH</kw></opt></rhs></BNFdef>
    </grammar>"#;
    let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
    normalize(&mut tree).unwrap();

    let order = tree.preorder(tree.root().unwrap());
    let mut ids: Vec<usize> = order.iter().map(|n| tree.node(*n).id).collect();
    ids.sort();
    let expected: Vec<usize> = (0..order.len()).collect();
    assert_eq!(expected, ids);
}

#[test]
fn test_name_rhs_tags_rule_bodies() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><terminalsymbol>a</terminalsymbol></rhs></BNFdef>
    </grammar>"#;
    let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
    normalize_for_kpaths(&mut tree).unwrap();

    let root = tree.root().unwrap();
    let def = tree.node(root).children[0];
    let body = tree.node(def).children[0];
    assert_eq!("S", tree.node(body).name);
}

#[test]
fn test_random_grammars_uphold_normalization_invariants() {
    for seed in 0..40 {
        let xml = crate::grammar::random_grammar_xml(seed);
        let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
        normalize(&mut tree).unwrap();

        let root = tree.root().unwrap();
        let order = tree.preorder(root);

        // No seeTheRules or rhs survives anywhere.
        for id in order.iter() {
            assert_ne!(NodeKind::SeeTheRules, tree.node(*id).kind, "seed {}", seed);
            assert_ne!(NodeKind::Rhs, tree.node(*id).kind, "seed {}", seed);
        }

        // Ids form a contiguous, unique [0, N).
        let mut ids: Vec<usize> = order.iter().map(|id| tree.node(*id).id).collect();
        ids.sort();
        assert_eq!((0..order.len()).collect::<Vec<usize>>(), ids, "seed {}", seed);

        // Every definition condensed to one executable child.
        for def in tree.node(root).children.clone() {
            assert_eq!(1, tree.node(def).children.len(), "seed {}", seed);
            let body = tree.node(def).children[0];
            assert!(
                matches!(
                    tree.node(body).kind,
                    NodeKind::Alt
                        | NodeKind::Group
                        | NodeKind::Repeat
                        | NodeKind::Opt
                        | NodeKind::TerminalSymbol
                        | NodeKind::Kw
                        | NodeKind::Bnf
                ),
                "seed {}: {:?}",
                seed,
                tree.node(body)
            );
        }

        // Alternation positions hold exactly one alt, and every lifted
        // repeat owns its operand.
        for id in order.iter() {
            let children = &tree.node(*id).children;
            let n_alts = children
                .iter()
                .filter(|c| tree.node(**c).kind == NodeKind::Alt)
                .count();
            if n_alts > 0 {
                assert_eq!(1, children.len(), "seed {}", seed);
            }
            if tree.node(*id).kind == NodeKind::Repeat {
                assert!(!tree.node(*id).children.is_empty(), "seed {}", seed);
            }
        }
    }
}

#[test]
fn test_every_bnfdef_has_one_executable_child() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs>
            <alt><BNF name="T"/></alt>
            <alt><terminalsymbol>a</terminalsymbol></alt>
        </rhs></BNFdef>
        <BNFdef name="T"><rhs><kw>MATCH</kw><terminalsymbol>z</terminalsymbol></rhs></BNFdef>
    </grammar>"#;
    let mut tree = BnfLoader::load(xml.as_bytes()).unwrap();
    normalize(&mut tree).unwrap();

    let root = tree.root().unwrap();
    for def in tree.node(root).children.clone() {
        assert_eq!(NodeKind::BnfDef, tree.node(def).kind);
        assert_eq!(1, tree.node(def).children.len());
        let body = tree.node(def).children[0];
        assert!(matches!(
            tree.node(body).kind,
            NodeKind::Alt
                | NodeKind::Group
                | NodeKind::Repeat
                | NodeKind::Opt
                | NodeKind::TerminalSymbol
                | NodeKind::Kw
                | NodeKind::Bnf
        ));
    }
}
