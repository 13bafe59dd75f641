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

use crate::{
    errors::GqlFuzzerError,
    grammar::node::{NodeId, Tree},
    grammar::normalize::normalize_for_kpaths,
    trie::Trie,
};

/// Enumerates every downward path of exactly `k` consecutive node ids in
/// the canonical tree and collects them into a trie. Consumers use the
/// resulting trie to track which structural paths a generated corpus has
/// covered.
///
/// Runs on the k-path pipeline variant: `rhs` nodes survive (tagged with
/// their rule's name by `name-rhs`) and ids are assigned over that shape.
pub struct KpathGenerator {
    tree: Tree,
}

impl KpathGenerator {
    pub fn new(mut tree: Tree) -> Result<Self, GqlFuzzerError> {
        normalize_for_kpaths(&mut tree)?;
        Ok(Self { tree })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Build the trie of all k-paths. Paths shorter than `k` (cut off by a
    /// leaf) are not recorded.
    pub fn build_kpaths(&self, k: usize) -> Result<Trie<usize>, GqlFuzzerError> {
        let mut trie = Trie::new();
        if k == 0 {
            return Ok(trie);
        }

        let root = self.tree.root()?;
        for node in self.tree.preorder(root) {
            self.add_kpaths(node, k, &mut trie);
        }

        Ok(trie)
    }

    /// Record every length-`k` id sequence that starts at `n` and follows
    /// child edges.
    fn add_kpaths(&self, n: NodeId, k: usize, trie: &mut Trie<usize>) {
        let mut path = vec![];
        self.walk_paths(n, k, &mut path, trie);
    }

    fn walk_paths(&self, n: NodeId, k: usize, path: &mut Vec<usize>, trie: &mut Trie<usize>) {
        path.push(self.tree.node(n).id);

        if path.len() == k {
            trie.insert(path);
        } else {
            for child in self.tree.node(n).children.iter() {
                self.walk_paths(*child, k, path, trie);
            }
        }

        path.pop();
    }
}

#[cfg(test)]
use crate::grammar::loader::BnfLoader;

#[cfg(test)]
fn kpath_generator(xml: &str) -> KpathGenerator {
    let tree = BnfLoader::load(xml.as_bytes()).unwrap();
    KpathGenerator::new(tree).unwrap()
}

#[test]
fn test_build_kpaths_records_downward_id_runs() {
    // grammar(0) -> BNFdef(1) -> rhs(2) -> terminalsymbol(3)
    let g = kpath_generator(
        r#"<grammar>
        <BNFdef name="S"><rhs><terminalsymbol>a</terminalsymbol></rhs></BNFdef>
    </grammar>"#,
    );

    let trie = g.build_kpaths(2).unwrap();
    assert_eq!(3, trie.count());
    assert!(trie.search(&[0, 1]));
    assert!(trie.search(&[1, 2]));
    assert!(trie.search(&[2, 3]));
    assert!(!trie.search(&[0, 2]));

    // Each node id appears exactly once as a 1-path.
    let singles = g.build_kpaths(1).unwrap();
    assert_eq!(4, singles.count());
}

#[test]
fn test_kpaths_shorter_than_k_are_dropped() {
    let g = kpath_generator(
        r#"<grammar>
        <BNFdef name="S"><rhs><terminalsymbol>a</terminalsymbol></rhs></BNFdef>
    </grammar>"#,
    );

    // The deepest chain has four nodes; no 5-path exists.
    let trie = g.build_kpaths(5).unwrap();
    assert_eq!(0, trie.count());

    let full = g.build_kpaths(4).unwrap();
    assert_eq!(1, full.count());
    assert!(full.search(&[0, 1, 2, 3]));
}

#[test]
fn test_kpaths_branch_at_alternatives() {
    let g = kpath_generator(
        r#"<grammar>
        <BNFdef name="S"><rhs>
            <alt><terminalsymbol>a</terminalsymbol></alt>
            <alt><terminalsymbol>b</terminalsymbol></alt>
        </rhs></BNFdef>
    </grammar>"#,
    );

    let trie = g.build_kpaths(3).unwrap();
    let mut words = vec![];
    trie.visit_all(&mut |w| words.push(w.to_vec()));

    // Both alternatives contribute a distinct root-to-leaf run.
    assert!(words.iter().all(|w| w.len() == 3));
    assert!(trie.count() >= 2);
}
