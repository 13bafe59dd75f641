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
use std::hash::Hash;

/// Generic prefix tree over comparable symbols. The k-path walk stores node
/// id sequences in one of these for coverage bookkeeping, but nothing ties
/// it to that use.
#[derive(Clone)]
pub struct Trie<T>
where
    T: Eq + Hash + Clone,
{
    children: HashMap<T, Trie<T>>,
    is_word: bool,
}

impl<T> Trie<T>
where
    T: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            children: HashMap::new(),
            is_word: false,
        }
    }

    pub fn insert(&mut self, word: &[T]) {
        match word.split_first() {
            None => self.is_word = true,
            Some((first, rest)) => self
                .children
                .entry(first.clone())
                .or_insert_with(Trie::new)
                .insert(rest),
        }
    }

    pub fn search(&self, word: &[T]) -> bool {
        match word.split_first() {
            None => self.is_word,
            Some((first, rest)) => match self.children.get(first) {
                Some(child) => child.search(rest),
                None => false,
            },
        }
    }

    /// Number of distinct words stored.
    pub fn count(&self) -> usize {
        let mut cnt = 0;
        for child in self.children.values() {
            cnt += child.count();
        }
        if self.is_word {
            cnt += 1;
        }
        cnt
    }

    /// Call the visitor once per stored word.
    pub fn visit_all(&self, visitor: &mut impl FnMut(&[T])) {
        let mut prefix = vec![];
        self.visit_words(&mut prefix, visitor);
    }

    fn visit_words(&self, prefix: &mut Vec<T>, visitor: &mut impl FnMut(&[T])) {
        if self.is_word {
            visitor(prefix);
        }
        for (symbol, child) in self.children.iter() {
            prefix.push(symbol.clone());
            child.visit_words(prefix, visitor);
            prefix.pop();
        }
    }
}

impl<T> Default for Trie<T>
where
    T: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn test_trie_insert_search() {
    let mut trie = Trie::new();
    trie.insert(&[1, 2, 3]);
    assert!(trie.search(&[1, 2, 3]));
    assert!(!trie.search(&[1, 2]));
    assert!(!trie.search(&[1, 2, 3, 4]));
    assert!(!trie.search(&[1]));
    trie.insert(&[1]);
    assert!(trie.search(&[1]));
    assert!(!trie.search(&[1, 2]));
    assert!(!trie.search(&[1, 2, 3, 4]));
    trie.insert(&[1, 2, 3, 4]);
    assert!(trie.search(&[1, 2, 3, 4]));
    assert!(!trie.search(&[1, 2]));
    trie.insert(&[2, 3, 4]);
    assert!(!trie.search(&[1, 2]));
    assert!(trie.search(&[2, 3, 4]));
    assert!(!trie.search(&[2, 3, 4, 5]));
    assert!(!trie.search(&[2, 3]));
}

#[test]
fn test_trie_count() {
    let mut trie = Trie::new();
    trie.insert(&[1, 2, 3]);
    assert_eq!(1, trie.count());
    trie.insert(&[1, 2, 3, 4]);
    assert_eq!(2, trie.count());
    trie.insert(&[1]);
    assert_eq!(3, trie.count());
    trie.insert(&[1, 2, 3]);
    assert_eq!(3, trie.count());
}

#[test]
fn test_trie_visit_all_enumerates_distinct_words() {
    let mut trie = Trie::new();
    trie.insert(&[1, 2]);
    trie.insert(&[1, 3]);
    trie.insert(&[1, 2]);
    trie.insert(&[7]);

    let mut words: Vec<Vec<i32>> = vec![];
    trie.visit_all(&mut |word| words.push(word.to_vec()));
    words.sort();

    assert_eq!(vec![vec![1, 2], vec![1, 3], vec![7]], words);
    assert_eq!(trie.count(), words.len());
}
