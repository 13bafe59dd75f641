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

use std::fmt::{Debug, Display};

use crate::errors::GqlFuzzerError;

/// Arena index of a node. Distinct from [`Node::id`], which is assigned by
/// the normalizer in pre-order over the canonical tree.
pub type NodeId = usize;

/// Depth value standing in for "no terminating derivation reachable".
pub const INFINITE_DEPTH: u32 = u32::MAX;

/// Every vertex of the grammar tree carries one of these kinds. The XML
/// element names of the BNF dialect map onto them one to one; element names
/// outside the dialect land in `Other` so a grammar can carry auxiliary
/// annotations without crashing the pipeline.
#[derive(Clone, PartialEq, Eq)]
pub enum NodeKind {
    Grammar,
    BnfDef,
    Rhs,
    Bnf,
    Alt,
    Group,
    Opt,
    Repeat,
    TerminalSymbol,
    Kw,
    Fn(Intrinsic),
    SeeTheRules,
    Other(String),
}

impl NodeKind {
    /// Map an XML element's local name onto a kind. The dialect is
    /// case-sensitive (`BNFdef`, `BNF`).
    pub fn from_element(name: &str) -> Self {
        match name {
            "grammar" => Self::Grammar,
            "BNFdef" => Self::BnfDef,
            "rhs" => Self::Rhs,
            "BNF" => Self::Bnf,
            "alt" => Self::Alt,
            "group" => Self::Group,
            "opt" => Self::Opt,
            "repeat" => Self::Repeat,
            "terminalsymbol" => Self::TerminalSymbol,
            "kw" => Self::Kw,
            "seeTheRules" => Self::SeeTheRules,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Grammar => "grammar",
            Self::BnfDef => "BNFdef",
            Self::Rhs => "rhs",
            Self::Bnf => "BNF",
            Self::Alt => "alt",
            Self::Group => "group",
            Self::Opt => "opt",
            Self::Repeat => "repeat",
            Self::TerminalSymbol => "terminalsymbol",
            Self::Kw => "kw",
            Self::Fn(_) => "fn",
            Self::SeeTheRules => "seeTheRules",
            Self::Other(name) => name,
        }
    }
}

impl Debug for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Discriminants for the fixed set of intrinsic rules. The derivation engine
/// dispatches on these instead of holding function values in the tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    CharacterRepresentation,
    StringLiteralCharacter,
    IdentifierStart,
    IdentifierExtend,
    Whitespace,
    TruncatingWhitespace,
    BidirectionalControlCharacter,
    SimpleCommentCharacter,
    BracketedCommentContents,
    Newline,
    OtherDigit,
    OtherLanguageCharacter,
    SingleQuotedCharacterSequence,
    DoubleQuotedCharacterSequence,
    AccentQuotedCharacterSequence,
}

impl Intrinsic {
    /// Rule names the table installs, paired with their discriminants.
    /// These override any same-named rule found in the grammar document.
    pub const ALL: [(&'static str, Intrinsic); 15] = [
        ("character representation", Intrinsic::CharacterRepresentation),
        ("string literal character", Intrinsic::StringLiteralCharacter),
        ("identifier start", Intrinsic::IdentifierStart),
        ("identifier extend", Intrinsic::IdentifierExtend),
        ("whitespace", Intrinsic::Whitespace),
        ("truncating whitespace", Intrinsic::TruncatingWhitespace),
        (
            "bidirectional control character",
            Intrinsic::BidirectionalControlCharacter,
        ),
        ("simple comment character", Intrinsic::SimpleCommentCharacter),
        (
            "bracketed comment contents",
            Intrinsic::BracketedCommentContents,
        ),
        ("newline", Intrinsic::Newline),
        ("other digit", Intrinsic::OtherDigit),
        ("other language character", Intrinsic::OtherLanguageCharacter),
        (
            "single quoted character sequence",
            Intrinsic::SingleQuotedCharacterSequence,
        ),
        (
            "double quoted character sequence",
            Intrinsic::DoubleQuotedCharacterSequence,
        ),
        (
            "accent quoted character sequence",
            Intrinsic::AccentQuotedCharacterSequence,
        ),
    ];
}

impl Debug for Intrinsic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, intrinsic) in Self::ALL {
            if intrinsic == *self {
                return write!(f, "{}", name);
            }
        }
        Ok(())
    }
}

/// The universal tree vertex. Created by the loader, rewritten by the
/// normalizer and depth analyzer, and visited (with `cnt` bumps) by the
/// derivation engine.
#[derive(Clone)]
pub struct Node {
    pub kind: NodeKind,

    /// Pre-order index assigned by the normalizer; contiguous and unique
    /// within one grammar.
    pub id: usize,

    /// Rule name for `BNFdef`/`BNF`; set on rule bodies by `name-rhs`.
    pub name: String,

    /// Literal text for `terminalsymbol` and `kw`.
    pub value: String,

    pub children: Vec<NodeId>,

    /// Consulted only while normalization passes run.
    pub parent: Option<NodeId>,

    /// Active-visit counter. Nonzero only while a derivation is inside
    /// this node.
    pub cnt: u32,

    /// Minimum number of rule expansions separating this node from a purely
    /// terminal derivation. [`INFINITE_DEPTH`] when none exists; 0 until the
    /// analyzer has run.
    pub ref_depth: u32,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            id: 0,
            name: String::new(),
            value: String::new(),
            children: vec![],
            parent: None,
            cnt: 0,
            ref_depth: 0,
        }
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            NodeKind::Kw | NodeKind::TerminalSymbol => {
                write!(f, "{:?}({}, {})", self.kind, self.id, self.value)
            }
            NodeKind::Bnf | NodeKind::BnfDef => {
                write!(f, "{:?}({}, {})", self.kind, self.id, self.name)
            }
            _ => write!(f, "{:?}({})", self.kind, self.id),
        }
    }
}

/// Arena holding every node of one grammar. Child lists and the rule table
/// refer into it by [`NodeId`], so the table never extends node lifetimes
/// beyond the tree's.
#[derive(Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: vec![],
            root: None,
        }
    }

    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind));
        self.nodes.len() - 1
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Result<NodeId, GqlFuzzerError> {
        self.root
            .ok_or_else(|| GqlFuzzerError::Grammar("document has no grammar root".into()))
    }

    /// Pre-order listing of the subtree rooted at `start`.
    pub fn preorder(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = vec![];
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            order.push(id);
            for child in self.node(id).children.iter().rev() {
                stack.push(*child);
            }
        }

        order
    }

    /// Indented listing of the subtree, one node per line. Handy when a
    /// grammar does not normalize the way you expected.
    pub fn dump(&self, start: NodeId) -> String {
        let mut out = String::new();
        self.dump_node(start, "", &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, indent: &str, out: &mut String) {
        out.push_str(&format!("{}{:?}\n", indent, self.node(id)));
        let deeper = format!("{}  ", indent);
        for child in self.node(id).children.clone() {
            self.dump_node(child, &deeper, out);
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.root {
            Some(root) => write!(f, "{}", self.dump(root)),
            None => Ok(()),
        }
    }
}

#[test]
fn test_preorder_and_dump() {
    let mut tree = Tree::new();
    let root = tree.alloc(NodeKind::Grammar);
    let def = tree.alloc(NodeKind::BnfDef);
    let term = tree.alloc(NodeKind::TerminalSymbol);
    tree.node_mut(root).children.push(def);
    tree.node_mut(def).children.push(term);
    tree.node_mut(def).name = "S".into();
    tree.node_mut(term).value = "a".into();
    tree.set_root(root);

    assert_eq!(vec![root, def, term], tree.preorder(root));

    let dump = tree.dump(root);
    assert!(dump.contains("grammar(0)"));
    assert!(dump.contains("BNFdef(0, S)"));
    assert!(dump.contains("terminalsymbol(0, a)"));
}

#[test]
fn test_kind_from_element_roundtrip() {
    for name in [
        "grammar",
        "BNFdef",
        "rhs",
        "BNF",
        "alt",
        "group",
        "opt",
        "repeat",
        "terminalsymbol",
        "kw",
        "seeTheRules",
    ] {
        assert_eq!(name, NodeKind::from_element(name).label());
    }

    let unknown = NodeKind::from_element("annotation");
    assert_eq!(NodeKind::Other("annotation".into()), unknown);
    assert_eq!("annotation", unknown.label());
}
