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

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::{
    errors::GqlFuzzerError,
    grammar::node::{NodeId, NodeKind, Tree},
};

/// Builds the raw node tree from the XML serialization of the BNF dialect.
///
/// Each start element becomes a node whose kind is the element's local name;
/// `BNFdef` and `BNF` additionally read their `name` attribute. Character
/// data is stored un-stripped as the value of the currently open `kw` or
/// `terminalsymbol` node and ignored everywhere else. Comments, processing
/// instructions, declarations and doctypes are skipped. Anything else coming
/// out of the reader is fatal.
pub struct BnfLoader;

impl BnfLoader {
    pub fn load(input: impl BufRead) -> Result<Tree, GqlFuzzerError> {
        let mut reader = Reader::from_reader(input);
        let mut buf = Vec::new();
        let mut tree = Tree::new();
        let mut current: Option<NodeId> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Err(e) => return Err(GqlFuzzerError::Xml(e)),
                Ok(Event::Eof) => break,
                Ok(Event::Start(start)) => {
                    let node = Self::handle_start_element(&mut tree, &start, current)?;
                    if tree.root().is_err() {
                        tree.set_root(node);
                    }
                    current = Some(node);
                }
                Ok(Event::Empty(start)) => {
                    // Self-closing form of an element; same node, no descent.
                    let node = Self::handle_start_element(&mut tree, &start, current)?;
                    if tree.root().is_err() {
                        tree.set_root(node);
                    }
                }
                Ok(Event::End(_)) => {
                    let open = current.ok_or_else(|| {
                        GqlFuzzerError::Grammar("close tag without matching open element".into())
                    })?;
                    current = tree.node(open).parent;
                }
                Ok(Event::Text(text)) => {
                    if let Some(open) = current {
                        let node = tree.node_mut(open);
                        if matches!(node.kind, NodeKind::Kw | NodeKind::TerminalSymbol) {
                            node.value = text
                                .unescape()
                                .map_err(|e| {
                                    GqlFuzzerError::Grammar(format!("bad character data: {}", e))
                                })?
                                .into_owned();
                        }
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(open) = current {
                        let node = tree.node_mut(open);
                        if matches!(node.kind, NodeKind::Kw | NodeKind::TerminalSymbol) {
                            node.value = String::from_utf8_lossy(data.as_ref()).into_owned();
                        }
                    }
                }
                Ok(Event::Comment(_)) | Ok(Event::PI(_)) | Ok(Event::Decl(_))
                | Ok(Event::DocType(_)) => {}
                Ok(other) => {
                    return Err(GqlFuzzerError::Grammar(format!(
                        "unhandled xml event: {:?}",
                        other
                    )))
                }
            }
            buf.clear();
        }

        tree.root()?;
        Ok(tree)
    }

    fn handle_start_element(
        tree: &mut Tree,
        start: &BytesStart,
        parent: Option<NodeId>,
    ) -> Result<NodeId, GqlFuzzerError> {
        let local = start.local_name();
        let name = std::str::from_utf8(local.as_ref())
            .map_err(|e| GqlFuzzerError::Grammar(format!("element name not utf-8: {}", e)))?;

        let kind = NodeKind::from_element(name);
        let node = tree.alloc(kind);
        tree.node_mut(node).parent = parent;

        if matches!(tree.node(node).kind, NodeKind::BnfDef | NodeKind::Bnf) {
            if let Some(attr) = start
                .try_get_attribute("name")
                .map_err(|e| GqlFuzzerError::Grammar(format!("bad name attribute: {}", e)))?
            {
                tree.node_mut(node).name = attr
                    .unescape_value()
                    .map_err(|e| GqlFuzzerError::Grammar(format!("bad name attribute: {}", e)))?
                    .into_owned();
            }
        }

        if let Some(parent) = parent {
            tree.node_mut(parent).children.push(node);
        }

        Ok(node)
    }
}

#[test]
fn test_load_simple_grammar() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><terminalsymbol>a</terminalsymbol></rhs></BNFdef>
    </grammar>"#;

    let tree = BnfLoader::load(xml.as_bytes()).unwrap();
    let root = tree.root().unwrap();
    assert_eq!(NodeKind::Grammar, tree.node(root).kind);

    let def = tree.node(root).children[0];
    assert_eq!(NodeKind::BnfDef, tree.node(def).kind);
    assert_eq!("S", tree.node(def).name);

    let rhs = tree.node(def).children[0];
    assert_eq!(NodeKind::Rhs, tree.node(rhs).kind);

    let term = tree.node(rhs).children[0];
    assert_eq!(NodeKind::TerminalSymbol, tree.node(term).kind);
    assert_eq!("a", tree.node(term).value);
}

#[test]
fn test_load_reads_kw_and_bnf_reference() {
    let xml = r#"<grammar>
        <BNFdef name="S"><rhs><kw>SELECT</kw><BNF name="ident"/></rhs></BNFdef>
        <BNFdef name="ident"><rhs><terminalsymbol>x</terminalsymbol></rhs></BNFdef>
    </grammar>"#;

    let tree = BnfLoader::load(xml.as_bytes()).unwrap();
    let root = tree.root().unwrap();
    let rhs = tree.node(tree.node(root).children[0]).children[0];

    let kw = tree.node(rhs).children[0];
    assert_eq!(NodeKind::Kw, tree.node(kw).kind);
    assert_eq!("SELECT", tree.node(kw).value);

    let bnf = tree.node(rhs).children[1];
    assert_eq!(NodeKind::Bnf, tree.node(bnf).kind);
    assert_eq!("ident", tree.node(bnf).name);
}

#[test]
fn test_load_tolerates_unknown_elements_and_ignores_noise() {
    let xml = r#"<?xml version="1.0"?>
    <grammar>
        <!-- a comment -->
        <annotation>ignored text</annotation>
        <BNFdef name="S"><rhs><seeTheRules/><terminalsymbol>a</terminalsymbol></rhs></BNFdef>
    </grammar>"#;

    let tree = BnfLoader::load(xml.as_bytes()).unwrap();
    let root = tree.root().unwrap();

    let annotation = tree.node(root).children[0];
    assert_eq!(
        NodeKind::Other("annotation".into()),
        tree.node(annotation).kind
    );
    // Character data outside kw/terminalsymbol is dropped.
    assert_eq!("", tree.node(annotation).value);

    let rhs = tree.node(tree.node(root).children[1]).children[0];
    assert_eq!(
        NodeKind::SeeTheRules,
        tree.node(tree.node(rhs).children[0]).kind
    );
}

#[test]
fn test_load_rejects_malformed_xml() {
    let xml = "<grammar><BNFdef name=\"S\"></grammar>";
    assert!(BnfLoader::load(xml.as_bytes()).is_err());
}
