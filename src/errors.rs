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

use std::{
    fmt::{Debug, Display},
    io,
};

pub enum GqlFuzzerError {
    General(String),
    IOError(io::Error),
    /// Malformed XML in the grammar document. Fatal at first occurrence.
    Xml(quick_xml::Error),
    /// Structural grammar violations found while normalizing or indexing
    /// the rule tree. Carries the offending rule/node identity.
    Grammar(String),
    /// A `BNF` reference or start rule naming a rule that is in neither the
    /// grammar nor the intrinsic set.
    UnknownRule(String),
    /// A node's active-visit count passed the revisit bound while the
    /// restart strategy was active. Recovered by the generate loop.
    RecursionExceeded { kind: String, id: usize },
    RandomSource(String),
}

impl Display for GqlFuzzerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General(e) => write!(f, "{}", e),
            Self::IOError(e) => write!(f, "io: {}", e),
            Self::Xml(e) => write!(f, "xml: {}", e),
            Self::Grammar(e) => write!(f, "grammar: {}", e),
            Self::UnknownRule(name) => write!(f, "rule not found: {}", name),
            Self::RecursionExceeded { kind, id } => {
                write!(f, "recursion level exceeded at {}({})", kind, id)
            }
            Self::RandomSource(e) => write!(f, "random source: {}", e),
        }
    }
}

impl Debug for GqlFuzzerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl From<&str> for GqlFuzzerError {
    fn from(value: &str) -> Self {
        Self::General(value.to_string())
    }
}

impl From<String> for GqlFuzzerError {
    fn from(value: String) -> Self {
        Self::General(value)
    }
}

impl From<io::Error> for GqlFuzzerError {
    fn from(value: io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<quick_xml::Error> for GqlFuzzerError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Xml(value)
    }
}

impl From<serde_json::Error> for GqlFuzzerError {
    fn from(value: serde_json::Error) -> Self {
        Self::General(format!("config: {}", value))
    }
}
