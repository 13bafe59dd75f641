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

//! Random-sentence generator for a GQL-like query-language grammar
//! serialized as XML BNF. Load a grammar, normalize it into a directly
//! executable tree, and derive random strings from any start rule for use
//! as fuzz inputs.

pub mod config;
pub mod corpus;
pub mod errors;
pub mod expanders;
pub mod generator;
pub mod grammar;
pub mod kpath;
pub mod trie;
