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

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    config::GenerationConfig, errors::GqlFuzzerError, generator::Generator, grammar::Grammar,
};

/// Emit `config.count` derivations of the configured start rule.
///
/// The sequential path reuses one engine. The parallel path hands every
/// worker its own grammar clone, since derivations scribble visit counts
/// into the shared tree, and derives per-worker seeds from the base seed so
/// a run stays reproducible for a fixed thread-pool-independent index.
pub fn generate_corpus(
    grammar: &Grammar,
    config: &GenerationConfig,
) -> Result<Vec<String>, GqlFuzzerError> {
    if config.parallel && config.count > 1 {
        return (0..config.count)
            .into_par_iter()
            .map(|i| {
                let worker = config.with_seed(config.seed.wrapping_add(i as u64));
                let mut generator =
                    Generator::new(grammar.clone(), &config.start_rule, &worker)?;
                generator.generate(&config.start_rule)
            })
            .collect();
    }

    let mut generator = Generator::new(grammar.clone(), &config.start_rule, config)?;
    let mut corpus = Vec::with_capacity(config.count);
    for _ in 0..config.count {
        corpus.push(generator.generate(&config.start_rule)?);
    }
    Ok(corpus)
}

#[cfg(test)]
const ALT_GRAMMAR: &str = r#"<grammar>
    <BNFdef name="S"><rhs>
        <alt><terminalsymbol>a</terminalsymbol></alt>
        <alt><terminalsymbol>b</terminalsymbol></alt>
    </rhs></BNFdef>
</grammar>"#;

#[test]
fn test_sequential_corpus_has_requested_size() {
    let grammar = Grammar::from_reader(ALT_GRAMMAR.as_bytes()).unwrap();
    let config = GenerationConfig {
        start_rule: "S".into(),
        count: 25,
        ..GenerationConfig::default()
    };

    let corpus = generate_corpus(&grammar, &config).unwrap();
    assert_eq!(25, corpus.len());
    assert!(corpus.iter().all(|s| s == "a" || s == "b"));
}

#[test]
fn test_parallel_corpus_matches_sequential_contract() {
    let grammar = Grammar::from_reader(ALT_GRAMMAR.as_bytes()).unwrap();
    let config = GenerationConfig {
        start_rule: "S".into(),
        count: 50,
        parallel: true,
        ..GenerationConfig::default()
    };

    let corpus = generate_corpus(&grammar, &config).unwrap();
    assert_eq!(50, corpus.len());
    assert!(corpus.iter().all(|s| s == "a" || s == "b"));

    // Same base seed, same per-index seeds, same corpus.
    let again = generate_corpus(&grammar, &config).unwrap();
    assert_eq!(corpus, again);
}

#[test]
fn test_corpus_with_unknown_start_rule_fails() {
    let grammar = Grammar::from_reader(ALT_GRAMMAR.as_bytes()).unwrap();
    let config = GenerationConfig {
        start_rule: "missing".into(),
        ..GenerationConfig::default()
    };
    assert!(generate_corpus(&grammar, &config).is_err());
}
