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

use gql_fuzzer::{
    config::GenerationConfig,
    corpus::generate_corpus,
    errors::GqlFuzzerError,
    expanders::ExpanderWrapper,
    generator::RecursionStrategy,
    grammar::Grammar,
};

#[derive(clap::Parser)]
pub(super) struct FuzzerArgs {
    /// Path to an XML file containing the BNF rules for GQL.
    #[arg(long, default_value_t = String::from("./bnf.xml"))]
    bnf: String,

    /// Start rule name.
    #[arg(long, default_value_t = String::from("GQL-program"))]
    start: String,

    /// Number of grammar strings to emit.
    #[arg(long, default_value_t = 1)]
    cnt: usize,

    /// Verbose: print restart diagnostics and grammar bookkeeping.
    #[arg(long = "v", short = 'v', default_value_t = false)]
    verbose: bool,

    /// Seed for the structural random stream.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Active-visit bound per node before the recursion strategy kicks in.
    #[arg(long, default_value_t = 6)]
    max_revisit: u32,

    /// Recovery strategy once the revisit bound is exceeded.
    #[arg(long, value_enum, default_value_t = RecursionStrategy::ShortestPath)]
    strategy: RecursionStrategy,

    /// Alternative-selection policy.
    #[arg(long, value_enum, default_value_t = ExpanderWrapper::MonteCarlo)]
    expander: ExpanderWrapper,

    /// Optionally load the generation parameters from a JSON file instead
    /// of the individual flags above (--bnf still applies).
    #[arg(long)]
    config: Option<String>,

    /// Fan the emissions out across a thread pool, one grammar clone per
    /// worker.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Print the default configuration as JSON and exit.
    #[arg(long, default_value_t = false)]
    default_config: bool,
}

impl FuzzerArgs {
    pub(super) fn entry(&self) -> Result<(), GqlFuzzerError> {
        self.init_logging();

        if self.default_config {
            let config_str = serde_json::to_string_pretty(&GenerationConfig::default())?;
            println!("{}", config_str);
            return Ok(());
        }

        let config = match &self.config {
            Some(file) => {
                log::info!("loading generation config from {}", file);
                GenerationConfig::from_file(file)?
            }
            None => GenerationConfig {
                start_rule: self.start.clone(),
                count: self.cnt,
                max_revisit: self.max_revisit,
                seed: self.seed,
                strategy: self.strategy,
                expander: self.expander,
                parallel: self.parallel,
            },
        };

        let grammar = Grammar::from_path(&self.bnf)?;
        log::info!(
            "loaded grammar {} ({} rules, fingerprint {})",
            self.bnf,
            grammar.rules.len(),
            &grammar.fingerprint()[0..16]
        );

        for s in generate_corpus(&grammar, &config)? {
            println!("{}", s);
        }

        Ok(())
    }

    fn init_logging(&self) {
        let mut builder = env_logger::Builder::from_default_env();
        if self.verbose {
            builder.filter_level(log::LevelFilter::Debug);
        }
        builder.init();
    }
}
