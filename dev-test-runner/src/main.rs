//! Runs the derivation engine over JSON fixtures and checks the outcome.
//!
//! A fixture holds a schema definition, optional derive options, and either
//! the operations it must produce or the error messages it must be rejected
//! with.
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use colored::Colorize;
use serde::Deserialize;
use variant_derive::{DeriveOptions, Engine, SchemaDef};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// run every fixture matching the given paths or glob patterns
#[derive(Parser, Debug)]
struct CommandLineInterface {
    /// fixture files; literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., default_value = "dev-test-runner/fixtures/*.json")]
    input: Vec<String>,

    /// print each derivation as JSON
    #[arg(long)]
    dump: bool,

    /// debug-level engine logs on stderr
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    options: DeriveOptions,
    schema: SchemaDef,
    /// operation names that must be derived
    #[serde(default)]
    expect_operations: Vec<String>,
    /// substrings that must each appear in some reported error
    #[serde(default)]
    expect_errors: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Fixture {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        variant_derive::path_de::from_str_with_path(&source)
            .with_context(|| format!("failed to parse fixture {}", path.display()))
    }

    /// Problems found, empty when the fixture passes.
    fn check(&self, dump: bool) -> anyhow::Result<Vec<String>> {
        let mut problems = Vec::new();
        match Engine::new(self.options.clone()).derive(&self.schema) {
            Ok(derivation) => {
                if dump {
                    println!("{}", serde_json::to_string_pretty(&derivation)?);
                }
                if !self.expect_errors.is_empty() {
                    problems.push("derivation succeeded but errors were expected".to_string());
                }
                let derived: Vec<String> = derivation.operations().map(|op| op.kind.to_string()).collect();
                for expected in &self.expect_operations {
                    if !derived.contains(expected) {
                        problems.push(format!("missing operation `{expected}`"));
                    }
                }
            }
            Err(error) => {
                let messages = error.messages();
                if self.expect_errors.is_empty() {
                    problems.extend(messages.into_iter().map(|m| format!("unexpected error: {m}")));
                } else {
                    for expected in &self.expect_errors {
                        if !messages.iter().any(|m| m.contains(expected.as_str())) {
                            problems.push(format!("no error mentions `{expected}`"));
                        }
                    }
                }
            }
        }
        Ok(problems)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = CommandLineInterface::parse();
    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let paths = resolve_file_path_patterns(&cli.input)?;
    let mut failed = 0usize;
    for path in &paths {
        let problems = Fixture::load(path)?.check(cli.dump)?;
        if problems.is_empty() {
            println!("✅ {}", path.display().to_string().green());
        } else {
            failed += 1;
            println!("❌ {}", path.display().to_string().red());
            for problem in problems {
                println!("   {}", problem.yellow());
            }
        }
    }

    println!("{} fixture(s), {} failed", paths.len(), failed);
    if failed > 0 {
        bail!("{failed} fixture(s) failed");
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for pattern in patterns {
        if has_glob_chars(pattern) {
            let before = out.len();
            for entry in glob::glob(pattern)? {
                out.push(entry?);
            }
            if out.len() == before {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }
    Ok(out)
}
