//! Fixture runner: every `*.native.json` under the fixture directory must
//! round trip, and must normalize to its sibling `*.uast.json` when one
//! exists. `--bless` (re)writes those goldens.
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use regex::Regex;
use tracing_subscriber::EnvFilter;

use uast_normalizer::path_de::from_str_with_path;
use uast_normalizer::{python, Node, Transforms};

const NATIVE_SUFFIX: &str = ".native.json";
const UAST_SUFFIX: &str = ".uast.json";

#[derive(Parser, Debug)]
struct Settings {
    /// fixture root
    #[arg(long, default_value = "fixtures")]
    dir: PathBuf,

    /// only run fixtures whose path matches this regex
    #[arg(long)]
    filter: Option<String>,

    /// write normalized output as the expected golden
    #[arg(long)]
    bless: bool,
}

#[derive(Debug)]
enum Outcome {
    Passed,
    Blessed,
    Failed(String),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_env("UAST_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let settings = Settings::parse();
    let filter = settings.filter.as_deref().map(Regex::new).transpose()?;
    let transforms = python::transforms()?;

    let pattern = format!("{}/**/*{NATIVE_SUFFIX}", settings.dir.display());
    let mut fixtures = glob::glob(&pattern)?.collect::<Result<Vec<_>, _>>()?;
    fixtures.retain(|p| filter.as_ref().is_none_or(|re| re.is_match(&p.to_string_lossy())));
    fixtures.sort();

    let mut failed = 0;
    for path in &fixtures {
        let label = path.display().to_string();
        match run_fixture(&transforms, path, settings.bless) {
            Ok(Outcome::Passed) => eprintln!("{} {label}", "pass".green()),
            Ok(Outcome::Blessed) => eprintln!("{} {label}", "bless".cyan()),
            Ok(Outcome::Failed(why)) => {
                failed += 1;
                eprintln!("{} {label}: {why}", "FAIL".red().bold());
            }
            Err(error) => {
                failed += 1;
                eprintln!("{} {label}: {error:#}", "FAIL".red().bold());
            }
        }
    }

    eprintln!("{} fixtures, {} failed", fixtures.len(), failed);
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_fixture(transforms: &Transforms, path: &Path, bless: bool) -> anyhow::Result<Outcome> {
    let native: Node = read_node(path)?;
    let code = read_code(path)?;
    let (norm, back) = transforms.round_trip(native.clone(), code.as_deref())?;
    if back != native {
        return Ok(Outcome::Failed("denormalized tree differs from the input".to_string()));
    }

    let golden = sibling(path, UAST_SUFFIX);
    if bless {
        let pretty = serde_json::to_string_pretty(&serde_json::Value::from(&norm))?;
        std::fs::write(&golden, pretty + "\n")
            .with_context(|| format!("failed to write {}", golden.display()))?;
        return Ok(Outcome::Blessed);
    }
    if golden.exists() {
        let expected: Node = read_node(&golden)?;
        if expected != norm {
            return Ok(Outcome::Failed(format!("normalized tree differs from {}", golden.display())));
        }
    }
    Ok(Outcome::Passed)
}

fn read_node(path: &Path) -> anyhow::Result<Node> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = from_str_with_path(&source)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Node::from(value))
}

/// `foo.native.json` → `foo.py`, when present.
fn read_code(path: &Path) -> anyhow::Result<Option<String>> {
    let code_path = sibling(path, ".py");
    if !code_path.exists() {
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(&code_path)?))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    let stem = name.strip_suffix(NATIVE_SUFFIX).unwrap_or(&name);
    path.with_file_name(format!("{stem}{suffix}"))
}
