//! CLI: native AST ⇄ normalized UAST, plus a round-trip check.
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use tracing::{debug, info};

use uast_normalizer::path_de::from_str_with_path;
use uast_normalizer::{python, Node, Options, Transforms};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// convert between the Python driver's native AST and the normalized UAST
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// native AST → normalized UAST
    Normalize(NormalizeOut),
    /// normalized UAST → native AST
    Denormalize(DenormalizeOut),
    /// normalize, denormalize and compare against the input
    Roundtrip(RoundTripOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /response/ast)
    #[arg(long)]
    json_pointer: Option<String>,

    /// engine options file (JSON: `max_depth`, `dedup_roles`)
    #[arg(long)]
    config: Option<PathBuf>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct NormalizeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// read source text from a sibling file with this extension (e.g. `py`)
    /// and run the code transformers
    #[arg(long)]
    code_ext: Option<String>,

    /// output .json file, or a directory when there are several inputs
    /// (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct DenormalizeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file, or a directory when there are several inputs
    /// (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct RoundTripOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// read source text from a sibling file with this extension
    #[arg(long)]
    code_ext: Option<String>,

    /// also print the normalized tree of every failing document
    #[arg(long)]
    show_norm: bool,
}

/// One parsed input document.
#[derive(Debug)]
struct Document {
    source_path: PathBuf,
    /// position within an NDJSON file
    line: Option<usize>,
    node: Node,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Normalize(target) => {
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let transforms = target.input_settings.transforms()?;
                let documents = target.input_settings.load()?;
                let results = documents
                    .par_iter()
                    .map(|doc| {
                        let code = read_code(&doc.source_path, target.code_ext.as_deref())?;
                        transforms
                            .normalize(doc.node.clone(), code.as_deref())
                            .with_context(|| format!("failed to normalize {}", doc.label()))
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                write_outputs(&documents, &results, target.out.as_deref(), "uast")
            }
            Command::Denormalize(target) => {
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let transforms = target.input_settings.transforms()?;
                let documents = target.input_settings.load()?;
                let results = documents
                    .par_iter()
                    .map(|doc| {
                        transforms
                            .denormalize(doc.node.clone())
                            .with_context(|| format!("failed to denormalize {}", doc.label()))
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                write_outputs(&documents, &results, target.out.as_deref(), "native")
            }
            Command::Roundtrip(target) => {
                let transforms = target.input_settings.transforms()?;
                let documents = target.input_settings.load()?;
                let failures = documents
                    .par_iter()
                    .map(|doc| round_trip_one(&transforms, doc, target))
                    .filter(|ok| !ok)
                    .count();
                let total = documents.len();
                if failures > 0 {
                    bail!("{failures} of {total} documents did not round trip");
                }
                eprintln!("{} {total} documents round trip", "ok".green().bold());
                Ok(())
            }
        }
    }
}

impl InputSettings {
    fn transforms(&self) -> anyhow::Result<Transforms> {
        let mut transforms = python::transforms().context("invalid built-in rule set")?;
        if let Some(path) = self.config.as_ref() {
            let options = Options::load(path)?;
            debug!(?options, "loaded engine options");
            transforms.set_options(options);
        }
        Ok(transforms)
    }

    fn load(&self) -> anyhow::Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        info!(files = source_paths.len(), "loading inputs");
        let mut documents = Vec::new();
        for source_path in source_paths {
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {}", source_path.display()))?;
            if self.ndjson {
                for (ix, line) in source.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
                    let value = from_str_with_path::<serde_json::Value>(line).with_context(|| {
                        format!("failed to parse JSON ({}:{})", source_path.display(), ix + 1)
                    })?;
                    documents.push(Document {
                        source_path: source_path.clone(),
                        line: Some(ix + 1),
                        node: self.select(value, &source_path)?,
                    });
                }
            } else {
                let value = from_str_with_path::<serde_json::Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({})", source_path.display()))?;
                let node = self.select(value, &source_path)?;
                documents.push(Document { source_path, line: None, node });
            }
        }
        Ok(documents)
    }

    fn select(&self, value: serde_json::Value, source_path: &Path) -> anyhow::Result<Node> {
        match self.json_pointer.as_deref() {
            None => Ok(Node::from(value)),
            Some(pointer) => match value.pointer(pointer) {
                Some(sub) => Ok(Node::from(sub.clone())),
                None => bail!("JSON pointer {pointer} not found in {}", source_path.display()),
            },
        }
    }
}

impl Document {
    fn label(&self) -> String {
        match self.line {
            Some(line) => format!("{}:{line}", self.source_path.display()),
            None => self.source_path.display().to_string(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_code(source_path: &Path, code_ext: Option<&str>) -> anyhow::Result<Option<String>> {
    let Some(ext) = code_ext else {
        return Ok(None);
    };
    let code_path = source_path.with_extension(ext);
    if !code_path.exists() {
        debug!(path = %code_path.display(), "no source text next to input");
        return Ok(None);
    }
    let code = std::fs::read_to_string(&code_path)
        .with_context(|| format!("failed to read source text {}", code_path.display()))?;
    Ok(Some(code))
}

fn round_trip_one(transforms: &Transforms, doc: &Document, target: &RoundTripOut) -> bool {
    let code = match read_code(&doc.source_path, target.code_ext.as_deref()) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {}: {error:#}", "✗".red(), doc.label());
            return false;
        }
    };
    match transforms.round_trip(doc.node.clone(), code.as_deref()) {
        Ok((_, back)) if back == doc.node => {
            eprintln!("{} {}", "✓".green(), doc.label());
            true
        }
        Ok((norm, back)) => {
            let at = first_difference(&doc.node, &back, String::new()).unwrap_or_default();
            eprintln!("{} {}: mismatch at {}", "✗".red(), doc.label(), at.yellow());
            if target.show_norm {
                eprintln!("{}", to_pretty(&norm));
            }
            false
        }
        Err(error) => {
            eprintln!("{} {}: {error}", "✗".red(), doc.label());
            false
        }
    }
}

/// JSON pointer of the first place two trees disagree.
fn first_difference(a: &Node, b: &Node, path: String) -> Option<String> {
    match (a, b) {
        (Node::Object(x), Node::Object(y)) => {
            for (k, v) in x {
                let here = format!("{path}/{k}");
                match y.get(k) {
                    Some(w) => {
                        if let Some(found) = first_difference(v, w, here) {
                            return Some(found);
                        }
                    }
                    None => return Some(here),
                }
            }
            y.keys().find(|k| !x.contains_key(*k)).map(|k| format!("{path}/{k}"))
        }
        (Node::Sequence(xs), Node::Sequence(ys)) => {
            for (ix, (v, w)) in xs.iter().zip(ys).enumerate() {
                if let Some(found) = first_difference(v, w, format!("{path}/{ix}")) {
                    return Some(found);
                }
            }
            (xs.len() != ys.len()).then(|| format!("{path}/{}", xs.len().min(ys.len())))
        }
        _ if a == b => None,
        _ => Some(if path.is_empty() { "/".to_string() } else { path }),
    }
}

fn to_pretty(node: &Node) -> String {
    serde_json::to_string_pretty(&serde_json::Value::from(node)).unwrap_or_default()
}

fn write_outputs(documents: &[Document], results: &[Node], out: Option<&Path>, suffix: &str) -> anyhow::Result<()> {
    let Some(out) = out else {
        for node in results {
            println!("{}", to_pretty(node));
        }
        return Ok(());
    };
    if results.len() == 1 {
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out, to_pretty(&results[0]))
            .with_context(|| format!("failed to write {}", out.display()))?;
        return Ok(());
    }
    std::fs::create_dir_all(out)?;
    for (doc, node) in documents.iter().zip(results) {
        let stem = doc.source_path.file_stem().unwrap_or_default().to_string_lossy();
        let name = match doc.line {
            Some(line) => format!("{stem}.{line}.{suffix}.json"),
            None => format!("{stem}.{suffix}.json"),
        };
        let path = out.join(name);
        std::fs::write(&path, to_pretty(node))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    info!(files = results.len(), dir = %out.display(), "outputs written");
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
