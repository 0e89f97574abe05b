use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use stachematch::classify::{classify_batch, Category};
use stachematch::database::nearest_neighbors;
use stachematch::image::io::{has_image_extension, load_image};
use stachematch::{elastic_search, Database, LoadConfig, Match, OverlapPolicy, SearchConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Stachematch CLI")]
struct Cli {
    /// Log library spans and events at info level.
    #[arg(long, global = true)]
    trace: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a JSON database from a directory of labelled templates.
    Encode {
        /// Template directory; negatives go in its `negatives/` subdirectory.
        dir: PathBuf,
        /// Output JSON file.
        output: PathBuf,
        /// Threshold strictness in [0, 1].
        #[arg(long, default_value_t = 0.2)]
        strictness: f64,
        /// Do not add mirrored templates.
        #[arg(long)]
        no_mirror: bool,
        /// Keep the negative images in the output.
        #[arg(long)]
        negatives: bool,
        /// Prefix prepended to every template tag.
        #[arg(long, default_value = "")]
        tag_prefix: String,
    },
    /// Search one image (JSON config driven).
    Search {
        /// Path to the JSON configuration file.
        #[arg(short, long, value_name = "FILE", default_value = "config.json")]
        config: PathBuf,
        /// Print an example config and exit.
        #[arg(long)]
        print_example: bool,
    },
    /// Classify labelled photos named `X_Y_D.ext` into category directories.
    Sort {
        /// Directory holding the photos and the category subdirectories.
        dir: PathBuf,
        /// JSON database to test.
        database: PathBuf,
    },
    /// Report the closest other template for every template.
    Neighbors {
        /// JSON database.
        database: PathBuf,
        /// Fraction of each template edge that may be trimmed.
        #[arg(long, default_value_t = 0.15)]
        edge_leeway: f64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum OverlapConfig {
    Radius,
    BoxIntersection,
}

impl From<OverlapConfig> for OverlapPolicy {
    fn from(value: OverlapConfig) -> Self {
        match value {
            OverlapConfig::Radius => OverlapPolicy::Radius,
            OverlapConfig::BoxIntersection => OverlapPolicy::BoxIntersection,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SearchJson {
    database_path: String,
    image_path: String,
    output_path: Option<String>,
    sizes: Option<Vec<usize>>,
    overlap: OverlapConfig,
    parallel: bool,
}

impl Default for SearchJson {
    fn default() -> Self {
        Self {
            database_path: String::new(),
            image_path: String::new(),
            output_path: None,
            sizes: None,
            overlap: OverlapConfig::Radius,
            parallel: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct MatchRecord {
    tag: String,
    score: f64,
    center_x: f64,
    center_y: f64,
    width: f64,
    angle_deg: f64,
}

impl From<Match> for MatchRecord {
    fn from(value: Match) -> Self {
        Self {
            tag: value.tag,
            score: value.score,
            center_x: value.center.x,
            center_y: value.center.y,
            width: value.target_width,
            angle_deg: value.angle_deg,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    matches: Vec<MatchRecord>,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() -> CliResult {
    let cli = Cli::parse();

    let mut filter = EnvFilter::from_default_env();
    for directive in log_directives(cli.trace) {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Encode {
            dir,
            output,
            strictness,
            no_mirror,
            negatives,
            tag_prefix,
        } => encode(&dir, &output, strictness, !no_mirror, negatives, &tag_prefix),
        Command::Search {
            config,
            print_example,
        } => {
            if print_example {
                println!("{EXAMPLE_JSON}");
                return Ok(());
            }
            search(&config)
        }
        Command::Sort { dir, database } => sort(&dir, &database),
        Command::Neighbors {
            database,
            edge_leeway,
        } => neighbors(&database, edge_leeway),
    }
}

/// Library warnings, such as skipped photos, are always shown.
fn log_directives(trace: bool) -> [&'static str; 2] {
    let library = if trace { "stachematch=info" } else { "stachematch=warn" };
    [library, "stachematch_cli=info"]
}

fn encode(
    dir: &Path,
    output: &Path,
    strictness: f64,
    mirror: bool,
    keep_negatives: bool,
    tag_prefix: &str,
) -> CliResult {
    let mut db = Database::load_dir(dir, &LoadConfig { strictness, mirror })?;
    if !keep_negatives {
        db.strip_negatives();
    }
    db.prefix_tags(tag_prefix);
    db.save(output)?;
    info!(templates = db.len(), output = %output.display(), "database encoded");
    Ok(())
}

fn search(config_path: &Path) -> CliResult {
    let config_text = fs::read_to_string(config_path)?;
    let config: SearchJson = serde_json::from_str(&config_text)?;
    if config.database_path.is_empty() || config.image_path.is_empty() {
        return Err("database_path and image_path must be set in the config".into());
    }
    if config.sizes.as_ref().is_some_and(|s| s.is_empty() || s.contains(&0)) {
        return Err("sizes must be a non-empty list of positive sizes".into());
    }

    let db = Database::load(&config.database_path)?;
    let image = load_image(&config.image_path)?;
    let search_cfg = SearchConfig {
        overlap: config.overlap.into(),
        parallel: config.parallel,
    };
    let matches = elastic_search(&db, &image, config.sizes.as_deref(), &search_cfg)?;

    let output = Output {
        matches: matches.into_iter().map(MatchRecord::from).collect(),
    };
    let json = serde_json::to_string_pretty(&output)?;
    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Collects photos from `dir` and its category subdirectories, creating the
/// subdirectories that are missing.
fn sort_candidates(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths = Vec::new();
    let category_dirs = Category::ALL.map(|c| dir.join(c.as_str()));
    for sub in std::iter::once(dir.to_path_buf()).chain(category_dirs) {
        if !sub.is_dir() {
            fs::create_dir_all(&sub)?;
            continue;
        }
        for entry in fs::read_dir(&sub)? {
            let path = entry?.path();
            let hidden = path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with('.'));
            if !hidden && path.is_file() && has_image_extension(&path) {
                paths.push(path);
            }
        }
    }
    paths.sort();
    Ok(paths)
}

fn sort(dir: &Path, database: &Path) -> CliResult {
    let db = Database::load(database)?;
    let photos = sort_candidates(dir)?;
    let cfg = SearchConfig::default();

    for (path, category) in classify_batch(&db, &photos, &cfg) {
        let Some(name) = path.file_name() else {
            continue;
        };
        let dest = dir.join(category.as_str()).join(name);
        if dest != path {
            info!(photo = %path.display(), %category, "moving");
            if let Err(err) = fs::rename(&path, &dest) {
                warn!(photo = %path.display(), error = %err, "move failed");
            }
        }
    }
    Ok(())
}

fn neighbors(database: &Path, edge_leeway: f64) -> CliResult {
    if !(0.0..=1.0).contains(&edge_leeway) {
        return Err("edge-leeway must be within [0, 1]".into());
    }
    let db = Database::load(database)?;
    for pair in nearest_neighbors(&db, edge_leeway)? {
        println!("{pair}");
    }
    Ok(())
}
