#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line structured address search.
//!
//! ```text
//! geosearch search --city Berlin --street "Unter den Linden" --housenumber 77
//! geosearch search --city Springfield --layer city --bbox=-91.5,37,-87.5,42.5
//! geosearch import places.jsonl
//! ```
//!
//! The configuration file is taken from `--config`, then the
//! `GEOSEARCH_CONFIG` environment variable, then `geosearch.toml`.

mod import;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use geosearch_index::PlaceIndex;
use geosearch_query::{BoundingBox, StructuredAddressRequest};
use geosearch_search::config::{config_path_from_env, load_config};
use geosearch_search_models::{BackendConfig, SearchConfig};

#[derive(Parser)]
#[command(name = "geosearch", about = "Structured address search")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for an address and print the results as JSON
    Search(SearchArgs),
    /// Import places from a JSON-lines file into the local index
    Import {
        /// File with one place record per line
        file: PathBuf,
        /// Index directory (defaults to the configured tantivy index)
        #[arg(long)]
        index_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Result language (defaults to the configured language)
    #[arg(long)]
    language: Option<String>,
    /// ISO 3166-1 alpha-2 country code
    #[arg(long)]
    country: Option<String>,
    /// State or region
    #[arg(long)]
    state: Option<String>,
    /// County
    #[arg(long)]
    county: Option<String>,
    /// City
    #[arg(long)]
    city: Option<String>,
    /// Postal code
    #[arg(long)]
    postcode: Option<String>,
    /// District or suburb
    #[arg(long)]
    district: Option<String>,
    /// Street
    #[arg(long)]
    street: Option<String>,
    /// House number
    #[arg(long)]
    housenumber: Option<String>,
    /// Only return places of this type (house, street, city, ...); repeatable
    #[arg(long = "layer")]
    layers: Vec<String>,
    /// Only return places inside `minLon,minLat,maxLon,maxLat`
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    bbox: Option<BoundingBox>,
    /// Maximum number of results (1-50)
    #[arg(long, default_value = "15")]
    limit: usize,
}

impl SearchArgs {
    fn into_request(self, config: &SearchConfig) -> StructuredAddressRequest {
        let language = self
            .language
            .unwrap_or_else(|| config.default_language.clone());

        let mut request = StructuredAddressRequest::new(language)
            .with_supported_languages(config.languages.iter().cloned())
            .with_limit(self.limit);
        request.country_code = self.country;
        request.state = self.state;
        request.county = self.county;
        request.city = self.city;
        request.postal_code = self.postcode;
        request.district = self.district;
        request.street = self.street;
        request.house_number = self.housenumber;
        request.layers = self.layers;
        request.bbox = self.bbox;
        request
    }
}

fn parse_bbox(value: &str) -> Result<BoundingBox, String> {
    let coords = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Invalid coordinate: {e}"))?;

    match coords[..] {
        [min_lon, min_lat, max_lon, max_lat] => {
            if !(-180.0..=180.0).contains(&min_lon)
                || !(-180.0..=180.0).contains(&max_lon)
                || !(-90.0..=90.0).contains(&min_lat)
                || !(-90.0..=90.0).contains(&max_lat)
            {
                return Err("Coordinates out of range".to_string());
            }
            Ok(BoundingBox::new(min_lon, min_lat, max_lon, max_lat))
        }
        _ => Err(format!(
            "Expected 4 comma-separated numbers, got {}",
            coords.len()
        )),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config_path_from_env);
    let config = load_config(&config_path)?;

    match cli.command {
        Commands::Search(args) => {
            let handler = geosearch_search::create_handler(&config)?;
            let request = args.into_request(&config);
            let results = handler.search(&request).await?;

            log::info!("{} result(s)", results.len());
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Import { file, index_dir } => {
            import_places(&config, &file, index_dir).await?;
        }
    }

    Ok(())
}


async fn import_places(
    config: &SearchConfig,
    file: &Path,
    index_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (configured_dir, writer_heap_bytes) = match &config.backend {
        BackendConfig::Tantivy {
            index_dir,
            writer_heap_bytes,
        } => (Some(PathBuf::from(index_dir)), *writer_heap_bytes),
        BackendConfig::OpenSearch { .. } => {
            (None, geosearch_search_models::default_writer_heap())
        }
    };

    let index_dir = index_dir
        .or(configured_dir)
        .ok_or("No index directory: pass --index-dir or configure a tantivy backend")?;

    log::info!("Reading places from {}", file.display());
    let places = import::read_places(BufReader::new(File::open(file)?))?;

    let languages = config.languages.clone();
    let count = tokio::task::spawn_blocking(move || {
        let index = PlaceIndex::open_or_create(&index_dir, &languages)?;
        let count = index.add_places(&places, writer_heap_bytes)?;
        log::info!("Index now holds {} places", index.num_docs());
        Ok::<_, geosearch_index::IndexError>(count)
    })
    .await??;

    println!("Imported {count} places");

    Ok(())
}
