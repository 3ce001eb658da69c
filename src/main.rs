pub mod types;
pub mod config;
pub mod data;
pub mod region;
pub mod aggregate;
pub mod processing;
pub mod lookup;
pub mod colors;
pub mod view;
pub mod render;

use aggregate::{aggregate_by_province, aggregate_by_region, aggregate_national};
use clap::{Parser, Subcommand};
use region::RegionId;
use render::{JsonRenderer, PngRenderer, Renderer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use view::{MapMode, ViewState};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print national, regional and per-province totals
    Summary {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write the dashboard view as JSON and a PNG map
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, value_enum, default_value_t = MapMode::Region)]
        mode: MapMode,
        /// Highlight a region (west, central, east, unknown)
        #[arg(short, long)]
        region: Option<RegionId>,
        /// Focus a province by code, e.g. 11 or 11.01
        #[arg(short, long)]
        province: Option<String>,
        /// Seed for the dot sampler, overrides the config
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show the province under a coordinate
    Query {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long)]
        lon: f64,
        #[arg(long)]
        lat: f64,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Summary { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;
            let table = aggregate_by_province(&dataset.records);

            let national = aggregate_national(&table);
            println!(
                "{:<24} {:>10} {:>10} {:>7}",
                "", "schools", "internet", "rate"
            );
            print_row("Indonesia", &national);
            for region in RegionId::ALL {
                let totals = aggregate_by_region(&table, region);
                print_row(&format!("  {}", region.label()), &totals.counts);
            }
            for province in table.iter() {
                print_row(&format!("    {} {}", province.code, province.name), &province.counts);
            }
        }
        Commands::Render { config, mode, region, province, seed } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;
            let table = aggregate_by_province(&dataset.records);

            let state = ViewState {
                map_mode: *mode,
                active_region: *region,
                hover_region: None,
                focused_province: province.as_deref().map(|p| aggregate::clean_code(Some(p))),
            };
            let mut rng = processing::make_rng(seed.or(app_config.sampling.seed));
            let view = view::build_view(&app_config.sampling, &table, &dataset.boundaries, &state, &mut rng);

            let out = &app_config.output;
            let mut renderers: Vec<Box<dyn Renderer>> = vec![
                Box::new(JsonRenderer::new(out.dir.join("dashboard.json"))),
                Box::new(PngRenderer::new(out.dir.join("dashboard.png"), out.width, out.height)),
            ];
            for renderer in renderers.iter_mut() {
                renderer.draw(&view)?;
            }

            println!("{}", view.bar_chart.title);
            for bar in &view.bar_chart.bars {
                println!("  {:<16} {}", bar.label, bar.text);
            }
            println!("{} dots drawn", view.dots.len());
        }
        Commands::Query { config, lon, lat } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;
            let table = aggregate_by_province(&dataset.records);
            let index = lookup::BoundaryIndex::new(&dataset.boundaries);

            match index.province_at(*lon, *lat) {
                Some(boundary) => {
                    let summary = view::summarize(&boundary.code, &table);
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                None => println!("No province at ({}, {})", lon, lat),
            }
        }
    }

    Ok(())
}

fn print_row(label: &str, counts: &types::SchoolCounts) {
    println!(
        "{:<24} {:>10} {:>10} {:>6.1}%",
        label,
        view::thousands(counts.total_schools),
        view::thousands(counts.total_schools_with_internet),
        counts.rates().total
    );
}
