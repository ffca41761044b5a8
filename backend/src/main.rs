//! Immo CLI - French real-estate dashboard data
//!
//! # Main Commands
//!
//! ```bash
//! immo serve                          # Start HTTP server (port 3000)
//! immo render --region Bretagne       # Compute every dashboard view as JSON
//! immo selectors                      # Choice lists for the three selectors
//! ```
//!
//! # Reference Commands
//!
//! ```bash
//! immo columns                        # Headers of both source files
//! immo departments --code 2A          # Department lookup / statistics
//! immo regions                        # Region list
//! immo map --check-geometry           # Choropleth values
//! ```

use clap::{Parser, Subcommand};
use immo::api::logs::log_error;
use immo::catalog::DepartmentCatalog;
use immo::geo::{feature_codes, missing_geometry, BoundaryClient};
use immo::models::MERGED_COLUMNS;
use immo::transform::pipeline::load;
use immo::{load_departments, render, selector_options, DashboardConfig, Selectors, ViewOptions};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "immo")]
#[command(about = "Statistics behind the French real-estate transaction dashboard", long_about = None)]
struct Cli {
    /// Department reference CSV (overrides IMMO_DEPARTMENTS_PATH)
    #[arg(long, global = true)]
    departments: Option<PathBuf>,

    /// DVF transactions file (overrides IMMO_TRANSACTIONS_PATH)
    #[arg(long, global = true)]
    transactions: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and output every view as JSON
    Render {
        /// Region name ("Toutes" or omitted: all regions)
        #[arg(long)]
        region: Option<String>,

        /// Department name ("Tous" or omitted: all departments)
        #[arg(long)]
        department: Option<String>,

        /// Property type ("Tous" or omitted: all types)
        #[arg(long)]
        property_type: Option<String>,

        /// Number of preview rows (default: IMMO_PREVIEW_ROWS or 10)
        #[arg(long)]
        preview_rows: Option<usize>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the choice lists for the region, department and type selectors
    Selectors,

    /// Show the columns of both source files
    Columns,

    /// Department reference statistics, or a lookup by code or name
    Departments {
        /// Department code (e.g. 29, 2A)
        #[arg(long, conflicts_with = "name")]
        code: Option<String>,

        /// Department name, exact match
        #[arg(long)]
        name: Option<String>,
    },

    /// List regions
    Regions,

    /// Mean transaction value per department, for the choropleth
    Map {
        /// Region filter
        #[arg(long)]
        region: Option<String>,

        /// Property type filter
        #[arg(long)]
        property_type: Option<String>,

        /// Fetch the boundary GeoJSON and report departments without geometry
        #[arg(long)]
        check_geometry: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: IMMO_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match DashboardConfig::from_env() {
        Ok(config) => config.with_paths(cli.departments, cli.transactions),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Render {
            region,
            department,
            property_type,
            preview_rows,
            output,
        } => {
            let selectors = Selectors::from_choices(region.as_deref(), department.as_deref(), property_type.as_deref());
            let options = ViewOptions {
                preview_rows: preview_rows.unwrap_or(config.preview_rows),
            };
            cmd_render(&config, &selectors, &options, output.as_deref())
        }

        Commands::Selectors => cmd_selectors(&config),

        Commands::Columns => cmd_columns(&config),

        Commands::Departments { code, name } => cmd_departments(&config, code.as_deref(), name.as_deref()),

        Commands::Regions => cmd_regions(&config),

        Commands::Map {
            region,
            property_type,
            check_geometry,
        } => {
            let selectors = Selectors::from_choices(region.as_deref(), None, property_type.as_deref());
            cmd_map(&config, &selectors, check_geometry).await
        }

        Commands::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.port = port;
            }
            immo::server::start_server(config).await
        }
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

fn cmd_render(
    config: &DashboardConfig,
    selectors: &Selectors,
    options: &ViewOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = render(&config.sources(), selectors, options)?;

    eprintln!("   Transactions: {}", bundle.scalars.row_count);
    if let Some(mean) = bundle.scalars.mean_value {
        eprintln!("   Mean value: {:.2}", mean);
    }
    for warning in &bundle.warnings {
        eprintln!("   ⚠️  {}", warning);
    }

    let json = serde_json::to_string_pretty(&bundle)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_selectors(config: &DashboardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let options = selector_options(&config.sources())?;
    println!("{}", serde_json::to_string_pretty(&options)?);
    Ok(())
}

fn cmd_columns(config: &DashboardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load(&config.sources())?;

    for info in loaded.sources() {
        eprintln!(
            "📄 {} ({}, '{}', {} rows)",
            info.path.display(),
            info.encoding,
            info.delimiter,
            info.row_count
        );
    }

    let department_headers = match &loaded.departments {
        Ok(table) => table.info.headers.clone(),
        Err(e) => {
            eprintln!("⚠️  {}", e);
            Vec::new()
        }
    };

    let body = json!({
        "departments": department_headers,
        "transactions": loaded.transactions.info.headers,
        "merged": MERGED_COLUMNS,
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn cmd_departments(
    config: &DashboardConfig,
    code: Option<&str>,
    name: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = load_departments(&config.departments_path)?;
    let catalog = DepartmentCatalog::new(&table.rows);

    let json = match (code, name) {
        (Some(code), _) => {
            let matches = catalog.find_by_code(code);
            if matches.is_empty() {
                eprintln!("No department with code '{}'", code);
            }
            serde_json::to_string_pretty(&matches)?
        }
        (None, Some(name)) => {
            let matches = catalog.find_by_name(name);
            if matches.is_empty() {
                eprintln!("No department named '{}'", name);
            }
            serde_json::to_string_pretty(&matches)?
        }
        (None, None) => {
            let summary = catalog.summary();
            eprintln!(
                "📋 {} departments in {} regions",
                summary.total_departments, summary.total_regions
            );
            serde_json::to_string_pretty(&summary)?
        }
    };

    println!("{}", json);
    Ok(())
}

fn cmd_regions(config: &DashboardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let table = load_departments(&config.departments_path)?;
    let catalog = DepartmentCatalog::new(&table.rows);
    println!("{}", serde_json::to_string_pretty(&catalog.regions())?);
    Ok(())
}

async fn cmd_map(
    config: &DashboardConfig,
    selectors: &Selectors,
    check_geometry: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = render(&config.sources(), selectors, &config.view_options())?;

    if check_geometry {
        let client = BoundaryClient::new(config.geojson_url.clone());
        // Geometry problems never fail the command.
        match client.fetch().await.and_then(|geojson| feature_codes(&geojson)) {
            Ok(codes) => {
                let missing = missing_geometry(&bundle.choropleth, &codes);
                if missing.is_empty() {
                    eprintln!("🗺️  Every department has geometry ({} features)", codes.len());
                } else {
                    eprintln!("⚠️  No geometry for: {}", missing.join(", "));
                }
            }
            Err(e) => eprintln!("⚠️  Map geometry unavailable: {}", e),
        }
    }

    println!("{}", serde_json::to_string_pretty(&bundle.choropleth)?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Saved to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
