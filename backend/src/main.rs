//! AIM CLI - FAST UI input to actuarial calculator input
//!
//! # Main Commands
//!
//! ```bash
//! aim process input.json --product life --level full   # Full pipeline
//! aim init-config                                      # Write default config files
//! aim check-config                                     # Report configuration coverage
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! aim parse input.json                     # Canonical field map + statistics
//! aim validate input.json -p life -l strict
//! aim map input.json -p life               # Mapped document + match report
//! aim mapping-summary -p life
//! aim export-mapping -p life --targets fields.txt -o mapping.csv
//! ```

use clap::{Parser, Subcommand};
use aim::config::DEFAULT_CONFIG_DIR;
use aim::logs::LOG_BROADCASTER;
use aim::{
    parse, parsing_statistics, read_input_file, ConfigStore, CsvMappingExporter, ExportSource,
    FieldMapper, JsonSubmissionStore, MappingExporter, Pipeline, SubmissionOutcome, SubmissionStore,
    Transformer, ValidationLevel, Validator,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "aim")]
#[command(about = "Transform FAST UI insurance input into actuarial calculator input", long_about = None)]
struct Cli {
    /// Directory holding the four configuration files
    #[arg(long, global = true, env = "AIM_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Silence progress logs on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: parse, validate, map, transform, assemble
    Process {
        /// Input JSON file
        input: PathBuf,

        /// Product type (life, annuity, health)
        #[arg(short, long)]
        product: String,

        /// Validation level: basic, full or strict
        #[arg(short, long, default_value = "full")]
        level: ValidationLevel,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep successful raw inputs in this submission directory
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Parse an input file into the canonical field map
    Parse {
        /// Input JSON file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate an input file
    Validate {
        /// Input JSON file
        input: PathBuf,

        #[arg(short, long)]
        product: String,

        #[arg(short, long, default_value = "full")]
        level: ValidationLevel,
    },

    /// Map and transform an input file, with the match report
    Map {
        /// Input JSON file
        input: PathBuf,

        #[arg(short, long)]
        product: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List supported products
    Products,

    /// Check configuration coverage
    CheckConfig,

    /// Write missing default configuration files
    InitConfig,

    /// Show a product's mapping rules
    MappingSummary {
        #[arg(short, long)]
        product: String,
    },

    /// Export a calculator-field comparison as CSV
    ExportMapping {
        #[arg(short, long)]
        product: String,

        /// Target field file (one per line) or comma-separated list
        #[arg(short, long)]
        targets: String,

        /// Compare against a mapped input instead of the configured rules
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// CSV output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.quiet {
        LOG_BROADCASTER.set_echo(false);
    }
    let config_dir = cli.config_dir;

    let result = match cli.command {
        Commands::InitConfig => cmd_init_config(&config_dir),
        command => load_config(&config_dir).and_then(|config| run(&config, command)),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &ConfigStore, command: Commands) -> CliResult {
    match command {
        Commands::Process {
            input,
            product,
            level,
            output,
            store,
        } => cmd_process(config, &input, &product, level, output.as_deref(), store.as_deref()),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Validate { input, product, level } => cmd_validate(config, &input, &product, level),

        Commands::Map { input, product, output } => cmd_map(config, &input, &product, output.as_deref()),

        Commands::Products => cmd_products(config),

        Commands::CheckConfig => cmd_check_config(config),

        Commands::MappingSummary { product } => cmd_mapping_summary(config, &product),

        Commands::ExportMapping {
            product,
            targets,
            input,
            output,
        } => cmd_export_mapping(config, &product, &targets, input.as_deref(), &output),

        Commands::InitConfig => cmd_init_config(config.config_dir().unwrap_or(Path::new(DEFAULT_CONFIG_DIR))),
    }
}

/// Load the config directory, or the built-in defaults when it does not exist.
fn load_config(dir: &Path) -> Result<ConfigStore, Box<dyn std::error::Error>> {
    if dir.is_dir() {
        Ok(ConfigStore::load(dir)?)
    } else {
        eprintln!(
            "⚠️  Config directory {} not found, using built-in defaults (run 'aim init-config' to persist them)",
            dir.display()
        );
        Ok(ConfigStore::defaults())
    }
}

fn cmd_init_config(dir: &Path) -> CliResult {
    let created = ConfigStore::ensure_defaults(dir)?;
    if created.is_empty() {
        eprintln!("✅ All configuration files already present in {}", dir.display());
    } else {
        for path in &created {
            eprintln!("📝 Created {}", path.display());
        }
    }
    Ok(())
}

fn cmd_process(
    config: &ConfigStore,
    input: &Path,
    product: &str,
    level: ValidationLevel,
    output: Option<&Path>,
    store_dir: Option<&Path>,
) -> CliResult {
    eprintln!("📄 Processing: {}", input.display());

    let raw = read_input_file(input)?;
    let envelope = Pipeline::new(config).process(&raw, product, level);

    if envelope.is_success() {
        if let Some(dir) = store_dir {
            let mut store = JsonSubmissionStore::with_dir(dir);
            match store.submit(&raw, product) {
                SubmissionOutcome::Stored(hash) => eprintln!("💾 Stored submission {}", hash),
                SubmissionOutcome::Duplicate(hash) => eprintln!("⚠️  Duplicate submission {}", hash),
                SubmissionOutcome::Error(e) => eprintln!("❌ Could not store submission: {}", e),
            }
        }
    }

    write_output(&serde_json::to_string_pretty(&envelope)?, output)?;

    match envelope.error_message() {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Parsing: {}", input.display());

    let raw = read_input_file(input)?;
    let canonical = parse(&raw)?;
    let statistics = parsing_statistics(&raw, &canonical);
    eprintln!("✅ Parsed {} fields", canonical.len());

    let json = serde_json::to_string_pretty(&json!({
        "fields": canonical,
        "statistics": statistics,
    }))?;
    write_output(&json, output)
}

fn cmd_validate(config: &ConfigStore, input: &Path, product: &str, level: ValidationLevel) -> CliResult {
    eprintln!("✔️  Validating: {}", input.display());

    let canonical = parse(&read_input_file(input)?)?;
    let result = Validator::new(config).validate(&canonical, product, level);

    for error in &result.errors {
        eprintln!("   ❌ {}", error);
    }
    for warning in &result.warnings {
        eprintln!("   ⚠️  {}", warning);
    }
    eprintln!(
        "\n📊 Results: {} errors, {} warnings",
        result.errors.len(),
        result.warnings.len()
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_valid {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_map(config: &ConfigStore, input: &Path, product: &str, output: Option<&Path>) -> CliResult {
    eprintln!("🗺️  Mapping: {}", input.display());

    let canonical = parse(&read_input_file(input)?)?;
    let mut report = FieldMapper::new(config).map_fields_detailed(&canonical, product)?;
    Transformer::new(config).apply_transformations(&mut report.document, product);

    for m in &report.matches {
        eprintln!(
            "   {} → {} ({:?}, {}%)",
            m.source_field, m.target_field, m.method, m.confidence
        );
    }

    write_output(&serde_json::to_string_pretty(&report)?, output)
}

fn cmd_products(config: &ConfigStore) -> CliResult {
    for product in config.get_supported_products() {
        println!("{}", product);
    }
    Ok(())
}

fn cmd_check_config(config: &ConfigStore) -> CliResult {
    let report = config.validate_configuration();
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_valid {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_mapping_summary(config: &ConfigStore, product: &str) -> CliResult {
    let summary = config.get_mapping_summary(product)?;
    eprintln!(
        "📋 {}: {} mappings ({} simple, {} complex)",
        summary.product_type, summary.total_mappings, summary.simple_mappings, summary.complex_mappings
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_export_mapping(
    config: &ConfigStore,
    product: &str,
    targets: &str,
    input: Option<&Path>,
    output: &Path,
) -> CliResult {
    let targets = read_targets(targets)?;
    let exporter = CsvMappingExporter;

    let report = match input {
        Some(path) => {
            let canonical = parse(&read_input_file(path)?)?;
            let mut document = FieldMapper::new(config).map_fields(&canonical, product)?;
            Transformer::new(config).apply_transformations(&mut document, product);
            exporter.export_to_path(ExportSource::Document(&document), &targets, output)?
        }
        None => {
            let summary = config.get_mapping_summary(product)?;
            exporter.export_to_path(ExportSource::Summary(&summary), &targets, output)?
        }
    };

    eprintln!(
        "📊 {} mapped, {} missing, {} unmapped source fields",
        report.mapped, report.missing, report.unmapped_source
    );
    Ok(())
}

/// Target fields from a file (one per line) or a comma-separated list.
fn read_targets(spec: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let path = Path::new(spec);
    let content = if path.is_file() {
        fs::read_to_string(path)?
    } else {
        spec.to_string()
    };

    Ok(content
        .split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
