// Remapgen CLI
// Compiles annotated remap definitions into RemapClass dispatch headers

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use remapgen_core::{Generator, GeneratorConfig, Source, SymbolMap, UnitConfig, UnitInput};

/// Remap rule compiler
#[derive(Parser, Debug)]
#[command(name = "remapgen")]
#[command(author = "remapgen contributors")]
#[command(version)]
#[command(about = "Compile <autogen> remap annotations into C++ dispatch classes", long_about = None)]
struct Args {
    /// TOML generator configuration
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Symbol table (overrides the config file)
    #[arg(short, long, value_name = "SYMBOLS")]
    symbols: Option<PathBuf>,

    /// Output file when compiling INPUTs directly
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Write the registry manifest here (overrides the config file)
    #[arg(short, long, value_name = "REGISTRY")]
    registry: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and symbol table, then exit
    #[arg(long)]
    check_config: bool,

    /// Annotated sources compiled into a single OUTPUT
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Resolve the run plan from CLI flags and/or the config file
fn load_plan(args: &Args) -> Result<GeneratorConfig> {
    if !args.inputs.is_empty() {
        let symbols = args
            .symbols
            .clone()
            .ok_or_else(|| anyhow!("--symbols is required when INPUT files are given"))?;
        let output = args
            .output
            .clone()
            .ok_or_else(|| anyhow!("--output is required when INPUT files are given"))?;
        let name = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "remapclass".to_string());

        return Ok(GeneratorConfig {
            symbols,
            registry: args.registry.clone(),
            units: vec![UnitConfig {
                name,
                sources: args.inputs.clone(),
                output,
            }],
        });
    }

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => GeneratorConfig::default_path()
            .ok_or_else(|| anyhow!("--config is required (no default config directory)"))?,
    };
    let mut config = GeneratorConfig::from_toml_path(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    if let Some(symbols) = &args.symbols {
        config.symbols = symbols.clone();
    }
    if let Some(registry) = &args.registry {
        config.registry = Some(registry.clone());
    }
    Ok(config)
}

/// (label, text) pairs per unit, in config order
fn read_sources(units: &[UnitConfig]) -> Result<Vec<Vec<(String, String)>>> {
    let mut all = Vec::with_capacity(units.len());
    for unit in units {
        let mut texts = Vec::with_capacity(unit.sources.len());
        for path in &unit.sources {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            texts.push((path.display().to_string(), text));
        }
        all.push(texts);
    }
    Ok(all)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

fn run(args: &Args) -> Result<()> {
    let plan = load_plan(args)?;
    let symbols = SymbolMap::from_toml_path(&plan.symbols)
        .with_context(|| format!("loading symbols {}", plan.symbols.display()))?;
    log::debug!(
        "Loaded {} symbols from {}",
        symbols.len(),
        plan.symbols.display()
    );

    if args.check_config {
        println!(
            "Configuration is valid ({} units, {} symbols)",
            plan.units.len(),
            symbols.len()
        );
        return Ok(());
    }

    let texts = read_sources(&plan.units)?;
    let inputs: Vec<UnitInput<'_>> = plan
        .units
        .iter()
        .zip(&texts)
        .map(|(unit, texts)| UnitInput {
            name: &unit.name,
            sources: texts
                .iter()
                .map(|(name, text)| Source::new(name, text))
                .collect(),
        })
        .collect();

    // Nothing is written unless every unit compiled
    let generation = Generator::new(&symbols).generate_all(&inputs)?;

    for (unit, generated) in plan.units.iter().zip(&generation.units) {
        write_file(&unit.output, &generated.code)?;
        log::info!(
            "Wrote {} ({} rules)",
            unit.output.display(),
            generated.rules.len()
        );
    }

    if let Some(path) = &plan.registry {
        let manifest = generation.registry.to_manifest().to_toml_string()?;
        write_file(path, &manifest)?;
        log::info!(
            "Wrote registry {} ({} entries)",
            path.display(),
            generation.registry.len()
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.inputs.is_empty() && args.output.is_some() {
        log::warn!("--output is ignored without INPUT files");
    }

    run(&args).map_err(|e| {
        log::error!("{:#}", e);
        e
    })
}
