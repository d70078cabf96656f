use std::path::{Path, PathBuf};
use std::{env, io::IsTerminal};

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use tracing::{Level, debug, info};

use c816_core::{AssembleOptions, RenderOptions};
use c816_link::{OutputFormat, OutputOptions, ProjectConfig};

/// Looked up next to the input when no `--config` is given.
const ADJACENT_CONFIG: &str = "c816.ron";

#[derive(Debug, Parser)]
#[command(
    name = "c816",
    version,
    about = "Cross assembler for the WDC 65C816",
    long_about = None,
    after_help = "Examples:\n  c816 game.s\n  c816 game.s -f ihex --ihex-strip -u 0xFF\n  c816 game.s -o rom.bin -l -I include"
)]
struct Cli {
    /// Input source file.
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    /// Output file; defaults to the input with a .bin or .hex extension.
    #[arg(short = 'o', long = "output", value_name = "OUTPUT")]
    output: Option<PathBuf>,
    /// Output file format.
    #[arg(short = 'f', long = "format", value_enum)]
    format: Option<FormatArg>,
    /// Write a listing next to the output file.
    #[arg(short = 'l', long = "listing")]
    listing: bool,
    /// Value filling unused areas of the image (0 to 255, 0x, 0o and 0b prefixes allowed).
    #[arg(short = 'u', long = "unused", value_name = "BYTE", value_parser = parse_byte)]
    unused: Option<u8>,
    /// Add a directory to the include search path.
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,
    /// Leave out Intel HEX records that only hold the unused value.
    #[arg(long = "ihex-strip")]
    ihex_strip: bool,
    /// Project config file in RON format.
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Mem,
    Ihex,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Mem => Self::Memory,
            FormatArg::Ihex => Self::IntelHex,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(stderr_supports_color())
        .with_target(false)
        .init();
}

fn parse_byte(text: &str) -> Result<u8, String> {
    let lower = text.trim().to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(octal) = lower.strip_prefix("0o") {
        (octal, 8)
    } else if let Some(binary) = lower.strip_prefix("0b") {
        (binary, 2)
    } else {
        (lower.as_str(), 10)
    };
    let value = u32::from_str_radix(digits, radix).map_err(|err| format!("invalid number '{text}': {err}"))?;
    u8::try_from(value).map_err(|_| format!("value must be 0 to 255 (0xFF), got {text}"))
}

fn stderr_supports_color() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if let Some(force) = env::var_os("CLICOLOR_FORCE") {
        return force != "0";
    }

    if let Some(choice) = env::var_os("CLICOLOR") {
        if choice == "0" {
            return false;
        }
    }

    std::io::stderr().is_terminal()
}

/// An explicit `--config` must load; the adjacent file is used only when present.
fn project_config(cli: &Cli) -> anyhow::Result<ProjectConfig> {
    if let Some(path) = &cli.config {
        return Ok(c816_link::load_config(path)?);
    }
    let adjacent = cli
        .input
        .parent()
        .unwrap_or(Path::new("."))
        .join(ADJACENT_CONFIG);
    if adjacent.is_file() {
        debug!(path = %adjacent.display(), "using adjacent project config");
        return Ok(c816_link::load_config(&adjacent)?);
    }
    Ok(ProjectConfig::default())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    for dir in &cli.include {
        if !dir.is_dir() {
            bail!("specified include path '{}' isn't valid", dir.display());
        }
    }
    let config = project_config(&cli)?;

    let output_options = OutputOptions {
        format: cli
            .format
            .map(OutputFormat::from)
            .or(config.format)
            .unwrap_or_default(),
        unused_byte: cli.unused.or(config.unused_byte).unwrap_or(0),
        ihex_strip: cli.ihex_strip || config.ihex_strip.unwrap_or(false),
    };
    let listing = cli.listing || config.listing.unwrap_or(false);

    let mut include_dirs = cli.include.clone();
    include_dirs.extend(config.include_dirs);
    let options = AssembleOptions {
        include_dirs,
        listing,
        render: RenderOptions {
            color: stderr_supports_color(),
        },
    };

    info!(input = %cli.input.display(), "assembling");
    let assembled = c816_core::assemble_file(&cli.input, &options)
        .map_err(|error| anyhow::anyhow!(error.rendered))?;
    if !assembled.rendered_warnings.is_empty() {
        eprint!("{}", assembled.rendered_warnings);
    }

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension(output_options.format.extension()));
    let bytes = c816_link::render_output(&assembled.segments, &output_options);
    std::fs::write(&output_path, &bytes)
        .with_context(|| format!("failed to write '{}'", output_path.display()))?;
    info!(output = %output_path.display(), len = bytes.len(), "output saved");

    if let Some(text) = &assembled.listing {
        let listing_path = output_path.with_extension("lst");
        std::fs::write(&listing_path, text)
            .with_context(|| format!("failed to write '{}'", listing_path.display()))?;
        info!(listing = %listing_path.display(), "listing saved");
    }
    Ok(())
}
