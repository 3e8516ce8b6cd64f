//! tomltree command-line tool: decode a TOML document into an ordered tree
//! and re-emit it as JSON, YAML, TOML or CBOR.
//!
//! Usage: tomltree [OPTIONS] [FILE]
//!
//! Options:
//!   -t, --to <FORMAT>      Output format (json, yaml, toml, cbor) [default: yaml]
//!   -o, --output <FILE>    Write output to specified file
//!       --compact          Emit JSON on a single line
//!       --strict-tables    Reject a table header declared more than once
//!       --check            Only check that the document decodes
//!   -v, --verbose          Log decoding steps to stderr (repeat for more)
//!   -h, --help             Print help
//!   -V, --version          Print version
//!
//! `RUST_LOG` overrides the verbosity flags.

use std::error::Error;
use std::fs;
use std::io::{self, Read, Write};
use std::process;

use clap::{ArgAction, Parser, ValueEnum};
use libtomltree::{encode, DecodeOptions, Decoder, Format, Node, TablePolicy};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod transcode {
    pub mod cbor;
    pub mod toml;
    pub mod yaml;
}

#[derive(Parser, Debug)]
#[command(name = "tomltree", version, about = "Decode TOML into an ordered document tree")]
struct Args {
    /// Input TOML file. Omit or use '-' to read from stdin.
    input: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, value_name = "format", default_value_t = OutputFormat::Yaml)]
    to: OutputFormat,

    /// Output file path (prints to stdout if omitted).
    #[arg(short, long, value_name = "file")]
    output: Option<String>,

    /// Emit JSON on a single line.
    #[arg(long)]
    compact: bool,

    /// Reject a table header declared more than once.
    #[arg(long)]
    strict_tables: bool,

    /// Only check that the document decodes.
    #[arg(long)]
    check: bool,

    /// Log decoding steps to stderr (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
    Toml,
    Cbor,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let input_name = match args.input.as_deref() {
        None | Some("-") => "<stdin>",
        Some(path) => path,
    };
    if let Err(e) = run(&args, input_name) {
        eprintln!("{}: {}", input_name, e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args, input_name: &str) -> Result<(), Box<dyn Error>> {
    let input = read_input(args.input.as_deref())?;

    let mut options = DecodeOptions::new();
    if args.strict_tables {
        options = options.with_table_policy(TablePolicy::Strict);
    }
    if let Some(path) = args.input.as_deref().filter(|p| *p != "-") {
        options = options.with_filename(path);
    }

    let mut decoder = Decoder::with_options(options);
    decoder.init_bytes(input);
    let document = match decoder.decode() {
        Ok(document) => document,
        Err(failure) => {
            debug!(partial = ?failure.partial, "partial document");
            return Err(failure.into_error().into());
        }
    };

    if args.check {
        println!("{}: ok", input_name);
        return Ok(());
    }

    // An empty document produces no output.
    let Some(document) = document else {
        debug!("empty document");
        return Ok(());
    };

    let output = render(&document, args)?;
    write_output(args.output.as_deref(), &output)?;
    Ok(())
}

fn read_input(path: Option<&str>) -> io::Result<Vec<u8>> {
    match path {
        None | Some("-") => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
        Some(path) => fs::read(path),
    }
}

fn render(document: &Node, args: &Args) -> Result<Vec<u8>, String> {
    let text = match args.to {
        OutputFormat::Json => {
            let format = if args.compact {
                Format::JsonCompact
            } else {
                Format::Json
            };
            encode(document, format)
        }
        OutputFormat::Yaml => transcode::yaml::encode(document)?,
        OutputFormat::Toml => transcode::toml::encode(document)?,
        OutputFormat::Cbor => {
            return transcode::cbor::encode(document).map_err(|e| format!("Cannot convert to CBOR: {}", e))
        }
    };

    let mut bytes = text.into_bytes();
    // Ensure output ends with newline
    if !bytes.ends_with(b"\n") {
        bytes.push(b'\n');
    }
    Ok(bytes)
}

fn write_output(path: Option<&str>, output: &[u8]) -> io::Result<()> {
    match path {
        Some(path) => fs::write(path, output),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output)?;
            stdout.flush()
        }
    }
}
