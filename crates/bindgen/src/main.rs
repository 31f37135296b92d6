//! mle-bindgen CLI
//!
//! Command-line interface for generating script bindings from the
//! editor's C headers.

use clap::{CommandFactory, Parser as ClapParser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use mlebind::{Backend, GeneratorConfig};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;

#[derive(ClapParser)]
#[command(name = "mle-bindgen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate Lua, Wren and uscript bindings for mle", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Lua,
    Wren,
    Uscript,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Lua => Backend::Lua,
            BackendArg::Wren => Backend::Wren,
            BackendArg::Uscript => Backend::Uscript,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate binding code and write it to stdout
    Generate {
        /// Target script host
        #[arg(short, long, value_enum)]
        backend: BackendArg,

        /// Generator configuration (TOML); the built-in one is used otherwise
        #[arg(long)]
        config: Option<PathBuf>,

        /// Headers to scan, replacing any listed in the configuration
        headers: Vec<PathBuf>,
    },

    /// Print the merged prototypes, one declaration per line
    List {
        /// Generator configuration (TOML); the built-in one is used otherwise
        #[arg(long)]
        config: Option<PathBuf>,

        /// Headers to scan, replacing any listed in the configuration
        headers: Vec<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mle_bindgen=warn".parse().expect("valid log directive"))
                .add_directive("mlebind=warn".parse().expect("valid log directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            backend,
            config,
            headers,
        } => {
            run_generate(backend.into(), config.as_deref(), headers);
        }
        Commands::List { config, headers } => {
            run_list(config.as_deref(), headers);
        }
        Commands::Completions { shell } => {
            run_completions(shell);
        }
    }
}

fn load_config(config_path: Option<&Path>, headers: Vec<PathBuf>) -> GeneratorConfig {
    let config = match config_path {
        Some(path) => GeneratorConfig::load(path),
        None => GeneratorConfig::default_config(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    if headers.is_empty() {
        config
    } else {
        config.with_headers(headers)
    }
}

fn run_generate(backend: Backend, config_path: Option<&Path>, headers: Vec<PathBuf>) {
    let config = load_config(config_path, headers);
    if config.headers.is_empty() {
        eprintln!("Error: no headers to scan (pass them as arguments or list them in --config)");
        process::exit(1);
    }
    debug!("generating {} bindings from {} headers", backend, config.headers.len());

    // Nothing reaches stdout unless the whole run succeeded
    match mlebind::generate(&config, backend) {
        Ok(code) => {
            let mut stdout = io::stdout().lock();
            if let Err(e) = stdout.write_all(code.as_bytes()).and_then(|_| stdout.flush()) {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_list(config_path: Option<&Path>, headers: Vec<PathBuf>) {
    let config = load_config(config_path, headers);
    match mlebind::collect_prototypes(&config) {
        Ok(prototypes) => {
            for proto in &prototypes {
                if proto.is_hardcoded {
                    println!("{} // hardcoded", proto);
                } else {
                    println!("{}", proto);
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "mle-bindgen", &mut io::stdout());
}
