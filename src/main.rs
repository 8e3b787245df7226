use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use confclasses::SchemaInstance;
use confclasses::declare::{Declaration, parse_declaration_file};
use confclasses::yaml::{dump_config, dump_config_plain, load_config};

#[derive(Parser)]
#[command(name = "confclasses")]
#[command(
	author,
	version,
	about = "Check, dump and initialize YAML configuration against typed schema declarations"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	/// Log what the loader does (RUST_LOG takes precedence)
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Load a YAML config against a declaration and report any errors
	Check {
		/// Schema declaration file (TOML)
		declaration: PathBuf,

		/// YAML config file to check
		config: PathBuf,
	},
	/// Print a configuration as YAML, with field docs as comments
	Dump {
		/// Schema declaration file (TOML)
		declaration: PathBuf,

		/// YAML config file to load before dumping (defaults only if omitted)
		#[arg(long, value_name = "FILE")]
		config: Option<PathBuf>,

		/// Leave out the generated comments
		#[arg(long)]
		no_comments: bool,

		/// Dump this schema instead of the declaration's root
		#[arg(long, value_name = "NAME")]
		schema: Option<String>,
	},
	/// Write a commented config file containing every default
	Init {
		/// Schema declaration file (TOML)
		declaration: PathBuf,

		/// Where to write the config file
		#[arg(short, long, default_value = "config.yaml")]
		output: PathBuf,

		/// Overwrite an existing file
		#[arg(long)]
		force: bool,
	},
}

fn main() -> ExitCode {
	match run() {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> Result<ExitCode> {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match cli.command {
		Commands::Check {
			declaration,
			config,
		} => handle_check(&declaration, &config),
		Commands::Dump {
			declaration,
			config,
			no_comments,
			schema,
		} => handle_dump(&declaration, config.as_deref(), !no_comments, schema.as_deref()),
		Commands::Init {
			declaration,
			output,
			force,
		} => handle_init(&declaration, &output, force),
	}
}

fn init_logging(verbose: bool) {
	let default = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	let _ = tracing_subscriber::registry()
		.with(fmt::layer().with_writer(std::io::stderr))
		.with(filter)
		.try_init();
}

fn read_declaration(path: &Path) -> Result<Declaration> {
	parse_declaration_file(path)
		.with_context(|| format!("Failed to load schema declaration: {}", path.display()))
}

fn read_config(path: &Path) -> Result<String> {
	std::fs::read_to_string(path)
		.with_context(|| format!("Failed to read config file: {}", path.display()))
}

fn handle_check(declaration_path: &Path, config_path: &Path) -> Result<ExitCode> {
	let declaration = read_declaration(declaration_path)?;
	let yaml_text = read_config(config_path)?;

	let mut instance = declaration.instantiate();
	match load_config(&mut instance, &yaml_text) {
		Ok(_) => {
			println!(
				"Configuration is valid: {} ({})",
				config_path.display(),
				declaration.root().name()
			);
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => {
			eprintln!("Configuration error: {:#}", anyhow::Error::new(e));
			Ok(ExitCode::FAILURE)
		}
	}
}

fn handle_dump(
	declaration_path: &Path,
	config_path: Option<&Path>,
	comments: bool,
	schema_name: Option<&str>,
) -> Result<ExitCode> {
	let declaration = read_declaration(declaration_path)?;
	let mut instance = select_instance(&declaration, schema_name)?;

	if let Some(path) = config_path {
		let yaml_text = read_config(path)?;
		load_config(&mut instance, &yaml_text)
			.with_context(|| format!("Failed to load config file: {}", path.display()))?;
	}

	let rendered = if comments {
		dump_config(&instance)
	} else {
		dump_config_plain(&instance)
	};
	print!("{rendered}");
	Ok(ExitCode::SUCCESS)
}

fn handle_init(declaration_path: &Path, output: &Path, force: bool) -> Result<ExitCode> {
	if output.exists() && !force {
		anyhow::bail!("{} already exists. Use --force to overwrite.", output.display());
	}

	let declaration = read_declaration(declaration_path)?;
	let instance = declaration.instantiate();
	std::fs::write(output, dump_config(&instance))
		.with_context(|| format!("Failed to write {}", output.display()))?;

	println!("Created {}", output.display());
	Ok(ExitCode::SUCCESS)
}

fn select_instance(declaration: &Declaration, schema_name: Option<&str>) -> Result<SchemaInstance> {
	match schema_name {
		Some(name) => declaration
			.get(name)
			.map(|schema| schema.instantiate())
			.ok_or_else(|| anyhow::anyhow!("Schema not found in declaration: {}", name)),
		None => Ok(declaration.instantiate()),
	}
}
