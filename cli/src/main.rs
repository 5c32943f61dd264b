use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use dumptruck_core::{DumpConfig, ServiceName, ValidatedOperation};
use dumptruck_discovery::discover::DiscoveryEngine;
use dumptruck_discovery::sanitize::sanitize;
use dumptruck_discovery::scanner::scan;
use dumptruck_discovery::{MemoizedRunner, ProcessRunner, dump_with_tool};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dumptruck")]
#[command(about = "Dump every list/describe operation of a cloud CLI into a directory tree")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,
    /// YAML config file; command-line flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Discover every list/describe operation and capture it in all formats.
    Dump(DumpArgs),
    /// List services that pass validation.
    Services(ServicesArgs),
    /// List runnable list/describe subcommands of one service.
    Commands(CommandsArgs),
    /// Print the bulleted items of one section of a saved help page.
    Scan(ScanArgs),
}

#[derive(Debug, Args)]
struct ToolArgs {
    /// External tool program (default: aws).
    #[arg(long)]
    tool: Option<String>,
    /// Per-invocation timeout in seconds (default: 300).
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Debug, Args)]
struct DumpArgs {
    #[command(flatten)]
    tool: ToolArgs,
    /// Root of the artifact tree (default: ./dumptruck).
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Capture with this many parallel jobs (default: 1, sequential).
    #[arg(long)]
    jobs: Option<usize>,
    /// Restrict the sweep to this service; repeatable.
    #[arg(long = "service")]
    services: Vec<String>,
}

#[derive(Debug, Args)]
struct ServicesArgs {
    #[command(flatten)]
    tool: ToolArgs,
    /// Print a JSON array instead of one name per line.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct CommandsArgs {
    /// Service whose subcommands are listed.
    service: String,
    #[command(flatten)]
    tool: ToolArgs,
    /// Print a JSON array instead of one name per line.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct ScanArgs {
    /// Section heading text that starts the bullet list.
    #[arg(long)]
    marker: String,
    /// Help page file; stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Dump(args) => run_dump(cli.config, args),
        Command::Services(args) => run_services(cli.config, args),
        Command::Commands(args) => run_commands(cli.config, args),
        Command::Scan(args) => run_scan(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>, tool: &ToolArgs) -> Result<DumpConfig, String> {
    let mut config = match path {
        Some(path) => DumpConfig::load(&path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => DumpConfig::default(),
    };
    if let Some(program) = &tool.tool {
        config.tool = program.clone();
    }
    if let Some(secs) = tool.timeout {
        config.timeout_secs = secs;
    }
    Ok(config)
}

fn run_dump(config_path: Option<PathBuf>, args: DumpArgs) -> Result<(), String> {
    let mut config = load_config(config_path, &args.tool)?;
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if !args.services.is_empty() {
        config.services = args.services;
    }
    config.validate().map_err(|err| err.to_string())?;

    dump_with_tool(&config).map_err(|err| err.to_string())?;
    Ok(())
}

fn run_services(config_path: Option<PathBuf>, args: ServicesArgs) -> Result<(), String> {
    let config = load_config(config_path, &args.tool)?;
    config.validate().map_err(|err| err.to_string())?;

    let runner = MemoizedRunner::new(ProcessRunner, config.cache_capacity);
    let engine = DiscoveryEngine::new(&runner, &config);
    let services = engine.list_services().map_err(|err| err.to_string())?;

    if args.json {
        let names: Vec<ServiceName> = services.collect();
        let json = serde_json::to_string_pretty(&names)
            .map_err(|err| format!("JSON serialization failed: {err}"))?;
        println!("{json}");
    } else {
        for service in services {
            println!("{service}");
        }
    }
    Ok(())
}

fn run_commands(config_path: Option<PathBuf>, args: CommandsArgs) -> Result<(), String> {
    let config = load_config(config_path, &args.tool)?;
    config.validate().map_err(|err| err.to_string())?;
    let service = ServiceName::new(args.service).map_err(|err| err.to_string())?;

    let runner = MemoizedRunner::new(ProcessRunner, config.cache_capacity);
    let engine = DiscoveryEngine::new(&runner, &config);
    if !engine.oracle().service_is_valid(&service) {
        return Err(format!("'{service}' is not a valid service"));
    }
    let commands = engine
        .list_service_commands(&service)
        .map_err(|err| err.to_string())?
        .filter_map(|(service, subcommand)| engine.runnable_operation(service, subcommand));

    if args.json {
        let ops: Vec<ValidatedOperation> = commands.collect();
        let json = serde_json::to_string_pretty(&ops)
            .map_err(|err| format!("JSON serialization failed: {err}"))?;
        println!("{json}");
    } else {
        for op in commands {
            println!("{}", op.subcommand);
        }
    }
    Ok(())
}

fn run_scan(args: ScanArgs) -> Result<(), String> {
    let raw = match &args.input {
        Some(path) => fs::read(path)
            .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| format!("Failed to read stdin: {err}"))?;
            buf
        }
    };

    for item in scan(sanitize(&raw), &args.marker) {
        println!("{item}");
    }
    Ok(())
}
