use clap::Parser;

mod commands;

#[derive(Parser)]
#[command(
    name = "whatap-guide",
    about = "WhaTap Kubernetes install guide - render agent manifests and install steps",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        commands::Commands::Init(args) => commands::init::execute(args),
        commands::Commands::Validate(args) => commands::validate::execute(args),
        commands::Commands::Generate(args) => commands::generate::execute(args),
        commands::Commands::Commands(args) => commands::show_commands::execute(args),
    }
}
