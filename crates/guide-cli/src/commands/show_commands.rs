use std::path::PathBuf;

use clap::Args;

use guide_core::Configuration;

#[derive(Args)]
pub struct CommandsArgs {
    /// Path to config file
    pub config: PathBuf,

    /// Print commands as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: CommandsArgs) -> anyhow::Result<()> {
    let config = Configuration::from_file(&args.config)?;
    let commands = guide_manifests::generate_commands(&config);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&commands)?);
        return Ok(());
    }

    for (i, command) in commands.iter().enumerate() {
        println!("{}. {}", i + 1, command.title);
        println!("   {}", command.command);
    }
    Ok(())
}
