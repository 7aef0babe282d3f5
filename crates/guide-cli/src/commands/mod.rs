use clap::Subcommand;

pub mod generate;
pub mod init;
pub mod show_commands;
pub mod validate;

#[derive(Subcommand)]
pub enum Commands {
    /// Print a starting configuration with the wizard defaults
    Init(init::InitArgs),
    /// Check a configuration file and list anything that will be inert
    Validate(validate::ValidateArgs),
    /// Render every install document for a configuration
    Generate(generate::GenerateArgs),
    /// Print the install steps in execution order
    Commands(show_commands::CommandsArgs),
}
