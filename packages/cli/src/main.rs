mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    init, publish, serve, status, InitArgs, PublishArgs, ServeArgs, StatusArgs,
};

/// ftext - collaborative plain-text documents
#[derive(Parser, Debug)]
#[command(name = "ftext")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a config file and create the storage directory
    Init(InitArgs),

    /// Run the collaboration server
    Serve(ServeArgs),

    /// Show published/draft state of stored documents
    Status(StatusArgs),

    /// Apply draft changes of a stored document
    Publish(PublishArgs),
}

fn main() {
    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Serve(args) => serve(args, &cwd),
        Command::Status(args) => status(args, &cwd),
        Command::Publish(args) => publish(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
