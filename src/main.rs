use clap::Parser;
use vaxrank::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{epitopes, rank},
    utils::{handle_error_and_exit, Result},
};

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    let subcommand_name = match cli.command {
        Command::Rank(_) => "rank",
        Command::Epitopes(_) => "epitopes",
    };

    log::info!(
        "Running {}-{} [{}]",
        env!("CARGO_PKG_NAME"),
        *FULL_VERSION,
        subcommand_name
    );
    match cli.command {
        Command::Rank(args) => rank::rank(args)?,
        Command::Epitopes(args) => epitopes::epitopes(args)?,
    }
    log::info!("{} end", env!("CARGO_PKG_NAME"));
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
