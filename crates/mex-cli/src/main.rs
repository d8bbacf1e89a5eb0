//! mex command-line driver.

use clap::Parser;
use mex_cli::cli::{Cli, Command};
use mex_cli::commands::{
    run_create, run_export, run_import_costume, run_info, run_recompile_csps, run_relocate,
};
use mex_cli::logging::init_logging;

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = cli.log_config();
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let result = match &cli.command {
        Command::Create(args) => run_create(args).map(|_| ()),
        Command::Info(args) => run_info(args).map(|_| ()),
        Command::Export(args) => run_export(args).map(|_| ()),
        Command::ImportCostume(args) => run_import_costume(args).map(|_| ()),
        Command::RecompileCsps(args) => run_recompile_csps(args).map(|_| ()),
        Command::Relocate(args) => run_relocate(args),
    };
    let exit_code = match result {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error}");
            for cause in error.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
            1
        }
    };
    std::process::exit(exit_code);
}
