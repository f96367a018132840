//! twigs CLI - find local branches that are safe to delete, and delete them

mod cli;
mod colors;
mod commands;
mod interaction;
mod logging;
mod output;
mod render;

use std::process::ExitCode;

use cli::Commands;
use commands::GlobalArgs;
use commands::clean::CleanArgs;
use twigs_core::CancelToken;

fn main() -> ExitCode {
    let cli = cli::parse();
    logging::init_logging(cli.verbose);

    let cancel = CancelToken::new();
    interaction::install_cancel_handler(&cancel);

    let args = GlobalArgs {
        repo: cli.repo,
        overrides: cli.overrides,
        json: cli.json,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Some(Commands::Analyze) => commands::run_analyze(&args, &cancel),
        Some(Commands::Clean {
            yes,
            dry_run,
            allow_dirty,
        }) => commands::run_clean(
            &args,
            CleanArgs {
                yes,
                dry_run,
                allow_dirty,
            },
            &cancel,
        ),
        None => {
            // No subcommand - print version info
            if !args.quiet {
                println!("twigs v{}", env!("CARGO_PKG_VERSION"));
                println!("Use --help for usage information");
            }
            Ok(0)
        }
    };

    match result {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}
