use clap::Parser;
use haven_inbox::InboxConfig;
use haven_inbox_cli::{logging, run, Cli};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_guard = match logging::init(cli.verbose, cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:#}", e);
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout();
    let result = match InboxConfig::from_env() {
        Ok(config) => run(cli, config, &mut stdout).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        // Flush the file writer before exiting
        drop(log_guard);
        std::process::exit(1);
    }
}
