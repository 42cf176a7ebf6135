use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = onyxia::cli::Cli::parse();
    onyxia::init_logging(cli.verbose);

    if let Err(err) = onyxia::run(cli).await {
        tracing::error!(err = %err, "fatal");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
