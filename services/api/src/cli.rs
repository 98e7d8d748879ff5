use crate::demo::{run_score, run_sentiment, ScoreArgs, SentimentArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use supply_insights::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "SupplyInsights API",
    about = "Run the SupplyInsights dashboard API or one-off scoring commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute a supplier performance score from sub-scores
    Score(ScoreArgs),
    /// Analyze a piece of review text for sentiment
    Sentiment(SentimentArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Sentiment(args) => run_sentiment(args),
    }
}
