use clap::Parser;
use kz_points::{
    api::{serve, FilterProcessor, RunProcessor},
    args::{Args, Command},
    database::db::DbClient,
    model::{fitter::DistributionFitter, recalculator::BatchRecalculator},
    utils::logging::init_tracing
};
use tokio::io::{self, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level);

    let fitter = DistributionFitter::new(args.fit_options());
    let stdin = BufReader::new(io::stdin());

    let result = match &args.command {
        Command::Filter { database_url } => {
            let client = match DbClient::connect(database_url).await {
                Ok(client) => client,
                Err(e) => {
                    error!("Failed to connect to database: {}", e);
                    error!("Application cannot start without a valid database connection");
                    std::process::exit(1);
                }
            };

            info!("Connected to database, reading filter requests");
            let processor = FilterProcessor::new(BatchRecalculator::new(client, fitter));
            serve(&processor, stdin, io::stdout(), io::stderr()).await
        }
        Command::Run => {
            info!("Reading run requests");
            serve(&RunProcessor, stdin, io::stdout(), io::stderr()).await
        }
    };

    if let Err(e) = result {
        error!("Request stream failed: {}", e);
        std::process::exit(1);
    }
}
