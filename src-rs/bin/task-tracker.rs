use std::process::ExitCode;

use task_tracker_rs::api::server::TrackerServer;
use task_tracker_rs::config::TrackerConfig;
use task_tracker_rs::helpers::init_logging;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let config = TrackerConfig::from_env();
    init_logging(&config.log_level);
    config.log_summary();

    let server = TrackerServer::new(config);
    match server.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "server error");
            ExitCode::FAILURE
        }
    }
}
