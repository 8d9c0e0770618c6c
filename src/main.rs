use std::process::ExitCode;

use candidates::{Config, Server, app, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        table = %config.candidates_table_name,
        addr = %config.listen_addr,
        storage = %config.storage,
        time_zone = config.time_zone.name(),
        "configuration loaded",
    );

    let server = Server::bind(config.listen_addr).request_timeout(config.request_timeout);
    if let Err(e) = server.serve(app::build(&config).await).await {
        error!("server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
