use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use urfu_vpn::cli::Cli;
use urfu_vpn::logging::{self, Redactor};
use urfu_vpn::session::CtrlC;
use urfu_vpn::{Config, Identity, Platform};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Refuse unknown hosts before touching anything
    let platform = Platform::detect()?;

    let cli = Cli::parse();
    let secret = rpassword::prompt_password("Your UrFU password: ")?;

    // From here on every log line is scrubbed of the password
    logging::init(cli.verbose, Redactor::new([secret.as_str()]))?;
    let identity = Identity::new(cli.login, secret);

    let config = match Config::discover(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut interrupt = CtrlC::install()?;

    info!(
        "Connecting to {} on {} (connect time: {})",
        config.vpn.server, platform, cli.connect_time
    );
    match platform
        .connect(&config, &identity, cli.connect_time, &mut interrupt)
        .await
    {
        Ok(outcome) => {
            info!("Session finished: {:?}", outcome);
            Ok(ExitCode::from(outcome.exit_code()))
        }
        Err(e) => {
            error!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
