use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use drive_fetch::{
    auth, folder_link, Args, AuthorizedClient, ClientSecret, DriveClient, DriveConfig, DriveError,
    FileFetcher,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt().with_max_level(args.log_level).init();

    info!("Starting download of {}", args.file_name);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&args, &e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> drive_fetch::Result<()> {
    let secret = ClientSecret::read(&args.credentials)
        .await
        .map_err(|e| DriveError::InvalidConfig {
            message: format!(
                "Unable to read client secret file {}: {e}",
                args.credentials.display()
            ),
        })?;

    let config = DriveConfig::new();
    let http = config.http_client()?;
    let token = auth::obtain_token(&http, &secret, &args.token_file).await?;
    let client = AuthorizedClient::new(http, secret, token).with_token_path(&args.token_file);
    let drive = DriveClient::new(Arc::new(client), config);

    let fetcher = FileFetcher::new(Arc::new(drive), args.retry_policy());
    let report = fetcher
        .fetch_to(&args.target_dir, &args.file_name, &args.output_dir)
        .await?;

    info!(
        path = %report.path.display(),
        bytes = report.bytes_written,
        attempts = report.attempts,
        "Download complete"
    );
    Ok(())
}

fn report(args: &Args, e: &DriveError) {
    match e {
        DriveError::Ambiguous {
            parent_folder_ids, ..
        } => {
            error!("{e}");
            for parent in parent_folder_ids {
                error!("{}", folder_link(parent));
            }
            error!("Rename one of the files to resolve the duplicate");
        }
        e if e.is_resolution_error() => error!("{e}"),
        _ => error!(file_name = %args.file_name, "{e}"),
    }
}
