use anyhow::Context;
use clap::Parser;
use tfstate_gateway::{
    api::{build_router, serve},
    auth::CredentialResolver,
    cli::Cli,
    listener::{acquire_listener, ActivationEnv},
    observability::init_observability,
    startup::build_app_state,
    Config, APP_NAME, VERSION,
};
use tracing::{error, info};

fn install_rustls_provider() -> anyhow::Result<()> {
    use rustls::crypto::{ring, CryptoProvider};

    if CryptoProvider::get_default().is_none() {
        ring::default_provider()
            .install_default()
            .map_err(|_| anyhow::anyhow!("failed to install ring crypto provider"))?;
    }
    Ok(())
}

fn main() {
    // Environment mutation happens here, before the runtime spawns threads.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }
    let activation = ActivationEnv::take();

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
        .and_then(|runtime| runtime.block_on(run(activation)));

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        eprintln!("{}: {:#}", APP_NAME, e);
        std::process::exit(1);
    }
}

async fn run(activation: ActivationEnv) -> anyhow::Result<()> {
    install_rustls_provider()?;

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?.with_cli(&cli);

    init_observability(&config.observability).context("failed to initialize observability")?;
    info!(app_name = APP_NAME, version = VERSION, "Starting Terraform state gateway");

    let listener = acquire_listener(&config.server.listen_addr, &activation)
        .await
        .context("failed to get listener")?;

    let state = build_app_state(&config, CredentialResolver::from_env())
        .await
        .context("failed to initialize secret store")?;

    serve(listener, build_router(state)).await.context("failed to serve HTTP")?;
    Ok(())
}
