use anyhow::Result;

use notion_timesheet::auth::StartupError;
use notion_timesheet::config;
use notion_timesheet::server;

#[tokio::main]
async fn main() -> Result<()> {
    // Check if interactive setup is needed (no .env and no token in the environment)
    if config::needs_interactive_setup() {
        let interactive_config = config::run_interactive_setup()?;
        interactive_config.apply_to_env();
    }

    // Load configuration first (for log level)
    let config = config::Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Notion Timesheet starting...");
    tracing::info!(
        "Server configured: {}:{} ({} integration)",
        config.server_host,
        config.server_port,
        config.mode
    );

    // Verify the token before touching the network listener
    let app_state = match server::bootstrap(&config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Startup failed: {:#}", e);
            tracing::error!("");
            tracing::error!("Troubleshooting steps:");
            match e.downcast_ref::<StartupError>() {
                Some(StartupError::InvalidToken(_)) | Some(StartupError::NotABot) => {
                    tracing::error!("   1. Copy the integration token again from notion.so/my-integrations");
                    tracing::error!("   2. Update NOTION_API_KEY in your .env file");
                }
                Some(StartupError::MissingDatabase(title)) => {
                    tracing::error!("   1. Share the '{}' database with the integration", title);
                    tracing::error!("   2. Or set its id explicitly in the environment");
                }
                _ => {
                    tracing::error!("   1. Check your network connection");
                    tracing::error!("   2. Verify NOTION_API_BASE_URL points at the Notion API");
                }
            }
            tracing::error!("");
            anyhow::bail!("Startup failed: the configured Notion credential could not be verified");
        }
    };

    let app = server::build_app(app_state);

    // Bind to configured host and port
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    server::print_startup_banner(&config);
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
