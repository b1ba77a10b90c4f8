use delivery_invoicing::api::{self, AppState};
use delivery_invoicing::clients::{
    FileOrderFeed, Invoicer, OrderFeed, OtterClient, OtterOrderFeed, VendusClient,
};
use delivery_invoicing::config::FeedSource;
use delivery_invoicing::service::ReconcileSettings;
use delivery_invoicing::{create_pool, migrate, AppConfig, Poller, PollerSettings};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Local time, same layout as the receipt printer logs
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    info!("Starting with config: {:?}", config);

    let api_key = config
        .invoicer
        .api_key
        .clone()
        .ok_or("invoicer API key is not configured (APP__INVOICER__API_KEY or VENDUS_API_KEY)")?;

    let pool = create_pool(&config.database.url).await?;
    migrate(&pool).await?;
    info!("Ledger ready at {}", config.database.url);

    let invoicer: Arc<dyn Invoicer> = Arc::new(VendusClient::new_with_base_url(
        api_key,
        config.invoicer.base_url.clone(),
        config.document(),
    ));

    let feed: Arc<dyn OrderFeed> = match config.ordering.source {
        FeedSource::File => {
            info!("Reading tickets from {}", config.ordering.feed_path.display());
            Arc::new(FileOrderFeed::new(config.ordering.feed_path.clone()))
        }
        FeedSource::Platform => {
            let ordering = &config.ordering;
            let (user, password, facility_id) = match (
                ordering.user.clone(),
                ordering.password.clone(),
                ordering.facility_id.clone(),
            ) {
                (Some(user), Some(password), Some(facility_id)) => (user, password, facility_id),
                _ => {
                    return Err(
                        "platform feed needs ordering.user, ordering.password and ordering.facility_id"
                            .into(),
                    )
                }
            };
            info!("Fetching tickets from {} for facility {}", ordering.base_url, facility_id);
            let client = OtterClient::new_with_base_url(user, password, ordering.base_url.clone());
            Arc::new(OtterOrderFeed::new(
                client,
                facility_id,
                Some(ordering.feed_path.clone()),
            ))
        }
    };

    let state = Arc::new(AppState {
        pool: pool.clone(),
        invoicer: invoicer.clone(),
    });
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Status server listening on {}", addr);
    info!("  GET /health");
    info!("  GET /api/ledger");
    info!("  GET /api/ledger.csv");
    info!("  GET /api/audit");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Status server stopped: {}", e);
        }
    });

    let poller = Poller::new(
        pool.clone(),
        invoicer,
        feed,
        PollerSettings {
            interval: config.poll_interval(),
            manual_import: config.poll.manual_import,
            mapping_path: config.mapping.path.clone(),
            reconcile: ReconcileSettings {
                only_today: config.poll.only_today,
                ..ReconcileSettings::default()
            },
        },
    );

    tokio::select! {
        halt = poller.run() => {
            error!("Invoicing halted: {}", halt);
            error!("Manual intervention required before restarting");
            pool.close().await;
            std::process::exit(1);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    pool.close().await;
    Ok(())
}
