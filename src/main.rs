use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tg_repeater::config::RelayConfig;
use tg_repeater::relay::{self, RelayLoop};
use tg_repeater::store::LibSqlStore;
use tg_repeater::telegram::BotApi;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let RelayConfig {
        bot_token,
        db_path,
        poll_interval,
        request_timeout,
    } = RelayConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export BOT_TOKEN=123456:ABC-...");
        std::process::exit(1);
    });

    eprintln!("tg-repeater v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Store: {}", db_path.display());
    eprintln!("   Poll interval: {}s", poll_interval.as_secs());

    // A store that cannot be opened or read at startup is fatal: without
    // MAX(ts) there is no trustworthy watermark to resume from.
    let store = Arc::new(LibSqlStore::new_local(&db_path).await?);

    let transport = Arc::new(BotApi::new(bot_token, request_timeout));

    let stop = Arc::new(AtomicBool::new(false));
    let _signal_handle = relay::spawn_signal_listener(Arc::clone(&stop));

    let relay = RelayLoop::recover(transport, store, poll_interval, stop).await?;
    relay.run().await?;

    Ok(())
}
