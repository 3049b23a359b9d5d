use anyhow::Context;
use inpubsub::{init_logging, LoggingConfig, PubSub, Settings, Subscriber};

/// Three consumers on two topics, printing whatever arrives.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default())
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to initialize logging")?;
    tracing::info!(
        commit = env!("INPUBSUB_GIT_COMMIT"),
        built_at = env!("INPUBSUB_BUILD_TIME"),
        "start..."
    );

    let config = Settings::load()
        .and_then(Settings::into_config)
        .context("failed to load settings")?;
    let ps = PubSub::<String>::start(config)?;

    let subscribers = vec![
        ps.subscribe("t1").await?,
        ps.subscribe("t1").await?,
        ps.subscribe("t2").await?,
    ];
    let readers: Vec<_> = subscribers
        .into_iter()
        .enumerate()
        .map(|(n, sub)| tokio::spawn(print_all(n + 1, sub)))
        .collect();

    ps.publish("t1", "hi".to_string()).await?;
    ps.publish("t2", "hello".to_string()).await?;

    ps.shutdown().await?;
    for reader in readers {
        reader.await?;
    }

    tracing::info!(stats = ?ps.stats(), "end...");
    Ok(())
}

async fn print_all(
    n: usize,
    mut sub: Subscriber<String>,
) {
    while let Some(message) = sub.read().await {
        println!("subscriber{n}: {message}");
    }
}
