use std::sync::Arc;

use migration::{Migrator, MigratorTrait};

use connectors::{MxClient, OpenAiClient, PineconeClient, WebhookNotifier};
use engine::notify::NoopNotifier;
use engine::{AuthTokens, Cache, Engine, MemoryCache, Notifier, RedisCache};
use server::ServerState;
use settings::Database;

mod jobs;
mod settings;

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "moneta={level},server={level},engine={level},connectors={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;
    let engine = Arc::new(Engine::builder().database(db).build());

    let http = reqwest::Client::new();
    let mx = MxClient::new(
        http.clone(),
        settings.mx.base_url,
        settings.mx.client_id,
        settings.mx.api_key,
    );
    let openai = OpenAiClient::new(
        http.clone(),
        settings
            .openai
            .base_url
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
        settings.openai.api_key,
        settings
            .openai
            .chat_model
            .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
        settings
            .openai
            .embedding_model
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        settings
            .openai
            .realtime_model
            .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
    );
    let pinecone = PineconeClient::new(
        http.clone(),
        settings.pinecone.index_host,
        settings.pinecone.api_key,
    );

    let notifier: Arc<dyn Notifier> = match settings.notify {
        Some(notify) => Arc::new(WebhookNotifier::new(
            http.clone(),
            notify.email_webhook,
            notify.sms_webhook,
        )),
        None => Arc::new(NoopNotifier),
    };

    let redis_conn = match &settings.redis {
        Some(redis) => {
            let client = redis::Client::open(redis.url.as_str())?;
            Some(client.get_connection_manager().await?)
        }
        None => None,
    };
    let cache: Arc<dyn Cache> = match &redis_conn {
        Some(conn) => Arc::new(RedisCache::new(conn.clone())),
        None => {
            tracing::warn!("no redis configured, falling back to the in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    let auth = AuthTokens::new(
        settings.auth.access_secret,
        settings.auth.refresh_secret,
        settings.auth.issuer,
        settings.auth.audience,
    );

    let state = ServerState::new(
        engine.clone(),
        auth,
        mx.clone(),
        openai,
        pinecone,
        cache,
        notifier,
    );

    let bind = settings.server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    tasks.spawn(async move {
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(err) => {
                tracing::error!("failed to bind server listener: {err}");
                return;
            }
        };
        if let Err(err) = server::run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    if let (Some(conn), Some(sync)) = (redis_conn, settings.sync) {
        tracing::info!("Found sync settings...");
        let sync_engine = engine.clone();
        let sync_conn = conn.clone();
        tasks.spawn(async move {
            jobs::sync_task(sync_engine, mx, sync_conn, sync.interval_secs).await;
        });
        tasks.spawn(async move {
            jobs::worker_task(engine, conn).await;
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
