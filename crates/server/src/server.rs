use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use uuid::Uuid;

use connectors::{MxClient, OpenAiClient, PineconeClient};
use engine::{
    AuthTokens, Cache, Engine, InsightsService, Notifier, SemanticQueryService,
};

use crate::{ai, auth, bank, conversations, settings};

pub type SharedCache = Arc<dyn Cache>;
pub type Insights = InsightsService<MxClient, SharedCache>;
pub type Semantic = SemanticQueryService<MxClient, SharedCache, OpenAiClient, PineconeClient>;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub auth: AuthTokens,
    pub mx: MxClient,
    pub openai: OpenAiClient,
    pub pinecone: PineconeClient,
    pub cache: SharedCache,
    pub notifier: Arc<dyn Notifier>,
    pub insights: Arc<Insights>,
    pub semantic: Arc<Semantic>,
}

impl ServerState {
    pub fn new(
        engine: Arc<Engine>,
        auth: AuthTokens,
        mx: MxClient,
        openai: OpenAiClient,
        pinecone: PineconeClient,
        cache: SharedCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let insights = Arc::new(InsightsService::new(mx.clone(), cache.clone()));
        let semantic = Arc::new(SemanticQueryService::new(
            InsightsService::new(mx.clone(), cache.clone()),
            cache.clone(),
            openai.clone(),
            pinecone.clone(),
        ));

        Self {
            engine,
            auth,
            mx,
            openai,
            pinecone,
            cache,
            notifier,
            insights,
            semantic,
        }
    }
}

/// Bearer-token middleware: verifies the access JWT and loads the user
/// row into the request extensions.
async fn require_auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = auth_header.ok_or(StatusCode::UNAUTHORIZED)?;
    let claims = state
        .auth
        .verify_access(auth_header.token())
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| StatusCode::UNAUTHORIZED)?;
    let user = state
        .engine
        .user_by_id(user_id)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    let public = Router::new()
        .route("/v1/auth/signup", post(auth::signup))
        .route("/v1/auth/login", post(auth::login))
        .route("/v1/auth/verify-otp", post(auth::verify_otp))
        .route("/v1/auth/resend-otp", post(auth::resend_otp))
        .route("/v1/auth/refresh-token", post(auth::refresh_token))
        .route("/v1/auth/logout", post(auth::logout));

    let protected = Router::new()
        .route("/v1/bank/connect", post(bank::connect))
        .route("/v1/bank/current", get(bank::current))
        .route("/v1/bank/disconnect", axum::routing::delete(bank::disconnect))
        .route("/v1/bank/transactions", get(bank::transactions))
        .route(
            "/v1/bank/statements/{member_guid}",
            get(bank::statements),
        )
        .route("/v1/ai/session", post(ai::create_session))
        .route("/v1/ai/query-transactions", post(ai::query_transactions))
        .route(
            "/v1/ai/visualize-transactions",
            post(ai::visualize_transactions),
        )
        .route(
            "/v1/conversations",
            post(conversations::create).get(conversations::list),
        )
        .route(
            "/v1/conversations/completions",
            post(conversations::completions),
        )
        .route(
            "/v1/conversations/{id}",
            get(conversations::get_detail)
                .patch(conversations::edit)
                .delete(conversations::delete),
        )
        .route(
            "/v1/conversations/{id}/messages",
            post(conversations::save_completions),
        )
        .route(
            "/v1/conversations/{id}/suggestions",
            get(conversations::suggestions),
        )
        .route(
            "/v1/settings",
            get(settings::get_settings).patch(settings::update_settings),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public.merge(protected).with_state(state)
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
