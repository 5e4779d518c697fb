pub use cache::{Cache, MemoryCache, RedisCache};
pub use chart::{ChartOptions, ChartPoint, ChartSpec, ChartType};
pub use conversations::{Conversation, Message, MessageRole};
pub use credentials::AuthTokens;
pub use error::EngineError;
pub use insights::{InsightsService, Pagination, TransactionPage, TransactionSource};
pub use notify::{Notifier, OtpChannel, OtpNotification};
pub use ops::NewUser;
pub use semantic::{Embedder, QueryAnswer, SemanticQueryService, VectorMatch, VectorRecord, VectorStore};
use sea_orm::DatabaseConnection;
pub use summary::{BankTransaction, MonthKey, MonthSummary, Summary, Totals};
pub use tokens::{Token, TokenKind};
pub use transactions::StoredTransaction;
pub use user_settings::{DEFAULT_VOICE, UserSettings};
pub use users::User;

pub mod cache;
pub mod chart;
pub mod conversations;
pub mod credentials;
mod error;
pub mod insights;
pub mod markdown;
pub mod messages;
pub mod notify;
mod ops;
pub mod prompt;
pub mod semantic;
pub mod summary;
pub mod tokens;
pub mod transactions;
pub mod user_settings;
pub mod users;

type ResultEngine<T> = Result<T, EngineError>;

/// Database-backed domain operations. Holds no in-memory state beyond
/// the connection pool, so one instance is shared across every task.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn database(&self) -> &DatabaseConnection {
        &self.database
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
        }
    }
}
