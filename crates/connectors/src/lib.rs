//! Clients for the external systems the backend consumes: the MX bank
//! aggregation API, OpenAI, the Pinecone vector index, and the OTP
//! delivery webhooks.
//!
//! Each client wraps one configured `reqwest::Client` and implements
//! the matching engine trait at the bottom of its module.

pub use error::ConnectorError;
pub use mx::{MxClient, MxMember, MxStatement, MxTransaction};
pub use openai::{CompletionOutcome, OpenAiClient, finance_tools, suggestion_schema};
pub use pinecone::PineconeClient;
pub use notify::WebhookNotifier;

mod error;
mod mx;
mod notify;
mod openai;
mod pinecone;
