mod conversations;
mod settings;
mod tokens;
mod transactions;
mod users;

pub use users::NewUser;
