pub mod credentials;
pub mod onelake_adapter;
