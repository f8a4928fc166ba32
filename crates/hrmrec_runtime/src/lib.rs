pub mod datastore;
pub mod errors;
pub mod ledger;
pub mod models;
pub mod resolver;
pub mod source;
pub mod store;
