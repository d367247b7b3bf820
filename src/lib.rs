// Library for tests to access modules

pub mod backend_repo;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod format;
pub mod layout;
pub mod models;
pub mod normalizer;
pub mod registry;
pub mod routes;
pub mod session;
pub mod stats;
pub mod version;
pub mod wizard;
pub mod worker;
