pub mod assets;
pub mod date;
pub mod response;
pub mod sentry;
