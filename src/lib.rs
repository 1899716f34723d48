pub mod api;
pub mod coordinator;
pub mod model;
pub mod sensor;
pub mod session;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use api::Error;
pub use coordinator::PollingCoordinator;
pub use session::SessionCache;
pub use telemetry::TelemetryClient;
