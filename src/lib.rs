pub mod api;
pub mod auth_api;
pub mod config;
pub mod cuadro_export;
pub mod envelope;
pub mod error;
pub mod fake_backend;
pub mod http_client;
pub mod persist;
pub mod provider;
pub mod session;
pub mod solicitudes_api;
pub mod state;
pub mod stats_api;
pub mod stats_view;
pub mod transport;
pub mod users_api;
