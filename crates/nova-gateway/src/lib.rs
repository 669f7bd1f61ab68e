mod routes;
mod server;
mod state;

pub mod schemas;

pub use server::GatewayServer;
