//! Model Context Protocol front end: exposes the MAL client as tools to an
//! external agent over stdio.

mod protocol;
mod server;
mod tools;

pub use server::McpServer;
