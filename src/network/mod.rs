// Wire protocol: framed JSON envelopes over TCP

pub mod message;
mod connection;
mod server;
mod client;

pub use message::{Command, Message};
pub use connection::{Connection, read_frame, write_frame};
pub use server::Server;
pub use client::Client;
