#![allow(clippy::doc_markdown)]
//! `threadboard` is a small threaded bulletin board.
//!
//! Peers talk to the server over a UDP control channel: they log in (registering on first use),
//! create threads, post, edit and delete messages, and list and read threads.
//! File attachments travel over short-lived TCP connections that the server opens on demand.
//!
//! ## 📖 Documentation
//!
//! * [The wire protocol](protocol)
//! * [Configuring the server](config)
//!
//! ## 🧰 Getting Started
//!
//! Start a server on UDP port 5000, keeping its data in `./board`:
//!
//! ```text
//! threadboard server 5000 --data-dir board
//! ```
//!
//! Then connect to it interactively:
//!
//! ```text
//! threadboard client localhost 5000
//! ```
//!
//! The client asks for a username. A name the server has not seen before is registered with
//! whatever password you then give; a known name must give its password.
//! After that, type `help` for the list of commands.
//!
//! ## Security
//!
//! **Passwords are sent and stored in clear text.** The control channel is unencrypted UDP,
//! and sessions are keyed by the peer's address alone. Do not run this on an untrusted network.
//!
//! ## Design
//!
//! The server is a single sequential loop. It handles one datagram at a time to completion,
//! including any login handshake or file transfer it starts, before it looks at the next.
//! This keeps every thread's storage serialised without any locking, at the cost of making
//! other peers wait during a transfer. While a login handshake is waiting for its peer,
//! anyone else is told the server is busy.
//!
//! #### MSRV policy
//!
//! As this is an application crate, the MSRV is not guaranteed to remain stable.
//! The MSRV may be upgraded from time to time to take advantage of new language features.

pub(crate) mod cli;
pub use cli::cli as main;
pub use cli::styles;

pub mod auth;
pub mod client;
pub mod config;
pub use config::Configuration;
pub mod control;
pub mod error;
pub use error::BoardError;
pub mod protocol;
mod server;
pub use server::Server;
pub mod store;
mod transfer;
pub mod util;
