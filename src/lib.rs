//! pix-watch — reports incoming Pix credits found in bank notification emails.

pub mod config;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod mailbox;
pub mod parser;
pub mod pipeline;
pub mod poller;
