//! Pix notification pipeline.
//!
//! Each invocation:
//! 1. `MailboxSource::list_candidates()` — current candidate messages
//! 2. `Ledger::has()` — skip anything already handled
//! 3. `extract_text()` + `FieldParser::parse()` — body → fields
//! 4. `TransactionSink::record()` — report the result
//! 5. `Ledger::mark()` + `MailboxSource::mark_processed()`

pub mod processor;
pub mod sink;

pub use processor::{PixPipeline, RunSummary};
pub use sink::{JsonlSink, LogSink, TransactionSink};
