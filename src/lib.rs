//! Payslip router: reads the employee name off every page of a scanned
//! payslip batch, matches it against the company registry and mails each
//! employee their own page.

pub mod config;
pub mod document;
pub mod error;
pub mod mail;
pub mod matching;
pub mod oracle;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod template;
