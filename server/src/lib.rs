//! Messaging Platform Server
//!
//! Sends customer feedback surveys over a messaging channel, records read
//! receipts and survey responses from the channel's webhooks, and serves
//! delivery and sentiment analytics.

pub mod analytics;
pub mod api;
pub mod config;
pub mod db;
pub mod messages;
pub mod messenger;
