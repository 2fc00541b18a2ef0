//! Event media management for Backblaze B2.
//!
//! Media is stored under `events/{event_id}/media/{file_name}` in a flat
//! bucket namespace. The [`b2::Gateway`] scopes credentials per call and
//! returns every failure as a [`b2::GatewayError`] value; [`dispatch`] turns
//! command-line flags into exactly one gateway call and a [`report::Report`].

pub mod b2;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod report;
