//! Slack workspace invitation form: an HTML page that forwards visitor emails to Slack's
//! `users.admin.invite` endpoint and renders the outcome.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
