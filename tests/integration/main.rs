//! Integration tests for hoyofiles

mod cli_flow;
mod http_client;
mod support;
