#![forbid(unsafe_code)]

pub mod browser;
pub mod capture;
pub mod chapters;
pub mod cli;
pub mod config;
pub mod download;
pub mod logging;
pub mod navigator;
pub mod pipeline;
pub mod storage;
