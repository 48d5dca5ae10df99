// Copyright 2023 Remi Bernotavicius

pub mod config;
pub mod database;
pub mod import;
pub mod planner;
pub mod query;

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type Result<T> = std::result::Result<T, Error>;
