//! Data-file loading for hepconv: conversion request lists and source-event
//! fixtures in RON, JSON or TOML.

pub mod loader;
pub mod schema;

pub use loader::{
    load_conversion_config, load_scenario, load_source_event, load_source_event_file,
    DataLoadError,
};
pub use schema::ConversionConfig;
