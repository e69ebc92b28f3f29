#![doc = "confluence-export-core: core logic library for confluence-export."]

//! This crate contains the export pipeline: the Confluence REST client, pagination,
//! content and attachment extraction, document serialization and archiving.
//! The CLI crate only loads configuration and calls [`export::prepare_export`] and
//! [`export::run_export`].
//!
//! # Usage
//! Build an [`config::ExportConfig`] via [`export::prepare_export`], then run
//! [`export::run_export`], or [`export::export_space`] with any [`contract::ContentSource`].

pub mod archive;
pub mod attachment;
pub mod client;
pub mod config;
pub mod content;
pub mod contract;
pub mod document;
pub mod error;
pub mod export;
pub mod model;
pub mod paginate;
pub mod serialize;
