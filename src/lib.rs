//! Drug Effectiveness Index (DEI) pipeline: review normalisation, TF-IDF sentiment
//! modelling, composite scoring and drug/condition aggregation.

pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod nlp;
pub mod scoring;
