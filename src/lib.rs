//! cardshark - literature triage for antimicrobial-resistance curation
//!
//! Learns word, journal and word-pair scoring matrices from a positive
//! corpus of curated abstracts and a background corpus, then scores,
//! classifies and evaluates unseen abstracts.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod models;
pub mod pubmed;
pub mod reporters;
pub mod scoring;
pub mod text;
pub mod validation;
