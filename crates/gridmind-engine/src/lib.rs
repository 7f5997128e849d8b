//! gridmind-engine - Cell model, classification, and restricted formula evaluation.

pub mod engine;
