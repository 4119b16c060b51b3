//! Video ingestion and transcoding worker
//!
//! Picks up pending video jobs, turns each uploaded source into an HLS
//! rendition ladder with a thumbnail and sampled frames, runs plant
//! health/growth analysis over the frames and records the outcome.
//!
//! The [`orchestrator::Orchestrator`] owns the drain loop; everything it
//! talks to sits behind a trait ([`storage::BlobStore`],
//! [`repository::JobRepository`], [`media::MediaEngine`],
//! [`ai::AnalysisClient`]) so the pipeline can run against in-memory
//! collaborators.

pub mod admin;
pub mod ai;
pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod publisher;
pub mod repository;
pub mod storage;
pub mod transcoder;
pub mod workspace;
