//! LDP Server Library
//!
//! HTTP service that ingests arbitrarily large line-oriented text files
//! into an S3-compatible object store and, on request, processes them
//! line-by-line into structured records in PostgreSQL.
//!
//! # Architecture
//!
//! The server follows a CQRS-flavored vertical-slice layout:
//!
//! - **features/files**: the file catalog and the streaming upload pipeline
//!   (multipart request body → object store, no whole-body buffering)
//! - **features/jobs**: the durable job queue: atomic FIFO claim,
//!   lease-based locks, bounded error tails, stale-job recovery
//! - **worker**: the long-running processing loop that claims jobs, streams
//!   objects back, parses each line, and bulk-inserts records in throttled
//!   batches
//! - **storage**: the object-store adapter (streaming multipart puts,
//!   streaming gets, key derivation, reachability probe)
//! - **parser**: pure per-line parsing and validation
//!
//! Commands and queries implement the mediator pattern using the `mediator`
//! crate; route handlers call the slice `handle` functions directly.
//!
//! # Framework stack
//!
//! - **Axum** for HTTP (with streaming multipart extraction)
//! - **SQLx** for PostgreSQL access and migrations
//! - **aws-sdk-s3** for the object store (AWS S3 or MinIO)
//! - **Tower / tower-http** for middleware

pub mod api;
pub mod config;
pub mod db;
pub mod features;
pub mod middleware;
pub mod parser;
pub mod storage;
pub mod worker;
