//! Async client for remote generative-AI jobs.
//!
//! Provides the [`GenerationService`](service::GenerationService) seam,
//! the submit-poll-fetch [`JobPoller`](poller::JobPoller), a credential
//! [`Session`](session::Session), and Gemini-backed video, image and chat
//! implementations.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod events;
pub mod image;
pub mod messages;
pub mod poller;
pub mod service;
pub mod session;
pub mod video;
