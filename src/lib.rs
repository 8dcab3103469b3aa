// HTTP APIs: connect flow, cron trigger, dashboard
pub mod api;

// Bearer token checks
pub mod auth;

// Scheduled publish orchestrator
pub mod automation;

// Configuration
pub mod config;

// Encrypted credential storage
pub mod credentials;

// Error taxonomy
pub mod error;

// Content Generation Service client
pub mod generation;

// Facebook OAuth: state store and token exchange
pub mod oauth;

// Provider publish clients
pub mod publish;

// Settings and publish records
pub mod store;
