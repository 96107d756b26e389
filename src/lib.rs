//! MailMatch - returned-mail address capture and subscriber notification
//!
//! This crate drives a capture-to-confirmation workflow: take a snapshot of
//! an envelope (or type the address), have a backend recognize the address
//! and match it to a subscriber, confirm the match, and send a notification
//! email.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects, the workflow state machine, the view renderer and errors
//! - **Application**: The workflow controller and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (frame-source camera, HTTP backend, config store)
//! - **CLI**: Command-line interface, argument parsing, and the interactive session

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
