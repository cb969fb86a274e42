//! Accrual pipeline for scrip.
//!
//! Orders flow through a bounded multi-producer single-consumer queue:
//!
//! - the order-upload handler offers new orders without blocking (a full
//!   queue drops the offer; the sweeper will rediscover the order),
//! - the [`sweeper`] periodically re-enqueues every unterminated order
//!   with blocking sends,
//! - the single [`worker`] polls the external accrual service per order
//!   and applies results through the store.
//!
//! The pipeline is eventually consistent: any dropped or failed attempt
//! is retried on a later sweep, and terminal-state guards in the store
//! make repeated deliveries harmless.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod sweeper;
pub mod worker;

pub use client::{AccrualClient, AccrualError, AccrualReply, Poll};
pub use sweeper::run_sweeper;
pub use worker::run_worker;

/// Capacity of the pending-orders queue.
pub const ORDERS_QUEUE_CAPACITY: usize = 255;
