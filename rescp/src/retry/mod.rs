//! Retrying transfers
// (c) 2026 rescp developers
//!
//! A [`RetryController`] repeats a fallible attempt according to a [`RetryPolicy`], sleeping
//! per the policy's [`Backoff`] schedule between attempts. Attempts are strictly sequential.
//! Both the sleeps and the attempts can be cut short by a cancellation token or an overall
//! deadline.

mod backoff;
mod controller;
mod policy;

pub use backoff::Backoff;
pub use controller::RetryController;
pub use policy::RetryPolicy;
