//! Change-set sources: the GitLab webhook and the repository poller.
//!
//! Both turn repository activity into a [`ChangeSet`](crate::engine::ChangeSet)
//! and hand it to [`Engine::push_pass`](crate::engine::Engine::push_pass).

pub mod poller;
pub mod webhook;

pub use poller::Poller;
pub use webhook::{process_event, router, run_worker, serve, serve_on, PushEvent};
