//! The capabilities the cache client does not own itself.
//!
//! The client never talks to the network directly: it goes through a [`fetch::Fetcher`]. Loading
//! can be observed and steered by user supplied [`hooks::LoadHooks`].

pub mod fetch;
pub mod hooks;
