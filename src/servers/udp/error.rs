//! Reasons to drop an inbound datagram.
//!
//! None of these produce a reply: the datagram is counted in the `errors`
//! counter and discarded, and the tracker never mutates state for a dropped
//! request.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The datagram is shorter than its action requires.
    #[error("malformed frame: {len} bytes")]
    MalformedFrame { len: usize },

    /// The action field names no known request type.
    #[error("unknown action: {action}")]
    UnknownAction { action: u32 },

    /// The connection id does not match the source endpoint, or a connect
    /// request carried something other than the protocol magic.
    #[error("connection id could not be verified")]
    BadCookie,
}
