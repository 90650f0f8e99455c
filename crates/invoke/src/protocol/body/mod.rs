//! Request body handling for synthesized requests.
//!
//! An invocation has no socket: the whole request body arrives inside the
//! event. [`ReqBody`] still exposes it through the standard `http_body::Body`
//! trait so handlers read it the same way they read a streamed body.
//!
//! # Delivery guarantees
//!
//! - Nothing is delivered before the first poll engages the body
//! - Engagement yields one executor turn before the data frame is released
//! - The decoded body is delivered at most once, as a single frame
//! - End of stream is reported after the data frame and on every later poll
//!
//! See [`ReqBody`] for the state machine.

mod req_body;

pub use req_body::ReqBody;
