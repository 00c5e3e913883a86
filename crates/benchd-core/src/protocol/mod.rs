//! HTTP/1.x wire primitives.
//!
//! - `request`: incremental, panic-free request-head parser. Only framing data
//!   (method, target, version, body length, connection persistence) is extracted.
//! - `response`: the shared zero payload and the pre-encoded response heads.

pub mod request;
pub mod response;

pub use request::{parse_head, BodyFraming, Parsed, RequestHead, Version};
pub use response::{FixedPayload, BAD_REQUEST, PAYLOAD_LEN};
