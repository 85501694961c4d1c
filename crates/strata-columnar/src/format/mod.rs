//! On-disk layout of a columnar file.
//!
//! ```text
//! +--------------------------------------------------+
//! | FileHeader (16 bytes)                            |
//! +--------------------------------------------------+
//! | Stripe 0: column 0 stream | column 1 stream | ... |
//! | Stripe 1: ...                                    |
//! +--------------------------------------------------+
//! | Footer (variable)                                |
//! +--------------------------------------------------+
//! | FileTail (24 bytes)                              |
//! +--------------------------------------------------+
//! ```
//!
//! The tail is always written last. A file whose last bytes are not a valid
//! tail was never finalized and is rejected by readers.

mod footer;
mod header;

pub use footer::{Footer, FooterFlags, StreamInfo, StripeInfo};
pub use header::{FileHeader, FileTail};
