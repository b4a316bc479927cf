//! Domain types for qwallet.

mod address;
mod amount;
mod history;
mod keys;
mod network;
mod record;
mod scheme;

pub use address::*;
pub use amount::*;
pub use history::*;
pub use keys::*;
pub use network::*;
pub use record::*;
pub use scheme::*;
