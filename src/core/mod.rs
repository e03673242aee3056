// Core ledger data structures

mod types;
mod transaction;
mod serialize;
mod hash;

pub use types::*;
pub use transaction::*;
pub use serialize::*;
pub use hash::*;
