//! Chain data model: hashes, payload variants, outputs, transactions, assets.

pub mod asset;
pub mod hashes;
pub mod output;
pub mod output_payload;
pub mod transaction;
pub mod tx_payload;

pub use asset::Asset;
pub use hashes::{UInt168, UInt256};
pub use output::TransactionOutput;
pub use output_payload::{OutputPayload, OutputType, PayloadMismatch, VoteContent};
pub use transaction::{Transaction, TxInput, TxVersion};
pub use tx_payload::{TransactionPayload, TxType};
