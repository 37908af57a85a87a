//! The wallet's key-derivation capability, reduced to the one question the
//! sync session asks: does this program hash belong to us?

use crate::chain::UInt168;

/// Ownership oracle consulted during coinbase reconciliation.
pub trait AddressBook: Send + Sync {
	fn contains_program_hash(&self, program_hash: &UInt168) -> bool;
}

/// Fixed set of owned program hashes; enough for single-account wallets and
/// for tests.
pub struct StaticAddressBook {
	owned: Vec<UInt168>,
}

impl StaticAddressBook {
	pub fn new(owned: Vec<UInt168>) -> Self {
		Self { owned }
	}
}

impl AddressBook for StaticAddressBook {
	fn contains_program_hash(&self, program_hash: &UInt168) -> bool {
		self.owned.contains(program_hash)
	}
}
