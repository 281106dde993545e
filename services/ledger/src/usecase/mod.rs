pub mod access_code;
pub mod ledger;
pub mod metered;
pub mod usage;
