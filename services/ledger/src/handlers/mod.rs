pub mod access_code;
pub mod health;
pub mod ledger;
pub mod usage;
