pub mod access_codes;
pub mod usage_records;
