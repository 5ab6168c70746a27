pub mod account_record;
pub mod accounts;
