pub mod inventory;
pub mod report;
pub mod status;
