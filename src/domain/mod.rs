pub mod correlation;
pub mod message;
pub mod receipt;
pub mod submission;
