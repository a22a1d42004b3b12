pub mod carrier;
pub mod correlation;
pub mod queue;
pub mod redis;
