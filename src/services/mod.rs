pub mod dispatch_service;
pub mod health_service;
pub mod reassembly_service;
pub mod receipt_service;
