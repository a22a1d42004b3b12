pub mod reassembly_reaper;
pub mod submit;

pub use reassembly_reaper::ReassemblyReaperWorker;
pub use submit::SubmitWorker;
