// Training module - run specifications, trainer launch and the sweep loop

pub mod launcher;
pub mod metrics;
pub mod run_spec;
pub mod sweep;

pub use launcher::{SubprocessLauncher, TrainingInvocation, TrainingLauncher};
pub use metrics::{tail_lines, RunSummary};
pub use run_spec::{default_runs, validate_sweep, RunSpec};
pub use sweep::{RunSequencer, Settle, SweepReport, TokioSettle};
