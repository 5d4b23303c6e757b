pub mod policy;
pub mod reports;
pub mod seeds;
pub mod simulation;

pub use policy::PolicyKind;
pub use seeds::{resolve_seed_inputs, split_csv};
pub use simulation::{PolicyAggregate, RunRecord, SimulationPlan, aggregate, run_plan};
