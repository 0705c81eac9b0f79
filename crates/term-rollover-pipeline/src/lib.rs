//! End-of-term pipelines over a course store: rollover, the archive shaping
//! passes and snapshot, and secondary-to-primary reconciliation.

mod archive;
mod carry_forward;
mod config;
mod executor;
mod reconcile;
mod rollover;
mod shaping;
mod terms;

#[cfg(test)]
mod test_support;

pub use archive::{
    archive_tables, ArchiveReport, ArchiveSnapshotter, ArchiveTable, Selection, TableCopy,
    PRECONDITION_TABLES,
};
pub use carry_forward::{IncompleteSnapshot, OpenIncomplete};
pub use config::{
    Config, ConfigError, ProfileConfig, ProfilesConfig, ReconcileConfig, ARCHIVE,
    DEFAULT_CONFIG_FILE, PRIMARY, SECONDARY,
};
pub use executor::{
    Action, ActionReport, Forward, RunMode, StageExecutor, StageOutcome, StagePlan, StageReport,
};
pub use reconcile::{FamilyReport, ReconcileReport, Reconciler};
pub use rollover::{
    rollover_stages, PlanContext, RolloverOptions, RolloverPipeline, RolloverReport, Stage,
    ADVANCE_INCOMPLETES,
};
pub use shaping::{ShapingContext, ShapingKind, ShapingPass, ShapingReport};
pub use terms::resolve_terms;
