pub mod builder;
pub mod coverage;
pub mod error;
pub mod types;

pub use builder::{build_test_run, parse_duration_label};
pub use coverage::{build_coverage, line_ratio, CoverageFile, CoverageReport, CoverageTarget};
pub use error::{ModelError, ModelResult};
pub use types::{
    Counts, Device, Failure, GroupKind, SourceLocation, TestCase, TestGroup, TestNode, TestRun,
    TestStatus, Verdict,
};

pub mod prelude {
    pub use crate::builder::*;
    pub use crate::coverage::*;
    pub use crate::error::*;
    pub use crate::types::*;
}
