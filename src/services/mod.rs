pub mod admin;
pub mod condition_checker;
pub mod conditions;
pub mod tester;

pub use admin::AdminService;
pub use condition_checker::{CheckerOutcome, CheckerResult, ConditionChecker};
pub use conditions::{
    ActiveCondition, AtLeastCount, Condition, ExactCount, RunFor, StreamContents, TupleCheck,
};
pub use tester::{TestResult, Tester};
