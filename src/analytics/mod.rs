pub mod sink;
pub mod types;

pub use sink::{dispatch_activity, AnalyticsSink, HttpAnalyticsSink, NoopSink};
pub use types::{ActivityEvent, ActivityKind, SurveyResponse, SurveySubmission};
