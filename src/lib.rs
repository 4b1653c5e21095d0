//! DORA metrics over a history of change events
//!
//! Change events (merges, releases) come from an [`EventSource`], are
//! classified as success, failure or recovery, cut into fixed-size time
//! windows and reduced to one [`MetricSnapshot`] per window. An optional
//! trailing moving average smooths the series.

pub mod classifier;
pub mod config;
pub mod error;
pub mod interval;
pub mod metrics;
pub mod model;
pub mod moving_average;
pub mod output;
pub mod pipeline;
pub mod source;
pub mod window;

pub use classifier::{OutcomeClassifier, TagMatcher};
pub use config::{ReportConfig, ReportRange};
pub use error::{ReportError, Result};
pub use metrics::MetricSnapshot;
pub use model::{ChangeEvent, ClassifiedEvent, ResolvedOutcome, Signal};
pub use moving_average::MetricAverages;
pub use pipeline::{Report, ReportPipeline};
pub use source::{EventSource, LeadTimeResolver};
