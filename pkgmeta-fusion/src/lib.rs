//! pkgmeta-fusion library interface
//!
//! Two tiers over per-provider package records:
//! - **fusion** - field-wise aggregation into one merged record plus a
//!   confidence map
//! - **validators** - quality audit of a candidate record against the raw
//!   provider data
//!
//! Both tiers are pure and synchronous.

pub mod fusion;
pub mod types;
pub mod validators;

pub use fusion::{low_confidence_fields, Aggregator};
pub use types::{
    AggregationResult, Clock, ConfidenceMap, ConflictMap, ConflictResolutionStrategy, DataPoint,
    FixedClock, QualityReport, SourceInfo, SystemClock,
};
pub use validators::QualityAuditor;
