//! Hallucination detection for Python snippets
//!
//! Extracts lexical, syntax-tree and surface features from source text,
//! vectorizes them against a frozen layout and classifies the result with a
//! random forest.
//!
//! ```no_run
//! use hdva::classifier::{synthesize, train, TrainConfig};
//! use hdva::detector::{Detector, Source};
//!
//! let outcome = train(&synthesize(500, 500, 42), &TrainConfig::default())?;
//! let detector = Detector::from_bundle(outcome.bundle);
//! let analysis = detector.analyze(Source::Text("df.whenify().transmute()"))?;
//! println!("{} (P={:.3})", analysis.label, analysis.probability);
//! # Ok::<(), hdva::error::HdvaError>(())
//! ```

pub mod cache;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod features;
pub mod models;
pub mod scan;

pub use cache::ModelCache;
pub use detector::{Analysis, Detector, Source};
pub use error::{HdvaError, HdvaResult};
pub use models::{Dataset, Label, LabeledExample};
