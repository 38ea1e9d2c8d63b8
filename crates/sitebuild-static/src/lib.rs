//! Static site build pipeline.
//!
//! Assembles a deployable `build/` tree from a hand-written site: rewrites
//! favicon URLs for subdirectory hosting, prefixes and minifies the
//! stylesheet, copies scripts, fonts and favicons, and compresses images.

pub mod assets;
pub mod builder;
pub mod config;
pub mod copy;
pub mod html;
pub mod images;

pub use assets::CssProcessor;
pub use builder::{BuildError, BuildResult, SiteBuilder, Step, StepReport};
pub use config::{default_favicons, BuildConfig, Favicon};
