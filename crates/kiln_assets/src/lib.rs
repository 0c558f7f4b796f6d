//! Deterministic, content-addressed asset groups.
//!
//! An asset group maps an ordered list of stylesheet or script sources onto a
//! single output file. Sources are loaded, adjacent source-language fragments
//! are joined, and the result is fingerprinted and compared against the
//! generation ledger. Only when something changed are the external compilers
//! and compressor invoked and a new `[name-]<fingerprint>.<ext>` artifact
//! written.
//!
//! ```no_run
//! use kiln_assets::{AssetPipeline, Toolchain};
//!
//! let pipeline = AssetPipeline::new(Toolchain::external_defaults());
//! let css = pipeline
//!     .group(["assets/style/*.css", "assets/style/*.less"])
//!     .build("static", "app")?;
//! println!("stylesheet: {css}");
//! # Ok::<(), kiln_assets::BuildError>(())
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod fragment;
pub mod join;
pub mod pipeline;
pub mod resolve;
pub mod tool;

pub use error::BuildError;
pub use fragment::{Fragment, FragmentStore};
pub use join::join_adjacent;
pub use pipeline::{AssetGroup, AssetPipeline, BuildReport, GroupStatus};
pub use resolve::{GlobResolver, PathResolver, ResolveError};
pub use tool::{Compressor, ExternalCompressor, ExternalTool, ToolError, Toolchain, Transform};
