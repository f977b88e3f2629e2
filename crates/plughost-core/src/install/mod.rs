//! # plughost Install
//!
//! Turns a repository reference or a local directory into a built artifact
//! under the plugin layout.
//!
//! - **[`spec`]**: Parsing of `<repo-url>[@<version>|@latest]` arguments.
//! - **[`resolver`]**: Selection of a release tag for a [`VersionRequest`].
//! - **[`vcs`]**: The [`VersionControl`](vcs::VersionControl) collaborator
//!   and its `git` implementation.
//! - **[`toolchain`]**: The [`BuildToolchain`](toolchain::BuildToolchain)
//!   collaborator and its `cargo` implementation.
//! - **[`installer`]**: [`Installer`], which ties the above together.
pub mod error;
pub mod installer;
pub mod resolver;
pub mod spec;
pub mod toolchain;
pub mod vcs;

pub use error::{InstallError, ResolutionError, ToolchainError, VcsError};
pub use installer::{InstallOutcome, Installer};
pub use resolver::{Revision, TagReference, VersionRequest, resolve};
pub use spec::InstallSpec;
pub use toolchain::{BuildToolchain, CargoToolchain};
pub use vcs::{GitCli, VersionControl};
