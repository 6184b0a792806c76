// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Linked-view state engine for antibody-escape mutation data.
//!
//! dms-viz keeps a mutation/site chart, a 3D structure view, and a legend
//! consistent with each other while the user switches datasets, metrics,
//! filters, and selections, and mirrors that state into the page URL.
//!
//! # Key entry points
//!
//! - [`tool::Tool`] - the orchestrator owning the canonical configuration
//! - [`data`] - dataset validation, site mapping, and metric summaries
//! - [`color`] - per-epitope color scales and site color maps
//! - [`options::ToolConfig`] - the canonical configuration and its options
//! - [`query`] - URL query-string codec for the configuration
//!
//! # Architecture
//!
//! Raw datasets are validated and normalized once per load. The tool then
//! pushes read-only projections of its [`options::ToolConfig`] to three
//! view controllers ([`views::ChartController`],
//! [`views::ProteinController`], [`views::LegendController`]), which
//! derive what to draw and hand it to pluggable renderers. Chart
//! selections reach the other views through a
//! [`broadcast::SelectionBroadcaster`].

pub mod broadcast;
pub mod color;
pub mod data;
pub mod error;
pub mod options;
pub mod query;
pub mod tool;
pub mod views;
#[cfg(feature = "web")]
pub mod web;

pub use error::DmsVizError;
pub use tool::Tool;
