//! # coderism - parameters and workspace tags of coder templates
//!
//! ## Introduction for developers
//!
//! Read this to understand how `coderism` works internally.
//!
//! A coder template is a terraform module. Before anything is provisioned, two things have to be known about it:
//! - the parameters a user is asked for (`data "coder_parameter"` blocks)
//! - the workspace tags used to pick a provisioner (`data "coder_workspace_tags"` blocks)
//!
//! Both are computed from the configuration alone. Anything that depends on provisioning (resource ids, image
//! digests, ...) is not known at this point and is reported as such.
//!
//! ### HCL Terms
//!
//! In hcl terms...
//! - a file gets parsed as a `body`
//! - ...which is just a list of `structures`
//! - ...where there are two kinds:
//!   - `attribute`: a "key = value" pair
//!   - or `block`:
//!     - 1 `identifier`
//!     - followed by 0 or more `labels`
//!     - and a `body` enclosed in `{` and `}`
//!
//! ```hcl
//! data "coder_parameter" "region" {
//!   name    = "region"
//!   default = "us"
//!
//!   option {
//!     name  = "Europe"
//!     value = "eu"
//!   }
//! }
//! ```
//!
//! ### Loading files
//!
//! All `.tf` files of a directory are parsed with [hcl_edit] and collected by a [module::ModuleBuilder]. Each block
//! becomes a [block::ConfigBlock] that remembers the file and line it came from, so diagnostics can point there.
//! `.tfvars` files assign values to variables.
//!
//! ### Evaluation
//!
//! see [module::ModuleBuilder::build]
//!
//! We use [hcl::eval] to evaluate expressions. It has no notion of values that are not known yet, so every
//! expression is scanned for references first ([scope::EvalContext::evaluate]):
//!
//! | **reference**                       | **result**                              |
//! |-------------------------------------|-----------------------------------------|
//! | `var.region` with a default         | the default                             |
//! | `var.region` without a default      | unknown                                 |
//! | `docker_image.ubuntu.repo_digest`   | unknown (computed during apply)         |
//! | `foo_bar.baz`                       | error: there is no variable `foo_bar`   |
//!
//! Blocks reference each other in any order. The module scope is computed in repeated passes until it settles, then
//! every attribute is evaluated and `dynamic` blocks are expanded.
//!
//! ### Extraction
//!
//! see [extract::extract]
//!
//! 1. [parameters] resolves every parameter and writes its value back into the scope
//!    (`data.coder_parameter.<name>.value`)
//! 2. [workspace_tags] checks that tags are written as an object literal ([policy]) and evaluates each pair
//!
//! Problems never abort an extraction. They are collected as [diagnostics::Diagnostic]s next to whatever could be
//! resolved.
//!
//! ### Output
//!
//! [extract::Output] is serialized via [serde].
//!
pub mod attributes;
pub mod block;
pub mod coerce;
pub mod diagnostics;
mod evaluator;
pub mod extract;
pub mod module;
pub mod parameters;
pub mod policy;
pub mod scope;
pub mod typeexpr;
mod util;
pub mod value;
mod visit;
pub mod workspace_tags;

pub use extract::{extract, Input, Output};
pub use module::{Module, ModuleBuilder, ModuleGraph};
