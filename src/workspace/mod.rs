//! Workspace scanning: source analysis provider plus the parallel
//! invocation collector built on top of it.

mod collector;
mod provider;

pub use collector::collect_invocations;
pub use provider::{CallSite, CsWorkspace, ResolvedSymbol, SourceAnalysisProvider};
