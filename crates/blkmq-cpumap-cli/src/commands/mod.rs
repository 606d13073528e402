//! CLI command implementations.

mod apply;
mod route;
mod show;
mod simulate;

pub use apply::{apply, ApplyArgs};
pub use route::{route, RouteArgs};
pub use show::{show, ShowArgs};
pub use simulate::{simulate, SimulateArgs};
