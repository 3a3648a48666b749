pub mod date_resolver;
pub mod forward_pass;

pub use date_resolver::{DateResolver, EndSource, ResolveContext, Resolution};
pub use forward_pass::{ForwardPass, ResolutionKind, ResolvedDates};
