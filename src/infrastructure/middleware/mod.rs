// ViewerContext middleware and extractor
// Resolves the caller once per request so handlers only see a ViewerContext

pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use viewer_context_extractor::Vc;
pub use viewer_context_middleware::*;
