use futures::future::BoxFuture;
use tracing::debug;

use crate::state::room::ItemKind;

/// How many times a generation is attempted before falling back to the
/// "no content available" placeholder.
pub const MAX_GENERATION_ATTEMPTS: u32 = 5;

/// Best-effort content generation collaborator.
///
/// Implementations may be slow or fail; the engine treats `None` as "nothing
/// generated" and never propagates a generation failure. `existing` carries
/// the texts already in play so the generator can avoid duplicates.
pub trait ContentGenerator: Send + Sync {
    /// Produce one new prompt of `kind`, or `None` on failure.
    fn generate(&self, kind: ItemKind, existing: Vec<String>) -> BoxFuture<'static, Option<String>>;
}

/// Generator used when AI generation is switched off entirely.
pub struct DisabledGenerator;

impl ContentGenerator for DisabledGenerator {
    fn generate(&self, _kind: ItemKind, _existing: Vec<String>) -> BoxFuture<'static, Option<String>> {
        Box::pin(async { None })
    }
}

/// Run up to [`MAX_GENERATION_ATTEMPTS`] generation attempts, returning the
/// first non-empty result. Callers must not hold a room lock across this.
pub(crate) async fn generate_with_retries(
    generator: &dyn ContentGenerator,
    kind: ItemKind,
    existing: &[String],
) -> Option<String> {
    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        if let Some(text) = generator.generate(kind, existing.to_vec()).await {
            if !text.trim().is_empty() {
                return Some(text);
            }
        }
        debug!(%kind, attempt, "content generation attempt produced nothing");
    }
    None
}
