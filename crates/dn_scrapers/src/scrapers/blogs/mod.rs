//! Sources read from an HTML listing page.

pub mod figma_blog;
pub mod nngroup;
pub mod smashing;
pub mod ux_collective;
pub mod ux_movement;

pub use figma_blog::FigmaBlogScraper;
pub use nngroup::NnGroupScraper;
pub use smashing::SmashingMagazineScraper;
pub use ux_collective::UxCollectiveScraper;
pub use ux_movement::UxMovementScraper;

use dn_core::{ArticleCandidate, Result};
use scraper::{ElementRef, Html};

use super::utils;
use super::SourceMetadata;
use crate::context::SeenUrls;

/// Runs `parse_item` over every node matching `css`, skipping `Ok(None)`,
/// logging `Err` and dropping URLs already emitted.
pub(crate) fn collect_items<F>(
    document: &Html,
    css: &str,
    metadata: &SourceMetadata,
    seen: &mut SeenUrls,
    mut parse_item: F,
) -> Result<Vec<ArticleCandidate>>
where
    F: FnMut(ElementRef) -> Result<Option<ArticleCandidate>>,
{
    let sel = utils::selector(css)?;
    let mut candidates = Vec::new();
    for node in document.select(&sel) {
        match parse_item(node) {
            Ok(Some(candidate)) => {
                if seen.insert(&candidate.url) {
                    candidates.push(candidate);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(source = metadata.name, error = %e, "skipping unparseable item"),
        }
    }
    Ok(candidates)
}
