//! Sources read from an RSS or Atom feed.

pub mod figma_release_notes;
pub mod prototypr;
pub mod ux_matters;
pub mod ux_planet;

pub use figma_release_notes::FigmaReleaseNotesScraper;
pub use prototypr::PrototyprScraper;
pub use ux_matters::UxMattersScraper;
pub use ux_planet::UxPlanetScraper;
