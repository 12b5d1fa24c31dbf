use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dn_core::{ArticleCandidate, Result};

use crate::context::ScrapeContext;

pub mod blogs;
pub mod feed;
pub mod feeds;
pub mod newsletters;

use blogs::{FigmaBlogScraper, NnGroupScraper, SmashingMagazineScraper, UxCollectiveScraper, UxMovementScraper};
use feeds::{FigmaReleaseNotesScraper, PrototyprScraper, UxMattersScraper, UxPlanetScraper};
use newsletters::{DepartmentOfProductScraper, TldrScraper, UxDesignWeeklyScraper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCategory {
    Blog,
    Feed,
    Newsletter,
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceCategory::Blog => "blogs",
            SourceCategory::Feed => "feeds",
            SourceCategory::Newsletter => "newsletters",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetadata {
    /// Registry key, stored verbatim as the article's `source`.
    pub name: &'static str,
    pub emoji: &'static str,
    /// Author used when the listing has none.
    pub default_author: &'static str,
    pub category: SourceCategory,
    /// Every candidate is kept whatever its date.
    pub skip_date_filter: bool,
}

#[async_trait]
pub trait SourceExtractor: Send + Sync {
    fn source_metadata(&self) -> SourceMetadata;

    /// Fetches, parses and window-filters this source's listing.
    /// `Err` means the primary resource could not be read at all.
    async fn extract(&self) -> Result<Vec<ArticleCandidate>>;
}

/// Every source the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    SmashingMagazine,
    NnGroup,
    FigmaBlog,
    UxPlanet,
    UxMatters,
    UxCollective,
    DepartmentOfProduct,
    TldrNewsletter,
    Prototypr,
    FigmaReleaseNotes,
    UxMovement,
    UxDesignWeekly,
}

impl SourceKind {
    pub const ALL: [SourceKind; 12] = [
        SourceKind::SmashingMagazine,
        SourceKind::NnGroup,
        SourceKind::FigmaBlog,
        SourceKind::UxPlanet,
        SourceKind::UxMatters,
        SourceKind::UxCollective,
        SourceKind::DepartmentOfProduct,
        SourceKind::TldrNewsletter,
        SourceKind::Prototypr,
        SourceKind::FigmaReleaseNotes,
        SourceKind::UxMovement,
        SourceKind::UxDesignWeekly,
    ];

    pub fn metadata(self) -> SourceMetadata {
        match self {
            SourceKind::SmashingMagazine => SmashingMagazineScraper::METADATA,
            SourceKind::NnGroup => NnGroupScraper::METADATA,
            SourceKind::FigmaBlog => FigmaBlogScraper::METADATA,
            SourceKind::UxPlanet => UxPlanetScraper::METADATA,
            SourceKind::UxMatters => UxMattersScraper::METADATA,
            SourceKind::UxCollective => UxCollectiveScraper::METADATA,
            SourceKind::DepartmentOfProduct => DepartmentOfProductScraper::METADATA,
            SourceKind::TldrNewsletter => TldrScraper::METADATA,
            SourceKind::Prototypr => PrototyprScraper::METADATA,
            SourceKind::FigmaReleaseNotes => FigmaReleaseNotesScraper::METADATA,
            SourceKind::UxMovement => UxMovementScraper::METADATA,
            SourceKind::UxDesignWeekly => UxDesignWeeklyScraper::METADATA,
        }
    }

    pub fn name(self) -> &'static str {
        self.metadata().name
    }

    /// Short CLI alias.
    pub fn cli_name(self) -> &'static str {
        match self {
            SourceKind::SmashingMagazine => "smashing",
            SourceKind::NnGroup => "nngroup",
            SourceKind::FigmaBlog => "figma-blog",
            SourceKind::UxPlanet => "uxplanet",
            SourceKind::UxMatters => "uxmatters",
            SourceKind::UxCollective => "uxcollective",
            SourceKind::DepartmentOfProduct => "dept-of-product",
            SourceKind::TldrNewsletter => "tldr",
            SourceKind::Prototypr => "prototypr",
            SourceKind::FigmaReleaseNotes => "figma-release-notes",
            SourceKind::UxMovement => "uxmovement",
            SourceKind::UxDesignWeekly => "uxdesignweekly",
        }
    }

    /// Exact source name first, then the CLI alias.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == name)
            .or_else(|| Self::ALL.iter().copied().find(|k| k.cli_name() == name))
    }

    pub fn build(self, ctx: Arc<ScrapeContext>) -> Box<dyn SourceExtractor> {
        match self {
            SourceKind::SmashingMagazine => Box::new(SmashingMagazineScraper::new(ctx)),
            SourceKind::NnGroup => Box::new(NnGroupScraper::new(ctx)),
            SourceKind::FigmaBlog => Box::new(FigmaBlogScraper::new(ctx)),
            SourceKind::UxPlanet => Box::new(UxPlanetScraper::new(ctx)),
            SourceKind::UxMatters => Box::new(UxMattersScraper::new(ctx)),
            SourceKind::UxCollective => Box::new(UxCollectiveScraper::new(ctx)),
            SourceKind::DepartmentOfProduct => Box::new(DepartmentOfProductScraper::new(ctx)),
            SourceKind::TldrNewsletter => Box::new(TldrScraper::new(ctx)),
            SourceKind::Prototypr => Box::new(PrototyprScraper::new(ctx)),
            SourceKind::FigmaReleaseNotes => Box::new(FigmaReleaseNotesScraper::new(ctx)),
            SourceKind::UxMovement => Box::new(UxMovementScraper::new(ctx)),
            SourceKind::UxDesignWeekly => Box::new(UxDesignWeeklyScraper::new(ctx)),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use dn_core::{Error, Result};
    use scraper::{ElementRef, Html, Selector};
    use url::Url;

    pub fn selector(css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|e| Error::Parse(format!("invalid selector {:?}: {:?}", css, e)))
    }

    /// Trimmed text of an element with inner whitespace collapsed.
    pub fn text_of(element: &ElementRef) -> String {
        collapse_whitespace(&element.text().collect::<String>())
    }

    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// First match of `css` under `element`, as text. Empty text counts as absent.
    pub fn first_text(element: &ElementRef, css: &str) -> Result<Option<String>> {
        let sel = selector(css)?;
        Ok(element
            .select(&sel)
            .next()
            .map(|el| text_of(&el))
            .filter(|t| !t.is_empty()))
    }

    pub fn first_attr(element: &ElementRef, css: &str, attr: &str) -> Result<Option<String>> {
        let sel = selector(css)?;
        Ok(element
            .select(&sel)
            .next()
            .and_then(|el| el.value().attr(attr))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    /// Resolves `href` against `base`; absolute links pass through.
    pub fn absolute_url(base: &str, href: &str) -> Result<String> {
        let href = href.trim();
        if href.starts_with("http://") || href.starts_with("https://") {
            return Ok(href.to_string());
        }
        let base = Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))?;
        base.join(href)
            .map(|u| u.to_string())
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", href, e)))
    }

    /// Plain text of an HTML fragment.
    pub fn strip_html(html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        collapse_whitespace(&fragment.root_element().text().collect::<String>())
    }

    /// `src` of the first `<img>` in an HTML fragment.
    pub fn first_image(html: &str) -> Option<String> {
        let fragment = Html::parse_fragment(html);
        let sel = Selector::parse("img").ok()?;
        let src = fragment.select(&sel).next()?.value().attr("src")?;
        Some(src.trim().to_string()).filter(|s| !s.is_empty())
    }

    /// Cuts `text` to at most `max` chars, marking the cut with `...`.
    pub fn truncate(text: &str, max: usize) -> String {
        if text.chars().count() <= max {
            return text.to_string();
        }
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut.trim_end())
    }
}
