//! Sources published as dated editions or issues.

pub mod department_of_product;
pub mod tldr;
pub mod ux_design_weekly;

pub use department_of_product::DepartmentOfProductScraper;
pub use tldr::TldrScraper;
pub use ux_design_weekly::UxDesignWeeklyScraper;
