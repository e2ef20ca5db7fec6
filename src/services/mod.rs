//! Business services. Each service owns one slice of the domain and is the
//! only place where that slice's invariants are enforced; handlers stay thin.

pub mod cart;
pub mod catalog;
pub mod offers;
pub mod orders;
pub mod reviews;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use offers::OfferService;
pub use orders::OrderService;
pub use reviews::ReviewService;

use serde::Deserialize;

/// Page-based listing parameters shared by the list operations.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl Pagination {
    /// Clamped to sane bounds; page numbering is 1-based.
    pub fn normalize(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1) * self.per_page
    }
}
