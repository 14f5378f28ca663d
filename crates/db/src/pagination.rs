//! Page-number pagination over sea-orm selects.

use qanda_common::AppResult;
use sea_orm::{DatabaseConnection, EntityTrait, ItemsAndPagesNumber, PaginatorTrait, Select};
use serde::Serialize;

/// One page of results, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Clamp a requested page number into `1..=total_pages`.
    ///
    /// Out-of-range requests land on the nearest existing page, so a stale
    /// `?page=` link still shows something.
    #[must_use]
    pub fn clamp_page(requested: u64, total_pages: u64) -> u64 {
        requested.max(1).min(total_pages.max(1))
    }

    /// Whether a later page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Transform the items, keeping the page metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Fetch page `page` (1-based) of `select`, `per_page` rows at a time.
pub async fn fetch_page<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    page: u64,
    per_page: u64,
) -> AppResult<Page<E::Model>>
where
    E: EntityTrait,
    E::Model: Send + Sync + 'static,
{
    let per_page = per_page.max(1);
    let paginator = select.paginate(db, per_page);
    let ItemsAndPagesNumber {
        number_of_items,
        number_of_pages,
    } = paginator.num_items_and_pages().await?;

    let page = Page::<E::Model>::clamp_page(page, number_of_pages);
    let items = paginator.fetch_page(page - 1).await?;

    Ok(Page {
        items,
        page,
        per_page,
        total_items: number_of_items,
        total_pages: number_of_pages,
    })
}
