use std::cmp::Ordering;

use crate::models::coin::CoinRecord;
use crate::models::view::{
    ColumnSort, PageMarker, SortDirection, SortField, TabFilter, ViewPage, ViewState,
};
use crate::services::format_service::parse_numeric;

/// Pages shown in the pagination strip before it collapses into ellipses.
const MAX_VISIBLE_PAGES: usize = 5;

/// Filter → sort → paginate over a registry snapshot.
///
/// Pure and deterministic: the same records and `ViewState` always give the
/// same page. No I/O, no clock.
pub struct ViewPipeline;

impl ViewPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Compute the visible page for `state`.
    ///
    /// 1. Keep rows matching the network filter.
    /// 2. Order by the tab default, unless an explicit column sort is set,
    ///    in which case that sort alone decides the order.
    /// 3. Clamp the requested page into `1..=max(1, total_pages)` and slice.
    pub fn compute(&self, records: &[CoinRecord], state: &ViewState) -> ViewPage {
        let mut filtered: Vec<&CoinRecord> = records
            .iter()
            .filter(|c| state.network.matches(c.network.as_deref()))
            .collect();

        match state.column_sort {
            Some(sort) => Self::sort_by_column(&mut filtered, sort),
            None => Self::sort_by_tab(&mut filtered, state.tab),
        }

        let per_page = state.items_per_page.max(1);
        let filtered_count = filtered.len();
        let total_pages = filtered_count.div_ceil(per_page);
        let current_page = state.current_page.clamp(1, total_pages.max(1));

        let start = (current_page - 1) * per_page;
        let records = filtered
            .into_iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect();

        ViewPage {
            records,
            current_page,
            total_pages,
            filtered_count,
        }
    }

    /// Pagination strip: every page when there are few, otherwise first,
    /// a window around `current`, and last, with ellipses for the gaps.
    pub fn page_numbers(&self, current: usize, total: usize) -> Vec<PageMarker> {
        if total <= MAX_VISIBLE_PAGES {
            return (1..=total).map(PageMarker::Page).collect();
        }

        let mut pages = vec![PageMarker::Page(1)];
        let start = current.saturating_sub(1).max(2);
        let end = (current + 1).min(total - 1);

        if start > 2 {
            pages.push(PageMarker::Ellipsis);
        }
        pages.extend((start..=end).map(PageMarker::Page));
        if end < total - 1 {
            pages.push(PageMarker::Ellipsis);
        }
        pages.push(PageMarker::Page(total));
        pages
    }

    fn sort_by_tab(coins: &mut [&CoinRecord], tab: TabFilter) {
        match tab {
            TabFilter::Top => coins.sort_by(|a, b| match (a.rank, b.rank) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }),
            TabFilter::Trending => {
                coins.sort_by(|a, b| parse_numeric(&b.volume).total_cmp(&parse_numeric(&a.volume)))
            }
            TabFilter::MostVisited => {
                coins.sort_by(|a, b| b.view_count.unwrap_or(0).cmp(&a.view_count.unwrap_or(0)))
            }
            TabFilter::New => coins.sort_by(|a, b| {
                let ts = |c: &CoinRecord| c.date_add.map(|d| d.timestamp_millis()).unwrap_or(0);
                ts(*b).cmp(&ts(*a))
            }),
            TabFilter::Gainers => coins.sort_by(|a, b| {
                parse_numeric(&b.change_24h).total_cmp(&parse_numeric(&a.change_24h))
            }),
        }
    }

    fn sort_by_column(coins: &mut [&CoinRecord], sort: ColumnSort) {
        let key = |c: &CoinRecord| -> f64 {
            match sort.field {
                // Unranked rows compare as +inf.
                SortField::Rank => c.rank.map(f64::from).unwrap_or(f64::INFINITY),
                SortField::MarketCap => parse_numeric(&c.market_cap),
                SortField::Volume => parse_numeric(&c.volume),
            }
        };
        coins.sort_by(|a, b| {
            let ord = key(*a).total_cmp(&key(*b));
            match sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }
}

impl Default for ViewPipeline {
    fn default() -> Self {
        Self::new()
    }
}
