use serde::{Deserialize, Serialize};

use super::coin::CoinRecord;

/// Rows per page unless configured otherwise.
pub const DEFAULT_ITEMS_PER_PAGE: usize = 15;

/// Which network's coins to show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkFilter {
    #[default]
    All,
    Named(String),
}

impl NetworkFilter {
    /// `"All"` / `"All Networks"` (any case) mean no filter; anything else names a network.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("all")
            || trimmed.eq_ignore_ascii_case("all networks")
        {
            NetworkFilter::All
        } else {
            NetworkFilter::Named(trimmed.to_string())
        }
    }

    pub fn matches(&self, network: Option<&str>) -> bool {
        match self {
            NetworkFilter::All => true,
            NetworkFilter::Named(name) => network == Some(name.as_str()),
        }
    }
}

/// Named default ordering preset selected by a tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TabFilter {
    /// Ascending rank.
    #[default]
    Top,
    /// Descending 24h volume.
    Trending,
    /// Descending view count.
    MostVisited,
    /// Newest listing first.
    New,
    /// Descending 24h change.
    Gainers,
}

impl TabFilter {
    pub const ALL: [TabFilter; 5] = [
        TabFilter::Top,
        TabFilter::Trending,
        TabFilter::MostVisited,
        TabFilter::New,
        TabFilter::Gainers,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TabFilter::Top => "Top",
            TabFilter::Trending => "Trending",
            TabFilter::MostVisited => "Most Visited",
            TabFilter::New => "New",
            TabFilter::Gainers => "Gainers",
        }
    }
}

impl std::fmt::Display for TabFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortField {
    Rank,
    MarketCap,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// A column sort the user explicitly chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSort {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Everything that decides which rows are visible.
///
/// `column_sort` is `None` until the user picks a column; while it is `None`
/// the tab's default ordering applies. Once set it replaces the tab order
/// outright, even when it happens to be rank ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub network: NetworkFilter,
    pub tab: TabFilter,
    pub column_sort: Option<ColumnSort>,
    /// 1-based.
    pub current_page: usize,
    pub items_per_page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_ITEMS_PER_PAGE)
    }
}

impl ViewState {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            network: NetworkFilter::All,
            tab: TabFilter::Top,
            column_sort: None,
            current_page: 1,
            items_per_page: items_per_page.max(1),
        }
    }

    /// Change the network filter and go back to the first page.
    pub fn select_network(&mut self, network: NetworkFilter) {
        self.network = network;
        self.current_page = 1;
    }

    /// Change the tab and go back to the first page.
    pub fn select_tab(&mut self, tab: TabFilter) {
        self.tab = tab;
        self.current_page = 1;
    }

    /// Column header click: same field flips direction, a new field starts descending.
    pub fn sort_by(&mut self, field: SortField) {
        self.column_sort = Some(match self.column_sort {
            Some(current) if current.field == field => ColumnSort {
                field,
                direction: current.direction.toggled(),
            },
            _ => ColumnSort {
                field,
                direction: SortDirection::Desc,
            },
        });
    }

    /// Drop the explicit column sort and go back to the first page.
    pub fn clear_sort(&mut self) {
        self.column_sort = None;
        self.current_page = 1;
    }

    /// Move to `page` if it lies in `1..=total_pages`; returns whether it moved.
    pub fn go_to_page(&mut self, page: usize, total_pages: usize) -> bool {
        if page < 1 || page > total_pages {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn next_page(&mut self, total_pages: usize) -> bool {
        if self.current_page < total_pages {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    pub fn previous_page(&mut self) -> bool {
        if self.current_page > 1 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }
}

/// Output of the view pipeline for one `ViewState`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewPage {
    pub records: Vec<CoinRecord>,
    /// Requested page after clamping into `1..=max(1, total_pages)`.
    pub current_page: usize,
    pub total_pages: usize,
    /// Rows left after the network filter, across all pages.
    pub filtered_count: usize,
}

impl Default for ViewPage {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            current_page: 1,
            total_pages: 0,
            filtered_count: 0,
        }
    }
}

impl ViewPage {
    /// Symbols on this page, in display order.
    pub fn symbols(&self) -> Vec<String> {
        self.records.iter().map(|c| c.symbol.clone()).collect()
    }
}

/// One entry of the pagination strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageMarker {
    Page(usize),
    Ellipsis,
}
