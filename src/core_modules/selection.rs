// THEORY:
// The `SelectionState` is the browsing memory of the presentation shell. It is owned
// by the shell, not by the engine: the engine stays an immutable feature store plus
// pure ranking calls, and everything that changes while a user browses lives here.
//
// Key architectural principles:
// 1.  **Explicit State**: Current page, current query and current order are plain
//     fields of one value that the shell passes around. There is no hidden global.
// 2.  **Ranking Replaces, Paging Reads**: A new ranking fully replaces the current
//     order and sends the view back to the first page. Paging only moves a window
//     over the current order and never calls into the engine.
// 3.  **No-op Navigation**: Moving before the first page or past the last one leaves
//     the state untouched and reports that nothing changed.
// 4.  **Relevance Flags**: Per-image relevance marks are tracked and rendered, but
//     ranking never reads them. They are the hook for future relevance feedback.

use std::ops::Range;

use serde::Serialize;

use crate::core_modules::ImageId;
use crate::core_modules::distance::{Distance, serialize_optional_distance};
use crate::core_modules::feature_store::FeatureStore;
use crate::core_modules::ranker::{RankedOrder, RetrievalMethod, rank};
use crate::error::RetrievalError;

/// The shell never shows fewer images than this on one page.
pub const MIN_IMAGES_PER_PAGE: usize = 20;

/// One image slot of a rendered page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageEntry {
    /// 0-based position in the current order.
    pub position: usize,
    pub image_id: ImageId,
    pub file_name: String,
    /// Distance to the current query, when the order comes from a ranking.
    #[serde(serialize_with = "serialize_optional_distance")]
    pub distance: Option<Distance>,
    /// Relevance mark, only present while relevance marking is shown.
    pub relevant: Option<bool>,
}

/// Everything the shell needs to draw the current page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    /// 1-based page number, as displayed.
    pub page_number: usize,
    pub page_count: usize,
    pub query: Option<ImageId>,
    pub method: Option<RetrievalMethod>,
    pub entries: Vec<PageEntry>,
}

/// Shell-owned browsing state: page, query and the order being paged through.
#[derive(Debug, Clone)]
pub struct SelectionState {
    page: usize,
    images_per_page: usize,
    query: Option<ImageId>,
    order: Vec<ImageId>,
    ranking: Option<RankedOrder>,
    relevance: Vec<bool>,
    show_relevance: bool,
}

impl SelectionState {
    /// Starts on page 0 with the corpus in identity order `1..=corpus_size`.
    pub fn new(corpus_size: usize, images_per_page: usize) -> Self {
        let images_per_page = if images_per_page < MIN_IMAGES_PER_PAGE {
            log::warn!(
                "{} images per page is below the minimum, showing {}",
                images_per_page,
                MIN_IMAGES_PER_PAGE
            );
            MIN_IMAGES_PER_PAGE
        } else {
            images_per_page
        };
        Self {
            page: 0,
            images_per_page,
            query: None,
            order: (1..=corpus_size).collect(),
            ranking: None,
            relevance: vec![false; corpus_size],
            show_relevance: false,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn images_per_page(&self) -> usize {
        self.images_per_page
    }

    pub fn query(&self) -> Option<ImageId> {
        self.query
    }

    /// The order currently being paged through.
    pub fn order(&self) -> &[ImageId] {
        &self.order
    }

    /// The ranking that produced the current order, if any.
    pub fn ranking(&self) -> Option<&RankedOrder> {
        self.ranking.as_ref()
    }

    /// Selects the query image. The order is left alone until the next ranking.
    pub fn select_query(&mut self, id: ImageId) {
        self.query = Some(id);
    }

    pub fn clear_query(&mut self) {
        self.query = None;
    }

    /// Replaces the current order with a ranking and returns to the first page.
    pub fn apply_ranking(&mut self, ranking: RankedOrder) {
        self.order = ranking.ids();
        self.query = Some(ranking.query);
        self.ranking = Some(ranking);
        self.page = 0;
    }

    /// Ranks the corpus against the selected query and shows the result from page 0.
    ///
    /// On failure the state is left unchanged.
    pub fn retrieve(
        &mut self,
        store: &FeatureStore,
        method: RetrievalMethod,
    ) -> Result<(), RetrievalError> {
        let ranking = rank(store, self.query, method)?;
        self.apply_ranking(ranking);
        Ok(())
    }

    /// Restores corpus order `1..=N` and returns to the first page.
    pub fn reset_order(&mut self) {
        self.order = (1..=self.order.len()).collect();
        self.ranking = None;
        self.page = 0;
    }

    pub fn page_count(&self) -> usize {
        self.order.len().div_ceil(self.images_per_page)
    }

    /// Indices into the current order shown on the current page.
    pub fn page_range(&self) -> Range<usize> {
        let start = (self.page * self.images_per_page).min(self.order.len());
        let end = (start + self.images_per_page).min(self.order.len());
        start..end
    }

    /// Identifiers shown on the current page, in display order.
    pub fn current_page_ids(&self) -> &[ImageId] {
        &self.order[self.page_range()]
    }

    /// Advances one page. Returns `false`, and does nothing, on the last page.
    pub fn next_page(&mut self) -> bool {
        if (self.page + 1) * self.images_per_page < self.order.len() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Goes back one page. Returns `false`, and does nothing, on the first page.
    pub fn previous_page(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Jumps to a 0-based page. Out-of-range pages are ignored.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page < self.page_count() {
            self.page = page;
            true
        } else {
            false
        }
    }

    pub fn show_relevance(&self) -> bool {
        self.show_relevance
    }

    pub fn toggle_show_relevance(&mut self) -> bool {
        self.show_relevance = !self.show_relevance;
        log::info!(
            "Relevance marking {}",
            if self.show_relevance { "enabled" } else { "disabled" }
        );
        self.show_relevance
    }

    pub fn is_relevant(&self, id: ImageId) -> bool {
        id.checked_sub(1)
            .and_then(|index| self.relevance.get(index))
            .copied()
            .unwrap_or(false)
    }

    /// Marks or unmarks an image. Unknown identifiers are ignored.
    pub fn set_relevant(&mut self, id: ImageId, relevant: bool) {
        if let Some(flag) = id.checked_sub(1).and_then(|index| self.relevance.get_mut(index)) {
            *flag = relevant;
        }
    }

    pub fn toggle_relevant(&mut self, id: ImageId) {
        let relevant = self.is_relevant(id);
        self.set_relevant(id, !relevant);
    }

    pub fn relevant_ids(&self) -> Vec<ImageId> {
        self.relevance
            .iter()
            .enumerate()
            .filter(|&(_, &relevant)| relevant)
            .map(|(index, _)| index + 1)
            .collect()
    }

    /// Renders the current page, naming each image with `file_name`.
    pub fn current_page<F>(&self, file_name: F) -> PageView
    where
        F: Fn(ImageId) -> String,
    {
        let range = self.page_range();
        let entries = self.order[range.clone()]
            .iter()
            .zip(range)
            .map(|(&image_id, position)| PageEntry {
                position,
                image_id,
                file_name: file_name(image_id),
                distance: self.ranking.as_ref().and_then(|ranking| ranking.distance_to(image_id)),
                relevant: self.show_relevance.then(|| self.is_relevant(image_id)),
            })
            .collect();

        PageView {
            page_number: self.page + 1,
            page_count: self.page_count(),
            query: self.query,
            method: self.ranking.as_ref().map(|ranking| ranking.method),
            entries,
        }
    }
}
