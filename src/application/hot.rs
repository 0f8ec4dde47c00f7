//! Hot-question ranking and the rotating display window.

use std::{cmp::Reverse, collections::HashMap};

use qbank_api_types::{Category, Question, RecordId};
use serde::Serialize;

/// Maximum number of questions kept in the pool.
pub const POOL_CAPACITY: usize = 50;
/// Number of questions shown per window.
pub const WINDOW_SIZE: usize = 10;

/// Top questions by hot score, highest first. Ties keep their input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HotQuestionPool {
    questions: Vec<Question>,
}

pub fn build_pool(questions: &[Question]) -> HotQuestionPool {
    let mut pool = questions.to_vec();
    pool.sort_by_key(|question| Reverse(question.effective_hot_score()));
    pool.truncate(POOL_CAPACITY);
    HotQuestionPool { questions: pool }
}

impl HotQuestionPool {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Offset reduced into the pool. Pools that fit in one window always
    /// start at zero.
    pub fn normalize_offset(&self, offset: usize) -> usize {
        if self.questions.len() <= WINDOW_SIZE {
            0
        } else {
            offset % self.questions.len()
        }
    }

    /// Up to [`WINDOW_SIZE`] questions starting at `offset`, wrapping to the
    /// start of the pool when the end is reached.
    pub fn window(&self, offset: usize) -> Vec<&Question> {
        if self.questions.len() <= WINDOW_SIZE {
            return self.questions.iter().collect();
        }

        let len = self.questions.len();
        let start = self.normalize_offset(offset);
        (0..WINDOW_SIZE)
            .map(|step| &self.questions[(start + step) % len])
            .collect()
    }

    /// The window with display ranks. Ranks count from the window offset,
    /// so the top-three badges follow the rotation.
    pub fn ranked_window(&self, offset: usize) -> Vec<RankedQuestion<'_>> {
        let start = self.normalize_offset(offset);
        self.window(offset)
            .into_iter()
            .enumerate()
            .map(|(index, question)| {
                let rank = start + index + 1;
                RankedQuestion {
                    rank,
                    badge: RankBadge::for_rank(rank),
                    question,
                }
            })
            .collect()
    }
}

/// Rotating cursor over a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HotWindow {
    offset: usize,
}

impl HotWindow {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    pub fn offset(self) -> usize {
        self.offset
    }

    /// Move to the next page: `(offset + 10) mod max(10, pool_len)`.
    pub fn advance(&mut self, pool_len: usize) {
        let modulus = pool_len.max(WINDOW_SIZE);
        self.offset = (self.offset % modulus + WINDOW_SIZE) % modulus;
    }

    pub fn advanced(mut self, pool_len: usize) -> Self {
        self.advance(pool_len);
        self
    }
}

/// Emphasis for the first three display ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBadge {
    Gold,
    Silver,
    Bronze,
}

impl RankBadge {
    pub fn for_rank(rank: usize) -> Option<Self> {
        match rank {
            1 => Some(RankBadge::Gold),
            2 => Some(RankBadge::Silver),
            3 => Some(RankBadge::Bronze),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedQuestion<'a> {
    pub rank: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<RankBadge>,
    pub question: &'a Question,
}

/// Category names keyed by id, for labelling feed entries.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    names: HashMap<RecordId, String>,
}

impl CategoryIndex {
    pub fn new(categories: &[Category]) -> Self {
        Self {
            names: categories
                .iter()
                .map(|category| (category.id, category.name.clone()))
                .collect(),
        }
    }

    pub fn name(&self, id: RecordId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(count: i64) -> HotQuestionPool {
        let questions: Vec<Question> = (1..=count)
            .map(|id| Question::new(id, format!("Q{id}"), 1).with_hot_score(1000 - id))
            .collect();
        build_pool(&questions)
    }

    fn ids(window: &[&Question]) -> Vec<RecordId> {
        window.iter().map(|question| question.id).collect()
    }

    #[test]
    fn sorts_by_score_with_missing_as_zero() {
        let questions = vec![
            Question::new(1, "a", 1).with_hot_score(5),
            Question::new(2, "b", 1).with_hot_score(20),
            Question::new(3, "c", 1),
        ];
        let pool = build_pool(&questions);
        let order: Vec<_> = pool.questions().iter().map(|q| q.id).collect();
        assert_eq!(order, [2, 1, 3]);
    }

    #[test]
    fn ties_keep_input_order() {
        let questions = vec![
            Question::new(1, "a", 1).with_hot_score(3),
            Question::new(2, "b", 1),
            Question::new(3, "c", 1).with_hot_score(3),
            Question::new(4, "d", 1).with_hot_score(0),
        ];
        let order: Vec<_> = build_pool(&questions)
            .questions()
            .iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(order, [1, 3, 2, 4]);
    }

    #[test]
    fn pool_is_capped() {
        assert_eq!(pool_of(80).len(), POOL_CAPACITY);
    }

    #[test]
    fn window_wraps_around_the_end() {
        let pool = pool_of(12);
        let window = pool.window(10);
        assert_eq!(ids(&window), [11, 12, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(HotWindow::new(10).advanced(pool.len()).offset(), 8);
    }

    #[test]
    fn small_pool_is_returned_as_is() {
        let pool = pool_of(4);
        assert_eq!(ids(&pool.window(0)), [1, 2, 3, 4]);
        assert_eq!(ids(&pool.window(7)), [1, 2, 3, 4]);
        assert_eq!(HotWindow::new(0).advanced(pool.len()).offset(), 0);
    }

    #[test]
    fn empty_pool_yields_empty_window() {
        let pool = build_pool(&[]);
        assert!(pool.window(0).is_empty());
        assert!(pool.window(25).is_empty());
        assert!(pool.ranked_window(3).is_empty());
        assert_eq!(HotWindow::new(0).advanced(pool.len()).offset(), 0);
    }

    #[test]
    fn advance_cycles_through_full_pool() {
        let pool = pool_of(50);
        let mut window = HotWindow::default();
        let mut offsets = Vec::new();
        for _ in 0..6 {
            offsets.push(window.offset());
            window.advance(pool.len());
        }
        assert_eq!(offsets, [0, 10, 20, 30, 40, 0]);
    }

    #[test]
    fn advance_from_huge_offset_stays_in_range() {
        let window = HotWindow::new(usize::MAX - 3).advanced(12);
        assert!(window.offset() < 12);
        assert_eq!(window.offset(), ((usize::MAX - 3) % 12 + 10) % 12);
        assert_eq!(HotWindow::new(usize::MAX).advanced(0).offset(), 5);
    }

    #[test]
    fn ranks_follow_the_window_offset() {
        let pool = pool_of(30);
        let first = pool.ranked_window(0);
        assert_eq!(first[0].rank, 1);
        assert_eq!(first[0].badge, Some(RankBadge::Gold));
        assert_eq!(first[2].badge, Some(RankBadge::Bronze));
        assert_eq!(first[3].badge, None);

        let second = pool.ranked_window(10);
        assert_eq!(second[0].rank, 11);
        assert!(second.iter().all(|entry| entry.badge.is_none()));
    }

    #[test]
    fn category_index_resolves_names() {
        let index = CategoryIndex::new(&[Category {
            id: 3,
            name: "Graphs".to_string(),
        }]);
        assert_eq!(index.name(3), Some("Graphs"));
        assert_eq!(index.name(4), None);
        assert_eq!(index.len(), 1);
    }
}
