//! Association reassignment planning for tag merges.
//!
//! Both storage backends compute the rows to insert with [`plan_reassignment`]
//! inside their own transaction, so the union rule lives in one place.

use std::collections::HashSet;

use uuid::Uuid;

/// Articles that must be newly linked to the target when merging.
///
/// Returns every source article that the target is not already linked to,
/// in source order and without duplicates. Linking exactly these keeps the
/// `(target, article)` pair unique while making the target's set the union
/// of both.
pub fn plan_reassignment(source_articles: &[Uuid], target_articles: &[Uuid]) -> Vec<Uuid> {
    let mut linked: HashSet<Uuid> = target_articles.iter().copied().collect();
    source_articles
        .iter()
        .copied()
        .filter(|id| linked.insert(*id))
        .collect()
}
