//! Greedy non-maximum suppression.

/// Keeps the best-scoring item of every conflicting group.
///
/// Items are stably sorted by descending score, so equal scores keep their
/// input order. Each item is accepted unless it conflicts with an item that
/// was already accepted.
pub fn suppress<T, S, C>(mut items: Vec<T>, score: S, conflicts: C) -> Vec<T>
where
    S: Fn(&T) -> f64,
    C: Fn(&T, &T) -> bool,
{
    items.sort_by(|a, b| score(b).total_cmp(&score(a)));

    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !kept.iter().any(|accepted| conflicts(accepted, &item)) {
            kept.push(item);
        }
    }
    kept
}
