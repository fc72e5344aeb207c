use std::cmp::Ordering;

pub mod validation;

pub const ELLIPSIS: &str = "...";

/// Indices of the `k` highest scores, best first.
///
/// Equal scores keep their input order and NaN scores rank last.
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut indexed_scores: Vec<(usize, f32)> = scores
        .iter()
        .enumerate()
        .map(|(i, &score)| (i, score))
        .collect();

    indexed_scores.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
        (false, false) => b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });

    indexed_scores
        .into_iter()
        .take(k)
        .map(|(i, _)| i)
        .collect()
}

/// Keeps the first `limit` characters and always appends the ellipsis marker.
pub fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

pub fn image_slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

pub fn image_url(prefix: &str, name: &str) -> String {
    format!("{}/{}.jpg", prefix.trim_end_matches('/'), image_slug(name))
}
