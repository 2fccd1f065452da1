use std::cmp::Ordering;

/// 计算两个 f64 切片的余弦相似度
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot_product: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot_product / (norm_a * norm_b)
}

/// Indices and scores of the `k` embeddings closest to `query_embedding`, best first.
pub fn top_k(query_embedding: &[f64], embeddings: &[Vec<f64>], k: usize) -> Vec<(usize, f64)> {
    let mut scored: Vec<(usize, f64)> = embeddings
        .iter()
        .enumerate()
        .map(|(index, embedding)| (index, cosine_similarity(query_embedding, embedding)))
        .collect();
    scored.sort_by(|(_, sim_a), (_, sim_b)| sim_b.partial_cmp(sim_a).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}
