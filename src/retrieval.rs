//! Retrieval Engine (spec.md component E): BM25 sparse scoring, dense
//! cosine similarity, and three-way Reciprocal Rank Fusion.
//!
//! BM25 and the fusion combinator are grounded on the corpus's hybrid
//! search engines (per-collection term index, weighted/fused combination)
//! and its dedicated Reciprocal Rank Fusion implementation, generalised
//! here from two ranked lists to three (dense, BM25, salience) and from a
//! weighted sum to the RRF formula.

use std::collections::HashMap;

use crate::config::RetrievalConfig;
use crate::model::Segment;

/// Lowercase alphanumeric tokenisation, deterministic and locale-free.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "to", "and", "in", "is", "it", "that", "for", "on", "with", "as",
];

fn tokenize_with(text: &str, filter_stopwords: bool) -> Vec<String> {
    let tokens = tokenize(text);
    if filter_stopwords {
        tokens.into_iter().filter(|t| !STOPWORDS.contains(&t.as_str())).collect()
    } else {
        tokens
    }
}

/// A BM25 index built once over a fixed corpus of segments.
pub struct Bm25Corpus {
    k1: f64,
    b: f64,
    filter_stopwords: bool,
    /// term -> number of documents containing it
    doc_freq: HashMap<String, usize>,
    /// per-document term frequencies, indexed the same as `doc_lens`
    term_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f64,
    n: usize,
}

impl Bm25Corpus {
    pub fn build(segments: &[Segment], config: &RetrievalConfig) -> Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut term_freqs = Vec::with_capacity(segments.len());
        let mut doc_lens = Vec::with_capacity(segments.len());

        for segment in segments {
            let tokens = tokenize_with(&segment.text, config.filter_stopwords);
            doc_lens.push(tokens.len());

            let mut tf: HashMap<String, usize> = HashMap::new();
            for tok in &tokens {
                *tf.entry(tok.clone()).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let n = segments.len();
        let avg_doc_len = if n == 0 {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f64 / n as f64
        };

        Self {
            k1: config.bm25_k1,
            b: config.bm25_b,
            filter_stopwords: config.filter_stopwords,
            doc_freq,
            term_freqs,
            doc_lens,
            avg_doc_len,
            n,
        }
    }

    fn idf(&self, term: &str) -> f64 {
        let df = *self.doc_freq.get(term).unwrap_or(&0) as f64;
        let n = self.n as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// BM25 relevance score of document `doc_index` against `query`.
    pub fn score(&self, query: &str, doc_index: usize) -> f64 {
        let query_terms = tokenize_with(query, self.filter_stopwords);
        let tf_map = &self.term_freqs[doc_index];
        let doc_len = self.doc_lens[doc_index] as f64;

        query_terms
            .iter()
            .map(|term| {
                let tf = *tf_map.get(term).unwrap_or(&0) as f64;
                if tf == 0.0 {
                    return 0.0;
                }
                let idf = self.idf(term);
                let numerator = tf * (self.k1 + 1.0);
                let denominator =
                    tf + self.k1 * (1.0 - self.b + self.b * doc_len / self.avg_doc_len.max(1e-9));
                idf * numerator / denominator
            })
            .sum()
    }

    /// BM25 scores for every document in the corpus, in corpus order.
    pub fn score_all(&self, query: &str) -> Vec<f64> {
        (0..self.n).map(|i| self.score(query, i)).collect()
    }
}

/// Cosine similarity of two equal-length vectors. Returns 0.0 if either
/// vector has zero norm (undefined direction).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Builds a 1-based rank map from a descending-score-ordered index list.
/// Ties keep the earlier (lower-index) element ranked first, matching the
/// deterministic tie-break policy used for the fused output.
fn ranks_from_scores(scores: &[f64]) -> HashMap<usize, usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    indices
        .into_iter()
        .enumerate()
        .map(|(rank, idx)| (idx, rank + 1))
        .collect()
}

/// Runs BM25 + dense cosine + salience through three-way Reciprocal Rank
/// Fusion and returns the top `top_k` segment indices (into `segments`),
/// writing `query_similarity` and `retrieval_score` onto each scored
/// segment as a side effect.
///
/// `RRF(s) = 1/(k + rank_dense(s)) + 1/(k + rank_bm25(s)) + 1/(k + rank_salience(s))`
pub fn retrieve(
    segments: &mut [Segment],
    query: &str,
    query_embedding: Option<&[f32]>,
    config: &RetrievalConfig,
) -> Vec<usize> {
    let bm25 = Bm25Corpus::build(segments, config);
    let bm25_scores = bm25.score_all(query);

    let dense_scores: Vec<f64> = segments
        .iter()
        .map(|seg| match (query_embedding, seg.embedding.as_deref()) {
            (Some(q), Some(e)) => cosine_similarity(q, e) as f64,
            _ => 0.0,
        })
        .collect();

    let salience_scores: Vec<f64> = segments.iter().map(|s| s.salience_score as f64).collect();

    let dense_ranks = ranks_from_scores(&dense_scores);
    let bm25_ranks = ranks_from_scores(&bm25_scores);
    let salience_ranks = ranks_from_scores(&salience_scores);

    let k = config.rrf_k;
    let mut fused: Vec<(usize, f64)> = (0..segments.len())
        .map(|i| {
            let dr = *dense_ranks.get(&i).unwrap_or(&usize::MAX);
            let br = *bm25_ranks.get(&i).unwrap_or(&usize::MAX);
            let sr = *salience_ranks.get(&i).unwrap_or(&usize::MAX);
            let score = rrf_term(k, dr) + rrf_term(k, br) + rrf_term(k, sr);
            (i, score)
        })
        .collect();

    for (i, seg) in segments.iter_mut().enumerate() {
        seg.query_similarity = dense_scores[i] as f32;
        seg.retrieval_score = fused[i].1 as f32;
    }

    fused.sort_by(|(ia, sa), (ib, sb)| {
        sb.partial_cmp(sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| dense_ranks[ia].cmp(&dense_ranks[ib]))
            .then_with(|| bm25_ranks[ia].cmp(&bm25_ranks[ib]))
            .then_with(|| ia.cmp(ib))
    });

    fused.into_iter().take(config.top_k).map(|(i, _)| i).collect()
}

fn rrf_term(k: f64, rank: usize) -> f64 {
    if rank == usize::MAX {
        0.0
    } else {
        1.0 / (k + rank as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, salience: f32) -> Segment {
        let mut s = Segment::new("doc", 0, text.to_string(), vec![]);
        s.salience_score = salience;
        s
    }

    #[test]
    fn bm25_zero_df_term_contributes_zero() {
        let segments = vec![seg("alpha beta", 0.0), seg("gamma delta", 0.0)];
        let config = RetrievalConfig::default();
        let corpus = Bm25Corpus::build(&segments, &config);
        let score = corpus.score("zzz_not_present", 0);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn cosine_bounds_hold() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]), 0.0);
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn rrf_is_deterministic() {
        let mut segments = vec![
            seg("alpha beta", 0.5),
            seg("beta gamma", 0.4),
            seg("delta", 0.1),
        ];
        let config = RetrievalConfig::default();
        let first = retrieve(&mut segments.clone(), "beta", None, &config);
        let second = retrieve(&mut segments.clone(), "beta", None, &config);
        assert_eq!(first, second);
        assert_eq!(first[0], 0);
    }

    #[test]
    fn retrieval_respects_top_k() {
        let mut segments: Vec<Segment> =
            (0..10).map(|i| seg(&format!("word{} common", i), 0.1)).collect();
        let mut config = RetrievalConfig::default();
        config.top_k = 3;
        let results = retrieve(&mut segments, "common", None, &config);
        assert_eq!(results.len(), 3);
    }
}
