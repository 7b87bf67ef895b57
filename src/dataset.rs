use crate::error::DatasetError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// One paper drawn from the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub paper_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub decision: Option<String>,
}

/// Load the full corpus from a JSONL file.
pub fn load_corpus(path: &Path) -> Result<Vec<Sample>, DatasetError> {
    if !path.exists() {
        return Err(DatasetError::NotFound(path.to_path_buf()));
    }

    let file = std::fs::File::open(path).map_err(|e| DatasetError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut samples = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| DatasetError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let sample =
            serde_json::from_str(&line).map_err(|e| DatasetError::Malformed {
                line: idx + 1,
                source: e,
            })?;
        samples.push(sample);
    }

    if samples.is_empty() {
        return Err(DatasetError::Empty);
    }

    Ok(samples)
}

/// Draw a reproducible sample: seeded shuffle of the corpus indices, then
/// the first `sample_size`. The same seed over the same corpus yields the
/// same sample, which is what makes re-runs line up with the cached logs.
pub fn draw_sample(corpus: &[Sample], sample_size: usize, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..corpus.len()).collect();
    indices.shuffle(&mut rng);

    let picked: Vec<Sample> = indices
        .into_iter()
        .take(sample_size)
        .map(|i| corpus[i].clone())
        .collect();

    info!("Sampled {} of {} papers", picked.len(), corpus.len());
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn corpus(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample {
                paper_id: format!("p{}", i),
                title: format!("Paper {}", i),
                abstract_text: "An abstract.".to_string(),
                year: Some(2024),
                decision: Some("Accept".to_string()),
            })
            .collect()
    }

    #[test]
    fn test_draw_sample_is_deterministic() {
        let papers = corpus(20);
        let a = draw_sample(&papers, 5, 42);
        let b = draw_sample(&papers, 5, 42);
        let ids_a: Vec<_> = a.iter().map(|s| &s.paper_id).collect();
        let ids_b: Vec<_> = b.iter().map(|s| &s.paper_id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_draw_sample_caps_at_corpus_size() {
        let papers = corpus(3);
        assert_eq!(draw_sample(&papers, 10, 1).len(), 3);
    }

    #[test]
    fn test_different_seeds_differ() {
        let papers = corpus(50);
        let a = draw_sample(&papers, 10, 1);
        let b = draw_sample(&papers, 10, 2);
        let ids_a: Vec<_> = a.iter().map(|s| &s.paper_id).collect();
        let ids_b: Vec<_> = b.iter().map(|s| &s.paper_id).collect();
        assert_ne!(ids_a, ids_b);
    }

    #[test]
    fn test_load_corpus_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"paper_id": "x1", "title": "T", "abstract": "A", "year": 2023, "decision": "Reject"}}"#
        )
        .unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"paper_id": "x2", "title": "U", "abstract": "B"}}"#).unwrap();

        let corpus = load_corpus(&path).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[0].paper_id, "x1");
        assert_eq!(corpus[1].year, None);
    }

    #[test]
    fn test_load_corpus_missing_file() {
        assert!(matches!(
            load_corpus(Path::new("/nonexistent/papers.jsonl")),
            Err(DatasetError::NotFound(_))
        ));
    }
}
