use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `summary.json` written by the fetch container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSummary {
    pub total_urls: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub average_response_time_ms: f64,
    pub total_bytes_downloaded: u64,
    pub status_code_distribution: BTreeMap<String, usize>,
    pub processing_start: Option<String>,
    pub processing_end: Option<String>,
}

impl FetchSummary {
    pub fn headline(&self) -> String {
        format!(
            "{} urls: {} ok, {} failed, {} bytes, avg {:.1} ms",
            self.total_urls,
            self.successful_requests,
            self.failed_requests,
            self.total_bytes_downloaded,
            self.average_response_time_ms
        )
    }
}

/// `final_report.json` written by the analyzer service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisReport {
    pub processing_timestamp: Option<String>,
    pub documents_processed: usize,
    pub total_words: u64,
    pub unique_words: u64,
    pub top_100_words: Vec<WordCount>,
    pub document_similarity: Vec<Similarity>,
    pub top_bigrams: Vec<BigramCount>,
    pub readability: Readability,
}

impl AnalysisReport {
    pub fn headline(&self) -> String {
        let mut line = format!(
            "{} documents, {} words ({} unique)",
            self.documents_processed, self.total_words, self.unique_words
        );
        if let Some(top) = self.top_100_words.first() {
            line.push_str(&format!(", top word {:?} x{}", top.word, top.count));
        }
        if let Some(closest) = self.most_similar_pair() {
            line.push_str(&format!(
                ", closest pair {} / {} ({:.2})",
                closest.doc1, closest.doc2, closest.similarity
            ));
        }
        line
    }

    pub fn most_similar_pair(&self) -> Option<&Similarity> {
        self.document_similarity
            .iter()
            .max_by(|a, b| a.similarity.total_cmp(&b.similarity))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
    pub frequency: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Similarity {
    pub doc1: String,
    pub doc2: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BigramCount {
    pub bigram: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Readability {
    pub avg_sentence_length: f64,
    pub avg_word_length: f64,
    pub complexity_score: f64,
}
