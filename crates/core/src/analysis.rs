// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Qualitative analysis of benchmark latencies.
//!
//! These helpers turn raw numbers into the ratings and advice shown next to a
//! run: how consistent latencies are, whether they are trending up or down,
//! how the latency/throughput balance rates overall, and which follow-ups are
//! worth considering.

use crate::stats::BenchmarkStats;
use crate::types::BenchmarkResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of trailing samples compared against the overall mean for trends.
pub const TREND_WINDOW: usize = 5;

/// Latency of every attempted prompt, in prompt order.
pub fn latencies(results: &[BenchmarkResult]) -> Vec<f64> {
    results.iter().map(|r| r.response_time_ms as f64).collect()
}

/// How stable latencies are across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyRating {
    /// Coefficient of variation below 0.2.
    Excellent,
    /// Below 0.4.
    Good,
    /// Below 0.6.
    Fair,
    /// 0.6 or above.
    NeedsImprovement,
    /// Fewer than two samples.
    NotAvailable,
}

impl fmt::Display for ConsistencyRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::NeedsImprovement => "Needs Improvement",
            Self::NotAvailable => "N/A",
        })
    }
}

/// Rate consistency by the coefficient of variation of `latencies`.
pub fn consistency(latencies: &[f64]) -> ConsistencyRating {
    if latencies.len() < 2 {
        return ConsistencyRating::NotAvailable;
    }
    let n = latencies.len() as f64;
    let mean = latencies.iter().sum::<f64>() / n;
    let variance = latencies.iter().map(|t| (t - mean) * (t - mean)).sum::<f64>() / n;
    let cv = variance.sqrt() / mean;

    if cv < 0.2 {
        ConsistencyRating::Excellent
    } else if cv < 0.4 {
        ConsistencyRating::Good
    } else if cv < 0.6 {
        ConsistencyRating::Fair
    } else {
        // Includes the all-zero case where cv is NaN.
        ConsistencyRating::NeedsImprovement
    }
}

/// Direction recent latencies are moving in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    /// Recent mean below 90% of the overall mean.
    Improving,
    /// Recent mean within 110% of the overall mean.
    Stable,
    /// Recent mean at or above 110% of the overall mean.
    Declining,
    /// Fewer than [`TREND_WINDOW`] samples.
    NotAvailable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Improving => "Improving",
            Self::Stable => "Stable",
            Self::Declining => "Declining",
            Self::NotAvailable => "N/A",
        })
    }
}

/// Compare the mean of the last [`TREND_WINDOW`] latencies with the overall mean.
pub fn trend(latencies: &[f64]) -> Trend {
    if latencies.len() < TREND_WINDOW {
        return Trend::NotAvailable;
    }
    let overall = latencies.iter().sum::<f64>() / latencies.len() as f64;
    let recent_slice = &latencies[latencies.len() - TREND_WINDOW..];
    let recent = recent_slice.iter().sum::<f64>() / TREND_WINDOW as f64;

    if recent < overall * 0.9 {
        Trend::Improving
    } else if recent < overall * 1.1 {
        Trend::Stable
    } else {
        Trend::Declining
    }
}

/// Combined latency and throughput rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EfficiencyRating {
    /// Average latency of 5 s or more.
    Poor = 1,
    /// Under 5 s.
    Fair = 2,
    /// Under 3 s and above 2 tokens/s.
    Good = 3,
    /// Under 2 s and above 5 tokens/s.
    VeryGood = 4,
    /// Under 1 s and above 10 tokens/s.
    Excellent = 5,
}

impl fmt::Display for EfficiencyRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Excellent => "Excellent",
            Self::VeryGood => "Very Good",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        })
    }
}

/// Rate a run by average latency and tokens per second.
pub fn efficiency(stats: &BenchmarkStats) -> EfficiencyRating {
    let avg = stats.average_latency;
    let tps = stats.tokens_per_second;
    if avg < 1000.0 && tps > 10.0 {
        EfficiencyRating::Excellent
    } else if avg < 2000.0 && tps > 5.0 {
        EfficiencyRating::VeryGood
    } else if avg < 3000.0 && tps > 2.0 {
        EfficiencyRating::Good
    } else if avg < 5000.0 {
        EfficiencyRating::Fair
    } else {
        EfficiencyRating::Poor
    }
}

/// Share of latencies falling in a fixed bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyBucket {
    /// Bucket label, e.g. `1-2s`.
    pub label: &'static str,
    /// Percentage of samples in the bucket.
    pub percent: f64,
}

const BUCKETS: [(&str, f64, f64); 5] = [
    ("< 1s", 0.0, 1000.0),
    ("1-2s", 1000.0, 2000.0),
    ("2-3s", 2000.0, 3000.0),
    ("3-5s", 3000.0, 5000.0),
    ("> 5s", 5000.0, f64::INFINITY),
];

/// Percentage of `latencies` in each of the fixed buckets.
///
/// Buckets are half-open `[lower, upper)`. An empty input yields zeros.
pub fn distribution(latencies: &[f64]) -> Vec<LatencyBucket> {
    let total = latencies.len() as f64;
    BUCKETS
        .iter()
        .map(|&(label, lower, upper)| {
            let count = latencies.iter().filter(|&&t| t >= lower && t < upper).count();
            LatencyBucket {
                label,
                percent: if total > 0.0 {
                    count as f64 / total * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect()
}

/// How urgent a recommendation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Nothing to fix.
    Positive,
    /// Worth a look.
    Warning,
    /// Likely hurting results.
    Critical,
}

/// A suggested follow-up for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    /// Short heading.
    pub title: &'static str,
    /// One-sentence explanation.
    pub description: &'static str,
    /// Urgency.
    pub severity: Severity,
}

/// Suggestions for a run. Empty when no prompt succeeded.
pub fn recommendations(stats: &BenchmarkStats) -> Vec<Recommendation> {
    let mut out = Vec::new();
    if !stats.has_samples() {
        return out;
    }

    if stats.average_latency > 3000.0 {
        out.push(Recommendation {
            title: "Optimize Response Time",
            description: "Your average response time is above 3 seconds. Consider using a smaller model or reducing context length for faster responses.",
            severity: Severity::Warning,
        });
    }

    if stats.p99_latency > stats.average_latency * 2.0 {
        out.push(Recommendation {
            title: "Address Latency Spikes",
            description: "Your P99 latency is significantly higher than average. Some responses take much longer - consider monitoring for resource constraints.",
            severity: Severity::Critical,
        });
    }

    if stats.success_rate < 95.0 {
        out.push(Recommendation {
            title: "Improve Reliability",
            description: "Some requests are failing. Check for memory issues or consider reducing batch sizes for better stability.",
            severity: Severity::Critical,
        });
    }

    if stats.tokens_per_second < 5.0 {
        out.push(Recommendation {
            title: "Increase Throughput",
            description: "Token generation is slow. Consider optimizing model parameters or checking device resources.",
            severity: Severity::Warning,
        });
    }

    if stats.average_latency < 2000.0 && stats.success_rate > 95.0 {
        out.push(Recommendation {
            title: "Excellent Performance",
            description: "Your model is performing well with fast response times and high reliability.",
            severity: Severity::Positive,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(avg: f64, p99: f64, tps: f64, success: f64) -> BenchmarkStats {
        BenchmarkStats {
            total_prompts: 10,
            completed_prompts: 10,
            average_latency: avg,
            p99_latency: p99,
            tokens_per_second: tps,
            success_rate: success,
            ..BenchmarkStats::default()
        }
    }

    #[test]
    fn test_consistency() {
        assert_eq!(consistency(&[100.0]), ConsistencyRating::NotAvailable);
        assert_eq!(consistency(&[100.0, 100.0, 100.0]), ConsistencyRating::Excellent);
        // mean 100, std dev 30
        assert_eq!(consistency(&[70.0, 130.0]), ConsistencyRating::Good);
        assert_eq!(consistency(&[50.0, 150.0]), ConsistencyRating::Fair);
        assert_eq!(consistency(&[10.0, 190.0]), ConsistencyRating::NeedsImprovement);
    }

    #[test]
    fn test_trend() {
        assert_eq!(trend(&[1.0, 2.0, 3.0]), Trend::NotAvailable);
        let flat = [100.0; 8];
        assert_eq!(trend(&flat), Trend::Stable);
        let improving = [500.0, 500.0, 500.0, 500.0, 500.0, 100.0, 100.0, 100.0, 100.0, 100.0];
        assert_eq!(trend(&improving), Trend::Improving);
        let declining = [100.0, 100.0, 100.0, 100.0, 100.0, 500.0, 500.0, 500.0, 500.0, 500.0];
        assert_eq!(trend(&declining), Trend::Declining);
    }

    #[test]
    fn test_efficiency() {
        assert_eq!(efficiency(&stats(500.0, 0.0, 20.0, 100.0)), EfficiencyRating::Excellent);
        assert_eq!(efficiency(&stats(1500.0, 0.0, 6.0, 100.0)), EfficiencyRating::VeryGood);
        assert_eq!(efficiency(&stats(2500.0, 0.0, 3.0, 100.0)), EfficiencyRating::Good);
        assert_eq!(efficiency(&stats(500.0, 0.0, 1.0, 100.0)), EfficiencyRating::Fair);
        assert_eq!(efficiency(&stats(8000.0, 0.0, 50.0, 100.0)), EfficiencyRating::Poor);
        assert_eq!(EfficiencyRating::VeryGood.to_string(), "Very Good");
    }

    #[test]
    fn test_distribution() {
        let buckets = distribution(&[500.0, 1000.0, 1999.0, 2500.0, 6000.0]);
        let percents: Vec<f64> = buckets.iter().map(|b| b.percent).collect();
        assert_eq!(percents, vec![20.0, 40.0, 20.0, 0.0, 20.0]);
        assert_eq!(buckets[4].label, "> 5s");

        assert!(distribution(&[]).iter().all(|b| b.percent == 0.0));
    }

    #[test]
    fn test_recommendations_for_healthy_run() {
        let recs = recommendations(&stats(800.0, 1000.0, 20.0, 100.0));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].title, "Excellent Performance");
        assert_eq!(recs[0].severity, Severity::Positive);
    }

    #[test]
    fn test_recommendations_for_struggling_run() {
        let recs = recommendations(&stats(4000.0, 9000.0, 2.0, 80.0));
        let titles: Vec<&str> = recs.iter().map(|r| r.title).collect();
        assert_eq!(
            titles,
            vec![
                "Optimize Response Time",
                "Address Latency Spikes",
                "Improve Reliability",
                "Increase Throughput",
            ]
        );
    }

    #[test]
    fn test_no_recommendations_without_samples() {
        assert!(recommendations(&BenchmarkStats::default()).is_empty());
    }
}
