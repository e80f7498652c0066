//! Concurrent multi-party writer tests
//!
//! Parties of one job write through clones of the same facade from many
//! tokio tasks at once; no write may be lost or torn.

use std::collections::HashSet;

use serde_json::json;
use trueno_tracking::metric::MetricPoint;
use trueno_tracking::tracker::{
    InsertSummaryRequest, ReadMetricsRequest, ReadOutputDataInfoRequest, SaveMetricDataRequest,
    SaveOutputDataInfoRequest, TaskPath,
};
use trueno_tracking::TrackingDb;

const PARTIES: usize = 8;

fn party_path(party: usize) -> TaskPath {
    let role = if party == 0 { "guest" } else { "host" };
    TaskPath::new("J1", "hetero_lr_0", "T1", "0", role, format!("{}", 9999 + party))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parties_write_disjoint_keys() {
    let tracker = TrackingDb::builder().build().unwrap().tracker();

    let mut handles = Vec::new();
    for party in 0..PARTIES {
        let tracker = tracker.clone();
        handles.push(tokio::spawn(async move {
            let path = party_path(party);
            for iteration in 0..20_i64 {
                let envelope = tracker
                    .save_metric_data(
                        &path,
                        SaveMetricDataRequest {
                            metric_namespace: "train".into(),
                            metric_name: format!("loss_{iteration}"),
                            metrics: vec![json!([iteration, 1.0 / (iteration as f64 + 1.0)])],
                            job_level: false,
                        },
                    )
                    .await;
                assert!(envelope.is_success());
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for party in 0..PARTIES {
        let entries = tracker
            .read_metrics(&party_path(party), ReadMetricsRequest::default())
            .await
            .data
            .unwrap();
        assert_eq!(entries.len(), 20, "party {party} lost a series");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_key_writers_converge_to_one_value() {
    let tracker = TrackingDb::builder().build().unwrap().tracker();
    let path = party_path(0);

    let mut handles = Vec::new();
    for writer in 0..16_i64 {
        let tracker = tracker.clone();
        let path = path.clone();
        handles.push(tokio::spawn(async move {
            let points: Vec<_> = (0..50).map(|step| json!([step, writer])).collect();
            tracker
                .save_metric_data(
                    &path,
                    SaveMetricDataRequest {
                        metric_namespace: "train".into(),
                        metric_name: "loss".into(),
                        metrics: points,
                        job_level: false,
                    },
                )
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }

    let entries = tracker.read_metrics(&path, ReadMetricsRequest::default()).await.data.unwrap();
    let points = &entries[0].points;
    assert_eq!(points.len(), 50);

    // Every point comes from the same writer: no interleaving.
    let winner = points[0].value().unwrap();
    assert!(points.iter().all(|p| p.value() == Some(winner)));
    assert!((0.0..16.0).contains(&winner));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_summaries_last_writer_wins() {
    let tracker = TrackingDb::builder().build().unwrap().tracker();
    let path = party_path(1);

    let mut handles = Vec::new();
    for writer in 0..10 {
        let tracker = tracker.clone();
        let path = path.clone();
        handles.push(tokio::spawn(async move {
            tracker
                .insert_summary(
                    &path,
                    InsertSummaryRequest { summary: json!({"writer": writer, "ok": true}) },
                )
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }

    let summary = tracker.get_summary(&path).await.data.unwrap().unwrap();
    let writer = summary.summary()["writer"].as_i64().unwrap();
    assert!((0..10).contains(&writer));
    assert_eq!(summary.summary()["ok"], json!(true));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lineage_appends_all_retained() {
    let tracker = TrackingDb::builder().build().unwrap().tracker();
    let path = party_path(0);

    let mut handles = Vec::new();
    for writer in 0..32 {
        let tracker = tracker.clone();
        let path = path.clone();
        handles.push(tokio::spawn(async move {
            tracker
                .save_output_data_info(
                    &path,
                    SaveOutputDataInfoRequest {
                        data_name: "output".into(),
                        table_namespace: "ns".into(),
                        table_name: format!("t{writer}"),
                    },
                )
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }

    let history = tracker
        .read_output_data_info(&path, ReadOutputDataInfoRequest { data_name: "output".into() })
        .await
        .data
        .unwrap();
    assert_eq!(history.len(), 32);

    let tables: HashSet<&str> = history.iter().map(|r| r.table_name()).collect();
    assert_eq!(tables.len(), 32);

    let sequences: Vec<u64> = history.iter().map(|r| r.sequence()).collect();
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_observe_partial_series() {
    let tracker = TrackingDb::builder().build().unwrap().tracker();
    let path = party_path(2);

    let writer = {
        let tracker = tracker.clone();
        let path = path.clone();
        tokio::spawn(async move {
            for round in 1..=30_usize {
                let points: Vec<_> = (0..round).map(|step| json!([step, 0.5])).collect();
                tracker
                    .save_metric_data(
                        &path,
                        SaveMetricDataRequest {
                            metric_namespace: "eval".into(),
                            metric_name: "auc".into(),
                            metrics: points,
                            job_level: false,
                        },
                    )
                    .await;
            }
        })
    };

    let reader = {
        let tracker = tracker.clone();
        let path = path.clone();
        tokio::spawn(async move {
            for _ in 0..30 {
                let entries = tracker
                    .read_metrics(&path, ReadMetricsRequest::default())
                    .await
                    .data
                    .unwrap();
                if let Some(entry) = entries.first() {
                    // A visible series is always a whole submission.
                    let expected: Vec<MetricPoint> = (0..entry.points.len())
                        .map(|step| MetricPoint::new(step as i64, 0.5))
                        .collect();
                    assert_eq!(entry.points, expected);
                }
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
}
