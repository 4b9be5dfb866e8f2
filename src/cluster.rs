//! Greedy color-space clustering
//!
//! Entries are points in RGB space (red=x, green=y, blue=z). Processing
//! order is fixed by sorting on id, so the result does not depend on the
//! order entries arrived in. Each point joins the first existing cluster
//! (in creation order) whose centroid is closer than the threshold, or
//! opens a new one.

use std::collections::BTreeSet;

use crate::color::{self, Rgb};
use crate::normalize::CatalogEntry;

/// A group of entries drawn as one unit. Recomputed, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    members: Vec<CatalogEntry>,
    centroid: [f64; 3],
}

impl Cluster {
    fn open(entry: CatalogEntry, point: [f64; 3]) -> Self {
        Self {
            members: vec![entry],
            centroid: point,
        }
    }

    /// Add a member and move the centroid to the running mean
    fn absorb(&mut self, entry: CatalogEntry, point: [f64; 3]) {
        self.members.push(entry);
        let n = self.members.len() as f64;
        for (c, p) in self.centroid.iter_mut().zip(point) {
            *c = (*c * (n - 1.0) + p) / n;
        }
    }

    /// Members in assignment order
    pub fn members(&self) -> &[CatalogEntry] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn centroid(&self) -> [f64; 3] {
        self.centroid
    }

    /// First assigned member, shown as the cluster's label
    pub fn representative(&self) -> &CatalogEntry {
        &self.members[0]
    }

    /// RMS color of all members
    pub fn display_color(&self) -> Rgb {
        let colors: Vec<Rgb> = self.members.iter().filter_map(|m| m.rgb()).collect();
        color::aggregate(&colors).unwrap_or(Rgb::new(0, 0, 0))
    }

    /// The member's own hex for singletons, otherwise the RMS color
    pub fn display_hex(&self) -> String {
        match self.members.as_slice() {
            [only] => only.hex().to_string(),
            _ => self.display_color().to_hex(),
        }
    }
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Partition the visible entries into clusters.
///
/// Entries whose hex cannot be plotted are left out.
pub fn cluster(entries: &[CatalogEntry], visible_ids: &BTreeSet<String>, threshold: f64) -> Vec<Cluster> {
    let mut points: Vec<(&CatalogEntry, [f64; 3])> = entries
        .iter()
        .filter(|e| visible_ids.contains(e.id()))
        .filter_map(|e| e.rgb().map(|rgb| (e, rgb.to_point())))
        .collect();
    points.sort_by(|a, b| a.0.id().cmp(b.0.id()));
    let plotted = points.len();

    let mut clusters: Vec<Cluster> = Vec::new();
    for (entry, point) in points {
        match clusters
            .iter_mut()
            .find(|c| distance(c.centroid, point) < threshold)
        {
            Some(existing) => existing.absorb(entry.clone(), point),
            None => clusters.push(Cluster::open(entry.clone(), point)),
        }
    }

    tracing::debug!(
        "Clustered {} plotted entries ({} visible ids) into {} clusters (threshold {})",
        plotted,
        visible_ids.len(),
        clusters.len(),
        threshold
    );
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    use crate::normalize::Normalizer;

    fn entries(specs: &[(&str, &str)]) -> Vec<CatalogEntry> {
        let mut n = Normalizer::new("https://x");
        specs
            .iter()
            .filter_map(|(id, hex)| n.entry(&json!({"id": id, "hex": hex})))
            .collect()
    }

    fn ids(entries: &[CatalogEntry]) -> BTreeSet<String> {
        entries.iter().map(|e| e.id().to_string()).collect()
    }

    fn member_ids(clusters: &[Cluster]) -> Vec<Vec<String>> {
        clusters
            .iter()
            .map(|c| c.members().iter().map(|m| m.id().to_string()).collect())
            .collect()
    }

    #[test]
    fn test_threshold_scenario() {
        let es = entries(&[("a", "#000000"), ("b", "#020202"), ("c", "#c8c8c8")]);
        let visible = ids(&es);

        let tight = cluster(&es, &visible, 15.0);
        assert_eq!(member_ids(&tight), vec![vec!["a", "b"], vec!["c"]]);
        assert_eq!(tight[0].centroid(), [1.0, 1.0, 1.0]);
        assert_eq!(tight[1].centroid(), [200.0, 200.0, 200.0]);

        let loose = cluster(&es, &visible, 400.0);
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].len(), 3);
        let expected = 202.0 / 3.0;
        for c in loose[0].centroid() {
            assert!((c - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_input_order_independent() {
        let mut es = entries(&[
            ("d", "#102030"),
            ("a", "#112233"),
            ("c", "#ff0000"),
            ("b", "#fe0101"),
            ("e", "#808080"),
        ]);
        let visible = ids(&es);
        let first = cluster(&es, &visible, 20.0);
        es.reverse();
        let second = cluster(&es, &visible, 20.0);
        es.swap(0, 3);
        let third = cluster(&es, &visible, 20.0);
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_first_fit_not_best_fit() {
        // "a" opens at 0, "b" opens at 20; "c" at 12 is within 15 of both
        // but nearer to "b". It joins "a" because "a" was created first.
        let es = entries(&[("a", "#000000"), ("b", "#140000"), ("c", "#0c0000")]);
        let clusters = cluster(&es, &ids(&es), 15.0);
        assert_eq!(member_ids(&clusters), vec![vec!["a", "c"], vec!["b"]]);
    }

    #[test]
    fn test_strictly_less_than_threshold() {
        let es = entries(&[("a", "#000000"), ("b", "#0a0000")]);
        assert_eq!(cluster(&es, &ids(&es), 10.0).len(), 2);
        assert_eq!(cluster(&es, &ids(&es), 10.001).len(), 1);
    }

    #[test]
    fn test_only_visible_entries() {
        let es = entries(&[("a", "#000000"), ("b", "#010101"), ("c", "#020202")]);
        let visible: BTreeSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
        let clusters = cluster(&es, &visible, 50.0);
        assert_eq!(member_ids(&clusters), vec![vec!["a", "c"]]);
        assert!(cluster(&es, &BTreeSet::new(), 50.0).is_empty());
    }

    #[test]
    fn test_unplottable_hex_skipped() {
        // 5 digits passes validation but has no channel layout
        let es = entries(&[("a", "#12345"), ("b", "#000")]);
        assert_eq!(es.len(), 2);
        let clusters = cluster(&es, &ids(&es), 10.0);
        assert_eq!(member_ids(&clusters), vec![vec!["b"]]);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_log_counts_plotted_entries() {
        let es = entries(&[("a", "#000000"), ("b", "#12345")]);
        let visible: BTreeSet<String> = ["a", "b", "gone"].iter().map(|s| s.to_string()).collect();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let clusters = tracing::subscriber::with_default(subscriber, || cluster(&es, &visible, 10.0));

        assert_eq!(clusters.iter().map(Cluster::len).sum::<usize>(), 1);
        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("Clustered 1 plotted entries (3 visible ids) into 1 clusters"), "{}", log);
    }

    #[test]
    fn test_display_hex() {
        let es = entries(&[("a", "#FF0000"), ("b", "#00FF00"), ("c", "#0000ff")]);
        let singles = cluster(&es, &ids(&es), 1.0);
        assert_eq!(singles[0].display_hex(), "#FF0000");

        let two = &es[..2];
        let merged = cluster(two, &ids(two), 1000.0);
        assert_eq!(merged[0].display_hex(), "#b4b400");
        assert_eq!(merged[0].display_color(), Rgb::new(180, 180, 0));
        assert_eq!(merged[0].representative().id(), "a");
    }
}
