//! Link graph built from shard records
//!
//! Every page URL and every outlink target is a node; every outlink is a
//! directed edge. The edge list is exported for the external authority
//! scoring job.

use crate::output::PageRecord;
use crate::{Result, TrawlError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Directed link graph over page URLs
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    nodes: BTreeSet<String>,
    edges: BTreeSet<(String, String)>,
}

/// In- and out-degree of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Degree {
    pub incoming: usize,
    pub outgoing: usize,
}

#[derive(Serialize)]
struct EdgeExport<'a> {
    nodes: Vec<&'a str>,
    edges: Vec<[&'a str; 2]>,
}

impl LinkGraph {
    /// Builds the graph from page records
    ///
    /// Self-loops and empty targets are dropped; duplicate edges collapse.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a PageRecord>,
    {
        let mut graph = Self::default();

        for record in records {
            graph.nodes.insert(record.url.clone());

            for target in &record.outlinks {
                if target.is_empty() || *target == record.url {
                    continue;
                }
                graph.nodes.insert(target.clone());
                graph.edges.insert((record.url.clone(), target.clone()));
            }
        }

        graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, url: &str) -> bool {
        self.nodes.contains(url)
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.edges.contains(&(from.to_string(), to.to_string()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(from, to)| (from.as_str(), to.as_str()))
    }

    /// Degree of every node, keyed by URL
    pub fn degrees(&self) -> BTreeMap<&str, Degree> {
        let mut degrees: BTreeMap<&str, Degree> = self
            .nodes
            .iter()
            .map(|node| (node.as_str(), Degree::default()))
            .collect();

        for (from, to) in &self.edges {
            degrees.entry(from.as_str()).or_default().outgoing += 1;
            degrees.entry(to.as_str()).or_default().incoming += 1;
        }

        degrees
    }

    /// Nodes with the most incoming links, highest first (ties by URL)
    pub fn top_linked(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .degrees()
            .into_iter()
            .map(|(url, degree)| (url, degree.incoming))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(limit);
        ranked
    }

    /// Writes `{"nodes": [...], "edges": [[from, to], ...]}` to a file
    pub fn export_edges(&self, path: &Path) -> Result<()> {
        let export = EdgeExport {
            nodes: self.nodes().collect(),
            edges: self.edges().map(|(from, to)| [from, to]).collect(),
        };

        let persistence = |source| TrawlError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(persistence)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &export)?;
        writer.flush().map_err(persistence)?;

        tracing::info!(
            "Exported link graph ({} nodes, {} edges) to {}",
            self.node_count(),
            self.edge_count(),
            path.display()
        );
        Ok(())
    }
}
