//! Knowledge graph view: entries linked to their tags.

use std::collections::HashSet;

use serde::Serialize;

use crate::model::{Category, Entry};

const ARTICLE_VAL: u32 = 20;
const TAG_VAL: u32 = 10;
const TAG_COLOR: &str = "#ff00ff";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Article,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub group: Group,
    pub val: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

pub fn tag_node_id(tag: &str) -> String {
    format!("tag-{tag}")
}

/// One node per entry, one per distinct tag, one link per (entry, tag).
pub fn build(entries: &[Entry]) -> Graph {
    let mut graph = Graph::default();
    let mut seen: HashSet<String> = HashSet::new();

    for e in entries {
        if seen.insert(e.id.clone()) {
            graph.nodes.push(GraphNode {
                id: e.id.clone(),
                name: e.title.clone(),
                group: Group::Article,
                val: ARTICLE_VAL,
                url: Some(e.url.clone()),
                category: Some(e.category),
                color: None,
            });
        }
        for tag in &e.tags {
            let tag_id = tag_node_id(tag);
            if seen.insert(tag_id.clone()) {
                graph.nodes.push(GraphNode {
                    id: tag_id.clone(),
                    name: tag.clone(),
                    group: Group::Tag,
                    val: TAG_VAL,
                    url: None,
                    category: None,
                    color: Some(TAG_COLOR),
                });
            }
            graph.links.push(GraphLink {
                source: e.id.clone(),
                target: tag_id,
            });
        }
    }
    graph
}
