//! Bookmark records shared by the store, the pipeline and the read API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Tech,
    News,
    Design,
    Tutorial,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Tech,
        Category::News,
        Category::Design,
        Category::Tutorial,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Tech => "Tech",
            Category::News => "News",
            Category::Design => "Design",
            Category::Tutorial => "Tutorial",
            Category::Other => "Other",
        }
    }

    /// Keyword-based guess from free-text tags. Earlier categories in the
    /// table win when several match.
    pub fn infer(tags: &[String]) -> Category {
        const TABLE: &[(Category, &[&str])] = &[
            (
                Category::Tutorial,
                &["tutorial", "guide", "how-to", "howto", "教程", "入门", "指南", "实践"],
            ),
            (
                Category::Design,
                &["design", "ui", "ux", "figma", "typography", "设计", "交互"],
            ),
            (
                Category::News,
                &["news", "announcement", "release", "launch", "新闻", "发布", "资讯"],
            ),
            (
                Category::Tech,
                &[
                    "ai", "llm", "rust", "programming", "software", "engineering", "database",
                    "javascript", "typescript", "python", "cloud", "devops", "web", "api",
                    "技术", "编程", "开发", "架构", "人工智能",
                ],
            ),
        ];

        let lowered: Vec<String> = tags.iter().map(|t| t.trim().to_lowercase()).collect();
        for (category, keywords) in TABLE {
            let hit = lowered.iter().any(|tag| {
                keywords
                    .iter()
                    .any(|k| tag == k || (!(k.is_ascii() && k.len() <= 2) && tag.contains(k)))
            });
            if hit {
                return *category;
            }
        }
        Category::Other
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// A stored bookmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub archive_url: Option<String>,
    pub summary: String,
    pub insight: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields written when a bookmark is first created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub title: String,
    pub url: String,
    pub archive_url: Option<String>,
    pub summary: String,
    pub insight: String,
    pub category: Category,
    pub tags: Vec<String>,
}
