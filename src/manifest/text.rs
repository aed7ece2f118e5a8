//! Line-oriented manifest format
//!
//! ```text
//! # comment
//! Option <free-form text>
//! File <name> New [PageSize <n>]
//! File <name> Updated [PageSize <n>] Pages <p1> <p2> ...
//! File <name> Deleted
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::error::{IncrError, Result};
use crate::file_info::FileInfo;

use super::{ManifestClassification, ManifestClassifier, ManifestEntry};

/// Text manifest reader and writer
#[derive(Debug, Clone)]
pub struct TextManifest {
    /// Restore target; classified files are placed under it
    data_dest_dir: PathBuf,
}

impl TextManifest {
    pub fn new(data_dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dest_dir: data_dest_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.data_dest_dir.clone())
    }

    pub fn data_dest_dir(&self) -> &Path {
        &self.data_dest_dir
    }

    /// Render a classification: options first, then files in processing order
    pub fn render(classification: &ManifestClassification) -> String {
        let mut out = String::new();
        for option in &classification.options {
            let _ = writeln!(out, "Option {}", option);
        }
        for entry in classification.entries() {
            match entry {
                ManifestEntry::New(info) => {
                    let _ = write!(out, "File {} New", info.filename());
                    push_page_size(&mut out, info);
                    out.push('\n');
                }
                ManifestEntry::Updated(info, pages) => {
                    let _ = write!(out, "File {} Updated", info.filename());
                    push_page_size(&mut out, info);
                    out.push_str(" Pages");
                    for page in pages {
                        let _ = write!(out, " {}", page);
                    }
                    out.push('\n');
                }
                ManifestEntry::Deleted(name) => {
                    let _ = writeln!(out, "File {} Deleted", name);
                }
            }
        }
        out
    }

    fn file_info(&self, name: &str, pagesize: usize) -> FileInfo {
        FileInfo::new(name, self.data_dest_dir.join(name), pagesize)
    }

    fn parse_file_line(
        &self,
        tokens: &[&str],
        classification: &mut ManifestClassification,
    ) -> std::result::Result<(), String> {
        let (name, kind, rest) = match tokens {
            [name, kind, rest @ ..] => (*name, *kind, rest),
            [_] => return Err("missing file state".into()),
            [] => return Err("missing file name".into()),
        };

        match kind {
            "New" => {
                let (pagesize, rest) = parse_page_size(rest)?;
                if let Some(extra) = rest.first() {
                    return Err(format!("unexpected {:?} after New", extra));
                }
                classification
                    .add_new(self.file_info(name, pagesize))
                    .map_err(reason)
            }
            "Updated" => {
                let (pagesize, rest) = parse_page_size(rest)?;
                let pages = match rest {
                    ["Pages", pages @ ..] => pages
                        .iter()
                        .map(|p| {
                            p.parse::<u32>()
                                .map_err(|_| format!("bad page number {:?}", p))
                        })
                        .collect::<std::result::Result<Vec<_>, _>>()?,
                    _ => return Err(format!("updated file {} has no Pages list", name)),
                };
                classification
                    .add_updated(self.file_info(name, pagesize), pages)
                    .map_err(reason)
            }
            "Deleted" => {
                if let Some(extra) = rest.first() {
                    return Err(format!("unexpected {:?} after Deleted", extra));
                }
                classification.add_deleted(name).map_err(reason)
            }
            other => Err(format!("unknown file state {:?}", other)),
        }
    }
}

impl ManifestClassifier for TextManifest {
    fn classify(&self, text: &str) -> Result<ManifestClassification> {
        let mut classification = ManifestClassification::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            let outcome = match tokens[0] {
                "Option" => {
                    let value = line["Option".len()..].trim();
                    if value.is_empty() {
                        Err("empty Option".to_string())
                    } else {
                        classification.add_option(value);
                        Ok(())
                    }
                }
                "File" => self.parse_file_line(&tokens[1..], &mut classification),
                other => Err(format!("unknown directive {:?}", other)),
            };

            outcome.map_err(|msg| IncrError::Manifest(format!("line {}: {}", index + 1, msg)))?;
        }

        debug!(
            new = classification.new_files.len(),
            updated = classification.updated_files.len(),
            deleted = classification.deleted_files.len(),
            options = classification.options.len(),
            "classified manifest"
        );
        Ok(classification)
    }
}

/// Strip an optional leading `PageSize <n>`; 0 when absent
fn parse_page_size<'a, 'b>(
    tokens: &'a [&'b str],
) -> std::result::Result<(usize, &'a [&'b str]), String> {
    match tokens {
        ["PageSize", n, rest @ ..] => {
            let size = n
                .parse::<usize>()
                .map_err(|_| format!("bad page size {:?}", n))?;
            Ok((size, rest))
        }
        ["PageSize"] => Err("PageSize without a value".into()),
        _ => Ok((0, tokens)),
    }
}

/// Message of a classification error, without the manifest prefix
fn reason(err: IncrError) -> String {
    match err {
        IncrError::Manifest(msg) => msg,
        other => other.to_string(),
    }
}

fn push_page_size(out: &mut String, info: &FileInfo) {
    if info.pagesize() != 0 {
        let _ = write!(out, " PageSize {}", info.pagesize());
    }
}
