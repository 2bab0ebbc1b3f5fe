//! Host list parsing.
//!
//! A host list is a newline-separated text file where every non-blank,
//! non-comment line is a `host[,label[,group]]` record.

use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::io;

/// Group assigned to records that do not name one.
pub const DEFAULT_GROUP: &str = "default";

const MAX_FIELDS: usize = 3;

/// One target machine to deploy to. Defaults are resolved at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostTask {
    pub host: String,
    pub label: String,
    pub group: String,
}

impl HostTask {
    pub fn new(host: impl Into<String>, label: Option<String>, group: Option<String>) -> Self {
        let host = host.into();
        Self {
            label: label.unwrap_or_else(|| host.clone()),
            group: group.unwrap_or_else(|| DEFAULT_GROUP.to_string()),
            host,
        }
    }
}

/// Parsed host list plus the lines that were skipped along the way.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostList {
    pub tasks: Vec<HostTask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl HostList {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Parse host list content. Invalid records are skipped with a warning.
///
/// Never fails; an empty result is rejected by [`require_tasks`].
pub fn parse(content: &str) -> HostList {
    let mut list = HostList::default();
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_record(line) {
            Ok(task) => list.tasks.push(task),
            Err(problem) => {
                tracing::warn!(line = line_no, record = line, "skipping host record: {}", problem);
                list.warnings
                    .push(format!("line {}: {} ('{}')", line_no, problem, line));
            }
        }
    }

    list
}

fn parse_record(line: &str) -> std::result::Result<HostTask, &'static str> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    if fields.len() > MAX_FIELDS {
        return Err("too many fields, expected host[,label[,group]]");
    }

    let host = fields[0];
    if host.is_empty() {
        return Err("empty host");
    }

    let optional = |i: usize| {
        fields
            .get(i)
            .filter(|f| !f.is_empty())
            .map(|f| f.to_string())
    };

    Ok(HostTask::new(host, optional(1), optional(2)))
}

/// Reject a host list that produced no tasks.
pub fn require_tasks(list: HostList, source: &str) -> Result<HostList> {
    if list.is_empty() {
        return Err(Error::host_list_empty(source, list.warnings));
    }
    Ok(list)
}

/// Read and parse a host list file, failing when it yields no tasks.
pub fn load(path: &Path) -> Result<HostList> {
    let source = path.display().to_string();
    let content = io::read_file(path, "read host list")
        .map_err(|e| Error::host_list_unreadable(&source, e.describe()))?;

    require_tasks(parse(&content), &source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_applies_defaults_once() {
        let list = parse("h1,label1,g1\nh2,,g2\nh3\n");

        assert_eq!(
            list.tasks,
            vec![
                HostTask::new("h1", Some("label1".into()), Some("g1".into())),
                HostTask::new("h2", None, Some("g2".into())),
                HostTask::new("h3", None, None),
            ]
        );
        assert_eq!(list.tasks[1].label, "h2");
        assert_eq!(list.tasks[2].group, DEFAULT_GROUP);
        assert!(list.warnings.is_empty());
    }

    #[test]
    fn parse_skips_blank_and_comment_lines() {
        let content = "# fleet\n\n   \n  # indented comment\nweb-01.example.com,web-01,web-servers\n";
        let list = parse(content);

        assert_eq!(list.len(), 1);
        assert_eq!(list.tasks[0].host, "web-01.example.com");
        assert!(list.warnings.is_empty());
    }

    #[test]
    fn parse_ignores_leading_byte_order_mark() {
        let list = parse("\u{feff}# fleet inventory\nweb-01,web-01,web\n");
        assert_eq!(list.len(), 1);
        assert_eq!(list.tasks[0].host, "web-01");

        let list = parse("\u{feff}db-01\n");
        assert_eq!(list.tasks[0].host, "db-01");
        assert_eq!(list.tasks[0].label, "db-01");
    }

    #[test]
    fn parse_trims_fields_and_crlf() {
        let list = parse("  user@db.example.com , db-01 ,  database-servers \r\n");

        assert_eq!(list.tasks[0].host, "user@db.example.com");
        assert_eq!(list.tasks[0].label, "db-01");
        assert_eq!(list.tasks[0].group, "database-servers");
    }

    #[test]
    fn parse_drops_empty_host_with_warning() {
        let list = parse("h1\n ,orphan,g1\nh2\n");

        assert_eq!(list.len(), 2);
        assert!(list.tasks.iter().all(|t| t.label != "orphan"));
        assert_eq!(list.warnings.len(), 1);
        assert!(list.warnings[0].starts_with("line 2: empty host"));
    }

    #[test]
    fn parse_drops_records_with_extra_fields() {
        let list = parse("h1,a,b,c\nh2\n");

        assert_eq!(list.len(), 1);
        assert_eq!(list.tasks[0].host, "h2");
        assert!(list.warnings[0].contains("too many fields"));
    }

    #[test]
    fn parse_keeps_duplicate_hosts() {
        let list = parse("10.0.0.5,a\n10.0.0.5,b\n");

        assert_eq!(list.len(), 2);
        assert_eq!(list.tasks[0].host, list.tasks[1].host);
    }

    #[test]
    fn require_tasks_rejects_empty_list() {
        let err = require_tasks(parse("# nothing here\n,,\n"), "hosts.csv").unwrap_err();

        assert_eq!(err.code.as_str(), "config.host_list_empty");
        assert_eq!(err.details["path"], "hosts.csv");
        assert_eq!(err.details["warnings"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn load_reports_missing_file_as_configuration_error() {
        let err = load(Path::new("/nonexistent/hosts.csv")).unwrap_err();

        assert_eq!(err.code.as_str(), "config.host_list_unreadable");
        assert!(err.code.is_configuration());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts.csv");
        std::fs::write(&path, "192.168.1.10,web-02,web-servers\n").unwrap();

        let list = load(&path).unwrap();
        assert_eq!(list.tasks[0].label, "web-02");
    }
}
