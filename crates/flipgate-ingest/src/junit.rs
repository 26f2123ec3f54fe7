use crate::{IngestError, parse_timestamp, read_file};
use flipgate_types::{OutcomeRecord, TestStatus};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::{Path, PathBuf};
use time::PrimitiveDateTime;

struct SuiteFrame {
    name: String,
    timestamp: Option<PrimitiveDateTime>,
}

struct OpenCase {
    test_identifier: String,
    timestamp: PrimitiveDateTime,
    result: Option<TestStatus>,
    depth: usize,
}

impl OpenCase {
    fn finish(self) -> Option<OutcomeRecord> {
        let status = self.result.unwrap_or(TestStatus::Pass);
        if status.is_skipped() {
            return None;
        }
        Some(OutcomeRecord::new(self.timestamp, self.test_identifier, status))
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, quick_xml::Error> {
    match element.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

struct JunitParser<'a> {
    path: &'a Path,
    suites: Vec<SuiteFrame>,
    case: Option<OpenCase>,
    records: Vec<OutcomeRecord>,
    seen_root: bool,
}

impl<'a> JunitParser<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            suites: Vec::new(),
            case: None,
            records: Vec::new(),
            seen_root: false,
        }
    }

    fn xml_err(&self, source: quick_xml::Error) -> IngestError {
        IngestError::Xml {
            path: self.path.to_path_buf(),
            source,
        }
    }

    fn attr(&self, element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, IngestError> {
        attribute(element, name).map_err(|e| self.xml_err(e))
    }

    fn open(&mut self, element: &BytesStart<'_>, self_closing: bool) -> Result<(), IngestError> {
        let tag = element.local_name();
        let tag = tag.as_ref();

        if !self.seen_root {
            self.seen_root = true;
            if tag != b"testsuites" && tag != b"testsuite" {
                return Err(IngestError::UnexpectedRoot {
                    path: self.path.to_path_buf(),
                    root: String::from_utf8_lossy(tag).into_owned(),
                });
            }
        }

        if let Some(case) = self.case.as_mut() {
            if case.depth == 0 && case.result.is_none() {
                case.result = match tag {
                    b"failure" => Some(TestStatus::Failure),
                    b"error" => Some(TestStatus::Error),
                    b"skipped" => Some(TestStatus::Skipped),
                    _ => None,
                };
            }
            if !self_closing {
                case.depth += 1;
            }
            return Ok(());
        }

        match tag {
            b"testsuite" if !self_closing => self.open_suite(element),
            b"testcase" => self.open_case(element, self_closing),
            _ => Ok(()),
        }
    }

    fn open_suite(&mut self, element: &BytesStart<'_>) -> Result<(), IngestError> {
        let name = self.attr(element, b"name")?.unwrap_or_default();
        let timestamp = match self.attr(element, b"timestamp")? {
            Some(raw) => Some(parse_timestamp(&raw).ok_or_else(|| {
                IngestError::InvalidSuiteTimestamp {
                    path: self.path.to_path_buf(),
                    suite: name.clone(),
                    value: raw.clone(),
                }
            })?),
            // Nested suites may inherit the enclosing suite's timestamp.
            None => self.suites.last().and_then(|s| s.timestamp),
        };
        self.suites.push(SuiteFrame { name, timestamp });
        Ok(())
    }

    fn open_case(&mut self, element: &BytesStart<'_>, self_closing: bool) -> Result<(), IngestError> {
        let name = self
            .attr(element, b"name")?
            .ok_or_else(|| IngestError::MissingTestName {
                path: self.path.to_path_buf(),
            })?;
        let test_identifier = match self.attr(element, b"classname")? {
            Some(classname) if !classname.is_empty() => format!("{classname}::{name}"),
            _ => name,
        };

        let suite = self.suites.last();
        let timestamp = suite.and_then(|s| s.timestamp).ok_or_else(|| {
            IngestError::MissingSuiteTimestamp {
                path: self.path.to_path_buf(),
                suite: suite.map(|s| s.name.clone()).unwrap_or_default(),
            }
        })?;

        let case = OpenCase {
            test_identifier,
            timestamp,
            result: None,
            depth: 0,
        };
        if self_closing {
            self.records.extend(case.finish());
        } else {
            self.case = Some(case);
        }
        Ok(())
    }

    fn close(&mut self, tag: &[u8]) {
        if let Some(case) = self.case.as_mut() {
            if case.depth > 0 {
                case.depth -= 1;
                return;
            }
            if tag == b"testcase"
                && let Some(case) = self.case.take()
            {
                self.records.extend(case.finish());
            }
            return;
        }
        if tag == b"testsuite" {
            self.suites.pop();
        }
    }

    fn parse(mut self, xml: &str) -> Result<Vec<OutcomeRecord>, IngestError> {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event().map_err(|e| self.xml_err(e))? {
                Event::Start(e) => self.open(&e, false)?,
                Event::Empty(e) => self.open(&e, true)?,
                Event::End(e) => self.close(e.local_name().as_ref()),
                Event::Eof => break,
                _ => {}
            }
        }
        if !self.seen_root {
            return Err(IngestError::UnexpectedRoot {
                path: self.path.to_path_buf(),
                root: String::new(),
            });
        }
        Ok(self.records)
    }
}

/// Parse one JUnit XML document.
///
/// Every `<testcase>` becomes a record stamped with its suite's timestamp
/// and identified as `classname::name`. A test case with no result child
/// passed; otherwise its first `failure`/`error` child decides the status.
/// Skipped cases are dropped.
pub fn parse_junit_xml(xml: &str, path: &Path) -> Result<Vec<OutcomeRecord>, IngestError> {
    JunitParser::new(path).parse(xml)
}

/// Parse every `*.xml` file directly inside `dir`, in path order.
pub fn read_junit_dir(dir: &Path) -> Result<Vec<OutcomeRecord>, IngestError> {
    if !dir.is_dir() {
        return Err(IngestError::NotADirectory(dir.to_path_buf()));
    }

    let pattern = format!(
        "{}/*.xml",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in glob::glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "skipping unreadable junit entry"),
        }
    }
    files.sort();

    let mut records = Vec::new();
    for file in &files {
        let content = read_file(file)?;
        let parsed = parse_junit_xml(&content, file)?;
        tracing::debug!(path = %file.display(), records = parsed.len(), "parsed junit file");
        records.extend(parsed);
    }
    if files.is_empty() {
        tracing::warn!(dir = %dir.display(), "no *.xml files found");
    }
    Ok(records)
}
