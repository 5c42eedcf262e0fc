use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use interpreter::{IncludeResolver, ScriptEvaluator, Settled, Stats, WeaveError, weave_until_settled};
use mash::Parser;

use crate::config::Config;

const TEST_SUFFIX: &str = ".test.mash";

/// Statistics a test expects; fields left out are not checked.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedStats {
    pub frames: Option<usize>,
    pub code: Option<usize>,
    pub text: Option<usize>,
    pub includes: Option<usize>,
}

impl ExpectedStats {
    /// Describe the first mismatch, if any.
    fn mismatch(&self, actual: &Stats) -> Option<String> {
        let checks = [
            ("frames", self.frames, actual.frames),
            ("code", self.code, actual.code),
            ("text", self.text, actual.text),
            ("includes", self.includes, actual.includes),
        ];
        checks.iter().find_map(|(name, expected, got)| match expected {
            Some(expected) if expected != got => Some(format!(
                "stats mismatch: expected {} {}, got {} ({})",
                expected, name, got, actual
            )),
            _ => None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Expected printed output (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// Expected composed text of the document root (trimmed comparison).
    #[serde(default)]
    pub expect_text: Option<String>,

    /// Expected error; its Display string must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// If true, the test expects the document itself to be malformed.
    #[serde(default)]
    pub expect_parse_error: bool,

    #[serde(default)]
    pub expect_stats: Option<ExpectedStats>,
}

/// Split a `.test.mash` file into its TOML config and document.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM

    if !content.starts_with("---") {
        return Err("missing opening --- frontmatter delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest_start = close_pos + 4; // skip \n---
    let source = after_open[rest_start..]
        .strip_prefix("\r\n")
        .or_else(|| after_open[rest_start..].strip_prefix('\n'))
        .unwrap_or(&after_open[rest_start..]);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();
    let name = path.display().to_string();

    let parse_result = Parser::new(source, name.as_str()).parse();
    if config.expect_parse_error {
        return match parse_result {
            Err(_) => TestResult {
                path: path.to_path_buf(),
                description,
                outcome: TestOutcome::Pass,
            },
            Ok(_) => fail(
                description,
                "expected parse error, but parsing succeeded".into(),
            ),
        };
    }
    if let Err(err) = parse_result {
        return fail(description, format!("unexpected parse error: {}", err));
    }

    // Includes resolve next to the test file.
    let base_dir = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let resolver = IncludeResolver::new(base_dir);
    let result = weave_until_settled(
        || Ok(Parser::new(source, name.as_str()).parse()?),
        || ScriptEvaluator::new(Vec::new()),
        &resolver,
        Config::default().max_restarts,
    );

    match check_expectations(&config, result) {
        Some(reason) => fail(description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Compare a finished run against the test's expectations. Returns
/// `Some(reason)` on mismatch.
fn check_expectations(
    config: &TestConfig,
    result: Result<Settled<ScriptEvaluator<Vec<u8>>>, WeaveError>,
) -> Option<String> {
    let settled = match (&config.expect_error, result) {
        (Some(expected_err), Err(err)) => {
            let err_str = err.to_string();
            return if err_str.contains(expected_err.as_str()) {
                None
            } else {
                Some(format!(
                    "expected error containing \"{}\", got: {}",
                    expected_err, err_str
                ))
            };
        }
        (Some(expected_err), Ok(_)) => {
            return Some(format!(
                "expected error containing \"{}\", but weaving succeeded",
                expected_err
            ));
        }
        (None, Err(err)) => return Some(format!("unexpected error: {}", err)),
        (None, Ok(settled)) => settled,
    };

    if let Some(expected_output) = &config.expect_output {
        let actual = String::from_utf8_lossy(settled.evaluator.output());
        if actual.trim() != expected_output.trim() {
            return Some(format!(
                "output mismatch\n  expected: {}\n  actual:   {}",
                expected_output.trim(),
                actual.trim()
            ));
        }
    }

    if let Some(expected_text) = &config.expect_text {
        let actual = settled.report.text.trim();
        if actual != expected_text.trim() {
            return Some(format!(
                "text mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected_text.trim(),
                actual
            ));
        }
    }

    config
        .expect_stats
        .as_ref()
        .and_then(|expected| expected.mismatch(&settled.report.stats))
}

/// Discover test files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        log::warn!("cannot list {}", dir.display());
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(TEST_SUFFIX))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

/// ANSI styling, or none at all.
#[derive(Clone, Copy)]
struct Palette {
    color: bool,
}

impl Palette {
    fn paint(self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn pass(self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(self) -> String {
        self.paint("31", "FAIL")
    }

    fn bold(self, text: &str) -> String {
        self.paint("1", text)
    }
}

/// Keep only the requested categories and their subcategories.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }

    let mut selected = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let prefix = format!("{}/", req);
        let before = selected.len();
        for (category, files) in all {
            if category == req || category.starts_with(&prefix) {
                selected.insert(category.as_str(), files);
            }
        }
        if selected.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected
}

/// Run every test file under `path`, or `path` itself when it is a file.
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let palette = Palette { color: !no_color };

    let all_categories = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };
    if all_categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return 1;
    }

    let selected = if path.is_file() {
        select_categories(&all_categories, &[])
    } else {
        select_categories(&all_categories, categories)
    };
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &selected {
        eprintln!();
        eprintln!("{}", palette.bold(category_label(category)));

        for file in *files {
            let result = run_single_test(file);
            let label = result
                .description
                .clone()
                .unwrap_or_else(|| file_stem(file));

            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", palette.pass(), label);
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", palette.fail(), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", palette.paint("32", "ok"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            palette.paint("31", "FAILED"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

fn file_stem(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(TEST_SUFFIX).to_string())
        .unwrap_or_else(|| "?".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_test(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn failure(result: &TestResult) -> Option<&str> {
        match &result.outcome {
            TestOutcome::Pass => None,
            TestOutcome::Fail(reason) => Some(reason),
        }
    }

    #[test]
    fn test_front_matter_split() {
        let (config, source) = parse_test_file(
            "---\ndescription = \"adds\"\nexpect_output = \"3\"\n---\n[[[ print(1 + 2) ]]]\n",
        )
        .unwrap();
        assert_eq!(config.description.as_deref(), Some("adds"));
        assert_eq!(config.expect_output.as_deref(), Some("3"));
        assert!(!config.expect_parse_error);
        assert_eq!(source, "[[[ print(1 + 2) ]]]\n");
    }

    #[test]
    fn test_front_matter_stats() {
        let (config, _) =
            parse_test_file("---\n[expect_stats]\nframes = 2\ntext = 3\n---\nbody").unwrap();
        let stats = config.expect_stats.unwrap();
        assert_eq!(stats.frames, Some(2));
        assert_eq!(stats.text, Some(3));
        assert_eq!(stats.code, None);
    }

    #[test]
    fn test_front_matter_errors() {
        assert!(parse_test_file("no front matter").is_err());
        assert!(parse_test_file("---\ndescription = 1\n").is_err());
        assert!(parse_test_file("---\nunknown_key = true\n---\n").is_err());
    }

    #[test]
    fn test_passing_document() {
        let dir = TempDir::new().unwrap();
        let path = write_test(
            dir.path(),
            "end_to_end.test.mash",
            "---\nexpect_text = \"a\\nbe\\nf\"\n[expect_stats]\nframes = 2\ncode = 1\ntext = 3\n---\na\nb[[[ x = 1 |||d]]]e\nf",
        );
        let result = run_single_test(&path);
        assert_eq!(failure(&result), None);
    }

    #[test]
    fn test_output_mismatch_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_test(
            dir.path(),
            "wrong.test.mash",
            "---\nexpect_output = \"4\"\n---\n[[[ print(1 + 2) ]]]",
        );
        let result = run_single_test(&path);
        assert!(failure(&result).unwrap().contains("output mismatch"));
    }

    #[test]
    fn test_expected_errors() {
        let dir = TempDir::new().unwrap();
        let parse = write_test(
            dir.path(),
            "parse.test.mash",
            "---\nexpect_parse_error = true\n---\n[[[ a ||| b ||| c ]]]",
        );
        let runtime = write_test(
            dir.path(),
            "runtime.test.mash",
            "---\nexpect_error = \"division by zero\"\n---\n[[[ x = 1 / 0 ]]]",
        );
        assert_eq!(failure(&run_single_test(&parse)), None);
        assert_eq!(failure(&run_single_test(&runtime)), None);
    }

    #[test]
    fn test_includes_resolve_next_to_the_test() {
        let dir = TempDir::new().unwrap();
        write_test(dir.path(), "nested/defs.mash", "[[[ n = 21 ]]]");
        let path = write_test(
            dir.path(),
            "nested/uses.test.mash",
            "---\nexpect_output = \"42\"\n---\n[[[include defs.mash]]][[[ print(n * 2) ]]]",
        );
        assert_eq!(failure(&run_single_test(&path)), None);
    }

    #[test]
    fn test_discovery_by_category() {
        let dir = TempDir::new().unwrap();
        write_test(dir.path(), "top.test.mash", "---\n---\n");
        write_test(dir.path(), "scheduler/order.test.mash", "---\n---\n");
        write_test(dir.path(), "scheduler/notes.mash", "not a test");

        let categories = discover_categorized(dir.path());
        assert_eq!(
            categories.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["", "scheduler"]
        );
        assert_eq!(categories["scheduler"].len(), 1);

        let selected = select_categories(&categories, &["scheduler/".to_string()]);
        assert_eq!(selected.keys().copied().collect::<Vec<_>>(), vec!["scheduler"]);
    }

    #[test]
    fn test_run_tests_exit_codes() {
        let dir = TempDir::new().unwrap();
        write_test(dir.path(), "ok.test.mash", "---\nexpect_text = \"plain\"\n---\nplain");
        assert_eq!(run_tests(dir.path(), true, &[]), 0);

        write_test(dir.path(), "bad.test.mash", "---\nexpect_text = \"other\"\n---\nplain");
        assert_eq!(run_tests(dir.path(), true, &[]), 1);
    }
}
