use crate::probe_result::CheckResult;
use crate::reporter::ProbeReporter;
use crate::store::Site;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Write as _;

/// Prints a results table to stdout.
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

#[async_trait]
impl ProbeReporter for ConsoleReporter {
    async fn report(&self, sites: &[Site], results: &[CheckResult]) -> Result<()> {
        print!("{}", render_results(sites, results, self.verbose));
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Up sites first by latency, then down sites by name.
pub fn render_results(sites: &[Site], results: &[CheckResult], verbose: bool) -> String {
    let mut rows: Vec<(&Site, &CheckResult)> = sites.iter().zip(results).collect();
    rows.sort_by(|(sa, a), (sb, b)| match (a.is_up(), b.is_up()) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        (true, true) => a.latency.cmp(&b.latency),
        (false, false) => sa.name.cmp(&sb.name),
    });

    let mut out = String::new();
    let _ = writeln!(out, "\n=== sitecheck Results ===");
    let _ = writeln!(
        out,
        "{:<25} {:<8} {:<30} {:<8} {}",
        "Name", "Method", "Target", "Status", "Latency"
    );
    let _ = writeln!(out, "{}", "=".repeat(85));

    let mut up_count = 0;
    for (site, result) in &rows {
        let (status, latency) = if result.is_up() {
            up_count += 1;
            ("✓ UP", format!("{}ms", result.latency_ms()))
        } else {
            ("✗ DOWN", "-".to_string())
        };

        let _ = writeln!(
            out,
            "{:<25} {:<8} {:<30} {:<8} {}",
            truncate(&site.name, 24),
            truncate(site.method.as_str(), 7),
            truncate(&site.target, 29),
            status,
            latency
        );

        if verbose && !result.is_up() {
            let _ = writeln!(out, "    Error: {}", result.message);
        }
    }

    let total = rows.len();
    let success_rate = if total == 0 {
        0.0
    } else {
        up_count as f64 / total as f64 * 100.0
    };
    let _ = writeln!(out, "\n=== Summary ===");
    let _ = writeln!(out, "Total sites: {}", total);
    let _ = writeln!(out, "Up: {}", up_count);
    let _ = writeln!(out, "Down: {}", total - up_count);
    let _ = writeln!(out, "Success rate: {:.1}%", success_rate);
    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        // 3 chars reserved for "..."
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Method;
    use chrono::Utc;
    use std::time::Duration;

    fn site(id: &str, name: &str) -> Site {
        Site {
            id: id.into(),
            target: format!("{name}.example"),
            name: name.into(),
            method: Method::Tcp,
        }
    }

    #[test]
    fn up_rows_come_first_and_summary_counts() {
        let sites = vec![site("1", "zulu"), site("2", "alpha"), site("3", "bravo")];
        let now = Utc::now();
        let results = vec![
            CheckResult::down(&sites[0], now, Duration::ZERO, "refused"),
            CheckResult::from_success(&sites[1], now, Duration::from_millis(30)),
            CheckResult::down(&sites[2], now, Duration::ZERO, "timeout"),
        ];

        let table = render_results(&sites, &results, true);

        let alpha = table.find("alpha").unwrap();
        let bravo = table.find("bravo").unwrap();
        let zulu = table.find("zulu").unwrap();
        assert!(alpha < bravo && bravo < zulu);
        assert!(table.contains("30ms"));
        assert!(table.contains("Error: refused"));
        assert!(table.contains("Up: 1"));
        assert!(table.contains("Down: 2"));
        assert!(table.contains("Success rate: 33.3%"));
    }

    #[test]
    fn empty_table_has_zero_rate() {
        let table = render_results(&[], &[], false);
        assert!(table.contains("Success rate: 0.0%"));
    }

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
