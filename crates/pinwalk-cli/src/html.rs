//! Static HTML rendering of a [`ScanReport`].
//!
//! Nodes with dependencies or warnings go into the "Key Actions" table; the
//! rest are folded into a collapsed "Less Important" table.

use std::fmt::{self, Write as _};

use chrono::{DateTime, Utc};
use pinwalk_core::report::ScanReport;

const STYLE: &str = r#"
    body { margin: 0; font-family: "Segoe UI", Tahoma, Geneva, Verdana, sans-serif; background: #8ecae6; color: #333; }
    .header { background: #023047; color: #fff; padding: 20px; text-align: center; }
    .header h1 { margin: 0; font-size: 1.8em; }
    .container { max-width: 1200px; margin: 20px auto 60px auto; background: #fff; border-radius: 6px; padding: 20px; }
    h2 { margin-top: 0; color: #219ebc; }
    .table-responsive { width: 100%; overflow-x: auto; margin-bottom: 2em; }
    table { width: 100%; min-width: 600px; border-collapse: collapse; }
    thead tr { background: #219ebc; color: #fff; }
    th, td { padding: 12px 16px; border-bottom: 1px solid #eee; vertical-align: top; text-align: left; white-space: pre-wrap; word-wrap: break-word; }
    .dependencies-list, .warnings-list { list-style: none; margin: 0; padding-left: 1.2em; }
    .dependencies-list li::before { content: "\2022  "; color: #219ebc; }
    .warnings-list li::before { content: "\26A0  "; color: #d00; }
    .no-warnings { color: #666; font-style: italic; }
    .toggle-btn { background: #219ebc; color: #fff; border: none; padding: 0.6em 1em; border-radius: 4px; cursor: pointer; margin-bottom: 1em; }
    .footer { text-align: center; margin-top: 2em; font-size: 0.9em; color: #666; }
"#;

const SCRIPT: &str = r"
    function toggleHidden(id) {
      const el = document.getElementById(id);
      el.style.display = el.style.display === 'none' ? 'block' : 'none';
    }
";

const TABLE_HEAD: &str = r#"<thead><tr><th style="width: 30%;">Action</th><th style="width: 35%;">Dependencies</th><th style="width: 35%;">Docker Warnings</th></tr></thead>"#;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

struct Row<'a> {
    node: &'a str,
    children: &'a [String],
    warnings: &'a [String],
}

impl Row<'_> {
    const fn is_key(&self) -> bool {
        !self.children.is_empty() || !self.warnings.is_empty()
    }
}

fn rows(report: &ScanReport) -> Vec<Row<'_>> {
    let mut rows: Vec<Row<'_>> = report
        .dependencies_root_first()
        .map(|(node, children)| Row {
            node,
            children,
            warnings: report.warnings_for(node),
        })
        .collect();

    // Reports written by hand may carry warnings for nodes with no dependency entry.
    rows.extend(
        report
            .docker_warnings
            .iter()
            .filter(|(node, _)| !report.dependencies.contains_key(node.as_str()))
            .map(|(node, warnings)| Row {
                node,
                children: &[],
                warnings,
            }),
    );
    rows
}

fn write_row(html: &mut String, row: &Row<'_>) -> fmt::Result {
    write!(html, "<tr><td><strong>{}</strong></td><td>", escape_html(row.node))?;
    if row.children.is_empty() {
        html.push_str("<em>No further dependencies</em>");
    } else {
        html.push_str(r#"<ul class="dependencies-list">"#);
        for child in row.children {
            write!(html, "<li>{}</li>", escape_html(child))?;
        }
        html.push_str("</ul>");
    }
    html.push_str("</td><td>");
    if row.warnings.is_empty() {
        html.push_str(r#"<span class="no-warnings">No warnings</span>"#);
    } else {
        html.push_str(r#"<ul class="warnings-list">"#);
        for warning in row.warnings {
            write!(html, "<li>{}</li>", escape_html(warning))?;
        }
        html.push_str("</ul>");
    }
    html.push_str("</td></tr>\n");
    Ok(())
}

/// Render the full HTML document.
///
/// # Errors
///
/// Only if formatting into the output buffer fails.
pub fn render_html(
    report: &ScanReport,
    repo_name: &str,
    generated_at: DateTime<Utc>,
) -> Result<String, fmt::Error> {
    let name = escape_html(repo_name);
    let (key, rest): (Vec<Row<'_>>, Vec<Row<'_>>) =
        rows(report).into_iter().partition(Row::is_key);

    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, r#"<html lang="en">"#)?;
    writeln!(html, "<head>")?;
    writeln!(html, r#"<meta charset="UTF-8" />"#)?;
    writeln!(html, "<title>Dependency Report for {name}</title>")?;
    writeln!(html, "<style>{STYLE}</style>")?;
    writeln!(html, "<script>{SCRIPT}</script>")?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(
        html,
        r#"<div class="header"><h1>Dependency Report for {name}</h1></div>"#
    )?;
    writeln!(html, r#"<div class="container">"#)?;

    writeln!(html, "<h2>Key Actions</h2>")?;
    writeln!(html, r#"<div class="table-responsive"><table>{TABLE_HEAD}<tbody>"#)?;
    for row in &key {
        write_row(&mut html, row)?;
    }
    writeln!(html, "</tbody></table></div>")?;

    if !rest.is_empty() {
        writeln!(html, r#"<div class="collapsible-section">"#)?;
        writeln!(
            html,
            "<h2>Less Important (No Dependencies &amp; No Warnings)</h2>"
        )?;
        writeln!(
            html,
            r#"<button class="toggle-btn" onclick="toggleHidden('lessImportantTable')">Show/Hide</button>"#
        )?;
        writeln!(
            html,
            r#"<div id="lessImportantTable" style="display:none;"><div class="table-responsive"><table>{TABLE_HEAD}<tbody>"#
        )?;
        for row in &rest {
            write_row(&mut html, row)?;
        }
        writeln!(html, "</tbody></table></div></div>")?;
        writeln!(html, "</div>")?;
    }

    let summary = report.summary();
    writeln!(
        html,
        r#"<div class="footer">{} actions, {} warnings. Generated {}.</div>"#,
        summary.actions,
        summary.warnings,
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(html, "</div>")?;
    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pinwalk_core::ROOT_LABEL;
    use std::collections::BTreeMap;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn report() -> ScanReport {
        let mut dependencies = BTreeMap::new();
        dependencies.insert(ROOT_LABEL.to_string(), vec!["org/build@v1".to_string()]);
        dependencies.insert("org/build@v1".to_string(), vec![]);
        dependencies.insert("org/quiet@v1".to_string(), vec![]);

        let mut docker_warnings = BTreeMap::new();
        docker_warnings.insert(
            "org/build@v1".to_string(),
            vec!["Unpinned Docker FROM => '<img> & co'".to_string()],
        );

        ScanReport {
            dependencies,
            docker_warnings,
            all_actions: vec!["org/build@v1".to_string(), "org/quiet@v1".to_string()],
        }
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn key_and_less_important_rows_are_split() {
        let html = render_html(&report(), "org/repo", at()).expect("render");
        let key = html.find("<h2>Key Actions</h2>").expect("key section");
        let less = html.find("Less Important").expect("less section");
        let build = html.find("<strong>org/build@v1</strong>").expect("build row");
        let quiet = html.find("<strong>org/quiet@v1</strong>").expect("quiet row");
        assert!(key < build && build < less && less < quiet);
        assert!(html.contains("<strong>Main Repository</strong>"));
    }

    #[test]
    fn warning_text_is_escaped() {
        let html = render_html(&report(), "<repo>", at()).expect("render");
        assert!(html.contains("Unpinned Docker FROM =&gt; &#39;&lt;img&gt; &amp; co&#39;"));
        assert!(html.contains("Dependency Report for &lt;repo&gt;"));
        assert!(!html.contains("<img>"));
    }

    #[test]
    fn collapsed_section_is_omitted_when_every_node_matters() {
        let mut report = report();
        report.dependencies.remove("org/quiet@v1");
        let html = render_html(&report, "org/repo", at()).expect("render");
        assert!(!html.contains("lessImportantTable"));
    }

    #[test]
    fn warnings_without_dependency_entry_still_show() {
        let mut report = report();
        report
            .docker_warnings
            .insert("org/orphan@v1".to_string(), vec!["odd".to_string()]);
        let html = render_html(&report, "org/repo", at()).expect("render");
        assert!(html.contains("<strong>org/orphan@v1</strong>"));
    }

    #[test]
    fn footer_carries_counts_and_timestamp() {
        let html = render_html(&report(), "org/repo", at()).expect("render");
        assert!(html.contains("2 actions, 1 warnings. Generated 2024-05-01 12:00:00 UTC."));
    }
}
