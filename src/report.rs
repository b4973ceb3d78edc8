use anyhow::{Context, Result};
use serde_json::json;

use crate::config::RankBy;
use crate::dashboard::Dashboard;

const CHART_JS_URL: &str = "https://cdn.jsdelivr.net/npm/chart.js@4";
const NO_DATA: &str = "No data yet";

pub trait ReportFormatter {
    fn format(&self, dashboard: &Dashboard) -> Result<String>;
}

/// Renders the dashboard as one static HTML page for GitHub Pages.
pub struct HtmlFormatter;

impl HtmlFormatter {
    pub fn new() -> Self {
        Self
    }

    fn cards(dashboard: &Dashboard) -> String {
        let t = &dashboard.totals;
        [
            ("Total Views", format_count(t.total_views)),
            ("Unique Visitors", format_count(t.unique_views)),
            ("Total Clones", format_count(t.total_clones)),
            ("Unique Cloners", format_count(t.unique_clones)),
            ("Repos Tracked", format_count(t.repos_tracked as u64)),
            ("Total Stars", format_count(t.total_stars)),
        ]
        .iter()
        .map(|(label, value)| {
            format!(
                r#"
    <div class="card">
      <div class="label">{}</div>
      <div class="value">{}</div>
    </div>"#,
                label, value
            )
        })
        .collect()
    }

    fn leaderboard_rows(entries: &[(String, u64)], placeholder_cols: usize) -> String {
        if entries.is_empty() {
            return placeholder_row(placeholder_cols, NO_DATA);
        }

        entries
            .iter()
            .map(|(name, count)| {
                format!(
                    "\n          <tr><td>{}</td><td class=\"num\">{}</td></tr>",
                    escape_html(name),
                    format_count(*count)
                )
            })
            .collect()
    }

    fn repo_rows(dashboard: &Dashboard) -> String {
        if dashboard.repos.is_empty() {
            return placeholder_row(8, "No data yet - run the collector first");
        }

        dashboard
            .repos
            .iter()
            .map(|r| {
                let url = format!("https://github.com/{}/{}", r.owner, r.name);
                let title = r.description.as_deref().unwrap_or_default();
                format!(
                    r#"
        <tr class="repo-row" data-repo="{name}">
          <td><a href="{url}" target="_blank" rel="noopener" title="{title}">{name}</a></td>
          <td class="num">{views}</td>
          <td class="num">{uniques}</td>
          <td class="num">{clones}</td>
          <td class="num">{unique_clones}</td>
          <td class="num">{stars}</td>
          <td class="num">{forks}</td>
          <td class="num">{days}</td>
        </tr>"#,
                    name = escape_html(&r.name),
                    url = escape_html(&url),
                    title = escape_html(title),
                    views = format_count(r.total_views),
                    uniques = format_count(r.unique_views),
                    clones = format_count(r.total_clones),
                    unique_clones = format_count(r.unique_clones),
                    stars = format_count(r.stars),
                    forks = format_count(r.forks),
                    days = r.days_tracked,
                )
            })
            .collect()
    }

    fn chart_config(dashboard: &Dashboard) -> Result<String> {
        let datasets: Vec<_> = dashboard
            .chart_series
            .iter()
            .map(|s| {
                json!({
                    "label": s.label,
                    "data": s.data,
                    "borderColor": s.color,
                    "backgroundColor": s.color,
                    "fill": false,
                    "tension": 0.3,
                })
            })
            .collect();

        let config = json!({
            "type": "line",
            "data": {
                "labels": dashboard.chart_labels,
                "datasets": datasets,
            },
            "options": {
                "responsive": true,
                "interaction": {"mode": "index", "intersect": false},
                "plugins": {
                    "legend": {
                        "position": "bottom",
                        "labels": {"color": "#8b949e", "boxWidth": 12, "padding": 16}
                    }
                },
                "scales": {
                    "x": {"ticks": {"color": "#8b949e", "maxTicksLimit": 12}, "grid": {"color": "#21262d"}},
                    "y": {"ticks": {"color": "#8b949e"}, "grid": {"color": "#21262d"}, "beginAtZero": true}
                }
            }
        });

        let encoded = serde_json::to_string(&config).context("Failed to encode chart data")?;
        Ok(escape_script(&encoded))
    }
}

impl Default for HtmlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for HtmlFormatter {
    fn format(&self, dashboard: &Dashboard) -> Result<String> {
        let owner = dashboard.owner.as_deref().unwrap_or("GitHub");
        let built = dashboard.built_at.format("%Y-%m-%d").to_string();
        let chart_title = match dashboard.rank_by {
            RankBy::Uniques => "Daily Unique Visitors - Top 10 Repos",
            RankBy::Views => "Daily Views - Top 10 Repos",
        };
        let chart = if dashboard.chart_series.is_empty() {
            format!(r#"<p class="empty">{}</p>"#, NO_DATA)
        } else {
            r#"<canvas id="viewsChart" height="100"></canvas>"#.to_string()
        };

        Ok(format!(
            r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>GitHub Traffic Dashboard - {owner}</title>
  <script src="{chart_js}"></script>
  <style>
{style}
  </style>
</head>
<body>
  <h1>GitHub Traffic Dashboard</h1>
  <p class="subtitle">{owner} &middot; {repo_count} repos tracked &middot; Last collection: {last_collection}</p>

  <div class="cards">{cards}
  </div>

  <div class="chart-container">
    <h2>{chart_title}</h2>
    {chart}
  </div>

  <div class="two-col">
    <div class="section">
      <h2>Top Referrers</h2>
      <table>
        <thead><tr><th>Source</th><th class="num">Views</th></tr></thead>
        <tbody>{referrer_rows}
        </tbody>
      </table>
    </div>
    <div class="section">
      <h2>Most Starred</h2>
      <table>
        <thead><tr><th>Repository</th><th class="num">Stars</th></tr></thead>
        <tbody>{star_rows}
        </tbody>
      </table>
    </div>
  </div>

  <div class="section">
    <h2>Collection Info</h2>
    <table>
      <tbody>
        <tr><td>Last run</td><td>{last_run}</td></tr>
        <tr><td>Ranked by</td><td>{rank_by}</td></tr>
        <tr><td>Data retention</td><td>Forever (GitHub keeps 14 days)</td></tr>
        <tr><td>Dashboard built</td><td>{built}</td></tr>
      </tbody>
    </table>
  </div>

  <div class="section">
    <h2>All Repos</h2>
    <table>
      <thead>
        <tr>
          <th>Repository</th>
          <th class="num">Views</th>
          <th class="num">Unique</th>
          <th class="num">Clones</th>
          <th class="num">Unique</th>
          <th class="num">Stars</th>
          <th class="num">Forks</th>
          <th class="num">Days</th>
        </tr>
      </thead>
      <tbody>{repo_rows}
      </tbody>
    </table>
  </div>

  <footer>
    Traffic stats are preserved forever since GitHub only keeps 14 days.
    Generated by traffic-keeper {version} ({commit}).
  </footer>

  <script>
    const chartConfig = {chart_config};
    const canvas = document.getElementById('viewsChart');
    if (canvas) {{
      new Chart(canvas.getContext('2d'), chartConfig);
    }}
  </script>
</body>
</html>
"##,
            owner = escape_html(owner),
            chart_js = CHART_JS_URL,
            style = STYLE,
            repo_count = dashboard.totals.repos_tracked,
            last_collection = dashboard.last_run.as_deref().unwrap_or(&built),
            cards = Self::cards(dashboard),
            chart_title = chart_title,
            chart = chart,
            referrer_rows = Self::leaderboard_rows(&dashboard.top_referrers, 2),
            star_rows = Self::leaderboard_rows(&dashboard.top_starred, 2),
            last_run = dashboard.last_run.as_deref().unwrap_or("Not yet"),
            rank_by = dashboard.rank_by,
            built = built,
            repo_rows = Self::repo_rows(dashboard),
            version = env!("CARGO_PKG_VERSION"),
            commit = env!("GIT_COMMIT"),
            chart_config = Self::chart_config(dashboard)?,
        ))
    }
}

const STYLE: &str = r#"    :root {
      --bg: #0d1117; --surface: #161b22; --border: #30363d;
      --text: #e6edf3; --text-dim: #8b949e; --accent: #58a6ff;
    }
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
      background: var(--bg); color: var(--text); line-height: 1.5;
      padding: 2rem; max-width: 1200px; margin: 0 auto;
    }
    h1 { font-size: 1.5rem; margin-bottom: 0.25rem; }
    .subtitle { color: var(--text-dim); margin-bottom: 2rem; font-size: 0.9rem; }
    .cards {
      display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 1rem; margin-bottom: 2rem;
    }
    .card { background: var(--surface); border: 1px solid var(--border); border-radius: 8px; padding: 1.25rem; }
    .card .label { color: var(--text-dim); font-size: 0.8rem; text-transform: uppercase; letter-spacing: 0.05em; }
    .card .value { font-size: 1.75rem; font-weight: 600; margin-top: 0.25rem; }
    .chart-container {
      background: var(--surface); border: 1px solid var(--border);
      border-radius: 8px; padding: 1.5rem; margin-bottom: 2rem;
    }
    .chart-container h2, .section h2 { font-size: 1rem; margin-bottom: 0.75rem; }
    .empty { color: var(--text-dim); }
    .section { margin-bottom: 2rem; }
    table { width: 100%; border-collapse: collapse; background: var(--surface); border-radius: 8px; overflow: hidden; }
    th, td { padding: 0.6rem 1rem; text-align: left; border-bottom: 1px solid var(--border); font-size: 0.875rem; }
    th { color: var(--text-dim); font-weight: 500; font-size: 0.75rem; text-transform: uppercase; letter-spacing: 0.05em; }
    td a { color: var(--accent); text-decoration: none; }
    td a:hover { text-decoration: underline; }
    .num { text-align: right; font-variant-numeric: tabular-nums; }
    .repo-row:hover { background: rgba(88, 166, 255, 0.05); }
    .two-col { display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; }
    @media (max-width: 768px) { .two-col { grid-template-columns: 1fr; } }
    footer { color: var(--text-dim); font-size: 0.8rem; margin-top: 3rem; text-align: center; }"#;

fn placeholder_row(cols: usize, text: &str) -> String {
    format!(
        "\n          <tr><td colspan=\"{}\">{}</td></tr>",
        cols,
        escape_html(text)
    )
}

/// Formats a count with comma thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// JSON inside <script> must not close the tag early.
fn escape_script(json: &str) -> String {
    json.replace("</", "<\\/")
}
