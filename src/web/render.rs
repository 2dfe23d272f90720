// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Dashboard templates

use minijinja::{context, Environment};

use crate::present::DisplayState;
use crate::session::SessionSnapshot;
use crate::Result;

const BASE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    {% if display == "loading" %}<meta http-equiv="refresh" content="3">{% endif %}
    <title>CityPulse Studio</title>
    <style>
        :root {
            --bg-primary: #020617;
            --bg-secondary: #0f172a;
            --bg-card: #1e293b;
            --text-primary: #e2e8f0;
            --text-secondary: #64748b;
            --accent: #6366f1;
            --success: #10b981;
            --danger: #f87171;
            --warning: #fbbf24;
            --border: #1e293b;
        }
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            display: flex;
            min-height: 100vh;
            line-height: 1.5;
        }
        aside {
            width: 400px;
            background: var(--bg-secondary);
            border-right: 1px solid var(--border);
            display: flex;
            flex-direction: column;
        }
        aside section, aside header, aside footer { padding: 24px; border-bottom: 1px solid var(--border); }
        aside section { flex: 1; }
        h1 { font-size: 1.25em; }
        h1 span, .accent { color: var(--accent); }
        h3 {
            font-size: 0.7em;
            text-transform: uppercase;
            letter-spacing: 0.15em;
            color: var(--text-secondary);
            margin: 12px 0;
        }
        textarea {
            width: 100%;
            height: 8em;
            background: var(--bg-card);
            color: var(--text-primary);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 12px;
        }
        button {
            background: var(--accent);
            color: white;
            border: none;
            border-radius: 8px;
            padding: 6px 12px;
            cursor: pointer;
        }
        button[disabled] { background: var(--bg-card); color: var(--text-secondary); cursor: not-allowed; }
        .run { width: 100%; padding: 14px; font-weight: bold; text-transform: uppercase; letter-spacing: 0.1em; }
        .files { list-style: none; margin-top: 12px; }
        .files li { display: flex; gap: 8px; align-items: center; padding: 4px 0; }
        .files form { margin-left: auto; }
        .kind { font-size: 0.7em; text-transform: uppercase; color: var(--text-secondary); }
        .error { color: var(--danger); font-family: monospace; font-size: 0.75em; margin-top: 8px; }
        .note { color: var(--text-secondary); font-size: 0.8em; margin-top: 8px; }
        main { flex: 1; padding: 24px 32px; overflow-y: auto; }
        main > header {
            display: flex;
            justify-content: space-between;
            font-family: monospace;
            font-size: 0.75em;
            text-transform: uppercase;
            color: var(--text-secondary);
            border-bottom: 1px solid var(--border);
            padding-bottom: 12px;
            margin-bottom: 24px;
        }
        .live { color: var(--success); }
        .card {
            background: var(--bg-card);
            border-radius: 12px;
            padding: 20px;
            margin-bottom: 20px;
        }
        .card h2 { margin-bottom: 12px; color: var(--accent); font-size: 1em; }
        .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(280px, 1fr)); gap: 20px; }
        .recommendation { font-size: 1.3em; font-weight: 600; }
        .severity { font-size: 0.7em; padding: 2px 8px; border-radius: 12px; }
        .severity.high { background: var(--danger); color: black; }
        .severity.medium { background: var(--warning); color: black; }
        .severity.low { background: var(--success); color: black; }
        .zone { display: inline-block; font-size: 0.75em; border: 1px solid var(--text-secondary); border-radius: 6px; padding: 0 6px; margin: 2px; }
        pre { background: var(--bg-primary); padding: 12px; border-radius: 8px; overflow-x: auto; }
        .placeholder { text-align: center; color: var(--text-secondary); margin-top: 20vh; }
    </style>
</head>
<body>
{% block body %}{% endblock %}
</body>
</html>"#;

const DASHBOARD: &str = r#"{% extends "base.html" %}
{% block body %}
<aside>
    <header>
        <h1>CityPulse <span>Studio</span></h1>
        <p class="note">Urban Reasoning &amp; Prototyping</p>
    </header>
    <section>
        <h3>1. Upload Datasets</h3>
        <form method="post" action="/files" enctype="multipart/form-data">
            <input type="file" name="files" multiple
                   accept=".csv,.tsv,.xlsx,.xls,.ods,.png,.jpg,.jpeg,.webp,.gif,.bmp,.heic,.pdf,.txt,.md">
            <button type="submit">Add</button>
        </form>
        <ul class="files">
        {% for file in files %}
            <li>
                <span class="kind">{{ file.kind }}</span>
                <span>{{ file.name }}</span>
                <form method="post" action="/files/{{ file.id }}/remove"><button type="submit">&times;</button></form>
            </li>
        {% else %}
            <li class="note">No files yet</li>
        {% endfor %}
        </ul>
        {% for failure in ingest_failures %}
            <p class="error">{{ failure.name }}: {{ failure.reason }}</p>
        {% endfor %}

        <h3>2. Urban Context</h3>
        <form method="post" action="/transcribe" enctype="multipart/form-data">
            <input type="file" name="audio" accept="audio/*" capture>
            <button type="submit" {% if transcription.status == "transcribing" %}disabled{% endif %}>Transcribe</button>
        </form>
        {% if transcription.status == "transcribing" %}
            <p class="note">Transcribing&hellip;</p>
        {% elif transcription.status == "done" %}
            <p class="note">Transcribed: {{ transcription.text }}</p>
        {% endif %}
        {% if transcription_error %}<p class="error">{{ transcription_error }}</p>{% endif %}
        <form method="post" action="/context">
            <textarea name="text" placeholder="Describe urban challenges, citizen feedback, or specific goals for analysis...">{{ context }}</textarea>
            <button type="submit">Save notes</button>
        </form>
        {% if context %}
        <form method="post" action="/context/clear"><button type="submit">Clear notes</button></form>
        {% endif %}
    </section>
    <footer>
        <form method="post" action="/analyze">
            <button class="run" type="submit" {% if not can_run %}disabled{% endif %}>
                {% if can_run %}Generate Intelligence{% else %}Reasoning...{% endif %}
            </button>
        </form>
        {% if error %}<p class="error">{{ error }}</p>{% endif %}
    </footer>
</aside>
<main>
    <header>
        <span>Workspace / Reasoning Engine
            {% if analyzed_at %}<span class="live">&middot; Live Analysis {{ analyzed_at }}</span>{% endif %}
        </span>
        <span>{{ engine }} active</span>
    </header>
    {% if display == "loading" %}
        <div class="placeholder">
            <h2>Synthesising urban data&hellip;</h2>
            <p>Cross-referencing datasets, imagery and field notes.</p>
        </div>
    {% elif display == "result" %}
        <div class="card">
            <h2>Primary Recommendation</h2>
            <p class="recommendation">{{ result.primaryRecommendation }}</p>
        </div>
        <div class="grid">
            <div class="card">
                <h2>Key Insights</h2>
                <ol>{% for insight in result.keyInsights %}<li>{{ insight }}</li>{% endfor %}</ol>
            </div>
            <div class="card">
                <h2>Risks</h2>
                <ul>{% for risk in result.risks %}<li>{{ risk }}</li>{% endfor %}</ul>
            </div>
        </div>
        <div class="card">
            <h2>Problems ({{ result.problems|length }})</h2>
            {% for problem in result.problems %}
            <div>
                <strong>{{ problem.title }}</strong>
                <span class="severity {{ problem.severity|lower }}">{{ problem.severity }}</span>
                <p>{{ problem.description }}</p>
                <p>{% for zone in problem.affectedZones %}<span class="zone">{{ zone }}</span>{% endfor %}</p>
            </div>
            {% endfor %}
        </div>
        <div class="card">
            <h2>Root Causes ({{ result.rootCauses|length }})</h2>
            {% for cause in result.rootCauses %}
            <div>
                <p>{{ cause.description }}</p>
                <p class="note">Evidence: {{ cause.dataEvidence }}</p>
                <p class="note">Research: {{ cause.researchBasis }}</p>
            </div>
            {% endfor %}
        </div>
        <div class="card">
            <h2>Strategies ({{ result.strategies|length }})</h2>
            {% for strategy in result.strategies %}
            <div>
                <strong>{{ strategy.title }}</strong>
                <p>{{ strategy.details }}</p>
                <p class="note">Source: {{ strategy.source }}</p>
            </div>
            {% endfor %}
        </div>
        <div class="card">
            <h2>Prototype</h2>
            <p>{{ result.prototype.logic }}</p>
            <pre>{{ result.prototype.pseudocode }}</pre>
            <p class="note">{{ result.prototype.implementationNotes }}</p>
        </div>
    {% else %}
        <div class="placeholder">
            <h2>No analysis yet</h2>
            <p>Upload datasets or describe the urban context, then generate intelligence.</p>
        </div>
    {% endif %}
</main>
{% endblock %}"#;

fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("base.html", BASE)?;
    env.add_template("dashboard.html", DASHBOARD)?;
    Ok(env)
}

/// Render the whole workspace page from a session snapshot
pub fn render_dashboard(snapshot: &SessionSnapshot, engine: &str) -> Result<String> {
    let (display, result) = match DisplayState::of(snapshot) {
        DisplayState::Idle => ("idle", None),
        DisplayState::Loading => ("loading", None),
        DisplayState::Result(result) => ("result", Some(result)),
    };

    let env = environment()?;
    let template = env.get_template("dashboard.html")?;
    let html = template.render(context! {
        display => display,
        result => result,
        engine => engine,
        files => &snapshot.files,
        ingest_failures => &snapshot.ingest_failures,
        context => &snapshot.context,
        can_run => snapshot.can_run,
        error => &snapshot.error,
        transcription => &snapshot.transcription,
        transcription_error => &snapshot.transcription_error,
        analyzed_at => snapshot.analyzed_at.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string()),
    })?;

    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_result;
    use crate::ingest::{add_files, RawSelection};
    use crate::session::{Action, Session};

    #[test]
    fn test_idle_page() {
        let html = render_dashboard(&Session::new().snapshot(), "gemini-2.5-pro").unwrap();
        assert!(html.contains("No analysis yet"));
        assert!(html.contains("No files yet"));
        assert!(html.contains("Generate Intelligence"));
        assert!(html.contains("gemini-2.5-pro active"));
    }

    #[test]
    fn test_loading_page_disables_trigger() {
        let mut session = Session::new();
        session.reduce(Action::SetContext("storm drains".to_string()));
        session.reduce(Action::TriggerAnalysis);

        let html = render_dashboard(&session.snapshot(), "m").unwrap();
        assert!(html.contains("Synthesising urban data"));
        assert!(html.contains("disabled"));
        assert!(html.contains("Reasoning..."));
        assert!(html.contains("http-equiv=\"refresh\""));
    }

    #[test]
    fn test_result_page_matches_result() {
        let mut session = Session::new();
        let report = add_files(
            vec![RawSelection::from_bytes("zoning.csv", b"zone\nA\n".to_vec(), None)],
            &Default::default(),
        );
        session.reduce(Action::AddFiles(report.files));
        session.reduce(Action::SetContext("traffic congestion downtown".to_string()));
        session.reduce(Action::TriggerAnalysis);
        session.reduce(Action::AnalysisSettled(Ok(sample_result())));

        let html = render_dashboard(&session.snapshot(), "m").unwrap();
        assert!(html.contains("Convert two downtown arterials to bus priority corridors"));
        assert!(html.contains("Problems (2)"));
        assert!(html.contains("Root Causes (1)"));
        assert!(html.contains("Strategies (2)"));
        assert!(html.contains("severity high"));
        assert!(html.contains("zoning.csv"));
        assert!(html.contains("traffic congestion downtown"));
        assert!(html.contains("Live Analysis"));
    }

    #[test]
    fn test_user_text_is_escaped() {
        let mut session = Session::new();
        session.reduce(Action::SetContext("<script>alert(1)</script>".to_string()));

        let html = render_dashboard(&session.snapshot(), "m").unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_error_shown_with_previous_result() {
        let mut session = Session::new();
        session.reduce(Action::SetContext("x".to_string()));
        session.reduce(Action::TriggerAnalysis);
        session.reduce(Action::AnalysisSettled(Ok(sample_result())));
        session.reduce(Action::TriggerAnalysis);
        session.reduce(Action::AnalysisSettled(Err("Analysis failed: quota".to_string())));

        let html = render_dashboard(&session.snapshot(), "m").unwrap();
        assert!(html.contains("Analysis failed: quota"));
        assert!(html.contains("Primary Recommendation"));
        assert!(!html.contains("Synthesising urban data"));
    }
}
