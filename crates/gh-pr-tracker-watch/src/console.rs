//! Plain-text frame rendering

use gh_pr_tracker::{FrameSink, LoadingState, Notice, NoticeLevel, PrRow, RenderFrame};
use std::io::Write;

/// Prints every committed frame to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl FrameSink for ConsoleSink {
    fn frame(&self, frame: &RenderFrame) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(render_frame(frame).as_bytes()) {
            log::warn!("Failed to write frame: {}", e);
        }
    }

    fn notice(&self, notice: &Notice) {
        let prefix = match notice.level {
            NoticeLevel::Error => "error",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
        };
        eprintln!("[{}] {}", prefix, notice.message);
    }

    fn loading(&self, state: &LoadingState) {
        match state {
            LoadingState::Loading => eprintln!("Loading pull requests..."),
            LoadingState::Error(message) => eprintln!("Loading failed: {}", message),
            LoadingState::Idle | LoadingState::Loaded => {}
        }
    }
}

fn render_row(row: &PrRow) -> String {
    let summary = &row.pr.summary;
    let mut line = format!(
        "{} {:<24} {}#{} {}  [{}] CI: {}",
        row.readiness.icon(),
        row.readiness.label(),
        summary.repo_full_name,
        summary.number,
        summary.title,
        row.reviews.label(),
        row.ci.state.as_str(),
    );
    if row.pr.auto_merge.is_some() {
        line.push_str(" (auto-merge)");
    }
    line.push('\n');

    for item in &row.failed_items {
        line.push_str(&format!("    ✗ {}: {}\n", item.name, item.summary));
    }
    for item in &row.running_items {
        line.push_str(&format!("    ⋯ {}: {}\n", item.name, item.summary));
    }
    line
}

/// Text for one frame, header included
pub fn render_frame(frame: &RenderFrame) -> String {
    let source = match frame.fetch_epoch {
        Some(epoch) if frame.is_auto_refresh => format!("{}, auto", epoch),
        Some(epoch) => epoch.to_string(),
        None => "filter change".to_string(),
    };
    let mut out = format!(
        "\n{} of {} pull requests ({}) at {}\n",
        frame.rows.len(),
        frame.total_prs,
        source,
        frame.generated_at.format("%H:%M:%S"),
    );

    if frame.rows.is_empty() {
        if let Some(message) = &frame.empty_message {
            out.push_str(message);
            out.push('\n');
        }
    }
    for row in &frame.rows {
        out.push_str(&render_row(row));
    }
    out
}
