use crate::types::{FailureKind, StatementStory, VideoOutcome};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Format a statement story as human-readable markdown
pub fn format_story_readable(story: &StatementStory) -> String {
    let mut output = String::new();

    if story.bank_name.is_empty() {
        output.push_str("# Statement report\n\n");
    } else {
        output.push_str(&format!("# {} statement report\n\n", story.bank_name));
    }

    output.push_str(&format!(
        "**Transactions:** {} | **Total spent:** {:.2}\n\n",
        story.transactions.len(),
        story.total_spent()
    ));

    output.push_str("## Summary\n\n");
    output.push_str(&story.summary);
    output.push_str("\n\n");

    if !story.categories.is_empty() {
        output.push_str("## Categories\n\n");
        for category in &story.categories {
            output.push_str(&format!("• {}: {:.2}\n", category.name, category.total));
        }
        output.push('\n');
    }

    if !story.transactions.is_empty() {
        output.push_str("## Transactions\n\n");
        for tx in &story.transactions {
            let location = tx.location.as_deref().unwrap_or("N/A");
            output.push_str(&format!(
                "{:<8} {:<32} {:>10.2}  {}\n",
                tx.date, tx.merchant, tx.amount, location
            ));
        }
        output.push('\n');
    }

    let places = story.spend_by_place();
    if !places.is_empty() {
        output.push_str("## Spend by place\n\n");
        for place in &places {
            output.push_str(&format!(
                "{:<24} {:>10.2}  ({} tx)\n",
                place.place, place.total, place.transactions
            ));
        }
        output.push('\n');
    }

    for (title, body) in [
        ("Financial advice", &story.financial_advice),
        ("Spending personality", &story.spending_personality),
        ("What if", &story.whatif_scenarios),
    ] {
        if !body.is_empty() {
            output.push_str(&format!("## {}\n\n{}\n\n", title, body));
        }
    }

    output.push_str("## Story\n\n");
    for (i, line) in story.story.iter().enumerate() {
        output.push_str(&format!("{}. {} [{}]\n", i + 1, line.line, line.topic));
    }

    if !story.youtube_search.is_empty() {
        output.push_str(&format!("\n**Search for tips:** {}\n", story.youtube_search));
    }

    output
}

/// Suggested videos for the story's search query, at most `limit` of them.
pub fn format_video_suggestions(query: &str, links: &[String], limit: usize) -> String {
    let mut output = format!("## Suggested videos: {}\n\n", query.trim());
    if links.is_empty() {
        output.push_str("No video suggestions available.\n");
        return output;
    }
    for link in links.iter().take(limit) {
        output.push_str(&format!("• {}\n", link));
    }
    output
}

/// One line per composed segment, then the skipped and dropped ones.
pub fn format_outcome(outcome: &VideoOutcome) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} of {} segments composed, video {} / audio {}\n",
        outcome.composed_count(),
        outcome.sentence_count,
        format_timestamp(outcome.video_duration()),
        format_timestamp(outcome.audio_duration),
    ));

    // Clip positions in the assembled video; narration windows only differ after a drop.
    let mut video_start = 0.0;
    for segment in &outcome.segments {
        let video_end = video_start + segment.window.duration();
        output.push_str(&format!(
            "  [{}–{}] #{} {}: {}",
            format_timestamp(video_start),
            format_timestamp(video_end),
            segment.index,
            segment.phrase,
            segment.caption
        ));
        if (segment.window.start - video_start).abs() >= 0.5 {
            output.push_str(&format!(
                " (narration {}–{})",
                format_timestamp(segment.window.start),
                format_timestamp(segment.window.end)
            ));
        }
        output.push('\n');
        video_start = video_end;
    }

    for (label, kind) in [
        ("skipped", FailureKind::Resolution),
        ("dropped", FailureKind::Composition),
    ] {
        let failures: Vec<_> = outcome.failures_of(kind).collect();
        if failures.is_empty() {
            continue;
        }
        output.push_str(&format!("{} {}:\n", failures.len(), label));
        for failure in failures {
            output.push_str(&format!("  {}\n", failure));
        }
    }

    output
}
