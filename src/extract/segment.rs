//! Topic segmentation: fold a flat item stream into heading-keyed segments.

use crate::models::{ContentItem, TopicSegment};

/// Group `items` into one [`TopicSegment`] per heading that is followed by at
/// least one non-heading item.
///
/// Items seen before the first heading have no topic to attach to and are left
/// out; they still reach the LLM through `fullContent`. Segment content is the
/// grouped items as `speaker: text` lines joined by newlines.
pub fn segment(items: &[ContentItem]) -> Vec<TopicSegment> {
    let mut segments = Vec::new();
    let mut current: Option<&str> = None;
    let mut pending: Vec<&ContentItem> = Vec::new();

    for item in items {
        if item.is_heading {
            flush(&mut segments, current, &mut pending);
            current = Some(&item.text);
        } else if current.is_some() {
            pending.push(item);
        }
    }
    flush(&mut segments, current, &mut pending);

    segments
}

fn flush(segments: &mut Vec<TopicSegment>, topic: Option<&str>, pending: &mut Vec<&ContentItem>) {
    if let Some(topic) = topic {
        if !pending.is_empty() {
            segments.push(TopicSegment {
                topic: topic.to_string(),
                content: pending.iter().map(|c| c.line()).collect::<Vec<_>>().join("\n"),
                tags: Vec::new(),
            });
        }
    }
    pending.clear();
}
