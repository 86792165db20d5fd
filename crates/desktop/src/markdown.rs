//! Lightweight markdown pass for assistant chat bubbles.
//!
//! The planner answers in bullet points and numbered steps, so this covers
//! the subset those replies actually use: `#` headings, `-`/`*` bullets,
//! `1.`-style numbered items, **bold**, `inline code`, and [text](url)
//! links. Anything else renders as plain text.

use eframe::egui;

/// Inline fragment of one rendered line.
enum Span<'a> {
    Plain(&'a str),
    Bold(&'a str),
    Code(&'a str),
    Link { text: &'a str, url: &'a str },
}

enum Marker {
    Bold,
    Code,
    Link,
}

/// Render markdown text into an egui UI region.
pub fn render_markdown(ui: &mut egui::Ui, text: &str) {
    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            ui.add_space(6.0);
            continue;
        }
        if let Some((level, heading)) = heading_of(line) {
            let size = match level {
                1 => 18.0,
                2 => 16.0,
                _ => 15.0,
            };
            ui.add_space(6.0);
            ui.label(egui::RichText::new(heading).strong().size(size));
            ui.add_space(3.0);
            continue;
        }
        let (marker, rest) = list_marker_of(line);
        ui.horizontal_wrapped(|ui| {
            if let Some(marker) = marker {
                ui.label(marker);
            }
            for span in inline_spans(rest) {
                match span {
                    Span::Plain(s) => {
                        ui.label(s);
                    }
                    Span::Bold(s) => {
                        ui.label(egui::RichText::new(s).strong());
                    }
                    Span::Code(s) => {
                        ui.label(egui::RichText::new(s).code());
                    }
                    Span::Link { text, url } => {
                        ui.hyperlink_to(text, url);
                    }
                }
            }
        });
    }
}

/// `# `-style heading: returns (level 1..=4, text).
fn heading_of(line: &str) -> Option<(usize, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 4 {
        return None;
    }
    line[hashes..].strip_prefix(' ').map(|rest| (hashes, rest))
}

/// Bullet ("- ", "* ") or numbered ("3. ") list marker; returns the marker
/// label to draw and the remaining text.
fn list_marker_of(line: &str) -> (Option<String>, &str) {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return (Some("  •  ".to_string()), rest);
    }
    let digits = line.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return (Some(format!("  {}. ", &line[..digits])), rest);
        }
    }
    (None, line)
}

/// Split a line into plain/bold/code/link spans. Unterminated markers render
/// as plain text.
fn inline_spans(mut text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    while !text.is_empty() {
        match next_marker(text) {
            None => {
                spans.push(Span::Plain(text));
                break;
            }
            Some((pos, Marker::Bold)) => {
                if pos > 0 {
                    spans.push(Span::Plain(&text[..pos]));
                }
                let rest = &text[pos + 2..];
                match rest.find("**") {
                    Some(end) => {
                        spans.push(Span::Bold(&rest[..end]));
                        text = &rest[end + 2..];
                    }
                    None => {
                        spans.push(Span::Plain(&text[pos..]));
                        break;
                    }
                }
            }
            Some((pos, Marker::Code)) => {
                if pos > 0 {
                    spans.push(Span::Plain(&text[..pos]));
                }
                let rest = &text[pos + 1..];
                match rest.find('`') {
                    Some(end) => {
                        spans.push(Span::Code(&rest[..end]));
                        text = &rest[end + 1..];
                    }
                    None => {
                        spans.push(Span::Plain(&text[pos..]));
                        break;
                    }
                }
            }
            Some((pos, Marker::Link)) => {
                if pos > 0 {
                    spans.push(Span::Plain(&text[..pos]));
                }
                let rest = &text[pos + 1..];
                let parsed = rest.split_once("](").and_then(|(label, after)| {
                    after.split_once(')').map(|(url, tail)| (label, url, tail))
                });
                match parsed {
                    Some((label, url, tail)) => {
                        spans.push(Span::Link { text: label, url });
                        text = tail;
                    }
                    None => {
                        spans.push(Span::Plain(&text[pos..]));
                        break;
                    }
                }
            }
        }
    }
    spans
}

/// Position and kind of the next inline marker, if any.
fn next_marker(text: &str) -> Option<(usize, Marker)> {
    let mut best: Option<(usize, Marker)> = None;
    if let Some(pos) = text.find("**") {
        best = Some((pos, Marker::Bold));
    }
    if let Some(pos) = text.find('`') {
        if best.as_ref().map(|(p, _)| pos < *p).unwrap_or(true) {
            best = Some((pos, Marker::Code));
        }
    }
    if let Some(pos) = text.find('[') {
        // Only treat as a link when a "](" follows somewhere.
        if text[pos..].contains("](") && best.as_ref().map(|(p, _)| pos < *p).unwrap_or(true) {
            best = Some((pos, Marker::Link));
        }
    }
    best
}
