//! Rendering helpers for diagnostics.
//!
//! Everything here is plain string manipulation over `type_name` output,
//! used by error messages and by plan descriptions.

use std::fmt::Write as _;

/// Strips module paths from a fully qualified type name.
///
/// Generic arguments are shortened too.
///
/// ```
/// use autowire_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::net::Connection"), "Connection");
/// assert_eq!(
///     shorten_type_name("alloc::sync::Arc<dyn app::log::Logger>"),
///     "Arc<dyn Logger>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut out = String::with_capacity(full_name.len());
    let mut segment = String::new();
    let mut chars = full_name.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                out.push_str(&segment);
                out.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    out.push_str(&segment);
    out
}

/// Picks registered names that look like `requested`.
///
/// Full-name containment ranks highest, then short-name containment, then
/// a shared prefix of at least three characters.
pub fn suggest_similar(requested: &str, available: &[&str], limit: usize) -> Vec<String> {
    let requested_full = requested.to_lowercase();
    let requested_short = shorten_type_name(requested).to_lowercase();

    let mut ranked: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&candidate| {
            let full = candidate.to_lowercase();
            if full == requested_full {
                return None;
            }
            if full.contains(&requested_full) || requested_full.contains(&full) {
                return Some((candidate, 100));
            }

            let short = shorten_type_name(candidate).to_lowercase();
            if short.contains(&requested_short) || requested_short.contains(&short) {
                return Some((candidate, 80));
            }

            let prefix = short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();
            (prefix >= 3).then_some((candidate, prefix * 10))
        })
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.dedup_by(|a, b| a.0 == b.0);
    ranked
        .into_iter()
        .take(limit)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// One row of a rendered factory plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotLine {
    /// `param` or `prop`
    pub kind: &'static str,
    /// Parameter or property name
    pub name: String,
    /// Declared type, already shortened or not
    pub type_name: String,
    /// Human-readable strategy (`default`, `custom(Named)`)
    pub strategy: String,
}

/// Renders a plan as aligned rows under a header line.
///
/// ```text
/// Widget
///   param log      : Arc<dyn Logger>      <- default
///   param conn     : Arc<dyn Connection>  <- custom(Named)
///   prop  settings : Config               <- custom(FnResolver)
/// ```
pub fn render_plan(header: &str, lines: &[SlotLine]) -> String {
    let name_width = lines.iter().map(|l| l.name.len()).max().unwrap_or(0);
    let type_width = lines.iter().map(|l| l.type_name.len()).max().unwrap_or(0);

    let mut out = String::new();
    out.push_str(header);
    out.push('\n');

    for line in lines {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "  {:<5} {:<nw$} : {:<tw$}  <- {}",
            line.kind,
            line.name,
            line.type_name,
            line.strategy,
            nw = name_width,
            tw = type_width,
        );
    }

    out
}
