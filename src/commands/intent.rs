//! Classification of chat messages into commands.
//!
//! Rules are checked in order and the first match wins. Matching is a
//! case-insensitive substring search, so `fix` also matches words such as
//! "prefixed" or "fixture".

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Status,
    Remediate,
    Restart,
    Help,
}

#[derive(Debug)]
enum Matcher {
    AnyOf(&'static [&'static str]),
    /// Contains `needle` but not `unless`.
    ContainsUnless {
        needle: &'static str,
        unless: &'static str,
    },
}

impl Matcher {
    fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::AnyOf(needles) => needles.iter().any(|n| text.contains(n)),
            Matcher::ContainsUnless { needle, unless } => {
                text.contains(needle) && !text.contains(unless)
            }
        }
    }
}

#[derive(Debug)]
struct Rule {
    matcher: Matcher,
    intent: Intent,
}

const RULES: &[Rule] = &[
    Rule {
        matcher: Matcher::AnyOf(&["!status", "!health"]),
        intent: Intent::Status,
    },
    Rule {
        matcher: Matcher::AnyOf(&["!autofix", "!fix-ci"]),
        intent: Intent::Remediate,
    },
    // `status` guards against "!status" style text being read as a restart.
    Rule {
        matcher: Matcher::ContainsUnless {
            needle: "fix",
            unless: "status",
        },
        intent: Intent::Restart,
    },
    Rule {
        matcher: Matcher::AnyOf(&["!help"]),
        intent: Intent::Help,
    },
];

/// Returns `None` when the message should be ignored.
pub fn classify(text: &str, is_mention: bool) -> Option<Intent> {
    let text = text.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.matcher.matches(&text))
        .map(|rule| rule.intent)
        .or(is_mention.then_some(Intent::Help))
}
