//! Content filtering applied to relayed chat text

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Client-side translation/formatting escape sequences emitted by the game
static TRANSLATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b(T|F|E|\(T@[^\)]*\))").unwrap());

/// Mass mentions and raw id mentions
static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@(everyone|here|[!&]?[0-9]{17,20})").unwrap());

/// Drop every word carrying an invite link
pub fn clean_invites(text: &str) -> String {
    text.split_whitespace()
        .filter(|word| !word.contains("discord.gg") && !word.contains("discordapp.com/invite"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip translation escape sequences from game-originated text
pub fn strip_control_sequences(text: &str) -> String {
    TRANSLATION_RE.replace_all(text, "").into_owned()
}

/// Neutralize mentions by inserting a zero-width space after the `@`
pub fn redact_mentions(text: &str) -> String {
    MENTION_RE.replace_all(text, "@\u{200b}$1").into_owned()
}

/// Truncate to at most `limit` characters, on a character boundary
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Fold newlines into the visible separator used on the game side
pub fn fold_newlines(text: &str) -> String {
    text.replace('\n', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_words_are_dropped() {
        assert_eq!(clean_invites("hello discord.gg/abc world"), "hello world");
        assert_eq!(
            clean_invites("join discordapp.com/invite/xyz now"),
            "join now"
        );
        assert_eq!(clean_invites("no links here"), "no links here");
    }

    #[test]
    fn invite_only_content_cleans_to_empty() {
        assert_eq!(clean_invites("discord.gg/abc"), "");
    }

    #[test]
    fn translation_escapes_are_stripped() {
        assert_eq!(strip_control_sequences("\u{1b}Thello"), "hello");
        assert_eq!(strip_control_sequences("a\u{1b}(T@domain)b"), "ab");
        assert_eq!(strip_control_sequences("a\u{1b}Fb\u{1b}Ec"), "abc");
        assert_eq!(strip_control_sequences("plain"), "plain");
    }

    #[test]
    fn mentions_are_redacted() {
        assert_eq!(redact_mentions("hi @everyone"), "hi @\u{200b}everyone");
        assert_eq!(redact_mentions("ping @here"), "ping @\u{200b}here");
        assert_eq!(
            redact_mentions("<@!123456789012345678>"),
            "<@\u{200b}!123456789012345678>"
        );
        // Plain mail-style handles pass through
        assert_eq!(redact_mentions("a@b.com"), "a@b.com");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn newlines_become_slashes() {
        assert_eq!(fold_newlines("a\nb\nc"), "a/b/c");
    }
}
