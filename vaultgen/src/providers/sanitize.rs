//! Scrub secret-like tokens from provider error bodies and bound their length.
//!
//! Error bodies end up in attempt logs and in `GenerationFailure`, so any key
//! a provider echoes back must be redacted before the text leaves the adapter.

const MAX_ERROR_CHARS: usize = 200;

/// Key prefixes used by the providers this crate talks to, plus the generic
/// OpenAI-style `sk-`.
const SECRET_PREFIXES: [&str; 5] = ["pplx-", "gsk_", "hf_", "AIza", "sk-"];

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Replace anything that looks like an API key with `[REDACTED]`.
pub fn scrub_secrets(input: &str) -> String {
    let mut scrubbed = input.to_string();

    for prefix in SECRET_PREFIXES {
        let mut search_from = 0;
        loop {
            let Some(rel) = scrubbed[search_from..].find(prefix) else {
                break;
            };

            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);

            // A bare prefix carries no secret and must not stall the scan.
            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Scrub secrets and truncate to a length safe for logs and error messages.
pub fn sanitize_error_body(input: &str) -> String {
    let scrubbed = scrub_secrets(input);

    if scrubbed.chars().count() <= MAX_ERROR_CHARS {
        return scrubbed;
    }

    let truncated: String = scrubbed.chars().take(MAX_ERROR_CHARS).collect();
    format!("{}…", truncated)
}
