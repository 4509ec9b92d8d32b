//! `chatsplit`: length- and sentence-aware splitting of outbound chat text.
//!
//! Game chat channels carry short lines. [`split_message`] breaks a blob of
//! text into chunks that each fit the channel limit, preferring to cut at
//! sentence boundaries, then commas, then spaces, and only arbitrarily as a
//! last resort. Lengths are counted in characters, not bytes.

/// Punctuation that ends a sentence and makes a preferred split point.
const SENTENCE_ENDS: [char; 4] = ['.', '!', '?', ';'];

/// Split `message` into chat-safe chunks of at most `max_size` characters.
///
/// The input is first normalized (carriage returns dropped, surrounding
/// whitespace trimmed) and split on newlines; empty segments are discarded.
/// A segment starting with `/` gets a leading space so chat clients don't eat
/// it as a command. Oversized segments are split at the best available point
/// and the tail is re-examined, so one pass may produce many chunks.
///
/// Every chunk fits `max_size` whenever a usable split point exists; with no
/// punctuation or spaces at all the split is arbitrary. Chunks are never
/// empty and reading order is preserved.
pub fn split_message(message: &str, max_size: usize) -> Vec<String> {
    let normalized = message.replace('\r', "");
    let mut parts: Vec<String> = normalized
        .trim()
        .split('\n')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let mut a = 0;
    while a < parts.len() {
        let mut msg: Vec<char> = parts[a].trim().chars().collect();
        if msg.is_empty() {
            let _ = parts.remove(a);
            continue;
        }

        if msg[0] == '/' {
            msg.insert(0, ' ');
        }
        parts[a] = msg.iter().collect();

        if msg.len() > max_size {
            let split = pick_split(&msg, max_size);
            let before: String = msg[..split].iter().collect();
            let after: String = msg[split..].iter().collect();
            parts[a] = before.trim().to_string();
            parts.insert(a + 1, after.trim().to_string());
            // Re-examine the head now; the tail gets its turn next.
            continue;
        }

        a += 1;
    }

    parts
}

/// Choose the split index for a segment known to exceed `max_size`.
///
/// Precedence: sentence-ending punctuation (the middle candidate when there
/// are more than two, rounding half up), then the first comma, then the first
/// space at or past the midpoint, then the first space past index 0, then an
/// arbitrary cut. Sentence splits land after the mark; comma splits land on
/// the comma itself, so the comma leads the tail chunk.
fn pick_split(msg: &[char], max_size: usize) -> usize {
    let last = msg.len() - 1;
    let ends: Vec<usize> = msg
        .iter()
        .enumerate()
        .filter(|(i, c)| SENTENCE_ENDS.contains(c) && *i != last)
        .map(|(i, _)| i)
        .collect();

    if ends.len() > 2 {
        return ends[(ends.len() + 1) / 2] + 1;
    }
    if let Some(&i) = ends.first() {
        return i + 1;
    }

    // A comma at index 0 would make the split a no-op; skip it.
    if let Some(i) = msg.iter().skip(1).position(|&c| c == ',') {
        return i + 1;
    }

    // Index 0 can hold the slash-escape space; splitting there would be a
    // no-op too, so both space searches start at 1.
    let mid = (msg.len() / 2).max(1);
    if let Some(i) = msg[mid..].iter().position(|&c| c == ' ') {
        return mid + i;
    }
    if let Some(i) = msg.iter().skip(1).position(|&c| c == ' ') {
        return i + 1;
    }

    (max_size / 2).max(1)
}
