use crate::protocols::RequestRecord;
use crate::utils::format_size;
use owo_colors::OwoColorize;

pub fn print_response_box(record: &RequestRecord) {
    println!("╭─ Response ─────────────────────────────╮");

    let status = match &record.error {
        None => "PASS".green().to_string(),
        Some(_) => "FAIL".red().to_string(),
    };

    println!(
        "│ {} • {}ms • {}",
        status,
        record.response_time.as_millis(),
        format_size(record.response_length)
    );

    if let Some(error) = &record.error {
        for line in wrap(error, 38) {
            println!("│ {}", line.red());
        }
    }

    println!("╰────────────────────────────────────────╯");
    println!();
}

/// Splits `text` into lines of at most `width` characters.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_splits_on_width() {
        let lines = wrap("Status code: 503 for user 17", 10);
        assert_eq!(lines, vec!["Status cod", "e: 503 for", " user 17"]);
        assert!(wrap("", 10).is_empty());
    }
}
