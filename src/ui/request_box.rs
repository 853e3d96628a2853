use owo_colors::OwoColorize;

/// Prints the request a probe is about to send: the task name as title, then the
/// method and target, then payload lines.
pub fn print_request_box(title: &str, method: &str, target: &str, payload: &[String]) {
    let method_target_line = format!("{} {}", method, target);
    let mut max_width = method_target_line.chars().count() + 4;

    for line in payload {
        max_width = max_width.max(line.chars().count() + 4);
    }
    max_width = max_width.max(title.chars().count() + 6);

    // Ensure minimum width and reasonable maximum
    max_width = max_width.clamp(50, 100);

    let title = format!(" {} ", title);
    let title_len = title.chars().count().min(max_width - 2);
    let title_padding = (max_width - title_len - 2) / 2;
    let remaining_padding = max_width - title_len - 2 - title_padding;

    println!(
        "╭─{}{}{}─╮",
        "─".repeat(title_padding),
        title.bold(),
        "─".repeat(remaining_padding)
    );

    let method_colored = method.bright_green();
    println!(
        "│ {} {}{} │",
        method_colored,
        fit(target, max_width - method.chars().count() - 3),
        " ".repeat(padding(max_width, method_target_line.chars().count()))
    );

    for line in payload {
        println!(
            "│ {}{} │",
            fit(line, max_width - 2).dimmed(),
            " ".repeat(padding(max_width, line.chars().count()))
        );
    }

    println!("╰{}╯", "─".repeat(max_width));
}

fn padding(max_width: usize, content: usize) -> usize {
    max_width.saturating_sub(content + 2)
}

/// Cuts `text` to `width` characters, marking the cut with `...`.
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
