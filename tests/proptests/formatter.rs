// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Property-Based Tests: Message Formatter
//!
//! Generates messages of varying length and content and checks the line
//! layout the formatter promises, whatever the input.
//!
//! # Coverage
//!
//! - **Short messages:** one line, no correlation id.
//! - **Long messages:** one line per chunk (plus prepend/append), all
//!   sharing a single id, each chunk at most `MAX_LINE_CHARS` characters.
//! - **Arbitrary input:** formatting never panics.

#[cfg(test)]
mod tests {
    use log_relay::logging::formatter::{MessageFormatter, CORRELATION_ID_LEN, MAX_LINE_CHARS};
    use log_relay::EmitOptions;
    use proptest::prelude::*;

    /// `(id)`, `#k` and the chunk text of a batch line
    fn parts(line: &str) -> (&str, &str, &str) {
        let mut parts = line.splitn(3, ' ');
        let id = parts.next().unwrap();
        let seq = parts.next().unwrap();
        (id, seq, parts.next().unwrap_or(""))
    }

    proptest! {
        /// **Property:** A message that fits is emitted unchanged on one line.
        #[test]
        fn test_short_message_is_single_line(message in "[a-zA-Z0-9]([a-zA-Z0-9 ]{0,298}[a-zA-Z0-9])?") {
            let lines = MessageFormatter::default().format(&message, &EmitOptions::new());
            prop_assert_eq!(lines, vec![message]);
        }

        /// **Property:** N chunks become N lines, plus one each for prepend
        /// and append, all tagged with the same id.
        #[test]
        fn test_chunks_share_one_id(
            chunks in 2usize..6,
            tail in 0usize..MAX_LINE_CHARS,
            with_prepend in any::<bool>(),
            with_append in any::<bool>(),
        ) {
            let message = "x".repeat((chunks - 1) * MAX_LINE_CHARS + tail + 1);
            let mut options = EmitOptions::new();
            if with_prepend {
                options = options.prepend("start");
            }
            if with_append {
                options = options.append("end");
            }

            let lines = MessageFormatter::default().format(&message, &options);
            let extra = usize::from(with_prepend) + usize::from(with_append);
            prop_assert_eq!(lines.len(), chunks + extra);

            let (id, _, _) = parts(&lines[0]);
            prop_assert_eq!(id.len(), CORRELATION_ID_LEN + 2);
            for line in &lines {
                prop_assert!(line.starts_with(id));
            }
            if with_prepend {
                prop_assert_eq!(parts(&lines[0]).1, "#0");
            }
            if with_append {
                let last = parts(lines.last().unwrap()).1.to_string();
                prop_assert_eq!(last, format!("#{}", chunks + 1));
            }
        }

        /// **Property:** Chunks respect the width and reassemble the line.
        #[test]
        fn test_chunks_reassemble_message(message in "[a-z][a-z ]{300,900}[a-z]") {
            let lines = MessageFormatter::default().format(&message, &EmitOptions::new());
            prop_assert!(lines.len() >= 2);

            let mut rebuilt = String::new();
            for (idx, line) in lines.iter().enumerate() {
                let (_, seq, chunk) = parts(line);
                prop_assert_eq!(seq.to_string(), format!("#{}", idx + 1));
                prop_assert!(chunk.chars().count() <= MAX_LINE_CHARS);
                rebuilt.push_str(chunk);
            }
            prop_assert_eq!(rebuilt, message);
        }

        /// **Property:** Formatting never panics, whatever the input.
        #[test]
        fn test_format_does_not_panic(message in any::<String>(), width in 1usize..400) {
            let formatter = MessageFormatter::default().with_max_line_chars(width);
            let _ = formatter.format(&message, &EmitOptions::new().prepend("p").append("a"));
        }
    }
}
