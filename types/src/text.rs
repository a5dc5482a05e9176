//! Helpers for human readable diagnostics.

use core::fmt::Display;

/// Join items into a sentence: `one, two and three`.
pub fn comma_sentence<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [single] => single.as_ref().to_owned(),
        [init @ .., last] => {
            let head = init.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", ");
            format!("{head} and {}", last.as_ref())
        }
    }
}

/// Number each item and put it on its own line: `1. first\n2. second`.
pub fn numbered_list<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| format!("{}. {item}", idx + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
