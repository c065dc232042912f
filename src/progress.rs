use indicatif::{ProgressBar, ProgressBarIter, ProgressIterator, ProgressStyle};

/// Wrap `iter` in a progress bar of `len` steps. A disabled bar is hidden
/// but the iterator behaves identically.
pub fn track<I>(iter: I, len: u64, message: &str, enabled: bool) -> ProgressBarIter<I::IntoIter>
where
    I: IntoIterator,
{
    let pb = if enabled {
        create_progress_bar(len, message)
    } else {
        ProgressBar::hidden()
    };
    iter.into_iter().progress_with(pb)
}

/// Create a bar with the crate's usual style
pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("▰▰▱"),
    );
    pb.set_message(message.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_is_transparent() {
        let items = vec![1, 2, 3];
        let hidden: Vec<i32> = track(items.clone(), 3, "hidden", false).collect();
        let shown: Vec<i32> = track(items.clone(), 3, "shown", true).collect();

        assert_eq!(hidden, items);
        assert_eq!(shown, items);
    }
}
