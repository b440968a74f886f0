use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

pub fn init_pbar(total: usize) -> Result<ProgressBar> {
    let progress_bar = ProgressBar::new(total as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg} (ETA {eta})")?
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Initialising...");
    Ok(progress_bar)
}
