use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::summary::TraceSummary;

mod concurrency;
mod journal;
mod session;

fn temp_path(stem: &str, extension: &str) -> PathBuf {
    let unique = SystemTime::now().duration_since(UNIX_EPOCH).expect("time went backwards").as_nanos();
    std::env::temp_dir().join(format!("tensor_trace_{stem}_{unique}.{extension}"))
}

fn remove_trace(path: &Path) {
    let _ = std::fs::remove_file(path);
    let _ = std::fs::remove_file(TraceSummary::sidecar_path(path));
}
