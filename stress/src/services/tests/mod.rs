//! Service-specific tests
//!
//! Each service has its own test file with dedicated fixtures and helpers.

mod launcher;

pub mod common {
    use std::path::Path;

    /// Create an implementation directory with `run.sh` and, optionally, a built binary
    pub fn fake_implementation(dir: &Path, binary: Option<&str>) -> std::path::PathBuf {
        let runscript = dir.join("run.sh");
        std::fs::write(&runscript, "#!/bin/sh\n").expect("write runscript");

        if let Some(binary) = binary {
            std::fs::create_dir_all(dir.join("bin")).expect("create bin dir");
            std::fs::write(dir.join("bin").join(binary), "").expect("write binary");
        }

        runscript
    }
}
