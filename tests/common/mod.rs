//! Shared fixture for integration tests: a temporary home directory and an
//! initialized dotsync repository beside it.

use dotsync::SyncContext;
use dotsync::prompt::ScriptedPrompt;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    // Held for its Drop; the directory outlives every context built from it.
    _dir: TempDir,
    pub home: PathBuf,
    pub repo: PathBuf,
}

impl TestEnv {
    /// Creates home and repo directories and runs `init` on the repo.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let env = Self {
            home: dir.path().join("home"),
            repo: dir.path().join("repo"),
            _dir: dir,
        };
        std::fs::create_dir_all(&env.home).expect("create home");
        let ctx = env.ctx(&[]);
        dotsync::commands::init::execute(&ctx).expect("init");
        env
    }

    /// Creates the directories without initializing a repository.
    pub fn bare() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let env = Self {
            home: dir.path().join("home"),
            repo: dir.path().join("repo"),
            _dir: dir,
        };
        std::fs::create_dir_all(&env.home).expect("create home");
        std::fs::create_dir_all(&env.repo).expect("create repo");
        env
    }

    /// Builds a context whose prompt yields the given answers in order.
    pub fn ctx(&self, answers: &[&str]) -> SyncContext {
        let answers: Vec<String> = answers.iter().map(|s| (*s).to_string()).collect();
        SyncContext::new_explicit(
            self.repo.clone(),
            self.home.clone(),
            Box::new(ScriptedPrompt::new(answers)),
        )
    }

    /// Writes a file under the home directory.
    pub fn write_home(&self, rel: &str, content: &[u8]) {
        let path = self.home.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write home file");
    }

    /// Reads the manifest content.
    pub fn filelist(&self) -> String {
        std::fs::read_to_string(self.repo.join("filelist")).expect("read filelist")
    }
}
