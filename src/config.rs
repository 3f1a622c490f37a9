use std::{env, path::PathBuf};

use crate::minlang::backend::DEFAULT_BACKEND;

pub const DEFAULT_PRELUDE: &str = "lib/std.mnt";
pub const DEFAULT_RUNTIME: &str = "ruby";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name looked up in the backend registry.
    pub backend: String,
    /// Source prepended to the program before `--run`.
    pub prelude: PathBuf,
    /// Command the compiled output is piped into for `--run`.
    pub runtime: String,
}

impl Config {
    pub fn load_from_env() -> Config {
        Config::load_from(|name| env::var(name).ok())
    }

    fn load_from(get_env: impl Fn(&'static str) -> Option<String>) -> Config {
        let get = |name| get_env(name).filter(|val: &String| !val.is_empty());
        Config {
            backend: get("MINAT_BACKEND").unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            prelude: get("MINAT_PRELUDE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PRELUDE)),
            runtime: get("MINAT_RUNTIME").unwrap_or_else(|| DEFAULT_RUNTIME.to_string()),
        }
    }

    /// Command-line values win over the environment.
    pub fn with_overrides(
        mut self,
        backend: Option<String>,
        prelude: Option<PathBuf>,
        runtime: Option<String>,
    ) -> Config {
        if let Some(backend) = backend {
            self.backend = backend;
        }
        if let Some(prelude) = prelude {
            self.prelude = prelude;
        }
        if let Some(runtime) = runtime {
            self.runtime = runtime;
        }
        self
    }
}
