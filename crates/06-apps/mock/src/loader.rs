use crate::programs::{BouncingBall, InputEcho, ResourceProbe};
use anyhow::bail;
use app::{Program, ProgramLoader};
use std::collections::BTreeMap;

type Factory = Box<dyn Fn() -> Box<dyn Program> + Send + Sync>;

/// Resolves program paths from a fixed table of factories.
#[derive(Default)]
pub struct StaticLoader {
    programs: BTreeMap<String, Factory>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<P, F>(mut self, path: &str, factory: F) -> Self
    where
        P: Program + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.programs
            .insert(path.to_owned(), Box::new(move || Box::new(factory())));
        self
    }

    /// `bouncing_ball`, `input_echo` and `resource_probe` (which probes
    /// `logo.png`).
    pub fn demo() -> Self {
        Self::new()
            .with("bouncing_ball", BouncingBall::new)
            .with("input_echo", || InputEcho)
            .with("resource_probe", || ResourceProbe::new(["logo.png"]))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }
}

impl ProgramLoader for StaticLoader {
    fn load(&self, path: &str) -> anyhow::Result<Box<dyn Program>> {
        match self.programs.get(path) {
            Some(factory) => Ok(factory()),
            None => bail!("no program registered at `{path}`"),
        }
    }
}

impl std::fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.paths()).finish()
    }
}
