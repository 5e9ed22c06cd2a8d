use crate::runtime::Runtime;

/// A program driven by the producer thread.
///
/// `main` owns the frame loop: it typically spins on
/// [`Runtime::window_should_close`] and publishes one frame per iteration.
pub trait Program {
    fn main(&mut self, rt: &mut Runtime<'_>) -> anyhow::Result<()>;
}

/// Resolves the path carried by a `Start` event into a runnable program.
pub trait ProgramLoader: Send + Sync {
    fn load(&self, path: &str) -> anyhow::Result<Box<dyn Program>>;
}

impl<F> ProgramLoader for F
where
    F: Fn(&str) -> anyhow::Result<Box<dyn Program>> + Send + Sync,
{
    fn load(&self, path: &str) -> anyhow::Result<Box<dyn Program>> {
        self(path)
    }
}
