//! Named pipeline builder.
//!
//! Wraps `redis::Pipeline` and remembers each queued command name so the
//! instrumentation hook can report the whole batch as one comma-joined
//! string. A batch passes the admission gate once, regardless of how many
//! commands it carries.

use redis::ToRedisArgs;

/// A batch of commands sent together and acknowledged together.
#[derive(Default, Clone)]
pub struct StorePipeline {
    pipe: redis::Pipeline,
    names: Vec<String>,
}

impl StorePipeline {
    pub fn new() -> Self {
        StorePipeline::default()
    }

    /// Queue a command. Arguments are added with [`StorePipeline::arg`] and
    /// apply to the most recently queued command, mirroring `redis::Pipeline`.
    pub fn cmd(&mut self, name: &str) -> &mut Self {
        self.names.push(name.to_ascii_lowercase());
        self.pipe.cmd(name);
        self
    }

    pub fn arg<T: ToRedisArgs>(&mut self, arg: T) -> &mut Self {
        self.pipe.arg(arg);
        self
    }

    /// Drop the most recent command's reply from the batch result.
    pub fn ignore(&mut self) -> &mut Self {
        self.pipe.ignore();
        self
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub(crate) fn inner(&self) -> &redis::Pipeline {
        &self.pipe
    }

    /// Comma-joined command names, as the slow/error event reports them.
    pub fn command_names(&self) -> String {
        super::hook::join_commands(&self.names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_joined_in_queue_order() {
        let mut pipe = StorePipeline::new();
        pipe.cmd("SET").arg("k").arg("v").ignore();
        pipe.cmd("INCR").arg("counter");
        pipe.cmd("GET").arg("k");

        assert_eq!(pipe.len(), 3);
        assert_eq!(pipe.command_names(), "set,incr,get");
    }

    #[test]
    fn test_empty_pipeline() {
        let pipe = StorePipeline::new();
        assert!(pipe.is_empty());
        assert_eq!(pipe.command_names(), "");
    }
}
