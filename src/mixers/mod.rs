mod logistic_mixer;

pub use logistic_mixer::*;

/// Sink the models push their stretched predictions into.
pub trait Mixer {
    /// Adds one input in the stretched domain
    fn add(&mut self, x: i32);
    /// Selects weight set `ctx` out of the next `range` sets
    fn set(&mut self, ctx: u32, range: u32);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::Mixer;

    /// Collects inputs so tests can look at what a model added.
    #[derive(Default)]
    pub struct InputRecorder {
        pub inputs: Vec<i32>,
        pub contexts: Vec<(u32, u32)>,
    }

    impl Mixer for InputRecorder {
        fn add(&mut self, x: i32) {
            self.inputs.push(x);
        }

        fn set(&mut self, ctx: u32, range: u32) {
            self.contexts.push((ctx, range));
        }
    }
}
