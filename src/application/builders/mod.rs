//! Entity builders turning samples into topology entities.
//!
//! Every builder reports failures per entity: an entity that cannot be built
//! shows up in [`BuildOutput::errors`] while its siblings are still emitted.

pub mod consumer;
pub mod producer;
pub mod standalone;
pub mod stitching;

pub use consumer::ConsumerEntityBuilder;
pub use producer::ProducerEntityBuilder;
pub use standalone::StandaloneEntityBuilder;

use crate::domain::entity::Entity;
use crate::domain::errors::BuildError;
use crate::domain::sample::MetricSample;

/// Samples correlated under one producer or consumer id.
#[derive(Debug, Clone, Copy)]
pub struct SampleGroup<'a> {
    pub id: &'a str,
    pub samples: &'a [MetricSample],
}

impl<'a> SampleGroup<'a> {
    pub fn new(id: &'a str, samples: &'a [MetricSample]) -> Self {
        Self { id, samples }
    }
}

/// An entity that could not be built, and the subject it was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntity {
    pub subject: String,
    pub error: BuildError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOutput {
    pub entities: Vec<Entity>,
    pub errors: Vec<SkippedEntity>,
}

impl BuildOutput {
    pub fn push_result(&mut self, subject: &str, result: Result<Entity, BuildError>) {
        match result {
            Ok(entity) => self.entities.push(entity),
            Err(error) => self.errors.push(SkippedEntity {
                subject: subject.to_string(),
                error,
            }),
        }
    }

    pub fn extend(&mut self, other: BuildOutput) {
        self.entities.extend(other.entities);
        self.errors.extend(other.errors);
    }
}

/// Builds one or more entities from `Input`.
pub trait EntityBuilder<Input: ?Sized> {
    fn build(&self, input: &Input) -> BuildOutput;

    fn build_all<'i, I>(&self, inputs: I) -> BuildOutput
    where
        Input: 'i,
        I: IntoIterator<Item = &'i Input>,
    {
        let mut output = BuildOutput::default();
        for input in inputs {
            output.extend(self.build(input));
        }
        output
    }
}
